/*
Recursive descent parser for the flownet syntax :

expr ::= term ( ( '.' | '||' ) term )*
term ::= IDENT [ '(' ')' ] [ '^' DIGITS ]
       | '[' expr ']' [ '^' DIGITS ]

Both binary operators are left associative and always build binary nodes,
so "a.b.c" is Sequence(Sequence(a, b), c) and never a flat 3-element sequence.
A priority marker binds to the term right before it.
The depth of the built tree and the bracket nesting are both bounded by max_nesting.
Nothing is checked about module names here, that is the job of the code generator.
*/

use crate::ast::parse_ast::*;

use super::lexer::{Token, TokenKind, Tokenizer};
use super::{ParseError, ParseErrorType, SyntaxError, MAX_NESTING};

pub struct Parser<I: Iterator<Item = char>> {
    tokens: Tokenizer<I>,
    cur: Token,
    file_id: usize,
    depth: usize,
    max_nesting: usize,
}

//how a token is named in error messages
fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::End => token.kind.to_string(),
        TokenKind::Prio => format!("\"^{}\"", token.value),
        _ => format!("\"{}\"", token.value),
    }
}

impl<I: Iterator<Item = char>> Parser<I> {
    pub fn new(file_id: usize, chars: I) -> Result<Self, ParseError> {
        let mut tokens = Tokenizer::new(chars);
        let cur = tokens.next_token()?;
        Ok(Parser {
            tokens,
            cur,
            file_id,
            depth: 0,
            max_nesting: MAX_NESTING,
        })
    }

    pub fn with_max_nesting(mut self, max_nesting: usize) -> Self {
        self.max_nesting = max_nesting;
        self
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.tokens.next_token()?;
        Ok(std::mem::replace(&mut self.cur, next))
    }

    fn error_here(&self, kind: ParseErrorType) -> ParseError {
        ParseError {
            kind,
            line: self.cur.line,
            col: self.cur.col,
            l: self.cur.l,
            r: self.cur.r,
        }
    }

    fn unexpected(&self, expected: String) -> ParseError {
        self.error_here(ParseErrorType::Syntax(SyntaxError {
            token: describe(&self.cur),
            expected,
        }))
    }

    //consumes the current token if it has the expected kind
    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.cur.kind != kind {
            return Err(self.unexpected(kind.to_string()));
        }
        self.advance()
    }

    //the tree gets one level deeper at the given token, which must stay within the limit
    fn deeper(&self, depth: usize, at: &Token) -> Result<usize, ParseError> {
        if depth >= self.max_nesting {
            return Err(ParseError {
                kind: ParseErrorType::TooDeep(self.max_nesting),
                line: at.line,
                col: at.col,
                l: at.l,
                r: at.r,
            });
        }
        Ok(depth + 1)
    }

    //optional "^digits" after a term
    fn priority(&mut self, node: Expr, depth: usize) -> Result<(Expr, usize), ParseError> {
        if self.cur.kind != TokenKind::Prio {
            return Ok((node, depth));
        }
        if self.cur.value.is_empty() {
            return Err(self.error_here(ParseErrorType::MissingPriority));
        }
        let level = self
            .cur
            .value
            .parse::<u32>()
            .map_err(|_| self.error_here(ParseErrorType::PriorityOutOfRange(self.cur.value.clone())))?;
        let depth = self.deeper(depth, &self.cur)?;
        self.advance()?;
        Ok((Expr::priority(level, node), depth))
    }

    //IDENT '(' ')', the identifier is already consumed
    fn call(&mut self, name: Token) -> Result<Expr, ParseError> {
        self.expect(TokenKind::LParen)?;
        self.expect(TokenKind::RParen)?;
        Ok(Expr::Call {
            module: Loc::new((self.file_id, name.l, name.r), name.value),
        })
    }

    //a term and the depth of its tree
    fn parse_term(&mut self) -> Result<(Expr, usize), ParseError> {
        match self.cur.kind {
            TokenKind::Ident => {
                let name = self.advance()?;
                let node = if self.cur.kind == TokenKind::LParen {
                    self.call(name)?
                } else {
                    Expr::action(&name.value)
                };
                self.priority(node, 1)
            }
            TokenKind::LBrack => {
                if self.depth >= self.max_nesting {
                    return Err(self.error_here(ParseErrorType::TooDeep(self.max_nesting)));
                }
                self.depth += 1;
                self.advance()?;
                let (node, depth) = self.parse_expr()?;
                self.expect(TokenKind::RBrack)?;
                self.depth -= 1;
                self.priority(node, depth)
            }
            _ => Err(self.unexpected("a term (identifier or \"[\")".to_string())),
        }
    }

    //a chain is parsed in a loop, but every operator puts the whole chain one level deeper
    fn parse_expr(&mut self) -> Result<(Expr, usize), ParseError> {
        let (mut left, mut depth) = self.parse_term()?;
        loop {
            let op = self.cur.kind;
            if !matches!(op, TokenKind::Dot | TokenKind::Parallel | TokenKind::Choice) {
                return Ok((left, depth));
            }
            let op_token = self.advance()?;
            let (right, right_depth) = self.parse_term()?;
            depth = self.deeper(depth.max(right_depth), &op_token)?;
            left = match op {
                TokenKind::Dot => Expr::sequence(left, right),
                TokenKind::Parallel => Expr::parallel(left, right),
                _ => Expr::choice(left, right),
            };
        }
    }

    fn expect_end(&self) -> Result<(), ParseError> {
        if self.cur.kind != TokenKind::End {
            return Err(self.error_here(ParseErrorType::ExtraInput(describe(&self.cur))));
        }
        Ok(())
    }

    //parses a whole expression, nothing may follow it
    pub fn parse(mut self) -> Result<Expr, ParseError> {
        let (expr, _) = self.parse_expr()?;
        self.expect_end()?;
        Ok(expr)
    }

    //parses a single module call with an optional priority, nothing may follow it
    pub fn parse_invocation(mut self) -> Result<Expr, ParseError> {
        let name = self.expect(TokenKind::Ident)?;
        let call = self.call(name)?;
        let (expr, _) = self.priority(call, 1)?;
        self.expect_end()?;
        Ok(expr)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{parse_invocation, parse_str};
    use super::*;

    fn kind(src: &str) -> ParseErrorType {
        parse_str(src).unwrap_err().kind
    }

    #[test]
    fn test_left_leaning_sequence() {
        assert_eq!(
            parse_str("a.b.c").unwrap(),
            Expr::sequence(
                Expr::sequence(Expr::action("a"), Expr::action("b")),
                Expr::action("c")
            )
        );
    }

    #[test]
    fn test_literals() {
        assert_eq!(
            parse_str("a||b").unwrap(),
            Expr::parallel(Expr::action("a"), Expr::action("b"))
        );
        assert_eq!(
            parse_str("x^5").unwrap(),
            Expr::priority(5, Expr::action("x"))
        );
        assert_eq!(parse_str("modA()").unwrap(), Expr::call("modA"));
        assert_eq!(
            parse_str("[a||b]").unwrap(),
            Expr::parallel(Expr::action("a"), Expr::action("b"))
        );
    }

    #[test]
    fn test_priority_binds_tighter() {
        assert_eq!(
            parse_str("a^2.b").unwrap(),
            Expr::sequence(Expr::priority(2, Expr::action("a")), Expr::action("b"))
        );
        assert_eq!(
            parse_str("[a.b]^3 || m()^1").unwrap(),
            Expr::parallel(
                Expr::priority(3, Expr::sequence(Expr::action("a"), Expr::action("b"))),
                Expr::priority(1, Expr::call("m"))
            )
        );
    }

    #[test]
    fn test_mixed_operators_left_assoc() {
        assert_eq!(
            parse_str("a.b||c").unwrap(),
            Expr::parallel(
                Expr::sequence(Expr::action("a"), Expr::action("b")),
                Expr::action("c")
            )
        );
    }

    #[test]
    fn test_deterministic() {
        let src = "[init . [left || right()^4]]^2 . done";
        assert_eq!(parse_str(src).unwrap(), parse_str(src).unwrap());
    }

    #[test]
    fn test_call_position() {
        match parse_str("a . sub()").unwrap() {
            Expr::Sequence { children } => match &children[1] {
                Expr::Call { module } => assert_eq!(module.loc, (0, 4, 7)),
                other => panic!("unexpected {:?}", other),
            },
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_rejected() {
        assert_eq!(kind("a|b"), ParseErrorType::LoneBar);
        assert!(matches!(kind(".a"), ParseErrorType::Syntax(_)));
        assert!(matches!(kind("[a.b"), ParseErrorType::Syntax(_)));
        assert_eq!(kind("a^^2"), ParseErrorType::MissingPriority);
        assert!(matches!(kind("a b"), ParseErrorType::ExtraInput(_)));
        assert!(matches!(kind("m(.a"), ParseErrorType::Syntax(_)));
        assert!(matches!(kind(""), ParseErrorType::Syntax(_)));
        assert_eq!(
            kind("a^99999999999"),
            ParseErrorType::PriorityOutOfRange("99999999999".to_string())
        );
    }

    #[test]
    fn test_invocation() {
        assert_eq!(parse_invocation("modA()").unwrap(), Expr::call("modA"));
        assert_eq!(
            parse_invocation("modA()^3").unwrap(),
            Expr::priority(3, Expr::call("modA"))
        );
        let err = parse_invocation("modA").unwrap_err();
        assert_eq!(
            err.kind,
            ParseErrorType::Syntax(SyntaxError {
                token: "end of input".to_string(),
                expected: "\"(\"".to_string(),
            })
        );
        assert!(parse_invocation("modA().b").is_err());
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}a{}", "[".repeat(20), "]".repeat(20));
        assert!(Parser::new(0, deep.chars()).unwrap().parse().is_ok());
        let err = Parser::new(0, deep.chars())
            .unwrap()
            .with_max_nesting(10)
            .parse()
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(10));
        assert_eq!(err.col, 11);
    }

    #[test]
    fn test_chain_depth_limit() {
        let err = Parser::new(0, "a.b.c.d".chars())
            .unwrap()
            .with_max_nesting(3)
            .parse()
            .unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(3));
        assert_eq!(err.col, 6);

        let long = vec!["a"; 20_000].join(".");
        let err = parse_str(&long).unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(MAX_NESTING));
        assert_eq!(err.col, 2 * MAX_NESTING);
        let err = parse_str(&vec!["a"; 20_000].join(" || ")).unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(MAX_NESTING));
    }

    #[test]
    fn test_depth_counts_inner_trees() {
        let parse = |src: &str| {
            Parser::new(0, src.chars())
                .unwrap()
                .with_max_nesting(3)
                .parse()
        };
        assert!(parse("a.[b.c]").is_ok());
        let err = parse("a.[b.[c.d]]").unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(3));
        assert_eq!(err.col, 2);
        assert!(parse("[a^1]^2").is_ok());
        let err = parse("[[a^1]^2]^3").unwrap_err();
        assert_eq!(err.kind, ParseErrorType::TooDeep(3));
        assert_eq!(err.col, 10);
    }

    #[test]
    fn test_deepest_accepted_trees() {
        let chain = vec!["a"; MAX_NESTING].join(".");
        assert!(parse_str(&chain).is_ok());
        let nested = format!(
            "{}a{}",
            "[".repeat(MAX_NESTING),
            "]".repeat(MAX_NESTING)
        );
        assert!(parse_str(&nested).is_ok());
    }

    #[test]
    fn test_error_position() {
        let err = parse_str("a.\n  [b || ]").unwrap_err();
        assert_eq!((err.line, err.col), (2, 9));
    }
}
