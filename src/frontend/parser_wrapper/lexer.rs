/*
The tokenizer. It reads characters one at a time from any char iterator and
hands out one token per call, so the whole token stream never exists at once.

Positions are 1-based line/column pairs (for messages) plus byte offsets
(for codespan labels).
*/

use std::{fmt::Display, iter::Peekable};

use super::{ParseError, ParseErrorType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Dot,
    Parallel,
    //reserved : no character produces it for now
    Choice,
    Prio,
    LBrack,
    RBrack,
    LParen,
    RParen,
    End,
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenKind::Ident => write!(f, "identifier"),
            TokenKind::Dot => write!(f, "\".\""),
            TokenKind::Parallel => write!(f, "\"||\""),
            TokenKind::Choice => write!(f, "choice operator"),
            TokenKind::Prio => write!(f, "priority marker"),
            TokenKind::LBrack => write!(f, "\"[\""),
            TokenKind::RBrack => write!(f, "\"]\""),
            TokenKind::LParen => write!(f, "\"(\""),
            TokenKind::RParen => write!(f, "\")\""),
            TokenKind::End => write!(f, "end of input"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String, //identifier name, priority digits, or the symbol itself
    pub line: usize,
    pub col: usize,
    pub l: usize, //byte span
    pub r: usize,
}

impl Token {
    fn new(kind: TokenKind, value: String, start: (usize, usize, usize), end: usize) -> Self {
        Token {
            kind,
            value,
            line: start.0,
            col: start.1,
            l: start.2,
            r: end,
        }
    }
}

pub struct Tokenizer<I: Iterator<Item = char>> {
    chars: Peekable<I>,
    line: usize,
    col: usize,
    offset: usize,
    finished: bool,
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
    pub fn new(chars: I) -> Self {
        Tokenizer {
            chars: chars.peekable(),
            line: 1,
            col: 1,
            offset: 0,
            finished: false,
        }
    }

    //line, column, byte offset of the next character
    fn here(&self) -> (usize, usize, usize) {
        (self.line, self.col, self.offset)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, kind: ParseErrorType, start: (usize, usize, usize)) -> ParseError {
        ParseError {
            kind,
            line: start.0,
            col: start.1,
            l: start.2,
            r: self.offset.max(start.2 + 1),
        }
    }

    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        while let Some(c) = self.chars.peek() {
            if matches!(*c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c') {
                self.bump();
            } else {
                break;
            }
        }
        let start = self.here();
        let c = match self.chars.peek() {
            Some(c) => *c,
            None => {
                self.finished = true;
                return Ok(Token::new(TokenKind::End, String::new(), start, start.2));
            }
        };
        if c.is_ascii_alphabetic() {
            let mut name = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_alphanumeric() || c == '_' {
                    name.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return Ok(Token::new(TokenKind::Ident, name, start, self.offset));
        }
        self.bump();
        let kind = match c {
            '.' => TokenKind::Dot,
            '[' => TokenKind::LBrack,
            ']' => TokenKind::RBrack,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '|' => {
                if self.chars.peek() == Some(&'|') {
                    self.bump();
                    return Ok(Token::new(
                        TokenKind::Parallel,
                        "||".to_string(),
                        start,
                        self.offset,
                    ));
                }
                return Err(self.error(ParseErrorType::LoneBar, start));
            }
            '^' => {
                let mut digits = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_digit() {
                        digits.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                return Ok(Token::new(TokenKind::Prio, digits, start, self.offset));
            }
            other => return Err(self.error(ParseErrorType::UnknownChar(other), start)),
        };
        Ok(Token::new(kind, c.to_string(), start, self.offset))
    }
}

//stops after the end token or the first error
impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
    type Item = Result<Token, ParseError>;
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        if token.is_err() {
            self.finished = true;
        }
        Some(token)
    }
}
