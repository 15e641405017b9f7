pub mod lexer;
pub mod parser;
use std::fmt::Display;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};

use crate::ast::parse_ast::*;

use self::parser::Parser;
use codespan_reporting::files::SimpleFiles;

//maximum depth of a parsed tree, and of bracket nesting
pub const MAX_NESTING: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorType {
    UnknownChar(char),
    LoneBar,
    Syntax(SyntaxError),
    ExtraInput(String),
    MissingPriority,
    PriorityOutOfRange(String),
    TooDeep(usize),
}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    pub token: String,
    pub expected: String,
}

//a lexical or syntax error, with the position of the offending character or token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub kind: ParseErrorType,
    pub line: usize,
    pub col: usize,
    pub l: usize,
    pub r: usize,
}

impl Display for ParseErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErrorType::UnknownChar(c) => write!(f, "Unknown character: {}", c),
            ParseErrorType::LoneBar => write!(f, "Expected '||'"),
            ParseErrorType::Syntax(err) => {
                write!(f, "Unexpected token {}, expected {}", err.token, err.expected)
            }
            ParseErrorType::ExtraInput(token) => write!(f, "Extra input {}", token),
            ParseErrorType::MissingPriority => write!(f, "Missing priority level after '^'"),
            ParseErrorType::PriorityOutOfRange(digits) => {
                write!(f, "Priority level {} is out of range", digits)
            }
            ParseErrorType::TooDeep(depth) => {
                write!(f, "Expression nested more than {} levels deep", depth)
            }
        }
    }
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Parse error at {}:{} - {}", self.line, self.col, self.kind)
    }
}

impl std::error::Error for ParseError {}

#[derive(Debug)]
pub struct FileError {
    pub file: PathBuf,
    pub error: String,
}

impl From<(PathBuf, std::io::Error)> for FileError {
    fn from(error: (PathBuf, std::io::Error)) -> Self {
        FileError {
            file: error.0,
            error: format!("{}", error.1),
        }
    }
}

impl Display for FileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.file.to_string_lossy(), self.error)
    }
}

#[derive(Debug)]
pub enum ParserError {
    File(FileError),
    Parse(usize, ParseError), //file id in the SimpleFiles, error
}

impl From<FileError> for ParserError {
    fn from(err: FileError) -> Self {
        ParserError::File(err)
    }
}

impl From<(usize, ParseError)> for ParserError {
    fn from(err: (usize, ParseError)) -> Self {
        ParserError::Parse(err.0, err.1)
    }
}

impl Display for ParserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParserError::File(err) => write!(f, "Cannot open input: {}", err),
            ParserError::Parse(_, err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for ParserError {}

//parses a standalone expression, positions refer to file 0
pub fn parse_str(src: &str) -> Result<Expr, ParseError> {
    Parser::new(0, src.chars())?.parse()
}

//parses a source that must be a single module call, like "modA()"
pub fn parse_invocation(src: &str) -> Result<Expr, ParseError> {
    Parser::new(0, src.chars())?.parse_invocation()
}

//registers the source so diagnostics can show it, then parses it
pub fn parse_source(
    files: &mut SimpleFiles<String, String>,
    name: String,
    source: String,
    max_nesting: usize,
) -> Result<Expr, ParserError> {
    let file_id = files.add(name, source.clone());
    let expr = Parser::new(file_id, source.chars())
        .and_then(|p| p.with_max_nesting(max_nesting).parse())
        .map_err(|e| (file_id, e))?;
    Ok(expr)
}

pub fn parse_file(
    files: &mut SimpleFiles<String, String>,
    path: &Path,
    max_nesting: usize,
) -> Result<Expr, ParserError> {
    let source = read_to_string(path).map_err(|e| FileError::from((path.to_path_buf(), e)))?;
    parse_source(
        files,
        path.to_string_lossy().to_string(),
        source,
        max_nesting,
    )
}
