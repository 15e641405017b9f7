use codespan_reporting::diagnostic::{Diagnostic, Label};
use codespan_reporting::files::SimpleFiles;
use codespan_reporting::term::termcolor::{ColorChoice, StandardStream, WriteColor};
use itertools::Itertools;
use std::rc::Rc;

use crate::frontend::{
    codegen::CompileError,
    lockfile::ProjectError,
    parser_wrapper::{FileError, ParseError, ParseErrorType, ParserError},
};

/*
This file is dedicated to the handling of all errors, to pretty print them using codespan_diagnostic.
Every error of the pipeline ends up here, with the sources it refers to.
*/
#[derive(Debug)]
pub enum ErrorType {
    Parser(ParserError),
    Compile(CompileError),
    Project(ProjectError),
    Output(FileError),
}

impl From<ParserError> for ErrorType {
    fn from(err: ParserError) -> Self {
        ErrorType::Parser(err)
    }
}
impl From<CompileError> for ErrorType {
    fn from(err: CompileError) -> Self {
        ErrorType::Compile(err)
    }
}
impl From<ProjectError> for ErrorType {
    fn from(err: ProjectError) -> Self {
        ErrorType::Project(err)
    }
}
impl From<FileError> for ErrorType {
    fn from(err: FileError) -> Self {
        ErrorType::Output(err)
    }
}

fn file_diagnostic(file_error: &FileError) -> Diagnostic<usize> {
    Diagnostic::error()
        .with_message(format!("File {}", file_error.file.to_string_lossy()))
        .with_code("E0000")
        .with_notes(vec![file_error.error.clone()])
}

fn parse_diagnostic(file_id: usize, error: &ParseError) -> Diagnostic<usize> {
    let label = Label::primary(file_id, error.l..error.r);
    let location = format!("at line {}, column {}", error.line, error.col);
    match &error.kind {
        ParseErrorType::UnknownChar(_) | ParseErrorType::LoneBar => Diagnostic::error()
            .with_message("Lexical Error")
            .with_code("E0001")
            .with_labels(vec![label.with_message(format!("{}", error.kind))])
            .with_notes(vec![location]),
        ParseErrorType::Syntax(syntax_error) => Diagnostic::error()
            .with_message("Syntax Error")
            .with_code("E0002")
            .with_labels(vec![
                label.with_message(format!("Unexpected token {}", syntax_error.token))
            ])
            .with_notes(vec![
                format!("Expected {}", syntax_error.expected),
                location,
            ]),
        ParseErrorType::ExtraInput(token) => Diagnostic::error()
            .with_message("Syntax Error : extra input")
            .with_code("E0003")
            .with_labels(vec![
                label.with_message(format!("{} after a complete expression", token))
            ])
            .with_notes(vec![location]),
        ParseErrorType::MissingPriority | ParseErrorType::PriorityOutOfRange(_) => {
            Diagnostic::error()
                .with_message("Syntax Error : bad priority")
                .with_code("E0004")
                .with_labels(vec![label.with_message(format!("{}", error.kind))])
                .with_notes(vec![
                    "A priority is written ^ followed by a 32 bit unsigned integer".to_string(),
                    location,
                ])
        }
        ParseErrorType::TooDeep(_) => Diagnostic::error()
            .with_message("Syntax Error : nesting too deep")
            .with_code("E0005")
            .with_labels(vec![label.with_message(format!("{}", error.kind))])
            .with_notes(vec![location]),
    }
}

fn parser_diagnostic(error: &ParserError) -> Diagnostic<usize> {
    match error {
        ParserError::File(file_error) => file_diagnostic(file_error),
        ParserError::Parse(file_id, parse_error) => parse_diagnostic(*file_id, parse_error),
    }
}

fn compile_diagnostic(error: &CompileError) -> Diagnostic<usize> {
    let labels = |call_site: &Option<(usize, usize, usize)>, message: String| match call_site {
        Some((file_id, l, r)) => vec![Label::primary(*file_id, *l..*r).with_message(message)],
        None => Vec::new(),
    };
    match error {
        CompileError::UnknownModule(call_site, name) => Diagnostic::error()
            .with_message("Error : unknown module")
            .with_code("E0010")
            .with_labels(labels(call_site, format!("Unknown module {}", name)))
            .with_notes(vec![format!("No module named {} was registered", name)]),
        CompileError::CyclicModuleCall(call_site, cycle) => Diagnostic::error()
            .with_message("Error : cyclic module reference")
            .with_code("E0011")
            .with_labels(labels(call_site, "This call closes the cycle".to_string()))
            .with_notes(vec![format!(
                "Module {} calls itself : {}",
                cycle.first().cloned().unwrap_or_default(),
                cycle.iter().join(" -> ")
            )]),
        CompileError::StackOverflow(name, depth) => Diagnostic::error()
            .with_message("Error : stack overflow")
            .with_code("E0012")
            .with_notes(vec![format!(
                "Module {} was nested more than {} levels deep while compiling.",
                name, depth
            )]),
    }
}

fn get_diagnostic(error_type: &ErrorType) -> Diagnostic<usize> {
    match error_type {
        ErrorType::Parser(err) => parser_diagnostic(err),
        ErrorType::Compile(err) => compile_diagnostic(err),
        ErrorType::Project(err) => match err {
            ProjectError::File(file_error) => file_diagnostic(file_error),
            ProjectError::Format(path, message) => Diagnostic::error()
                .with_message(format!("Malformed file {}", path.to_string_lossy()))
                .with_code("E0020")
                .with_notes(vec![message.clone()]),
            ProjectError::Module(parser_error) => parser_diagnostic(parser_error),
            ProjectError::NoModuleName(path) => Diagnostic::error()
                .with_message("Error : no module name")
                .with_code("E0021")
                .with_notes(vec![format!(
                    "Cannot derive a module name from {}, give it a \"name\"",
                    path.to_string_lossy()
                )]),
        },
        ErrorType::Output(file_error) => file_diagnostic(file_error).with_code("E0030"),
    }
}

pub struct FlownetError {
    error: ErrorType,
    files: Rc<SimpleFiles<String, String>>,
}
impl FlownetError {
    pub fn new(error: ErrorType, files: Rc<SimpleFiles<String, String>>) -> Self {
        FlownetError { error, files }
    }

    pub fn emit(&self, writer: &mut dyn WriteColor) -> std::fmt::Result {
        let diagnostic = get_diagnostic(&self.error);
        let config = codespan_reporting::term::Config::default();
        codespan_reporting::term::emit(writer, &config, &*self.files, &diagnostic)
            .map_err(|_| std::fmt::Error)
    }

    pub fn print(&self) -> std::fmt::Result {
        let mut writer = StandardStream::stderr(ColorChoice::Auto);
        self.emit(&mut writer)
    }
}

impl From<(ParserError, Rc<SimpleFiles<String, String>>)> for FlownetError {
    fn from(err: (ParserError, Rc<SimpleFiles<String, String>>)) -> Self {
        let (parse_error, files) = err;
        FlownetError::new(ErrorType::Parser(parse_error), files)
    }
}

impl From<(CompileError, Rc<SimpleFiles<String, String>>)> for FlownetError {
    fn from(err: (CompileError, Rc<SimpleFiles<String, String>>)) -> Self {
        let (compile_error, files) = err;
        FlownetError::new(ErrorType::Compile(compile_error), files)
    }
}

impl From<(ProjectError, Rc<SimpleFiles<String, String>>)> for FlownetError {
    fn from(err: (ProjectError, Rc<SimpleFiles<String, String>>)) -> Self {
        let (project_error, files) = err;
        FlownetError::new(ErrorType::Project(project_error), files)
    }
}

impl From<(FileError, Rc<SimpleFiles<String, String>>)> for FlownetError {
    fn from(err: (FileError, Rc<SimpleFiles<String, String>>)) -> Self {
        let (file_error, files) = err;
        FlownetError::new(ErrorType::Output(file_error), files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frontend::{codegen::Codegen, parser_wrapper::parse_source};
    use codespan_reporting::term::termcolor::NoColor;

    fn render(error: FlownetError) -> String {
        let mut out = NoColor::new(Vec::new());
        error.emit(&mut out).unwrap();
        String::from_utf8(out.into_inner()).unwrap()
    }

    #[test]
    fn test_syntax_diagnostic() {
        let mut files = SimpleFiles::new();
        let err = parse_source(&mut files, "flow.rppa".into(), "a . [b || ]".into(), 10)
            .unwrap_err();
        let text = render((err, Rc::new(files)).into());
        assert!(text.contains("E0002"));
        assert!(text.contains("flow.rppa"));
        assert!(text.contains("Unexpected token \"]\""));
    }

    #[test]
    fn test_compile_diagnostic() {
        let mut files = SimpleFiles::new();
        let expr = parse_source(&mut files, "main.rppa".into(), "start . ghost()".into(), 10)
            .unwrap();
        let mut cg = Codegen::new();
        cg.register("main", expr);
        let err = cg.generate("main").unwrap_err();
        let text = render((err, Rc::new(files)).into());
        assert!(text.contains("E0010"));
        assert!(text.contains("Unknown module ghost"));
        assert!(text.contains("main.rppa"));
    }

    #[test]
    fn test_cycle_diagnostic() {
        let mut files = SimpleFiles::new();
        let a = parse_source(&mut files, "a.rppa".into(), "b()".into(), 10).unwrap();
        let b = parse_source(&mut files, "b.rppa".into(), "a()".into(), 10).unwrap();
        let mut cg = Codegen::new();
        cg.register("a", a);
        cg.register("b", b);
        let err = cg.generate("a").unwrap_err();
        let text = render((err, Rc::new(files)).into());
        assert!(text.contains("E0011"));
        assert!(text.contains("a -> b -> a"));
        assert!(text.contains("b.rppa"));
    }
}
