/*
The files in this folder are called in the following order :
-parser_wrapper (lexer.rs, then parser.rs) turns a source into an Expr
-lockfile.rs registers every module of a project (optional)
-codegen.rs compiles a registered module into a Petri net fragment
*/

pub(crate) mod codegen;
pub(crate) mod lockfile;
pub(crate) mod parser_wrapper;
