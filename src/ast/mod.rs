pub mod parse_ast;
pub mod petri;
