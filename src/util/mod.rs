pub mod errors;
pub mod viz;
