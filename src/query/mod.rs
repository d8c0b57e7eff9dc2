pub mod ast;
pub mod names;
pub mod parser;

pub use ast::QueryNode;
pub use parser::QueryParser;
