// Shared IR: the type model, data model, expression AST and statement tree.

pub mod expr;
pub mod model;
pub mod stmt;
pub mod types;
