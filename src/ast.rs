mod expr;
mod print;
mod stmt;

pub use expr::Expr;
pub use stmt::{FunctionDecl, Stmt};
