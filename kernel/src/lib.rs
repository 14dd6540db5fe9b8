pub mod ast;
pub mod checker;
pub mod display;
pub mod eval;
pub mod prelude;
pub mod sharing;

pub use ast::*;
