//! The symbolic algebra system.

mod expr;
pub mod ops;
mod parse;

pub use expr::{BinaryOperation, Expression, Parameter};
pub use parse::{parse, ParseError, TokenKind};
