//! The JavaScript output tree: operators, nodes, precedence and printing.

pub mod ast;
pub mod ops;
pub mod precedence;
pub mod printer;

pub use ast::{JsExpr, JsFunction, JsLiteral, JsProgram, JsStmt};
pub use ops::{BinaryOp, UnaryOp};
pub use precedence::{NodeRef, Precedence, resolve};
pub use printer::{expr_to_js, to_js};
