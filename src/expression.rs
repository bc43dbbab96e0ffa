//! Expression language: AST, parser, evaluator and function library.
//!
//! This module provides:
//! - An arena-backed expression AST with parent links
//! - A recursive-descent parser with full and partial parsing
//! - Evaluation against pluggable value providers
//! - A case-insensitive function registry with built-in functions

pub mod error;
pub mod eval;
pub mod expr;
pub mod functions;
pub mod operator;
pub mod parser;

pub use error::{ExpressionError, ExpressionResult};
pub use eval::{apply_binary, Evaluator, NoValues, ValueProvider, VariableProvider};
pub use expr::{Expression, ExpressionBuilder, LiteralKind, Node, NodeId, NodeKind};
pub use functions::{Function, FunctionRegistry};
pub use operator::{BinaryOperator, OperatorClass};
pub use parser::{ExpressionParser, PartialParse};
