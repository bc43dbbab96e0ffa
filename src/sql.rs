//! SQL module - parsing of the `SELECT ... FROM ... [WHERE ...]` subset
//!
//! Expressions inside the query are handled by the expression parser; this
//! module splits the clauses, resolves table aliases and joins, and records
//! which columns each table must provide.

pub mod ast;
pub mod error;
pub mod parser;
pub mod scanner;

pub use ast::{ColumnRef, JoinKey, JoinKind, JoinNode, QueryTree, SelectItem, TableNode};
pub use error::{QueryError, QueryResult};
pub use parser::QueryParser;
