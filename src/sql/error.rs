//! Errors raised while parsing or executing a query.

use crate::expression::ExpressionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Expression(#[from] ExpressionError),

    /// The text does not have the `SELECT ... FROM ... [WHERE ...]` shape
    #[error("Invalid query '{query}': {reason}")]
    InvalidQuery { query: String, reason: String },

    #[error("SELECT * is not supported, list the columns explicitly")]
    SelectAll,

    #[error("Ambiguous join condition '{condition}': {reason}")]
    AmbiguousJoinCondition { condition: String, reason: String },

    /// An alias is referenced but no such table is declared or loaded
    #[error("Missing base table '{alias}' referenced by {context}")]
    MissingBaseTable { alias: String, context: String },

    #[error("Ambiguous column '{column}': {reason}")]
    AmbiguousColumn { column: String, reason: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Evaluating a SELECT item failed on some row
    #[error("Cannot compute column '{column}' ({expression}): {source}")]
    ColumnEvaluation {
        column: String,
        expression: String,
        #[source]
        source: ExpressionError,
    },

    /// Failure reported by the table source, passed through unchanged
    #[error(transparent)]
    Source(#[from] anyhow::Error),
}

impl QueryError {
    pub fn invalid_query(query: &str, reason: impl Into<String>) -> Self {
        QueryError::InvalidQuery {
            query: query.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ambiguous_join(condition: &str, reason: impl Into<String>) -> Self {
        QueryError::AmbiguousJoinCondition {
            condition: condition.to_string(),
            reason: reason.into(),
        }
    }

    pub fn column_evaluation(column: &str, expression: &str, source: ExpressionError) -> Self {
        QueryError::ColumnEvaluation {
            column: column.to_string(),
            expression: expression.to_string(),
            source,
        }
    }
}

pub type QueryResult<T> = Result<T, QueryError>;
