//! Error types for expression parsing and evaluation.

use thiserror::Error;

/// Errors raised while parsing or evaluating an expression
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    /// The expression text could not be parsed
    #[error("Malformed expression '{text}': {reason}")]
    MalformedExpression { text: String, reason: String },

    /// A reference could not be resolved by the value provider
    #[error("Unknown identifier: {name}")]
    UnknownIdentifier { name: String },

    /// No function is registered under this name
    #[error("Unknown function: {name}")]
    UnknownFunction { name: String },

    /// A function was called with unusable arguments
    #[error("Invalid arguments for function {function}: {reason}")]
    FunctionArgument { function: String, reason: String },

    /// A function failed while computing its result
    #[error("Function {function} failed: {reason}")]
    FunctionFailed { function: String, reason: String },

    /// A value could not be converted to the type an operator needs
    #[error("Cannot convert '{value}' to {target}")]
    InvalidConversion { value: String, target: String },

    #[error("Division by zero")]
    DivisionByZero,
}

impl ExpressionError {
    pub fn malformed(text: impl Into<String>, reason: impl Into<String>) -> Self {
        ExpressionError::MalformedExpression {
            text: text.into(),
            reason: reason.into(),
        }
    }

    pub fn argument(function: &str, reason: impl Into<String>) -> Self {
        ExpressionError::FunctionArgument {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    pub fn failed(function: &str, reason: impl Into<String>) -> Self {
        ExpressionError::FunctionFailed {
            function: function.to_string(),
            reason: reason.into(),
        }
    }

    pub fn conversion(value: impl ToString, target: &str) -> Self {
        ExpressionError::InvalidConversion {
            value: value.to_string(),
            target: target.to_string(),
        }
    }
}

/// Result type for expression operations
pub type ExpressionResult<T> = Result<T, ExpressionError>;
