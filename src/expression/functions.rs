//! Function registry and the built-in function library.

mod convert;
mod date;
mod logic;
mod math;
mod text;

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::value::Value;
use chrono::NaiveDateTime;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A callable registered under one or more names.
pub trait Function: Send + Sync {
    fn call(&self, args: &[Value]) -> ExpressionResult<Value>;
}

impl<F> Function for F
where
    F: Fn(&[Value]) -> ExpressionResult<Value> + Send + Sync,
{
    fn call(&self, args: &[Value]) -> ExpressionResult<Value> {
        self(args)
    }
}

/// Case-insensitive map of function names to implementations.
///
/// The registry is read-only while queries run and is shared through `Arc`.
#[derive(Clone)]
pub struct FunctionRegistry {
    functions: HashMap<String, Arc<dyn Function>>,
}

impl FunctionRegistry {
    /// Registry holding the built-in math, string, date, conversion and logic functions.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        math::register(&mut registry);
        text::register(&mut registry);
        date::register(&mut registry);
        convert::register(&mut registry);
        logic::register(&mut registry);
        registry
    }

    pub fn empty() -> Self {
        Self {
            functions: HashMap::new(),
        }
    }

    /// Registers `function` under `name`, replacing any previous entry.
    pub fn register<F>(&mut self, name: &str, function: F)
    where
        F: Function + 'static,
    {
        self.functions
            .insert(name.to_lowercase(), Arc::new(function));
    }

    /// Registers one implementation under several names.
    pub fn register_aliases<F>(&mut self, names: &[&str], function: F)
    where
        F: Function + 'static,
    {
        let shared: Arc<dyn Function> = Arc::new(function);
        for name in names {
            self.functions.insert(name.to_lowercase(), shared.clone());
        }
    }

    pub fn remove(&mut self, name: &str) -> bool {
        self.functions.remove(&name.to_lowercase()).is_some()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(&name.to_lowercase())
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.functions.get(&name.to_lowercase()).cloned()
    }

    pub fn call(&self, name: &str, args: &[Value]) -> ExpressionResult<Value> {
        let function = self
            .functions
            .get(&name.to_lowercase())
            .ok_or_else(|| ExpressionError::UnknownFunction {
                name: name.to_string(),
            })?;
        function.call(args)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.functions.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FunctionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionRegistry")
            .field("functions", &self.names())
            .finish()
    }
}

// Argument helpers shared by the built-in families

pub(crate) fn expect_args(
    function: &str,
    args: &[Value],
    min: usize,
    max: usize,
) -> ExpressionResult<()> {
    if args.len() >= min && args.len() <= max {
        return Ok(());
    }
    let expected = if min == max {
        format!("{}", min)
    } else if max == usize::MAX {
        format!("at least {}", min)
    } else {
        format!("{} to {}", min, max)
    };
    Err(ExpressionError::argument(
        function,
        format!("expected {} arguments, got {}", expected, args.len()),
    ))
}

pub(crate) fn number_arg(function: &str, args: &[Value], index: usize) -> ExpressionResult<f64> {
    args[index].to_number().ok_or_else(|| {
        ExpressionError::argument(
            function,
            format!("argument {}: cannot convert '{}' to number", index + 1, args[index]),
        )
    })
}

pub(crate) fn integer_arg(function: &str, args: &[Value], index: usize) -> ExpressionResult<i64> {
    args[index].to_integer().ok_or_else(|| {
        ExpressionError::argument(
            function,
            format!("argument {}: cannot convert '{}' to integer", index + 1, args[index]),
        )
    })
}

pub(crate) fn bool_arg(function: &str, args: &[Value], index: usize) -> ExpressionResult<bool> {
    args[index].to_bool().ok_or_else(|| {
        ExpressionError::argument(
            function,
            format!("argument {}: cannot convert '{}' to boolean", index + 1, args[index]),
        )
    })
}

pub(crate) fn datetime_arg(
    function: &str,
    args: &[Value],
    index: usize,
) -> ExpressionResult<NaiveDateTime> {
    args[index].to_datetime().ok_or_else(|| {
        ExpressionError::argument(
            function,
            format!("argument {}: cannot convert '{}' to datetime", index + 1, args[index]),
        )
    })
}

pub(crate) fn text_arg(args: &[Value], index: usize) -> String {
    args[index].to_string()
}
