//! Expression evaluation.

use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::expression::expr::{Expression, LiteralKind, NodeId, NodeKind};
use crate::expression::functions::FunctionRegistry;
use crate::expression::operator::BinaryOperator;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::HashMap;

/// Resolves referenced names to values during evaluation.
pub trait ValueProvider {
    fn get_value(&self, name: &str) -> ExpressionResult<Value>;
}

/// Provider for expressions that reference nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoValues;

impl ValueProvider for NoValues {
    fn get_value(&self, name: &str) -> ExpressionResult<Value> {
        Err(ExpressionError::UnknownIdentifier {
            name: name.to_string(),
        })
    }
}

/// Provider backed by a plain name to value map.
#[derive(Debug, Clone, Default)]
pub struct VariableProvider {
    values: HashMap<String, Value>,
}

impl VariableProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }
}

impl ValueProvider for VariableProvider {
    fn get_value(&self, name: &str) -> ExpressionResult<Value> {
        self.values
            .get(name)
            .cloned()
            .ok_or_else(|| ExpressionError::UnknownIdentifier {
                name: name.to_string(),
            })
    }
}

/// Evaluates expression trees against a value provider and a function registry.
#[derive(Clone, Copy)]
pub struct Evaluator<'a> {
    functions: &'a FunctionRegistry,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionRegistry) -> Self {
        Self { functions }
    }

    pub fn evaluate(
        &self,
        expression: &Expression,
        provider: &dyn ValueProvider,
    ) -> ExpressionResult<Value> {
        self.evaluate_node(expression, expression.root(), provider)
    }

    /// Evaluates the sub-tree rooted at `id`.
    pub fn evaluate_node(
        &self,
        expression: &Expression,
        id: NodeId,
        provider: &dyn ValueProvider,
    ) -> ExpressionResult<Value> {
        match expression.kind(id) {
            NodeKind::Literal {
                text,
                kind: LiteralKind::String,
            } => Ok(Value::String(text.clone())),
            NodeKind::Literal {
                text,
                kind: LiteralKind::Number,
            } => number_literal(text),
            NodeKind::Boolean(b) => Ok(Value::Boolean(*b)),
            NodeKind::Null => Ok(Value::Null),
            NodeKind::Reference(name) => provider.get_value(name),
            NodeKind::Group(inner) => self.evaluate_node(expression, *inner, provider),
            NodeKind::Binary { op, left, right } => {
                // Both sides are always evaluated, logical operators included
                let left = self.evaluate_node(expression, *left, provider)?;
                let right = self.evaluate_node(expression, *right, provider)?;
                apply_binary(*op, &left, &right)
            }
            NodeKind::Call { name, args } => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate_node(expression, *arg, provider))
                    .collect::<ExpressionResult<Vec<_>>>()?;
                self.functions.call(name, &values)
            }
        }
    }

    /// Evaluates a node as a filter condition. Null counts as false.
    pub fn evaluate_predicate(
        &self,
        expression: &Expression,
        id: NodeId,
        provider: &dyn ValueProvider,
    ) -> ExpressionResult<bool> {
        let value = self.evaluate_node(expression, id, provider)?;
        if value.is_null() {
            return Ok(false);
        }
        value
            .to_bool()
            .ok_or_else(|| ExpressionError::conversion(&value, "boolean"))
    }
}

fn number_literal(text: &str) -> ExpressionResult<Value> {
    if !text.contains('.') {
        if let Ok(i) = text.parse::<i64>() {
            return Ok(Value::Integer(i));
        }
    }
    text.parse::<f64>()
        .map(Value::Number)
        .map_err(|_| ExpressionError::conversion(text, "number"))
}

fn number(value: &Value) -> ExpressionResult<f64> {
    value
        .to_number()
        .ok_or_else(|| ExpressionError::conversion(value, "number"))
}

fn integer(value: &Value) -> ExpressionResult<i64> {
    value
        .to_integer()
        .ok_or_else(|| ExpressionError::conversion(value, "integer"))
}

fn boolean(value: &Value) -> ExpressionResult<bool> {
    value
        .to_bool()
        .ok_or_else(|| ExpressionError::conversion(value, "boolean"))
}

fn compare(left: &Value, right: &Value) -> ExpressionResult<Option<Ordering>> {
    if let (Value::DateTime(l), Value::DateTime(r)) = (left, right) {
        return Ok(Some(l.cmp(r)));
    }
    Ok(number(left)?.partial_cmp(&number(right)?))
}

/// Applies a binary operator to two already evaluated operands.
///
/// A null operand makes every operator yield `false`.
pub fn apply_binary(op: BinaryOperator, left: &Value, right: &Value) -> ExpressionResult<Value> {
    if left.is_null() || right.is_null() {
        return Ok(Value::Boolean(false));
    }

    let value = match op {
        BinaryOperator::Add => match (left.as_numeric(), right.as_numeric()) {
            (Some(l), Some(r)) => Value::Number(l + r),
            _ => Value::String(format!("{}{}", left, right)),
        },
        BinaryOperator::Sub => Value::Number(number(left)? - number(right)?),
        BinaryOperator::Mul => Value::Number(number(left)? * number(right)?),
        BinaryOperator::Div => Value::Number(number(left)? / number(right)?),
        BinaryOperator::Mod => {
            let divisor = integer(right)?;
            let result = integer(left)?
                .checked_rem(divisor)
                .ok_or(ExpressionError::DivisionByZero)?;
            Value::Integer(result)
        }
        BinaryOperator::BitAnd => Value::Integer(integer(left)? & integer(right)?),
        BinaryOperator::BitOr => Value::Integer(integer(left)? | integer(right)?),
        BinaryOperator::Lt => Value::Boolean(compare(left, right)? == Some(Ordering::Less)),
        BinaryOperator::Le => Value::Boolean(matches!(
            compare(left, right)?,
            Some(Ordering::Less | Ordering::Equal)
        )),
        BinaryOperator::Gt => Value::Boolean(compare(left, right)? == Some(Ordering::Greater)),
        BinaryOperator::Ge => Value::Boolean(matches!(
            compare(left, right)?,
            Some(Ordering::Greater | Ordering::Equal)
        )),
        BinaryOperator::Eq => Value::Boolean(left.to_string() == right.to_string()),
        BinaryOperator::Ne => Value::Boolean(left.to_string() != right.to_string()),
        BinaryOperator::And => {
            let l = boolean(left)?;
            let r = boolean(right)?;
            Value::Boolean(l && r)
        }
        BinaryOperator::Or => {
            let l = boolean(left)?;
            let r = boolean(right)?;
            Value::Boolean(l || r)
        }
    };

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::parser::ExpressionParser;

    fn eval_with(text: &str, provider: &dyn ValueProvider) -> ExpressionResult<Value> {
        let registry = FunctionRegistry::new();
        let expr = ExpressionParser::new().parse(text)?;
        Evaluator::new(&registry).evaluate(&expr, provider)
    }

    fn eval(text: &str) -> Value {
        eval_with(text, &NoValues).unwrap()
    }

    #[test]
    fn test_flat_associativity() {
        assert_eq!(eval("3 + 4 * 5").to_string(), "35");
        assert_eq!(eval("3 + (4 * 5)").to_string(), "23");
    }

    #[test]
    fn test_addition_or_concatenation() {
        assert_eq!(eval("1 + 2"), Value::Number(3.0));
        assert_eq!(eval("'1' + '2'"), Value::Number(3.0));
        assert_eq!(eval("'a' + 1"), Value::from("a1"));
        assert_eq!(eval("'x' + true"), Value::from("xtrue"));
    }

    #[test]
    fn test_integer_operators() {
        assert_eq!(eval("7 % 3"), Value::Integer(1));
        assert_eq!(eval("6 & 3"), Value::Integer(2));
        assert_eq!(eval("6 | 3"), Value::Integer(7));
        assert_eq!(
            eval_with("1 % 0", &NoValues).unwrap_err(),
            ExpressionError::DivisionByZero
        );
    }

    #[test]
    fn test_comparisons() {
        assert_eq!(eval("2 < 10"), Value::Boolean(true));
        assert_eq!(eval("'2' < '10'"), Value::Boolean(true));
        assert_eq!(eval("3 >= 3"), Value::Boolean(true));
        assert_eq!(eval("1 = 1.0"), Value::Boolean(true));
        assert_eq!(eval("'a' == 'a'"), Value::Boolean(true));
        assert_eq!(eval("'a' != 'b'"), Value::Boolean(true));
        assert!(matches!(
            eval_with("'a' < 1", &NoValues),
            Err(ExpressionError::InvalidConversion { .. })
        ));
    }

    #[test]
    fn test_null_operands_yield_false() {
        let provider = VariableProvider::new().with("x", Value::Null);
        for text in ["x + 1", "x = x", "x <> 1", "x and true", "1 - x", "x < 2"] {
            assert_eq!(
                eval_with(text, &provider).unwrap(),
                Value::Boolean(false),
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_logical_operators() {
        assert_eq!(eval("1 = 1 and 2 = 2"), Value::Boolean(true));
        assert_eq!(eval("false || 'true'"), Value::Boolean(true));
        assert!(eval_with("'maybe' or true", &NoValues).is_err());
    }

    #[test]
    fn test_references() {
        let provider = VariableProvider::new().with("t.a", 4).with("name", "bob");
        assert_eq!(
            eval_with("t.a * 2", &provider).unwrap(),
            Value::Number(8.0)
        );
        assert_eq!(
            eval_with("upper(name)", &provider).unwrap(),
            Value::from("BOB")
        );
        assert_eq!(
            eval_with("missing", &provider).unwrap_err(),
            ExpressionError::UnknownIdentifier {
                name: "missing".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            eval_with("nope(1)", &NoValues).unwrap_err(),
            ExpressionError::UnknownFunction {
                name: "nope".to_string()
            }
        );
    }

    #[test]
    fn test_predicate() {
        let registry = FunctionRegistry::new();
        let evaluator = Evaluator::new(&registry);
        let parser = ExpressionParser::new();

        let expr = parser.parse("nvl(null, null)").unwrap();
        assert!(!evaluator
            .evaluate_predicate(&expr, expr.root(), &NoValues)
            .unwrap());

        let expr = parser.parse("'abc'").unwrap();
        assert!(evaluator
            .evaluate_predicate(&expr, expr.root(), &NoValues)
            .is_err());
    }
}
