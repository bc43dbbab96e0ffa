//! Logic functions: if (with aliases), nvl, not.

use super::{bool_arg, expect_args, FunctionRegistry};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_aliases(&["if", "iif", "case", "casewhen"], if_then_else);
    registry.register("nvl", nvl);
    registry.register("not", not);
}

/// if(cond1, value1, cond2, value2, ..., else). A null condition is false.
fn if_then_else(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("if", args, 3, usize::MAX)?;
    if args.len() % 2 == 0 {
        return Err(ExpressionError::argument(
            "if",
            format!(
                "expected an odd number of arguments (condition/value pairs and an else value), got {}",
                args.len()
            ),
        ));
    }

    for pair in (0..args.len() - 1).step_by(2) {
        if !args[pair].is_null() && bool_arg("if", args, pair)? {
            return Ok(args[pair + 1].clone());
        }
    }
    Ok(args[args.len() - 1].clone())
}

fn nvl(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("nvl", args, 2, 2)?;
    if args[0].is_null() {
        Ok(args[1].clone())
    } else {
        Ok(args[0].clone())
    }
}

fn not(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("not", args, 1, 1)?;
    if args[0].is_null() {
        return Ok(Value::Null);
    }
    Ok(Value::Boolean(!bool_arg("not", args, 0)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> ExpressionResult<Value> {
        FunctionRegistry::new().call(name, args)
    }

    #[test]
    fn test_if_chain() {
        let args = [
            Value::Boolean(false),
            Value::from("first"),
            Value::from("true"),
            Value::from("second"),
            Value::from("else"),
        ];
        assert_eq!(call("casewhen", &args).unwrap(), Value::from("second"));

        let args = [Value::Null, Value::Integer(1), Value::Integer(2)];
        assert_eq!(call("if", &args).unwrap(), Value::Integer(2));
    }

    #[test]
    fn test_if_argument_shape() {
        assert!(call("if", &[Value::Boolean(true), Value::Integer(1)]).is_err());
        let four = [
            Value::Boolean(true),
            Value::Integer(1),
            Value::Boolean(true),
            Value::Integer(2),
        ];
        assert!(call("iif", &four).is_err());
    }

    #[test]
    fn test_nvl_and_not() {
        assert_eq!(
            call("nvl", &[Value::Null, Value::from("fallback")]).unwrap(),
            Value::from("fallback")
        );
        assert_eq!(
            call("nvl", &[Value::from(""), Value::from("fallback")]).unwrap(),
            Value::from("")
        );
        assert_eq!(call("not", &[Value::Boolean(true)]).unwrap(), Value::Boolean(false));
        assert_eq!(call("not", &[Value::Null]).unwrap(), Value::Null);
        assert!(call("not", &[Value::from("x")]).is_err());
    }
}
