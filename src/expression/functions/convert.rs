//! Conversion functions: cstr cbool cint cdbl cdate cchar.

use super::{bool_arg, datetime_arg, expect_args, integer_arg, number_arg, FunctionRegistry};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("cstr", cstr);
    registry.register("cbool", cbool);
    registry.register("cint", cint);
    registry.register("cdbl", cdbl);
    registry.register("cdate", cdate);
    registry.register("cchar", cchar);
}

fn cstr(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cstr", args, 1, 1)?;
    Ok(Value::String(args[0].to_string()))
}

fn cbool(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cbool", args, 1, 1)?;
    Ok(Value::Boolean(bool_arg("cbool", args, 0)?))
}

fn cint(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cint", args, 1, 1)?;
    Ok(Value::Integer(integer_arg("cint", args, 0)?))
}

fn cdbl(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cdbl", args, 1, 1)?;
    Ok(Value::Number(number_arg("cdbl", args, 0)?))
}

fn cdate(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cdate", args, 1, 1)?;
    Ok(Value::DateTime(datetime_arg("cdate", args, 0)?))
}

/// A one-character string, or the character with the given code point.
fn cchar(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("cchar", args, 1, 1)?;
    let ch = match &args[0] {
        Value::String(s) if s.chars().count() == 1 => s.chars().next(),
        Value::Integer(code) => u32::try_from(*code).ok().and_then(char::from_u32),
        _ => None,
    };
    ch.map(|c| Value::String(c.to_string()))
        .ok_or_else(|| ExpressionError::conversion(&args[0], "char"))
}
