//! Math functions: sin cos tan abs pi ceiling floor round max min.

use super::{expect_args, integer_arg, number_arg, FunctionRegistry};
use crate::expression::error::ExpressionResult;
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("sin", sin);
    registry.register("cos", cos);
    registry.register("tan", tan);
    registry.register("abs", abs);
    registry.register("pi", pi);
    registry.register("ceiling", ceiling);
    registry.register("floor", floor);
    registry.register_aliases(&["round", "rnd"], round);
    registry.register("max", max);
    registry.register("min", min);
}

fn unary(name: &str, args: &[Value], f: fn(f64) -> f64) -> ExpressionResult<Value> {
    expect_args(name, args, 1, 1)?;
    Ok(Value::Number(f(number_arg(name, args, 0)?)))
}

fn sin(args: &[Value]) -> ExpressionResult<Value> {
    unary("sin", args, f64::sin)
}

fn cos(args: &[Value]) -> ExpressionResult<Value> {
    unary("cos", args, f64::cos)
}

fn tan(args: &[Value]) -> ExpressionResult<Value> {
    unary("tan", args, f64::tan)
}

fn abs(args: &[Value]) -> ExpressionResult<Value> {
    unary("abs", args, f64::abs)
}

fn ceiling(args: &[Value]) -> ExpressionResult<Value> {
    unary("ceiling", args, f64::ceil)
}

fn floor(args: &[Value]) -> ExpressionResult<Value> {
    unary("floor", args, f64::floor)
}

fn pi(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("pi", args, 0, 0)?;
    Ok(Value::Number(std::f64::consts::PI))
}

/// round(x[, digits]), half away from zero
fn round(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("round", args, 1, 2)?;
    let x = number_arg("round", args, 0)?;
    if args.len() == 1 {
        return Ok(Value::Number(x.round()));
    }
    let digits = integer_arg("round", args, 1)?.clamp(0, 15) as i32;
    let scale = 10f64.powi(digits);
    Ok(Value::Number((x * scale).round() / scale))
}

fn max(args: &[Value]) -> ExpressionResult<Value> {
    fold("max", args, f64::max)
}

fn min(args: &[Value]) -> ExpressionResult<Value> {
    fold("min", args, f64::min)
}

fn fold(name: &str, args: &[Value], f: fn(f64, f64) -> f64) -> ExpressionResult<Value> {
    expect_args(name, args, 1, usize::MAX)?;
    let mut result = number_arg(name, args, 0)?;
    for index in 1..args.len() {
        result = f(result, number_arg(name, args, index)?);
    }
    Ok(Value::Number(result))
}
