//! String functions.
//!
//! Positions are character indices starting at 0.

use super::{expect_args, integer_arg, text_arg, FunctionRegistry};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::value::Value;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register_aliases(&["toupper", "upper"], upper);
    registry.register_aliases(&["tolower", "lower"], lower);
    registry.register_aliases(&["indexof", "instr"], index_of);
    registry.register("replace", replace);
    registry.register("substring", substring);
    registry.register_aliases(&["strcontains", "contains"], contains);
    registry.register_aliases(&["strleft", "left"], left);
    registry.register_aliases(&["strright", "right"], right);
    registry.register_aliases(&["strmid", "mid"], mid);
    registry.register("startswith", starts_with);
    registry.register("endswith", ends_with);
}

fn upper(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("upper", args, 1, 1)?;
    Ok(Value::String(text_arg(args, 0).to_uppercase()))
}

fn lower(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("lower", args, 1, 1)?;
    Ok(Value::String(text_arg(args, 0).to_lowercase()))
}

/// Character index of the byte offset `byte` in `text`.
fn char_index(text: &str, byte: usize) -> usize {
    text[..byte].chars().count()
}

/// Byte offset of the character index `index`, if it is within `text`.
fn byte_offset(text: &str, index: usize) -> Option<usize> {
    if index == text.chars().count() {
        return Some(text.len());
    }
    text.char_indices().nth(index).map(|(offset, _)| offset)
}

/// indexof(text, search[, start]), -1 when not found
fn index_of(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("indexof", args, 2, 3)?;
    let text = text_arg(args, 0);
    let search = text_arg(args, 1);
    let start = if args.len() == 3 {
        integer_arg("indexof", args, 2)?
    } else {
        0
    };
    let offset = usize::try_from(start)
        .ok()
        .and_then(|start| byte_offset(&text, start))
        .ok_or_else(|| {
            ExpressionError::failed("indexof", format!("start index {} is out of range", start))
        })?;

    let found = text[offset..]
        .find(&search)
        .map(|pos| char_index(&text, offset + pos) as i64)
        .unwrap_or(-1);
    Ok(Value::Integer(found))
}

fn replace(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("replace", args, 3, 3)?;
    let text = text_arg(args, 0);
    let search = text_arg(args, 1);
    if search.is_empty() {
        return Ok(Value::String(text));
    }
    Ok(Value::String(text.replace(&search, &text_arg(args, 2))))
}

/// substring(text, start[, length])
fn substring(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("substring", args, 2, 3)?;
    let text = text_arg(args, 0);
    let chars: Vec<char> = text.chars().collect();
    let start = integer_arg("substring", args, 1)?;
    let length = if args.len() == 3 {
        Some(integer_arg("substring", args, 2)?)
    } else {
        None
    };
    let out_of_range = || {
        let length = length.map(|l| l.to_string()).unwrap_or_else(|| "rest".to_string());
        ExpressionError::failed(
            "substring",
            format!("start {} with length {} is outside of '{}'", start, length, text),
        )
    };

    let start = usize::try_from(start)
        .ok()
        .filter(|start| *start <= chars.len())
        .ok_or_else(out_of_range)?;
    let end = match length {
        Some(length) => usize::try_from(length)
            .ok()
            .and_then(|length| start.checked_add(length))
            .filter(|end| *end <= chars.len())
            .ok_or_else(out_of_range)?,
        None => chars.len(),
    };
    Ok(Value::String(chars[start..end].iter().collect()))
}

fn contains(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("contains", args, 2, 2)?;
    Ok(Value::Boolean(text_arg(args, 0).contains(&text_arg(args, 1))))
}

/// Text before the first occurrence of the search text, or "".
fn left(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("left", args, 2, 2)?;
    let text = text_arg(args, 0);
    let result = match text.find(&text_arg(args, 1)) {
        Some(pos) => text[..pos].to_string(),
        None => String::new(),
    };
    Ok(Value::String(result))
}

/// Text after the last occurrence of the search text, or "".
fn right(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("right", args, 2, 2)?;
    let text = text_arg(args, 0);
    let search = text_arg(args, 1);
    let result = match text.rfind(&search) {
        Some(pos) => text[pos + search.len()..].to_string(),
        None => String::new(),
    };
    Ok(Value::String(result))
}

/// mid(text, start_marker, end_marker): text between the two markers, or "".
fn mid(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("mid", args, 3, 3)?;
    let text = text_arg(args, 0);
    let start_marker = text_arg(args, 1);
    let end_marker = text_arg(args, 2);

    let Some(start) = text.find(&start_marker) else {
        return Ok(Value::String(String::new()));
    };
    let start = start + start_marker.len();
    let result = match text[start..].find(&end_marker) {
        Some(end) => text[start..start + end].to_string(),
        None => String::new(),
    };
    Ok(Value::String(result))
}

fn starts_with(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("startswith", args, 2, 2)?;
    Ok(Value::Boolean(text_arg(args, 0).starts_with(&text_arg(args, 1))))
}

fn ends_with(args: &[Value]) -> ExpressionResult<Value> {
    expect_args("endswith", args, 2, 2)?;
    Ok(Value::Boolean(text_arg(args, 0).ends_with(&text_arg(args, 1))))
}
