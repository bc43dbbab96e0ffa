//! Date functions built on chrono.

use super::{datetime_arg, expect_args, integer_arg, number_arg, FunctionRegistry};
use crate::expression::error::{ExpressionError, ExpressionResult};
use crate::value::Value;
use chrono::{Datelike, Months, NaiveDate, NaiveDateTime, TimeDelta, Timelike};

/// Ticks are 100 ns intervals since 0001-01-01 00:00:00.
const TICKS_PER_MICROSECOND: i64 = 10;

pub(super) fn register(registry: &mut FunctionRegistry) {
    registry.register("date", date);
    registry.register_aliases(&["addseconds", "adjustseconds"], add_seconds);
    registry.register_aliases(&["addminutes", "adjustminutes"], add_minutes);
    registry.register_aliases(&["addhours", "adjusthours"], add_hours);
    registry.register_aliases(&["adddays", "adjustdays"], add_days);
    registry.register_aliases(&["addmonths", "adjustmonths"], add_months);
    registry.register_aliases(&["addyears", "adjustyears"], add_years);
    registry.register("second", |args: &[Value]| part("second", args, |d| d.second() as i64));
    registry.register("minute", |args: &[Value]| part("minute", args, |d| d.minute() as i64));
    registry.register("hour", |args: &[Value]| part("hour", args, |d| d.hour() as i64));
    registry.register("day", |args: &[Value]| part("day", args, |d| d.day() as i64));
    registry.register("month", |args: &[Value]| part("month", args, |d| d.month() as i64));
    registry.register("year", |args: &[Value]| part("year", args, |d| d.year() as i64));
}

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1, 1, 1)?.and_hms_opt(0, 0, 0)
}

/// date(ticks) | date(year, month, day) | date(year, month, day, hour, minute, second)
fn date(args: &[Value]) -> ExpressionResult<Value> {
    let invalid = || ExpressionError::failed("date", "arguments do not form a valid date");

    let result = match args.len() {
        1 => {
            let ticks = integer_arg("date", args, 0)?;
            epoch()
                .and_then(|e| {
                    e.checked_add_signed(TimeDelta::microseconds(ticks / TICKS_PER_MICROSECOND))
                })
                .ok_or_else(invalid)?
        }
        3 | 6 => {
            let mut parts = [0i64; 6];
            for (index, slot) in parts.iter_mut().enumerate().take(args.len()) {
                *slot = integer_arg("date", args, index)?;
            }
            let field = |v: i64| u32::try_from(v).map_err(|_| invalid());
            let year = i32::try_from(parts[0]).map_err(|_| invalid())?;
            NaiveDate::from_ymd_opt(year, field(parts[1])?, field(parts[2])?)
                .and_then(|d| d.and_hms_opt(field(parts[3]).ok()?, field(parts[4]).ok()?, field(parts[5]).ok()?))
                .ok_or_else(invalid)?
        }
        n => {
            return Err(ExpressionError::argument(
                "date",
                format!("expected 1, 3 or 6 arguments, got {}", n),
            ))
        }
    };

    Ok(Value::DateTime(result))
}

fn shift(name: &str, args: &[Value], unit_seconds: f64) -> ExpressionResult<Value> {
    expect_args(name, args, 2, 2)?;
    let base = datetime_arg(name, args, 0)?;
    let amount = number_arg(name, args, 1)?;
    let out_of_range = || ExpressionError::failed(name, "result is out of the supported date range");

    let millis = (amount * unit_seconds * 1000.0).round();
    if !millis.is_finite() || millis < i64::MIN as f64 || millis >= i64::MAX as f64 {
        return Err(out_of_range());
    }
    let delta = TimeDelta::try_milliseconds(millis as i64).ok_or_else(out_of_range)?;
    base.checked_add_signed(delta)
        .map(Value::DateTime)
        .ok_or_else(out_of_range)
}

fn add_seconds(args: &[Value]) -> ExpressionResult<Value> {
    shift("addseconds", args, 1.0)
}

fn add_minutes(args: &[Value]) -> ExpressionResult<Value> {
    shift("addminutes", args, 60.0)
}

fn add_hours(args: &[Value]) -> ExpressionResult<Value> {
    shift("addhours", args, 3600.0)
}

fn add_days(args: &[Value]) -> ExpressionResult<Value> {
    shift("adddays", args, 86400.0)
}

fn shift_months(name: &str, args: &[Value], factor: i64) -> ExpressionResult<Value> {
    expect_args(name, args, 2, 2)?;
    let base = datetime_arg(name, args, 0)?;
    let months = integer_arg(name, args, 1)?
        .checked_mul(factor)
        .ok_or_else(|| ExpressionError::failed(name, "result is out of the supported date range"))?;
    let magnitude = Months::new(u32::try_from(months.unsigned_abs()).unwrap_or(u32::MAX));
    let shifted = if months >= 0 {
        base.checked_add_months(magnitude)
    } else {
        base.checked_sub_months(magnitude)
    };
    shifted
        .map(Value::DateTime)
        .ok_or_else(|| ExpressionError::failed(name, "result is out of the supported date range"))
}

fn add_months(args: &[Value]) -> ExpressionResult<Value> {
    shift_months("addmonths", args, 1)
}

fn add_years(args: &[Value]) -> ExpressionResult<Value> {
    shift_months("addyears", args, 12)
}

fn part(name: &str, args: &[Value], extract: fn(&NaiveDateTime) -> i64) -> ExpressionResult<Value> {
    expect_args(name, args, 1, 1)?;
    Ok(Value::Integer(extract(&datetime_arg(name, args, 0)?)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(name: &str, args: &[Value]) -> ExpressionResult<Value> {
        FunctionRegistry::new().call(name, args)
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|v| Value::Integer(*v)).collect()
    }

    #[test]
    fn test_date_constructors() {
        assert_eq!(
            call("date", &ints(&[2024, 2, 29])).unwrap().to_string(),
            "2024-02-29 00:00:00"
        );
        assert_eq!(
            call("date", &ints(&[2024, 2, 29, 13, 5, 9])).unwrap().to_string(),
            "2024-02-29 13:05:09"
        );
        // One day after the epoch
        assert_eq!(
            call("date", &ints(&[864_000_000_000])).unwrap().to_string(),
            "0001-01-02 00:00:00"
        );
        assert!(call("date", &ints(&[2023, 2, 29])).is_err());
        assert!(call("date", &ints(&[2023, 2])).is_err());
    }

    #[test]
    fn test_adjustments() {
        let base = Value::from("2024-01-31 10:00:00");
        let shifted = |name: &str, amount: i64| {
            call(name, &[base.clone(), Value::Integer(amount)])
                .unwrap()
                .to_string()
        };
        assert_eq!(shifted("addSeconds", 30), "2024-01-31 10:00:30");
        assert_eq!(shifted("adjustMinutes", -15), "2024-01-31 09:45:00");
        assert_eq!(shifted("addHours", 14), "2024-02-01 00:00:00");
        assert_eq!(shifted("addDays", 1), "2024-02-01 10:00:00");
        assert_eq!(shifted("addMonths", 1), "2024-02-29 10:00:00");
        assert_eq!(shifted("addYears", -1), "2023-01-31 10:00:00");
    }

    #[test]
    fn test_adjustments_out_of_range() {
        let base = call("date", &ints(&[2020, 1, 1])).unwrap();
        let shifted = |name: &str, amount: Value| call(name, &[base.clone(), amount]);

        for amount in [i64::MAX, i64::MIN, 1_000_000_000_000_000_000, -1_000_000_000_000_000_000] {
            for name in ["addyears", "addmonths", "adddays"] {
                let result = shifted(name, Value::Integer(amount));
                assert!(
                    matches!(result, Err(ExpressionError::FunctionFailed { .. })),
                    "{}({}) gave {:?}",
                    name,
                    amount,
                    result
                );
            }
        }
        for amount in [1e300, -1e300, f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            for name in ["adddays", "addseconds"] {
                let result = shifted(name, Value::Number(amount));
                assert!(
                    matches!(result, Err(ExpressionError::FunctionFailed { .. })),
                    "{}({}) gave {:?}",
                    name,
                    amount,
                    result
                );
            }
        }
        assert!(shifted("addyears", Value::Integer(1_000_000)).is_err());
    }

    #[test]
    fn test_parts() {
        let dt = [Value::from("2021-07-04 18:30:15")];
        assert_eq!(call("year", &dt).unwrap(), Value::Integer(2021));
        assert_eq!(call("Month", &dt).unwrap(), Value::Integer(7));
        assert_eq!(call("day", &dt).unwrap(), Value::Integer(4));
        assert_eq!(call("hour", &dt).unwrap(), Value::Integer(18));
        assert_eq!(call("minute", &dt).unwrap(), Value::Integer(30));
        assert_eq!(call("second", &dt).unwrap(), Value::Integer(15));
        assert!(call("year", &[Value::from("not a date")]).is_err());
    }
}
