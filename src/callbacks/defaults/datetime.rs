use std::sync::Arc;

use chrono::{
    DateTime, Datelike, Months, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc,
};

use super::{arg, integer_arg, temporal_arg, text_arg, Temporal};
use crate::{
    callbacks::CallbackModule,
    eval::{Context, EvalError, EvalResult},
    literal::LiteralCoercer,
    value::Value,
};

/// String arguments are read with `coercer`, so the configured datetime
/// patterns apply inside functions as they do in contexts.
pub(super) fn register(module: CallbackModule, coercer: LiteralCoercer) -> CallbackModule {
    let coercer = Arc::new(coercer);

    module
        .function("now", 0, |_, _| Ok(Value::DateTime(Utc::now())))
        .function("today", 0, |_, _| Ok(Value::Date(Utc::now().date_naive())))
        .function("date", 3, date)
        .function("time", 3, time)
        .function("datevalue", 1, bind(&coercer, |c, args| {
            Ok(Value::Date(date_part(c, "datevalue", &args)?))
        }))
        .function("timevalue", 1, bind(&coercer, |c, args| {
            Ok(Value::Time(time_part(c, "timevalue", &args)?))
        }))
        .function("year", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(date_part(c, "year", &args)?.year().into()))
        }))
        .function("month", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(date_part(c, "month", &args)?.month().into()))
        }))
        .function("day", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(date_part(c, "day", &args)?.day().into()))
        }))
        .function("weekday", 1, bind(&coercer, |c, args| {
            let weekday = date_part(c, "weekday", &args)?.weekday();
            Ok(Value::Integer(weekday.number_from_sunday().into()))
        }))
        .function("hour", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(time_part(c, "hour", &args)?.hour().into()))
        }))
        .function("minute", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(time_part(c, "minute", &args)?.minute().into()))
        }))
        .function("second", 1, bind(&coercer, |c, args| {
            Ok(Value::Integer(time_part(c, "second", &args)?.second().into()))
        }))
        .function("edate", 2, bind(&coercer, edate))
        .function("datetime_add", 3, bind(&coercer, datetime_add))
}

fn bind<F>(
    coercer: &Arc<LiteralCoercer>,
    f: F,
) -> impl Fn(&Context, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static
where
    F: Fn(&LiteralCoercer, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
{
    let coercer = coercer.clone();
    move |_: &Context, args: Vec<Value>| f(&coercer, args)
}

fn date_part(coercer: &LiteralCoercer, function: &str, args: &[Value]) -> EvalResult<NaiveDate> {
    let value = arg(function, args, 0)?;
    temporal_arg(coercer, function, args, 0)?
        .date()
        .ok_or_else(|| EvalError::type_mismatch("date or datetime", value))
}

fn time_part(coercer: &LiteralCoercer, function: &str, args: &[Value]) -> EvalResult<NaiveTime> {
    let value = arg(function, args, 0)?;
    temporal_arg(coercer, function, args, 0)?
        .time()
        .ok_or_else(|| EvalError::type_mismatch("time or datetime", value))
}

fn u32_arg(function: &str, args: &[Value], index: usize) -> EvalResult<u32> {
    let value = integer_arg(function, args, index)?;
    u32::try_from(value)
        .map_err(|_| EvalError::callback(function, format!("{} is out of range", value)))
}

fn date(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let year = integer_arg("date", &args, 0)?;
    let month = u32_arg("date", &args, 1)?;
    let day = u32_arg("date", &args, 2)?;
    i32::try_from(year)
        .ok()
        .and_then(|year| NaiveDate::from_ymd_opt(year, month, day))
        .map(Value::Date)
        .ok_or_else(|| {
            EvalError::callback("date", format!("invalid date {}-{}-{}", year, month, day))
        })
}

fn time(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let hour = u32_arg("time", &args, 0)?;
    let minute = u32_arg("time", &args, 1)?;
    let second = u32_arg("time", &args, 2)?;
    NaiveTime::from_hms_opt(hour, minute, second)
        .map(Value::Time)
        .ok_or_else(|| {
            EvalError::callback("time", format!("invalid time {}:{}:{}", hour, minute, second))
        })
}

fn shift_months<T>(
    value: T,
    months: i64,
    add: fn(T, Months) -> Option<T>,
    sub: fn(T, Months) -> Option<T>,
) -> Option<T> {
    let count = Months::new(u32::try_from(months.unsigned_abs()).ok()?);
    if months >= 0 {
        add(value, count)
    } else {
        sub(value, count)
    }
}

/// `EDATE(date, months)`. Day-of-month clamps to the end of shorter months.
fn edate(coercer: &LiteralCoercer, args: Vec<Value>) -> EvalResult<Value> {
    let temporal = temporal_arg(coercer, "edate", &args, 0)?;
    let months = integer_arg("edate", &args, 1)?;
    let shifted = match temporal {
        Temporal::Date(d) => shift_months(
            d,
            months,
            NaiveDate::checked_add_months,
            NaiveDate::checked_sub_months,
        )
        .map(Value::Date),
        Temporal::DateTime(dt) => shift_months(
            dt,
            months,
            DateTime::<Utc>::checked_add_months,
            DateTime::<Utc>::checked_sub_months,
        )
        .map(Value::DateTime),
        Temporal::Time(t) => {
            return Err(EvalError::type_mismatch("date or datetime", &Value::Time(t)));
        }
    };
    shifted.ok_or_else(|| EvalError::callback("edate", "date out of range"))
}

/// `DATETIME_ADD(datetime, amount, unit)` with unit one of `Y` `M` `W` `D`
/// `h` `m` `s`. Dates are promoted to midnight UTC.
fn datetime_add(coercer: &LiteralCoercer, args: Vec<Value>) -> EvalResult<Value> {
    let start = temporal_arg(coercer, "datetime_add", &args, 0)?;
    let start = start
        .datetime()
        .ok_or_else(|| EvalError::type_mismatch("date or datetime", &Value::from(start)))?;
    let amount = integer_arg("datetime_add", &args, 1)?;
    let unit = text_arg("datetime_add", &args, 2)?;

    let out_of_range = || EvalError::callback("datetime_add", "date out of range");
    let months = |n: i64| {
        shift_months(
            start,
            n,
            DateTime::<Utc>::checked_add_months,
            DateTime::<Utc>::checked_sub_months,
        )
        .ok_or_else(out_of_range)
    };
    let delta = |delta: Option<TimeDelta>| {
        delta
            .and_then(|d| start.checked_add_signed(d))
            .ok_or_else(out_of_range)
    };

    let result = match unit.as_str() {
        "Y" => months(amount.checked_mul(12).ok_or_else(out_of_range)?),
        "M" => months(amount),
        "W" => delta(TimeDelta::try_weeks(amount)),
        "D" => delta(TimeDelta::try_days(amount)),
        "h" => delta(TimeDelta::try_hours(amount)),
        "m" => delta(TimeDelta::try_minutes(amount)),
        "s" => delta(TimeDelta::try_seconds(amount)),
        other => {
            return Err(EvalError::callback(
                "datetime_add",
                format!("unknown unit {:?}, expected one of Y M W D h m s", other),
            ))
        }
    }?;
    Ok(Value::DateTime(result))
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::{
        callbacks::{Callable, CallbackRegistry},
        config::EngineConfig,
    };

    fn call(name: &str, args: Vec<Value>) -> EvalResult<Value> {
        let registry = CallbackRegistry::new(Vec::new(), &EngineConfig::default()).unwrap();
        match registry.resolve(name, args.len()).unwrap() {
            Callable::Eager(f) => f(&Context::new(), args),
            Callable::Lazy(_) => panic!("{} is lazy", name),
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> Value {
        Value::Date(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn test_constructors() {
        let args = vec![Value::Integer(2020), Value::Integer(2), Value::Integer(29)];
        assert_eq!(call("date", args), Ok(ymd(2020, 2, 29)));
        let args = vec![Value::Integer(2021), Value::Integer(2), Value::Integer(29)];
        assert!(call("date", args).is_err());
        let args = vec![Value::Integer(13), Value::Integer(5), Value::Integer(0)];
        assert_eq!(
            call("time", args),
            Ok(Value::Time(NaiveTime::from_hms_opt(13, 5, 0).unwrap()))
        );
    }

    #[test]
    fn test_parts() {
        let dt = Value::from("2021-06-15T08:30:45Z");
        assert_eq!(call("year", vec![dt.clone()]), Ok(Value::Integer(2021)));
        assert_eq!(call("month", vec![dt.clone()]), Ok(Value::Integer(6)));
        assert_eq!(call("day", vec![dt.clone()]), Ok(Value::Integer(15)));
        assert_eq!(call("hour", vec![dt.clone()]), Ok(Value::Integer(8)));
        assert_eq!(call("minute", vec![dt.clone()]), Ok(Value::Integer(30)));
        assert_eq!(call("second", vec![dt.clone()]), Ok(Value::Integer(45)));
        // a Tuesday
        assert_eq!(call("weekday", vec![dt.clone()]), Ok(Value::Integer(3)));
        assert_eq!(call("datevalue", vec![dt]), Ok(ymd(2021, 6, 15)));
        assert!(matches!(
            call("hour", vec![ymd(2021, 6, 15)]),
            Err(EvalError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_edate_clamps_day() {
        assert_eq!(
            call("edate", vec![ymd(2021, 1, 31), Value::Integer(1)]),
            Ok(ymd(2021, 2, 28))
        );
        assert_eq!(
            call("edate", vec![ymd(2021, 3, 15), Value::Integer(-3)]),
            Ok(ymd(2020, 12, 15))
        );
    }

    #[test]
    fn test_datetime_add() {
        let start = Value::DateTime(Utc.with_ymd_and_hms(2020, 1, 31, 10, 0, 0).unwrap());
        let add = |amount: i64, unit: &str| {
            call(
                "datetime_add",
                vec![start.clone(), Value::Integer(amount), Value::from(unit)],
            )
        };
        let at = |y, mo, d, h, mi, s| -> EvalResult<Value> {
            Ok(Value::DateTime(
                Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap(),
            ))
        };

        assert_eq!(add(1, "Y"), at(2021, 1, 31, 10, 0, 0));
        assert_eq!(add(1, "M"), at(2020, 2, 29, 10, 0, 0));
        assert_eq!(add(-1, "W"), at(2020, 1, 24, 10, 0, 0));
        assert_eq!(add(2, "D"), at(2020, 2, 2, 10, 0, 0));
        assert_eq!(add(15, "h"), at(2020, 2, 1, 1, 0, 0));
        assert_eq!(add(-30, "m"), at(2020, 1, 31, 9, 30, 0));
        assert_eq!(add(5, "s"), at(2020, 1, 31, 10, 0, 5));
        assert!(add(1, "fortnight").is_err());
    }

    #[test]
    fn test_configured_patterns_apply_to_arguments() {
        let config = EngineConfig {
            datetime_formats: vec!["%m/%d/%Y %H:%M".to_string()],
            ..EngineConfig::default()
        };
        let registry = CallbackRegistry::new(Vec::new(), &config).unwrap();
        let month = match registry.resolve("month", 1).unwrap() {
            Callable::Eager(f) => f,
            Callable::Lazy(_) => panic!("month is lazy"),
        };
        let ctx = Context::new();
        assert_eq!(
            month(&ctx, vec![Value::from("12/31/2020 23:00")]),
            Ok(Value::Integer(12))
        );
        // only the configured patterns are tried
        assert!(matches!(
            month(&ctx, vec![Value::from("31-12-2020 23:00:00")]),
            Err(EvalError::TypeMismatch { .. })
        ));
        assert_eq!(
            month(&ctx, vec![Value::from("2020-07-04")]),
            Ok(Value::Integer(7))
        );
    }

    #[test]
    fn test_today_is_a_date() {
        assert!(matches!(call("today", vec![]), Ok(Value::Date(_))));
        assert!(matches!(call("now", vec![]), Ok(Value::DateTime(_))));
    }
}
