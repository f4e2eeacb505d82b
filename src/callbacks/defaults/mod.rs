//! The built-in function library, registered as the `default` module.
//!
//! Argument helpers live here; each submodule adds one family of functions.

mod datetime;
mod logic;
mod math;
mod text;

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use regex::Regex;
use rust_decimal::{prelude::ToPrimitive, Decimal};

use super::CallbackModule;
use crate::{
    config::EngineConfig,
    eval::{EvalError, EvalResult},
    literal::LiteralCoercer,
    value::{Number, Value},
    Error, ExprResult,
};

pub const MODULE_NAME: &str = "default";

pub fn module(config: &EngineConfig) -> ExprResult<CallbackModule> {
    let separator = Regex::new(&config.word_separator).map_err(|e| {
        Error::config(format!(
            "Invalid word separator {:?}: {}",
            config.word_separator, e
        ))
    })?;

    let module = CallbackModule::new(MODULE_NAME);
    let module = text::register(module, separator);
    let module = logic::register(module);
    let module = math::register(module);
    let module = datetime::register(module, LiteralCoercer::from_config(config));
    Ok(module.function("count", 1, count))
}

fn count(_: &crate::eval::Context, args: Vec<Value>) -> EvalResult<Value> {
    let len = match arg("count", &args, 0)? {
        Value::List(items) => items.len(),
        Value::Map(entries) => entries.len(),
        Value::String(s) => s.chars().count(),
        other => return Err(EvalError::type_mismatch("list, map or string", other)),
    };
    Ok(Value::Integer(len as i64))
}

pub(crate) fn arg<'a>(function: &str, args: &'a [Value], index: usize) -> EvalResult<&'a Value> {
    args.get(index).ok_or_else(|| {
        EvalError::callback(function, format!("missing argument {}", index + 1))
    })
}

pub(crate) fn text_arg(function: &str, args: &[Value], index: usize) -> EvalResult<String> {
    arg(function, args, index).map(Value::to_display_string)
}

pub(crate) fn number_arg(function: &str, args: &[Value], index: usize) -> EvalResult<Number> {
    let value = arg(function, args, index)?;
    value
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch("number", value))
}

pub(crate) fn decimal_arg(function: &str, args: &[Value], index: usize) -> EvalResult<Decimal> {
    number_arg(function, args, index).map(Number::to_decimal)
}

/// A whole number. Decimals are accepted when they have no fractional part.
pub(crate) fn integer_arg(function: &str, args: &[Value], index: usize) -> EvalResult<i64> {
    let value = arg(function, args, index)?;
    match value.as_number() {
        Some(Number::Integer(i)) => Ok(i),
        Some(Number::Decimal(d)) if d.fract().is_zero() => d
            .to_i64()
            .ok_or_else(|| EvalError::type_mismatch("integer", value)),
        _ => Err(EvalError::type_mismatch("integer", value)),
    }
}

pub(crate) fn bool_arg(function: &str, args: &[Value], index: usize) -> EvalResult<bool> {
    let value = arg(function, args, index)?;
    value
        .as_bool()
        .ok_or_else(|| EvalError::type_mismatch("boolean", value))
}

/// Date-ish argument.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Temporal {
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
}

impl Temporal {
    pub(crate) fn date(self) -> Option<NaiveDate> {
        match self {
            Temporal::Date(d) => Some(d),
            Temporal::DateTime(dt) => Some(dt.date_naive()),
            Temporal::Time(_) => None,
        }
    }

    pub(crate) fn time(self) -> Option<NaiveTime> {
        match self {
            Temporal::Time(t) => Some(t),
            Temporal::DateTime(dt) => Some(dt.time()),
            Temporal::Date(_) => None,
        }
    }

    /// Dates become midnight UTC.
    pub(crate) fn datetime(self) -> Option<DateTime<Utc>> {
        match self {
            Temporal::DateTime(dt) => Some(dt),
            Temporal::Date(d) => Some(d.and_time(NaiveTime::MIN).and_utc()),
            Temporal::Time(_) => None,
        }
    }
}

impl From<Temporal> for Value {
    fn from(temporal: Temporal) -> Self {
        match temporal {
            Temporal::Date(d) => Value::Date(d),
            Temporal::Time(t) => Value::Time(t),
            Temporal::DateTime(dt) => Value::DateTime(dt),
        }
    }
}

/// Strings are read with `coercer` first.
pub(crate) fn temporal_arg(
    coercer: &LiteralCoercer,
    function: &str,
    args: &[Value],
    index: usize,
) -> EvalResult<Temporal> {
    let value = arg(function, args, index)?;
    let coerced = match value {
        Value::String(s) => coercer.coerce(s),
        other => Some(other.clone()),
    };
    match coerced {
        Some(Value::Date(d)) => Ok(Temporal::Date(d)),
        Some(Value::Time(t)) => Ok(Temporal::Time(t)),
        Some(Value::DateTime(dt)) => Ok(Temporal::DateTime(dt)),
        _ => Err(EvalError::type_mismatch("date, time or datetime", value)),
    }
}

/// Spreads list arguments one level, the way spreadsheet ranges are passed
/// to aggregate functions.
pub(crate) fn flatten(args: Vec<Value>) -> Vec<Value> {
    args.into_iter()
        .flat_map(|value| match value {
            Value::List(items) => items,
            other => vec![other],
        })
        .collect()
}
