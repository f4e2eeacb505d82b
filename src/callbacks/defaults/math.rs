use std::cmp::Ordering;

use rust_decimal::{prelude::ToPrimitive, Decimal, RoundingStrategy};

use super::{flatten, integer_arg, number_arg};
use crate::{
    ast::BinaryOperator,
    callbacks::CallbackModule,
    eval::{
        operators::{arithmetic, compare},
        Context, EvalError, EvalResult,
    },
    value::{Number, Value},
};

pub(super) fn register(module: CallbackModule) -> CallbackModule {
    module
        .function("abs", 1, |_, args| {
            Ok(match number_arg("abs", &args, 0)? {
                Number::Integer(i) => i
                    .checked_abs()
                    .map(Value::Integer)
                    .unwrap_or_else(|| Value::Decimal(Decimal::from(i).abs())),
                Number::Decimal(d) => Value::Decimal(d.abs()),
            })
        })
        .function("int", 1, |_, args| {
            Ok(match number_arg("int", &args, 0)? {
                Number::Integer(i) => Value::Integer(i),
                Number::Decimal(d) => integral(d.floor()),
            })
        })
        .function("mod", 2, modulo)
        .function("power", 2, |_, args| {
            let base = number_arg("power", &args, 0)?;
            let exponent = number_arg("power", &args, 1)?;
            arithmetic(BinaryOperator::Power, base, exponent).map(Value::from)
        })
        .function("round", 1, |_, args| {
            round("round", &args, 0, RoundingStrategy::MidpointAwayFromZero)
        })
        .function("round", 2, |_, args| {
            let places = integer_arg("round", &args, 1)?;
            round("round", &args, places, RoundingStrategy::MidpointAwayFromZero)
        })
        .function("rounddown", 1, |_, args| {
            round("rounddown", &args, 0, RoundingStrategy::ToZero)
        })
        .function("rounddown", 2, |_, args| {
            let places = integer_arg("rounddown", &args, 1)?;
            round("rounddown", &args, places, RoundingStrategy::ToZero)
        })
        .function("roundup", 1, |_, args| {
            round("roundup", &args, 0, RoundingStrategy::AwayFromZero)
        })
        .function("roundup", 2, |_, args| {
            let places = integer_arg("roundup", &args, 1)?;
            round("roundup", &args, places, RoundingStrategy::AwayFromZero)
        })
        .vargs("sum", |_, args| sum(args).map(Value::from))
        .vargs("max", |_, args| extreme("max", args, Ordering::Greater))
        .vargs("min", |_, args| extreme("min", args, Ordering::Less))
        .vargs("average", |_, args| {
            let count = flatten(args.clone()).len();
            if count == 0 {
                return Err(EvalError::callback("average", "no values"));
            }
            let total = sum(args)?;
            arithmetic(
                BinaryOperator::Divide,
                total,
                Number::Integer(count as i64),
            )
            .map(Value::from)
        })
}

/// Whole decimals come back as integers when they fit.
fn integral(d: Decimal) -> Value {
    d.to_i64()
        .map(Value::Integer)
        .unwrap_or(Value::Decimal(d))
}

fn numbers(args: Vec<Value>) -> EvalResult<Vec<Number>> {
    flatten(args)
        .iter()
        .map(|value| {
            value
                .as_number()
                .ok_or_else(|| EvalError::type_mismatch("number", value))
        })
        .collect()
}

fn sum(args: Vec<Value>) -> EvalResult<Number> {
    numbers(args)?
        .into_iter()
        .try_fold(Number::Integer(0), |total, n| {
            arithmetic(BinaryOperator::Add, total, n)
        })
}

fn extreme(function: &str, args: Vec<Value>, wanted: Ordering) -> EvalResult<Value> {
    numbers(args)?
        .into_iter()
        .reduce(|best, n| if compare(n, best) == wanted { n } else { best })
        .map(Value::from)
        .ok_or_else(|| EvalError::callback(function, "no values"))
}

/// The result takes the sign of the divisor: `MOD(-3, 2)` is `1`.
fn modulo(_: &Context, args: Vec<Value>) -> EvalResult<Value> {
    let dividend = number_arg("mod", &args, 0)?;
    let divisor = number_arg("mod", &args, 1)?;
    if divisor.is_zero() {
        return Err(EvalError::Arithmetic("division by zero".to_string()));
    }
    match (dividend, divisor) {
        (Number::Integer(a), Number::Integer(b)) => {
            let r = a.checked_rem(b).unwrap_or(0);
            let r = if r != 0 && (r < 0) != (b < 0) { r + b } else { r };
            Ok(Value::Integer(r))
        }
        (a, b) => {
            let (a, b) = (a.to_decimal(), b.to_decimal());
            let r = a % b;
            let r = if !r.is_zero() && r.is_sign_negative() != b.is_sign_negative() {
                r + b
            } else {
                r
            };
            Ok(Value::Decimal(r))
        }
    }
}

fn round(function: &str, args: &[Value], places: i64, strategy: RoundingStrategy) -> EvalResult<Value> {
    let number = number_arg(function, args, 0)?;
    let places = u32::try_from(places)
        .map_err(|_| EvalError::callback(function, "decimal places must not be negative"))?;
    match number {
        Number::Integer(i) => Ok(Value::Integer(i)),
        Number::Decimal(d) if places == 0 => Ok(integral(d.round_dp_with_strategy(0, strategy))),
        Number::Decimal(d) => Ok(Value::Decimal(d.round_dp_with_strategy(places, strategy))),
    }
}
