//! Binary operators and indexing over [`Value`]s.
//!
//! Arithmetic stays in integers while results fit an `i64` and moves to
//! decimals otherwise. Division always produces a decimal.

use std::cmp::Ordering;

use rust_decimal::{prelude::ToPrimitive, Decimal, MathematicalOps};

use super::{EvalError, EvalResult};
use crate::{
    ast::BinaryOperator,
    literal,
    value::{Number, Value},
};

pub fn apply(op: BinaryOperator, left: Value, right: Value) -> EvalResult<Value> {
    match op {
        BinaryOperator::Concat => Ok(Value::String(format!("{}{}", left, right))),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::GreaterThan => ordering(&left, &right, |o| o.is_gt()),
        BinaryOperator::GreaterThanEqual => ordering(&left, &right, |o| o.is_ge()),
        BinaryOperator::LessThan => ordering(&left, &right, |o| o.is_lt()),
        BinaryOperator::LessThanEqual => ordering(&left, &right, |o| o.is_le()),
        BinaryOperator::Add
        | BinaryOperator::Subtract
        | BinaryOperator::Multiply
        | BinaryOperator::Divide
        | BinaryOperator::Power => {
            let (l, r) = numbers(&left, &right)?;
            arithmetic(op, l, r).map(Value::from)
        }
    }
}

fn numbers(left: &Value, right: &Value) -> EvalResult<(Number, Number)> {
    let l = left
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch("number", left))?;
    let r = right
        .as_number()
        .ok_or_else(|| EvalError::type_mismatch("number", right))?;
    Ok((l, r))
}

/// Ordering is numeric only: both sides must reduce to numbers.
fn ordering(left: &Value, right: &Value, test: fn(Ordering) -> bool) -> EvalResult<Value> {
    let (l, r) = numbers(left, right)?;
    Ok(Value::Boolean(test(compare(l, r))))
}

pub fn compare(left: Number, right: Number) -> Ordering {
    match (left, right) {
        (Number::Integer(a), Number::Integer(b)) => a.cmp(&b),
        (l, r) => l.to_decimal().cmp(&r.to_decimal()),
    }
}

fn overflow(op: BinaryOperator) -> EvalError {
    EvalError::Arithmetic(format!("overflow in {}", op))
}

pub fn arithmetic(op: BinaryOperator, left: Number, right: Number) -> EvalResult<Number> {
    use Number::Integer;

    match (op, left, right) {
        (BinaryOperator::Add, Integer(a), Integer(b)) => {
            Ok(a.checked_add(b).map(Integer).unwrap_or_else(|| {
                Number::Decimal(Decimal::from(a) + Decimal::from(b))
            }))
        }
        (BinaryOperator::Subtract, Integer(a), Integer(b)) => {
            Ok(a.checked_sub(b).map(Integer).unwrap_or_else(|| {
                Number::Decimal(Decimal::from(a) - Decimal::from(b))
            }))
        }
        (BinaryOperator::Multiply, Integer(a), Integer(b)) => match a.checked_mul(b) {
            Some(product) => Ok(Integer(product)),
            None => decimal_op(op, left, right),
        },
        (BinaryOperator::Divide, _, _) if right.is_zero() => {
            Err(EvalError::Arithmetic("division by zero".to_string()))
        }
        (BinaryOperator::Power, Integer(a), Integer(b)) if b >= 0 => {
            match u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)) {
                Some(result) => Ok(Integer(result)),
                None => decimal_op(op, left, right),
            }
        }
        _ => decimal_op(op, left, right),
    }
}

fn decimal_op(op: BinaryOperator, left: Number, right: Number) -> EvalResult<Number> {
    let (l, r) = (left.to_decimal(), right.to_decimal());
    if op == BinaryOperator::Power && l < Decimal::ZERO && !r.fract().is_zero() {
        return Err(EvalError::Arithmetic(format!(
            "{} ^ {} has no real result",
            l, r
        )));
    }
    let result = match op {
        BinaryOperator::Add => l.checked_add(r),
        BinaryOperator::Subtract => l.checked_sub(r),
        BinaryOperator::Multiply => l.checked_mul(r),
        BinaryOperator::Divide => l.checked_div(r),
        BinaryOperator::Power => power(l, r),
        other => {
            return Err(EvalError::Arithmetic(format!(
                "{} is not an arithmetic operator",
                other
            )))
        }
    };
    result.map(Number::Decimal).ok_or_else(|| overflow(op))
}

fn power(base: Decimal, exponent: Decimal) -> Option<Decimal> {
    if exponent.fract().is_zero() {
        if let Some(exp) = exponent.to_i64() {
            return base.checked_powi(exp);
        }
    }
    base.checked_powd(exponent)
}

/// `collection[index]`. Lists take an integer, negative counting from the
/// end; maps take a string key.
pub fn index(collection: Value, index: Value) -> EvalResult<Value> {
    match collection {
        Value::List(mut items) => {
            let position = list_index(&index)?;
            let len = items.len() as i64;
            let resolved = if position < 0 { len + position } else { position };
            if !(0..len).contains(&resolved) {
                return Err(EvalError::TypeMismatch {
                    expected: format!("index in -{}..{}", len, len),
                    found: index.describe(),
                });
            }
            Ok(items.swap_remove(resolved as usize))
        }
        Value::Map(mut entries) => {
            let key = match &index {
                Value::String(key) => key.clone(),
                other => return Err(EvalError::type_mismatch("string key", other)),
            };
            match entries.remove(&key) {
                Some(value) if !value.is_nil() => Ok(value),
                _ => Err(EvalError::UndefinedVariable { path: key }),
            }
        }
        other => Err(EvalError::type_mismatch("list or map", &other)),
    }
}

fn list_index(index: &Value) -> EvalResult<i64> {
    match index {
        Value::Integer(i) => Ok(*i),
        Value::String(s) => match literal::parse_number(s) {
            Some(Value::Integer(i)) => Ok(i),
            _ => Err(EvalError::type_mismatch("integer index", index)),
        },
        other => Err(EvalError::type_mismatch("integer index", other)),
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::BTreeMap, str::FromStr};

    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    use super::*;

    fn dec(s: &str) -> Value {
        Value::Decimal(Decimal::from_str(s).unwrap())
    }

    fn int(i: i64) -> Value {
        Value::Integer(i)
    }

    #[test]
    fn test_integer_arithmetic() {
        assert_eq!(apply(BinaryOperator::Add, int(3), int(8)), Ok(int(11)));
        assert_eq!(apply(BinaryOperator::Subtract, int(3), int(8)), Ok(int(-5)));
        assert_eq!(apply(BinaryOperator::Multiply, int(3), int(8)), Ok(int(24)));
        assert_eq!(apply(BinaryOperator::Power, int(2), int(10)), Ok(int(1024)));
    }

    #[test]
    fn test_division_is_decimal() {
        let result = apply(BinaryOperator::Divide, int(10), int(4)).unwrap();
        assert!(matches!(result, Value::Decimal(_)));
        assert_eq!(result, dec("2.5"));
        assert_eq!(apply(BinaryOperator::Divide, int(6), int(3)), Ok(dec("2")));
    }

    #[test]
    fn test_division_by_zero() {
        assert!(matches!(
            apply(BinaryOperator::Divide, int(1), int(0)),
            Err(EvalError::Arithmetic(_))
        ));
        assert!(matches!(
            apply(BinaryOperator::Divide, dec("1.5"), dec("0.0")),
            Err(EvalError::Arithmetic(_))
        ));
    }

    #[test]
    fn test_overflow_promotes_to_decimal() {
        let result = apply(BinaryOperator::Add, int(i64::MAX), int(1)).unwrap();
        assert_eq!(result, dec("9223372036854775808"));
        let result = apply(BinaryOperator::Multiply, int(i64::MAX), int(2)).unwrap();
        assert!(matches!(result, Value::Decimal(_)));
    }

    #[test]
    fn test_mixed_and_string_operands() {
        assert_eq!(apply(BinaryOperator::Add, int(1), dec("0.5")), Ok(dec("1.5")));
        assert_eq!(apply(BinaryOperator::Add, "2".into(), int(1)), Ok(int(3)));
        assert_eq!(
            apply(BinaryOperator::Add, int(1), "a".into()),
            Err(EvalError::TypeMismatch {
                expected: "number".to_string(),
                found: "string \"a\"".to_string()
            })
        );
    }

    #[test]
    fn test_power_variants() {
        assert_eq!(apply(BinaryOperator::Power, int(2), int(-1)), Ok(dec("0.5")));
        assert_eq!(apply(BinaryOperator::Power, dec("1.5"), int(2)), Ok(dec("2.25")));
        let root = apply(BinaryOperator::Power, int(4), dec("0.5")).unwrap();
        let Value::Decimal(root) = root else {
            panic!("expected a decimal");
        };
        assert!((root - Decimal::from(2)).abs() < Decimal::from_str("0.0001").unwrap());
    }

    #[test]
    fn test_concat_and_equality() {
        assert_eq!(apply(BinaryOperator::Concat, "a".into(), int(1)), Ok("a1".into()));
        assert_eq!(apply(BinaryOperator::Concat, Value::Nil, "b".into()), Ok("b".into()));
        assert_eq!(apply(BinaryOperator::Equal, int(5), dec("5.0")), Ok(true.into()));
        assert_eq!(apply(BinaryOperator::Equal, int(5), "5".into()), Ok(false.into()));
        assert_eq!(apply(BinaryOperator::NotEqual, "a".into(), "b".into()), Ok(true.into()));
    }

    #[test]
    fn test_ordering() {
        assert_eq!(apply(BinaryOperator::LessThan, int(2), dec("2.5")), Ok(true.into()));
        assert_eq!(apply(BinaryOperator::GreaterThanEqual, int(2), int(2)), Ok(true.into()));
        assert_eq!(apply(BinaryOperator::GreaterThan, "10".into(), int(9)), Ok(true.into()));
    }

    #[test]
    fn test_ordering_needs_numbers() {
        let a = Value::Date(NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        let b = Value::Date(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap());
        for (left, right) in [
            (a.clone(), b),
            (a, int(1)),
            ("2020-01-01".into(), "2021-01-01".into()),
            ("a".into(), "b".into()),
        ] {
            assert!(matches!(
                apply(BinaryOperator::LessThan, left, right),
                Err(EvalError::TypeMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_negative_base_fractional_power() {
        assert!(matches!(
            apply(BinaryOperator::Power, int(-8), dec("0.5")),
            Err(EvalError::Arithmetic(_))
        ));
        assert_eq!(apply(BinaryOperator::Power, int(-2), int(3)), Ok(int(-8)));
        assert_eq!(apply(BinaryOperator::Power, dec("-1.5"), int(2)), Ok(dec("2.25")));
    }

    #[test]
    fn test_list_index() {
        let list = Value::List(vec![int(10), int(20), int(30)]);
        assert_eq!(index(list.clone(), int(0)), Ok(int(10)));
        assert_eq!(index(list.clone(), int(-1)), Ok(int(30)));
        assert_eq!(index(list.clone(), "1".into()), Ok(int(20)));
        assert!(matches!(index(list.clone(), int(3)), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(index(list, dec("1.5")), Err(EvalError::TypeMismatch { .. })));
    }

    #[test]
    fn test_map_index() {
        let mut entries = BTreeMap::new();
        entries.insert("name".to_string(), Value::from("Bob"));
        entries.insert("gone".to_string(), Value::Nil);
        let map = Value::Map(entries);
        assert_eq!(index(map.clone(), "name".into()), Ok("Bob".into()));
        assert_eq!(
            index(map.clone(), "gone".into()),
            Err(EvalError::UndefinedVariable {
                path: "gone".to_string()
            })
        );
        assert!(matches!(index(map, int(0)), Err(EvalError::TypeMismatch { .. })));
        assert!(matches!(index(int(1), int(0)), Err(EvalError::TypeMismatch { .. })));
    }
}
