//! # Runtime values
//!
//! [`Value`] is the single type flowing through the engine: literals in the
//! AST, entries of a [`Context`](crate::eval::Context), function arguments and
//! evaluation results all use it.
//!
//! Numbers come in two flavours. [`Value::Integer`] covers whole numbers that
//! fit an `i64`; [`Value::Decimal`] is base-10 arbitrary precision so currency
//! and percentage arithmetic never drifts the way `f64` would.

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, NaiveDate, NaiveTime, SecondsFormat, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display};

use crate::literal;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub enum Value {
    Integer(i64),
    Decimal(Decimal),
    Boolean(bool),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(DateTime<Utc>),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
    #[default]
    Nil,
}

/// The kind of a [`Value`], used when reporting type mismatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr)]
#[strum(serialize_all = "lowercase")]
pub enum ValueKind {
    Integer,
    Decimal,
    Boolean,
    Date,
    Time,
    #[strum(serialize = "datetime")]
    DateTime,
    String,
    List,
    Map,
    Nil,
}

/// A value reduced to a number for arithmetic and comparisons.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i64),
    Decimal(Decimal),
}

impl Number {
    pub fn to_decimal(self) -> Decimal {
        match self {
            Number::Integer(i) => Decimal::from(i),
            Number::Decimal(d) => d,
        }
    }

    pub fn is_zero(self) -> bool {
        match self {
            Number::Integer(i) => i == 0,
            Number::Decimal(d) => d.is_zero(),
        }
    }
}

impl From<Number> for Value {
    fn from(number: Number) -> Self {
        match number {
            Number::Integer(i) => Value::Integer(i),
            Number::Decimal(d) => Value::Decimal(d),
        }
    }
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Integer(_) => ValueKind::Integer,
            Value::Decimal(_) => ValueKind::Decimal,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Date(_) => ValueKind::Date,
            Value::Time(_) => ValueKind::Time,
            Value::DateTime(_) => ValueKind::DateTime,
            Value::String(_) => ValueKind::String,
            Value::List(_) => ValueKind::List,
            Value::Map(_) => ValueKind::Map,
            Value::Nil => ValueKind::Nil,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, Value::Nil)
    }

    /// Reduces the value to a number. Strings that read as numeric literals
    /// count as numbers; every other kind does not.
    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Integer(i) => Some(Number::Integer(*i)),
            Value::Decimal(d) => Some(Number::Decimal(*d)),
            Value::String(s) => match literal::parse_number(s)? {
                Value::Integer(i) => Some(Number::Integer(i)),
                Value::Decimal(d) => Some(Number::Decimal(d)),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            Value::Integer(i) => Some(*i != 0),
            Value::Decimal(d) => Some(!d.is_zero()),
            Value::String(s) => literal::parse_boolean(s).and_then(|v| v.as_bool()),
            _ => None,
        }
    }

    pub fn to_display_string(&self) -> String {
        self.to_string()
    }

    /// A short description naming both the kind and the content, for error
    /// messages.
    pub fn describe(&self) -> String {
        match self {
            Value::String(s) => format!("{} {:?}", self.kind(), s),
            Value::Nil => self.kind().to_string(),
            _ => format!("{} {}", self.kind(), self),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Decimal(a), Value::Decimal(b)) => a == b,
            (Value::Integer(a), Value::Decimal(b)) | (Value::Decimal(b), Value::Integer(a)) => {
                Decimal::from(*a) == *b
            }
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Date(a), Value::Date(b)) => a == b,
            (Value::Time(a), Value::Time(b)) => a == b,
            (Value::DateTime(a), Value::DateTime(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Nil, Value::Nil) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(i) => write!(f, "{}", i),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Time(t) => write!(f, "{}", t),
            Value::DateTime(dt) => f.write_str(&dt.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            Value::String(s) => f.write_str(s),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Value::Map(entries) => {
                f.write_str("{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                f.write_str("}")
            }
            Value::Nil => Ok(()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<Decimal> for Value {
    fn from(d: Decimal) -> Self {
        Value::Decimal(d)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<NaiveDate> for Value {
    fn from(d: NaiveDate) -> Self {
        Value::Date(d)
    }
}

impl From<NaiveTime> for Value {
    fn from(t: NaiveTime) -> Self {
        Value::Time(t)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(dt: DateTime<Utc>) -> Self {
        Value::DateTime(dt)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(entries: BTreeMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_integer_and_decimal_compare_numerically() {
        let decimal = Decimal::from_str("5.0").unwrap();
        assert_eq!(Value::Integer(5), Value::Decimal(decimal));
        assert_ne!(Value::Integer(5), Value::String("5".to_string()));
    }

    #[test]
    fn test_display_strings() {
        assert_eq!(Value::Integer(-3).to_display_string(), "-3");
        assert_eq!(
            Value::Decimal(Decimal::from_str("1.50").unwrap()).to_display_string(),
            "1.50"
        );
        assert_eq!(Value::Boolean(true).to_display_string(), "true");
        assert_eq!(Value::Nil.to_display_string(), "");

        let dt = Utc.with_ymd_and_hms(2020, 1, 2, 10, 30, 0).unwrap();
        assert_eq!(
            Value::DateTime(dt).to_display_string(),
            "2020-01-02T10:30:00Z"
        );
        let date = NaiveDate::from_ymd_opt(2020, 1, 2).unwrap();
        assert_eq!(Value::Date(date).to_display_string(), "2020-01-02");
    }

    #[test]
    fn test_collection_display() {
        let list = Value::List(vec![Value::Integer(1), "a".into(), Value::Nil]);
        assert_eq!(list.to_string(), "[1, a, ]");

        let mut entries = BTreeMap::new();
        entries.insert("b".to_string(), Value::Integer(2));
        entries.insert("a".to_string(), Value::Integer(1));
        assert_eq!(Value::Map(entries).to_string(), "{a: 1, b: 2}");
    }

    #[test]
    fn test_as_number() {
        assert_eq!(Value::Integer(4).as_number(), Some(Number::Integer(4)));
        assert_eq!(
            Value::String("2.5".to_string()).as_number(),
            Some(Number::Decimal(Decimal::from_str("2.5").unwrap()))
        );
        assert_eq!(Value::String("a".to_string()).as_number(), None);
        assert_eq!(Value::Boolean(true).as_number(), None);
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(Value::Nil.kind().to_string(), "nil");
        assert_eq!(
            Value::DateTime(Utc::now()).kind().as_ref(),
            "datetime"
        );
        assert_eq!(Value::from("x").describe(), "string \"x\"");
    }
}
