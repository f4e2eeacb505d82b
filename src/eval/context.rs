use std::{collections::BTreeMap, str::FromStr};

use rust_decimal::Decimal;
use tracing::debug;

use super::{EvalError, EvalResult};
use crate::{literal::LiteralCoercer, value::Value};

/// Variables visible to an evaluation. Evaluation only ever borrows it, so a
/// context can be shared freely between threads and runs.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Context {
    vars: BTreeMap<String, Value>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.vars.insert(key.into(), value)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.vars.get(key)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, Value> {
        &self.vars
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.vars)
    }

    /// Follows a dotted path through nested maps. Numeric segments index
    /// into lists. A missing step, or a nil at the end, is an undefined
    /// variable.
    pub fn resolve(&self, path: &[String]) -> EvalResult<&Value> {
        let undefined = || EvalError::UndefinedVariable {
            path: path.join("."),
        };

        let (head, tail) = path.split_first().ok_or_else(undefined)?;
        let mut current = self.vars.get(head).ok_or_else(undefined)?;
        for segment in tail {
            current = match current {
                Value::Map(entries) => entries.get(segment),
                Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
                _ => None,
            }
            .ok_or_else(undefined)?;
        }

        if current.is_nil() {
            return Err(undefined());
        }
        Ok(current)
    }
}

impl From<BTreeMap<String, Value>> for Context {
    fn from(vars: BTreeMap<String, Value>) -> Self {
        Self { vars }
    }
}

impl FromIterator<(String, Value)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self {
            vars: iter.into_iter().collect(),
        }
    }
}

/// Builds a [`Context`] from host data, promoting string leaves that read as
/// literals (`"42"`, `"true"`, `"2020-01-01"`) to typed values. Building
/// never fails: anything that cannot be typed stays a string.
#[derive(Debug, Clone, Default)]
pub struct ContextBuilder {
    coercer: LiteralCoercer,
}

impl ContextBuilder {
    pub fn new(coercer: LiteralCoercer) -> Self {
        Self { coercer }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn build(&self, raw: &serde_json::Value) -> Context {
        match raw {
            serde_json::Value::Object(entries) => entries
                .iter()
                .map(|(key, value)| (key.clone(), self.convert(value)))
                .collect(),
            other => {
                debug!("Context root is not an object: {}", other);
                Context::new()
            }
        }
    }

    pub fn from_pairs<K, I>(&self, pairs: I) -> Context
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        pairs
            .into_iter()
            .map(|(key, value)| (key.into(), self.normalize(value)))
            .collect()
    }

    /// Coerces every string leaf of `value`. Already typed values are left
    /// alone, so normalizing twice changes nothing.
    pub fn normalize(&self, value: Value) -> Value {
        match value {
            Value::String(s) => self.leaf(s),
            Value::List(items) => {
                Value::List(items.into_iter().map(|v| self.normalize(v)).collect())
            }
            Value::Map(entries) => Value::Map(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, self.normalize(v)))
                    .collect(),
            ),
            other => other,
        }
    }

    fn convert(&self, raw: &serde_json::Value) -> Value {
        match raw {
            serde_json::Value::Null => Value::Nil,
            serde_json::Value::Bool(b) => Value::Boolean(*b),
            serde_json::Value::Number(n) => number(n),
            serde_json::Value::String(s) => self.leaf(s.clone()),
            serde_json::Value::Array(items) => {
                Value::List(items.iter().map(|v| self.convert(v)).collect())
            }
            serde_json::Value::Object(entries) => Value::Map(
                entries
                    .iter()
                    .map(|(k, v)| (k.clone(), self.convert(v)))
                    .collect(),
            ),
        }
    }

    fn leaf(&self, text: String) -> Value {
        self.coercer.coerce(&text).unwrap_or(Value::String(text))
    }
}

fn number(n: &serde_json::Number) -> Value {
    if let Some(i) = n.as_i64() {
        return Value::Integer(i);
    }
    let text = n.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map(Value::Decimal)
        .unwrap_or(Value::String(text))
}
