//! # Literal coercion
//!
//! Turns raw text into typed [`Value`]s. The same rules serve two callers: the
//! expression parser when it meets a literal token, and the
//! [`ContextBuilder`](crate::eval::ContextBuilder) when it decides whether a
//! string leaf of the host data should be promoted to a typed value.
//!
//! ## Trial order
//!
//! The first rule that matches wins:
//!
//! 1. numbers (`12`, `-3`, `1.5`, `2e3`); a decimal point or an exponent makes
//!    a [`Value::Decimal`], anything else a [`Value::Integer`]
//! 2. `true` / `false`, case-insensitively
//! 3. dates and times: ISO-8601 first, then the configured locale patterns
//!
//! Text matching none of them is not a literal and coercion returns `None`.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use lazy_static::lazy_static;
use nom::{
    character::complete::{char, digit1, one_of},
    combinator::{all_consuming, opt, recognize},
    error::context,
    sequence::{pair, tuple},
};
use rust_decimal::Decimal;

use crate::{config::EngineConfig, parser::ParserResult, value::Value};

lazy_static! {
    static ref DEFAULT_COERCER: LiteralCoercer = LiteralCoercer::default();
}

const ISO_NAIVE_DATETIME_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];
const ISO_TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f"];

/// Coerces text with the default rules.
pub fn coerce_literal(text: &str) -> Option<Value> {
    DEFAULT_COERCER.coerce(text)
}

#[derive(Debug, Clone)]
pub struct LiteralCoercer {
    datetime_formats: Vec<String>,
}

impl Default for LiteralCoercer {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl LiteralCoercer {
    pub fn new(datetime_formats: Vec<String>) -> Self {
        Self { datetime_formats }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.datetime_formats.clone())
    }

    pub fn coerce(&self, text: &str) -> Option<Value> {
        parse_number(text)
            .or_else(|| parse_boolean(text))
            .or_else(|| self.parse_temporal(text))
    }

    fn parse_temporal(&self, text: &str) -> Option<Value> {
        if let Some(dt) = parse_iso_datetime(text) {
            return Some(Value::DateTime(dt));
        }
        if let Ok(date) = NaiveDate::parse_from_str(text, "%Y-%m-%d") {
            return Some(Value::Date(date));
        }
        if let Some(time) = ISO_TIME_FORMATS
            .iter()
            .find_map(|format| NaiveTime::parse_from_str(text, format).ok())
        {
            return Some(Value::Time(time));
        }
        self.datetime_formats
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
            .map(|naive| Value::DateTime(naive.and_utc()))
    }
}

/// Recognizes the textual shape of a number without interpreting it.
pub(crate) fn numeric_literal(input: &str) -> ParserResult<&str> {
    context(
        "numeric literal",
        recognize(tuple((
            opt(char('-')),
            digit1,
            opt(pair(char('.'), digit1)),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
    )(input)
}

/// Parses a complete numeric literal. Integers written with leading zeros
/// (`0123`) are rejected so identifiers such as phone numbers stay strings.
pub fn parse_number(text: &str) -> Option<Value> {
    let (_, literal) = all_consuming(numeric_literal)(text).ok()?;

    let unsigned = literal.strip_prefix('-').unwrap_or(literal);
    let integer_part = unsigned
        .split(['.', 'e', 'E'])
        .next()
        .unwrap_or(unsigned);
    if integer_part.len() > 1 && integer_part.starts_with('0') {
        return None;
    }

    if unsigned.contains(['e', 'E']) {
        Decimal::from_scientific(literal).ok().map(Value::Decimal)
    } else if unsigned.contains('.') {
        Decimal::from_str(literal).ok().map(Value::Decimal)
    } else {
        literal
            .parse::<i64>()
            .ok()
            .map(Value::Integer)
            .or_else(|| Decimal::from_str(literal).ok().map(Value::Decimal))
    }
}

pub fn parse_boolean(text: &str) -> Option<Value> {
    if text.eq_ignore_ascii_case("true") {
        Some(Value::Boolean(true))
    } else if text.eq_ignore_ascii_case("false") {
        Some(Value::Boolean(false))
    } else {
        None
    }
}

/// Strict ISO-8601 date-time. Without an offset the instant is taken as UTC.
pub fn parse_iso_datetime(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    ISO_NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc())
}
