//! # Expression parser
//!
//! Parses the body of an `@( ... )` block. The top level of the block comes
//! back as a [`FlatExpression`] so precedence can be applied separately by
//! [`fold`]; every nested expression (call arguments, list items, groups,
//! index expressions) is folded as soon as it is parsed.
//!
//! ## Operands
//!
//! | Syntax | Result |
//! |---|---|
//! | `"text"`, `'text'` | string literal |
//! | `2020-01-01T10:00:00Z` | date-time literal |
//! | `12`, `1.5`, `2e3` | integer / decimal literal |
//! | `true`, `FALSE` | boolean literal |
//! | `contact.name` | variable path |
//! | `UPPER(x, y)` | function call |
//! | `[a, b]` | list |
//! | `(a + b)` | group |
//! | `-x` | negation |
//!
//! Any operand may be followed by `[index]`, and a call or index by
//! `.member`.

use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag, take_while, take_while_m_n},
    character::complete::{char, digit1, multispace0, one_of, satisfy},
    combinator::{all_consuming, cut, map, not, opt, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
};

use super::{fold, ws, ParseError, ParserResult, INVALID_LITERAL};
use crate::{
    ast::{BinaryOperator, Expression, FlatExpression},
    literal::{numeric_literal, parse_boolean, parse_iso_datetime, parse_number},
    value::Value,
};

/// Parses a block body into an unfolded infix chain.
#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_expression(input: &str) -> Result<FlatExpression, ParseError> {
    all_consuming(ws(flat_expression))(input)
        .map(|(_, flat)| flat)
        .map_err(|e| ParseError::from_nom(input, e))
}

/// Parses and folds a block body.
pub fn parse_block(input: &str) -> Result<Expression, ParseError> {
    parse_expression(input).map(fold)
}

fn flat_expression(input: &str) -> ParserResult<FlatExpression> {
    let (input, first) = ws(operand)(input)?;
    let (input, rest) = many0(pair(ws(binary_operator), cut(ws(operand))))(input)?;
    Ok((input, FlatExpression { first, rest }))
}

fn expression(input: &str) -> ParserResult<Expression> {
    map(flat_expression, fold)(input)
}

fn binary_operator(input: &str) -> ParserResult<BinaryOperator> {
    context(
        "operator",
        alt((
            // Multi-character operators first
            value(BinaryOperator::GreaterThanEqual, tag(">=")),
            value(BinaryOperator::LessThanEqual, tag("<=")),
            value(BinaryOperator::NotEqual, tag("!=")),
            value(BinaryOperator::NotEqual, tag("<>")),
            value(BinaryOperator::Equal, tag("==")),
            value(BinaryOperator::Equal, tag("=")),
            value(BinaryOperator::GreaterThan, tag(">")),
            value(BinaryOperator::LessThan, tag("<")),
            value(BinaryOperator::Add, tag("+")),
            value(BinaryOperator::Subtract, tag("-")),
            value(BinaryOperator::Multiply, tag("*")),
            value(BinaryOperator::Divide, tag("/")),
            value(BinaryOperator::Power, tag("^")),
            value(BinaryOperator::Concat, tag("&")),
        )),
    )(input)
}

enum Postfix {
    Index(Expression),
    Member(String),
}

fn operand(input: &str) -> ParserResult<Expression> {
    let (input, base) = primary(input)?;
    let (input, postfixes) = many0(postfix)(input)?;
    let expr = postfixes
        .into_iter()
        .fold(base, |collection, postfix| match postfix {
            Postfix::Index(index) => Expression::index(collection, index),
            Postfix::Member(name) => {
                Expression::index(collection, Expression::Literal(Value::String(name)))
            }
        });
    Ok((input, expr))
}

fn postfix(input: &str) -> ParserResult<Postfix> {
    alt((
        map(
            preceded(char('['), cut(terminated(ws(expression), char(']')))),
            Postfix::Index,
        ),
        map(preceded(char('.'), identifier), |name| {
            Postfix::Member(name.to_string())
        }),
    ))(input)
}

fn primary(input: &str) -> ParserResult<Expression> {
    context(
        "operand",
        alt((
            group,
            list_literal,
            map(string_literal, |s| Expression::Literal(Value::String(s))),
            datetime_literal,
            number_literal,
            negation,
            call_or_path,
        )),
    )(input)
}

fn group(input: &str) -> ParserResult<Expression> {
    context(
        "group",
        preceded(char('('), cut(terminated(ws(expression), char(')')))),
    )(input)
}

fn list_literal(input: &str) -> ParserResult<Expression> {
    context(
        "list",
        map(
            delimited(
                terminated(char('['), multispace0),
                separated_list0(char(','), ws(expression)),
                cut(char(']')),
            ),
            Expression::List,
        ),
    )(input)
}

fn call_arguments(input: &str) -> ParserResult<Vec<Expression>> {
    context(
        "arguments",
        delimited(
            terminated(char('('), multispace0),
            separated_list0(char(','), ws(expression)),
            cut(char(')')),
        ),
    )(input)
}

pub(crate) fn identifier(input: &str) -> ParserResult<&str> {
    context(
        "identifier",
        recognize(pair(
            satisfy(|c: char| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_'),
        )),
    )(input)
}

/// `name(args)` is a call; otherwise `a.b.c` is a variable path, except that
/// a bare `true`/`false` is a boolean literal.
fn call_or_path(input: &str) -> ParserResult<Expression> {
    let (input, name) = identifier(input)?;
    let (input, args) = opt(call_arguments)(input)?;
    if let Some(args) = args {
        return Ok((input, Expression::call(name, args)));
    }

    let (input, members) = many0(preceded(char('.'), identifier))(input)?;
    if members.is_empty() {
        if let Some(boolean) = parse_boolean(name) {
            return Ok((input, Expression::Literal(boolean)));
        }
    }

    let mut path = Vec::with_capacity(members.len() + 1);
    path.push(name.to_string());
    path.extend(members.into_iter().map(str::to_string));
    Ok((input, Expression::Variable(path)))
}

fn negation(input: &str) -> ParserResult<Expression> {
    map(preceded(char('-'), cut(ws(operand))), |expr| match expr {
        Expression::Literal(Value::Decimal(d)) => Expression::Literal(Value::Decimal(-d)),
        Expression::Literal(Value::Integer(i)) if i != i64::MIN => {
            Expression::Literal(Value::Integer(-i))
        }
        other => Expression::binary(
            BinaryOperator::Subtract,
            Expression::Literal(Value::Integer(0)),
            other,
        ),
    })(input)
}

fn number_literal(input: &str) -> ParserResult<Expression> {
    let (rest, text) = terminated(
        numeric_literal,
        not(satisfy(|c: char| c.is_alphanumeric() || c == '_')),
    )(input)?;
    match parse_number(text) {
        Some(number) => Ok((rest, Expression::Literal(number))),
        None => Err(invalid_literal(input)),
    }
}

fn two_digits(input: &str) -> ParserResult<&str> {
    take_while_m_n(2, 2, |c: char| c.is_ascii_digit())(input)
}

fn datetime_literal(input: &str) -> ParserResult<Expression> {
    let (rest, text) = recognize(tuple((
        take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        char('-'),
        two_digits,
        char('-'),
        two_digits,
        char('T'),
        two_digits,
        char(':'),
        two_digits,
        char(':'),
        two_digits,
        opt(pair(char('.'), digit1)),
        opt(alt((
            tag("Z"),
            recognize(tuple((one_of("+-"), two_digits, char(':'), two_digits))),
        ))),
    )))(input)?;
    match parse_iso_datetime(text) {
        Some(dt) => Ok((rest, Expression::Literal(Value::DateTime(dt)))),
        None => Err(invalid_literal(input)),
    }
}

fn string_literal(input: &str) -> ParserResult<String> {
    context(
        "string literal",
        alt((quoted::<'"'>, quoted::<'\''>)),
    )(input)
}

fn quoted<const QUOTE: char>(input: &str) -> ParserResult<String> {
    let stop: &str = if QUOTE == '"' { "\\\"" } else { "\\'" };
    preceded(
        char(QUOTE),
        cut(terminated(
            map(
                opt(escaped_transform(is_not(stop), '\\', one_of("\\\"'"))),
                Option::unwrap_or_default,
            ),
            context(INVALID_LITERAL, char(QUOTE)),
        )),
    )(input)
}

fn invalid_literal(input: &str) -> nom::Err<VerboseError<&str>> {
    nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context(INVALID_LITERAL))],
    })
}
