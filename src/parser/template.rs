//! # Template lexer
//!
//! Splits a template into [`Segment`]s:
//!
//! * `@@` is a literal `@`
//! * `@contact.name` is shorthand for a variable path
//! * `@( ... )` is a full expression block
//! * everything else is text, copied verbatim
//!
//! Adjacent text, escapes included, is merged into one [`Segment::Text`].

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::char,
    combinator::{cut, map, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::many0,
    sequence::{pair, preceded},
};

use super::{expression::identifier, parse_block, ParseError, ParserResult};
use crate::ast::{Expression, Segment, Template};

#[derive(Debug, Clone, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    Escape,
    Block(&'a str),
    Path(Vec<String>),
}

#[tracing::instrument(level = "debug", skip(input))]
pub fn parse_template(input: &str) -> Result<Template, ParseError> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut remaining = input;

    while !remaining.is_empty() {
        let position = input.len() - remaining.len();
        let (rest, piece) = match piece(remaining) {
            Ok(parsed) => parsed,
            Err(_) if remaining.starts_with("@(") => {
                return Err(ParseError::UnbalancedParenthesis { position })
            }
            Err(_) => return Err(ParseError::MissingExpression { position }),
        };

        match piece {
            Piece::Text(chunk) => text.push_str(chunk),
            Piece::Escape => text.push('@'),
            Piece::Block(body) => {
                if body.trim().is_empty() {
                    return Err(ParseError::MissingExpression { position });
                }
                // body starts after "@("
                let expr = parse_block(body).map_err(|e| e.offset_by(position + 2))?;
                flush_text(&mut text, &mut segments);
                segments.push(Segment::Substitution(Expression::Block(Box::new(expr))));
            }
            Piece::Path(path) => {
                flush_text(&mut text, &mut segments);
                segments.push(Segment::Substitution(Expression::Variable(path)));
            }
        }
        remaining = rest;
    }
    flush_text(&mut text, &mut segments);

    Ok(Template::new(segments))
}

fn flush_text(text: &mut String, segments: &mut Vec<Segment>) {
    if !text.is_empty() {
        segments.push(Segment::Text(std::mem::take(text)));
    }
}

fn piece(input: &str) -> ParserResult<Piece> {
    alt((
        value(Piece::Escape, tag("@@")),
        map(preceded(tag("@("), cut(block_body)), Piece::Block),
        map(preceded(char('@'), cut(variable_path)), Piece::Path),
        map(take_while1(|c: char| c != '@'), Piece::Text),
    ))(input)
}

/// `identifier(.identifier)*`. A dot not followed by an identifier ends the
/// path and stays in the text.
fn variable_path(input: &str) -> ParserResult<Vec<String>> {
    context(
        "variable path",
        map(
            pair(identifier, many0(preceded(char('.'), identifier))),
            |(head, tail)| {
                std::iter::once(head)
                    .chain(tail)
                    .map(str::to_string)
                    .collect()
            },
        ),
    )(input)
}

/// Everything up to the `)` matching an already consumed `@(`. Parentheses
/// inside quoted strings do not count.
fn block_body(input: &str) -> ParserResult<&str> {
    let mut depth = 1usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in input.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Ok((&input[i + 1..], &input[..i]));
                }
            }
            _ => {}
        }
    }

    Err(nom::Err::Failure(VerboseError {
        errors: vec![(input, VerboseErrorKind::Context("balanced block"))],
    }))
}
