//! # Parsing
//!
//! Templates are parsed in three steps:
//!
//! ```text
//! template text → [template] segments → [expression] flat infix chain → [precedence] nested AST
//! ```
//!
//! * [`template`] splits the input into literal text and substitutions
//!   (`@contact.name`, `@( ... )`, and the `@@` escape).
//! * [`expression`] reads the body of an `@( ... )` block into a
//!   [`FlatExpression`](crate::ast::FlatExpression): operands and operators
//!   in source order.
//! * [`precedence`] folds that chain into a properly nested tree.
//!
//! All parsers are written with `nom` over `&str` and report failures as
//! [`ParseError`] with a byte offset into the template.

pub mod expression;
pub mod precedence;
pub mod template;

use nom::{
    character::complete::multispace0,
    error::{convert_error, VerboseError, VerboseErrorKind},
    sequence::delimited,
    IResult,
};
use thiserror::Error;

pub use expression::{parse_block, parse_expression};
pub use precedence::fold;
pub use template::parse_template;

pub type ParserResult<'a, T> = IResult<&'a str, T, VerboseError<&'a str>>;

/// Context label attached to literal parse failures so they surface as
/// [`ParseError::InvalidLiteral`].
pub(crate) const INVALID_LITERAL: &str = "invalid literal";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Syntax error at position {position}: {message}")]
    Syntax { message: String, position: usize },
    #[error("Unbalanced parenthesis opened at position {position}")]
    UnbalancedParenthesis { position: usize },
    #[error("Expected an identifier or expression after '@' at position {position}")]
    MissingExpression { position: usize },
    #[error("Invalid literal '{literal}' at position {position}")]
    InvalidLiteral { literal: String, position: usize },
}

impl ParseError {
    pub fn position(&self) -> usize {
        match self {
            ParseError::Syntax { position, .. }
            | ParseError::UnbalancedParenthesis { position }
            | ParseError::MissingExpression { position }
            | ParseError::InvalidLiteral { position, .. } => *position,
        }
    }

    /// Shifts the reported position, used when a block body is parsed on its
    /// own and the error must point into the surrounding template.
    pub(crate) fn offset_by(self, offset: usize) -> Self {
        match self {
            ParseError::Syntax { message, position } => ParseError::Syntax {
                message,
                position: position + offset,
            },
            ParseError::UnbalancedParenthesis { position } => ParseError::UnbalancedParenthesis {
                position: position + offset,
            },
            ParseError::MissingExpression { position } => ParseError::MissingExpression {
                position: position + offset,
            },
            ParseError::InvalidLiteral { literal, position } => ParseError::InvalidLiteral {
                literal,
                position: position + offset,
            },
        }
    }

    pub(crate) fn from_nom(input: &str, err: nom::Err<VerboseError<&str>>) -> Self {
        match err {
            nom::Err::Incomplete(needed) => ParseError::Syntax {
                message: format!("Incomplete input, {:?}", needed),
                position: input.len(),
            },
            nom::Err::Error(e) | nom::Err::Failure(e) => {
                let position = e
                    .errors
                    .first()
                    .map(|(rest, _)| input.len() - rest.len())
                    .unwrap_or(0);
                let invalid_literal = e.errors.iter().find(|(_, kind)| {
                    matches!(kind, VerboseErrorKind::Context(label) if *label == INVALID_LITERAL)
                });
                if let Some((fragment, _)) = invalid_literal {
                    let literal = fragment
                        .split(|c: char| c.is_whitespace() || c == ',' || c == ')')
                        .next()
                        .unwrap_or_default()
                        .to_string();
                    return ParseError::InvalidLiteral {
                        literal,
                        position: input.len() - fragment.len(),
                    };
                }
                let error = ParseError::Syntax {
                    message: convert_error(input, e),
                    position,
                };
                tracing::debug!("{}", error);
                error
            }
        }
    }
}

/// Wraps a parser so it skips surrounding whitespace.
pub(crate) fn ws<'a, O, F>(inner: F) -> impl FnMut(&'a str) -> ParserResult<'a, O>
where
    F: FnMut(&'a str) -> ParserResult<'a, O>,
{
    delimited(multispace0, inner, multispace0)
}
