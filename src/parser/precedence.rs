//! # Precedence folding
//!
//! Rewrites a [`FlatExpression`] into a nested tree. Precedence, highest
//! first:
//!
//! 1. `^`
//! 2. `*` `/`
//! 3. `+` `-` `&`
//! 4. `>` `>=` `<` `<=` `=` `!=`
//!
//! Every level associates left-to-right, `^` included: `2 ^ 3 ^ 2` is
//! `(2 ^ 3) ^ 2`.

use std::iter::Peekable;

use crate::ast::{BinaryOperator, Expression, FlatExpression};

pub fn fold(flat: FlatExpression) -> Expression {
    let mut rest = flat.rest.into_iter().peekable();
    climb(flat.first, 0, &mut rest)
}

fn climb<I>(mut left: Expression, min_precedence: u8, rest: &mut Peekable<I>) -> Expression
where
    I: Iterator<Item = (BinaryOperator, Expression)>,
{
    while let Some((op, mut right)) = rest.next_if(|(op, _)| op.precedence() >= min_precedence) {
        // A tighter operator to the right claims `right` first.
        while rest
            .peek()
            .is_some_and(|(next, _)| next.precedence() > op.precedence())
        {
            right = climb(right, op.precedence() + 1, rest);
        }
        left = Expression::binary(op, left, right);
    }
    left
}
