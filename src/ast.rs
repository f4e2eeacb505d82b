use strum_macros::{AsRefStr, Display, EnumString};

use crate::value::Value;

// テンプレート
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Template {
    pub segments: Vec<Segment>,
}

impl Template {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// The expression of a template made of exactly one substitution and no
    /// text. Such templates evaluate to a typed value instead of a string.
    pub fn single_substitution(&self) -> Option<&Expression> {
        match self.segments.as_slice() {
            [Segment::Substitution(expr)] => Some(expr),
            _ => None,
        }
    }

    pub fn substitutions(&self) -> impl Iterator<Item = &Expression> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Substitution(expr) => Some(expr),
            Segment::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Text(String),
    Substitution(Expression),
}

// 式
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Literal(Value),
    Variable(Vec<String>),
    FunctionCall {
        name: String,
        args: Vec<Expression>,
    },
    BinaryOp {
        op: BinaryOperator,
        left: Box<Expression>,
        right: Box<Expression>,
    },
    List(Vec<Expression>),
    Index {
        collection: Box<Expression>,
        index: Box<Expression>,
    },
    /// An `@( ... )` block.
    Block(Box<Expression>),
}

impl Expression {
    pub fn variable<S: AsRef<str>>(path: &[S]) -> Self {
        Expression::Variable(path.iter().map(|s| s.as_ref().to_string()).collect())
    }

    pub fn call<S: Into<String>>(name: S, args: Vec<Expression>) -> Self {
        Expression::FunctionCall {
            name: name.into(),
            args,
        }
    }

    pub fn binary(op: BinaryOperator, left: Expression, right: Expression) -> Self {
        Expression::BinaryOp {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn index(collection: Expression, index: Expression) -> Self {
        Expression::Index {
            collection: Box::new(collection),
            index: Box::new(index),
        }
    }

    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Expression::Literal(value) => Some(value),
            _ => None,
        }
    }
}

/// An infix chain straight out of the parser: operands and operators in
/// source order, with no precedence applied yet.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatExpression {
    pub first: Expression,
    pub rest: Vec<(BinaryOperator, Expression)>,
}

impl FlatExpression {
    pub fn new(first: Expression) -> Self {
        Self {
            first,
            rest: Vec::new(),
        }
    }
}

// 二項演算子
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumString, Display, AsRefStr)]
pub enum BinaryOperator {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Subtract,
    #[strum(serialize = "*")]
    Multiply,
    #[strum(serialize = "/")]
    Divide,
    #[strum(serialize = "^")]
    Power,
    #[strum(serialize = "&")]
    Concat,
    #[strum(to_string = "=", serialize = "==")]
    Equal,
    #[strum(to_string = "!=", serialize = "<>")]
    NotEqual,
    #[strum(serialize = ">")]
    GreaterThan,
    #[strum(serialize = ">=")]
    GreaterThanEqual,
    #[strum(serialize = "<")]
    LessThan,
    #[strum(serialize = "<=")]
    LessThanEqual,
}

impl BinaryOperator {
    /// Binding strength; higher binds tighter. Every level is left-associative.
    pub fn precedence(self) -> u8 {
        match self {
            BinaryOperator::Power => 4,
            BinaryOperator::Multiply | BinaryOperator::Divide => 3,
            BinaryOperator::Add | BinaryOperator::Subtract | BinaryOperator::Concat => 2,
            BinaryOperator::Equal
            | BinaryOperator::NotEqual
            | BinaryOperator::GreaterThan
            | BinaryOperator::GreaterThanEqual
            | BinaryOperator::LessThan
            | BinaryOperator::LessThanEqual => 1,
        }
    }

    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Power
        )
    }
}
