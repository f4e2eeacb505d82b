//! # Evaluation
//!
//! Two strategies share one set of semantics:
//!
//! * [`Evaluator`] walks the AST on every call
//! * [`Compiler`] turns the AST into a tree of closures once; the result is
//!   reusable across contexts and threads
//!
//! For any expression and context both produce the same value or the same
//! error. Operator semantics live in [`operators`] and are called by both.

pub mod compiler;
pub mod context;
pub mod evaluator;
pub mod operators;

pub use compiler::{CompiledExpression, CompiledSegment, CompiledTemplate, Compiler};
pub use context::{Context, ContextBuilder};
pub use evaluator::Evaluator;

use thiserror::Error;

use crate::{callbacks::DispatchError, value::Value};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    #[error("Undefined variable: {path}")]
    UndefinedVariable { path: String },
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),
    #[error("Error in {function}: {message}")]
    Callback { function: String, message: String },
}

impl EvalError {
    pub fn type_mismatch(expected: impl Into<String>, found: &Value) -> Self {
        EvalError::TypeMismatch {
            expected: expected.into(),
            found: found.describe(),
        }
    }

    pub fn callback(function: impl Into<String>, message: impl Into<String>) -> Self {
        EvalError::Callback {
            function: function.into(),
            message: message.into(),
        }
    }
}

pub type EvalResult<T> = Result<T, EvalError>;
