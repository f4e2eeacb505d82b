//! # floip-expression: templates with spreadsheet-style expressions
//!
//! Evaluates FLOIP-compatible text templates such as
//! `"Hello @contact.name, you owe @(FIXED(balance * 1.15, 2))"` against a
//! [`Context`] of host data.
//!
//! ## Processing Pipeline
//!
//! ```text
//! template text → Template Lexer → Expression Parser → Precedence Folder → Evaluator | Compiler
//! ```
//!
//! ### Stage 1: Template lexing
//!
//! [`parser::template`] splits text into literal runs and substitutions:
//! `@name.path` shorthand, `@( ... )` blocks and the `@@` escape.
//!
//! ### Stage 2: Expression parsing
//!
//! [`parser::expression`] reads block bodies (literals, variables, calls,
//! lists, indexing and infix operators) into a flat chain, which
//! [`parser::precedence`] folds into a tree ([`ast`]).
//!
//! ### Stage 3: Evaluation
//!
//! * [`eval::Evaluator`] walks the tree directly.
//! * [`eval::Compiler`] turns it into reusable closures.
//!
//! Both dispatch function calls through a [`callbacks::CallbackRegistry`]:
//! host-supplied [`callbacks::CallbackModule`]s first, then the built-in
//! library (text, logic, math and date functions).
//!
//! ## Values and contexts
//!
//! [`Value`] carries integers, decimals, booleans, dates, times, datetimes,
//! strings, lists and maps. [`ContextBuilder`] turns JSON host data into a
//! [`Context`], promoting string leaves that read as literals.
//!
//! ## Quick start
//!
//! ```
//! use floip_expression::{evaluate, Context, Value};
//!
//! let mut context = Context::new();
//! context.insert("name", Value::from("Ann"));
//! assert_eq!(
//!     evaluate("Hi @(UPPER(name))!", &context).unwrap(),
//!     Value::from("Hi ANN!")
//! );
//! ```

pub mod ast;
pub mod callbacks;
pub mod config;
pub mod engine;
pub mod error;
pub mod eval;
pub mod literal;
pub mod parser;
pub mod value;

// Re-exports
pub use ast::{BinaryOperator, Expression, Segment, Template};
pub use callbacks::{CallbackModule, CallbackRegistry, DispatchError};
pub use config::EngineConfig;
pub use engine::Engine;
pub use error::*;
pub use eval::{
    CompiledExpression, CompiledTemplate, Context, ContextBuilder, EvalError, EvalResult,
};
pub use parser::{parse_block, parse_template, ParseError};
pub use value::Value;

use lazy_static::lazy_static;

lazy_static! {
    static ref DEFAULT_ENGINE: Engine =
        Engine::new(EngineConfig::default()).expect("default engine configuration is valid");
}

/// The engine behind the free functions of this crate.
pub fn default_engine() -> &'static Engine {
    &DEFAULT_ENGINE
}

pub fn evaluate(template: &str, context: &Context) -> ExprResult<Value> {
    DEFAULT_ENGINE.evaluate(template, context)
}

pub fn evaluate_as_string(template: &str, context: &Context) -> ExprResult<String> {
    DEFAULT_ENGINE.evaluate_as_string(template, context)
}

pub fn evaluate_segments(template: &str, context: &Context) -> ExprResult<Vec<Value>> {
    DEFAULT_ENGINE.evaluate_segments(template, context)
}

pub fn compile_block(expr: &Expression) -> CompiledExpression {
    DEFAULT_ENGINE.compile_block(expr)
}

/// Evaluates with extra function modules in front of the built-ins.
pub fn evaluate_with(
    template: &str,
    context: &Context,
    modules: Vec<CallbackModule>,
) -> ExprResult<Value> {
    Engine::with_modules(EngineConfig::default(), modules)?.evaluate(template, context)
}
