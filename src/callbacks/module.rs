use std::{collections::HashMap, fmt, sync::Arc};

use crate::{
    ast::Expression,
    eval::{Context, EvalError, EvalResult},
    value::Value,
};

/// A function receiving its arguments already evaluated, left to right.
pub type EagerFn = dyn Fn(&Context, Vec<Value>) -> EvalResult<Value> + Send + Sync;

/// A function receiving unevaluated arguments. It decides which of them to
/// evaluate, and when.
pub type LazyFn = dyn Fn(&Context, &dyn LazyArguments) -> EvalResult<Value> + Send + Sync;

/// Argument access for lazy functions. Both the tree-walking evaluator and the
/// compiled closures provide an implementation.
pub trait LazyArguments {
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The raw expression of argument `index`.
    fn expression(&self, index: usize) -> Option<&Expression>;

    /// Evaluates argument `index` against the calling context.
    fn evaluate(&self, index: usize) -> EvalResult<Value>;
}

pub(crate) fn missing_argument(function: &str, index: usize) -> EvalError {
    EvalError::callback(function, format!("missing argument {}", index + 1))
}

#[derive(Clone)]
pub enum Callable {
    Eager(Arc<EagerFn>),
    Lazy(Arc<LazyFn>),
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callable::Eager(_) => f.write_str("Callable::Eager"),
            Callable::Lazy(_) => f.write_str("Callable::Lazy"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Arity {
    Exact(usize),
    Variable,
}

/// A named group of functions, built fluently:
///
/// ```
/// use floip_expression::{callbacks::CallbackModule, Value};
///
/// let module = CallbackModule::new("greetings")
///     .function("hello", 1, |_, args| Ok(Value::from(format!("hello {}", args[0]))));
/// assert_eq!(module.len(), 1);
/// ```
///
/// Names are stored lower-cased. Registering the same name and arity twice
/// keeps the last registration.
#[derive(Debug, Clone, Default)]
pub struct CallbackModule {
    name: String,
    functions: HashMap<(String, Arity), Callable>,
}

impl CallbackModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }

    pub fn function<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&Context, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arity::Exact(arity), Callable::Eager(Arc::new(f)))
    }

    pub fn vargs<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Context, Vec<Value>) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arity::Variable, Callable::Eager(Arc::new(f)))
    }

    pub fn lazy<F>(self, name: &str, arity: usize, f: F) -> Self
    where
        F: Fn(&Context, &dyn LazyArguments) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arity::Exact(arity), Callable::Lazy(Arc::new(f)))
    }

    pub fn lazy_vargs<F>(self, name: &str, f: F) -> Self
    where
        F: Fn(&Context, &dyn LazyArguments) -> EvalResult<Value> + Send + Sync + 'static,
    {
        self.register(name, Arity::Variable, Callable::Lazy(Arc::new(f)))
    }

    pub fn register(mut self, name: &str, arity: Arity, callable: Callable) -> Self {
        self.functions
            .insert((name.to_lowercase(), arity), callable);
        self
    }

    pub fn functions(&self) -> impl Iterator<Item = (&str, Arity, &Callable)> {
        self.functions
            .iter()
            .map(|((name, arity), callable)| (name.as_str(), *arity, callable))
    }
}
