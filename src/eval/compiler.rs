//! # Closure compiler
//!
//! Turns an [`Expression`] into a tree of closures once, so the same
//! expression can run against many contexts without re-walking the AST.
//!
//! Compared with the [`Evaluator`](super::Evaluator):
//!
//! * function names are resolved at compile time; a call that cannot be
//!   resolved compiles to a closure returning the same dispatch error the
//!   evaluator would raise
//! * binary operations and lists built only from literals are folded into a
//!   constant when folding succeeds; a fold that fails is left to run, and fail,
//!   at run time
//!
//! Compiled closures are `Send + Sync` and borrow nothing from the compiler.

use std::{fmt, sync::Arc};

use tracing::debug;

use super::{operators, Context, EvalError, EvalResult};
use crate::{
    ast::{Expression, Segment, Template},
    callbacks::{module::missing_argument, Callable, CallbackRegistry, LazyArguments},
    value::Value,
};

pub(crate) type CompiledFn = Arc<dyn Fn(&Context) -> EvalResult<Value> + Send + Sync>;

/// Intermediate result of compiling a node.
enum Node {
    Constant(Value),
    Dynamic(CompiledFn),
}

impl Node {
    fn into_fn(self) -> CompiledFn {
        match self {
            Node::Constant(value) => Arc::new(move |_: &Context| Ok(value.clone())),
            Node::Dynamic(f) => f,
        }
    }
}

#[derive(Clone)]
pub struct CompiledExpression {
    expression: Arc<Expression>,
    run: CompiledFn,
}

impl CompiledExpression {
    pub fn run(&self, context: &Context) -> EvalResult<Value> {
        (self.run)(context)
    }

    /// The expression this was compiled from.
    pub fn expression(&self) -> &Expression {
        &self.expression
    }
}

impl fmt::Debug for CompiledExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledExpression")
            .field("expression", &self.expression)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone)]
pub enum CompiledSegment {
    Text(String),
    Substitution(CompiledExpression),
}

#[derive(Debug, Clone)]
pub struct CompiledTemplate {
    segments: Vec<CompiledSegment>,
}

impl CompiledTemplate {
    pub fn segments(&self) -> &[CompiledSegment] {
        &self.segments
    }

    /// Same result shape as [`Evaluator::evaluate_template`](super::Evaluator::evaluate_template).
    pub fn run(&self, context: &Context) -> EvalResult<Value> {
        match self.segments.as_slice() {
            [CompiledSegment::Substitution(expr)] => expr.run(context),
            _ => self.run_as_string(context).map(Value::String),
        }
    }

    /// One value per segment, text included, like
    /// [`Evaluator::evaluate_segments`](super::Evaluator::evaluate_segments).
    pub fn run_segments(&self, context: &Context) -> EvalResult<Vec<Value>> {
        self.segments
            .iter()
            .map(|segment| match segment {
                CompiledSegment::Text(text) => Ok(Value::String(text.clone())),
                CompiledSegment::Substitution(expr) => expr.run(context),
            })
            .collect()
    }

    pub fn run_as_string(&self, context: &Context) -> EvalResult<String> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                CompiledSegment::Text(text) => out.push_str(text),
                CompiledSegment::Substitution(expr) => {
                    out.push_str(&expr.run(context)?.to_display_string())
                }
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone)]
pub struct Compiler {
    registry: Arc<CallbackRegistry>,
}

impl Compiler {
    pub fn new(registry: Arc<CallbackRegistry>) -> Self {
        Self { registry }
    }

    #[tracing::instrument(level = "debug", skip_all)]
    pub fn compile(&self, expr: &Expression) -> CompiledExpression {
        CompiledExpression {
            expression: Arc::new(expr.clone()),
            run: self.compile_node(expr).into_fn(),
        }
    }

    pub fn compile_template(&self, template: &Template) -> CompiledTemplate {
        let segments = template
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => CompiledSegment::Text(text.clone()),
                Segment::Substitution(expr) => CompiledSegment::Substitution(self.compile(expr)),
            })
            .collect();
        CompiledTemplate { segments }
    }

    fn compile_node(&self, expr: &Expression) -> Node {
        match expr {
            Expression::Literal(value) => Node::Constant(value.clone()),
            Expression::Block(inner) => self.compile_node(inner),
            Expression::Variable(path) => {
                let path = path.clone();
                Node::Dynamic(Arc::new(move |ctx: &Context| ctx.resolve(&path).cloned()))
            }
            Expression::BinaryOp { op, left, right } => {
                let op = *op;
                let left = self.compile_node(left);
                let right = self.compile_node(right);
                if let (Node::Constant(l), Node::Constant(r)) = (&left, &right) {
                    if let Ok(folded) = operators::apply(op, l.clone(), r.clone()) {
                        return Node::Constant(folded);
                    }
                }
                let (left, right) = (left.into_fn(), right.into_fn());
                Node::Dynamic(Arc::new(move |ctx: &Context| {
                    let l = left(ctx)?;
                    let r = right(ctx)?;
                    operators::apply(op, l, r)
                }))
            }
            Expression::List(items) => {
                let nodes: Vec<Node> = items.iter().map(|item| self.compile_node(item)).collect();
                if nodes.iter().all(|node| matches!(node, Node::Constant(_))) {
                    let values = nodes
                        .into_iter()
                        .filter_map(|node| match node {
                            Node::Constant(value) => Some(value),
                            Node::Dynamic(_) => None,
                        })
                        .collect();
                    return Node::Constant(Value::List(values));
                }
                let items: Vec<CompiledFn> = nodes.into_iter().map(Node::into_fn).collect();
                Node::Dynamic(Arc::new(move |ctx: &Context| {
                    items
                        .iter()
                        .map(|item| item(ctx))
                        .collect::<EvalResult<Vec<_>>>()
                        .map(Value::List)
                }))
            }
            Expression::Index { collection, index } => {
                let collection = self.compile_node(collection).into_fn();
                let index = self.compile_node(index).into_fn();
                Node::Dynamic(Arc::new(move |ctx: &Context| {
                    let c = collection(ctx)?;
                    let i = index(ctx)?;
                    operators::index(c, i)
                }))
            }
            Expression::FunctionCall { name, args } => self.compile_call(name, args),
        }
    }

    fn compile_call(&self, name: &str, args: &[Expression]) -> Node {
        let callable = match self.registry.resolve(name, args.len()) {
            Ok(callable) => callable,
            Err(err) => {
                debug!("Deferring dispatch error to run time: {}", err);
                let err = EvalError::Dispatch(err);
                return Node::Dynamic(Arc::new(move |_: &Context| Err(err.clone())));
            }
        };

        let compiled: Arc<[CompiledFn]> = args
            .iter()
            .map(|arg| self.compile_node(arg).into_fn())
            .collect();

        match callable {
            Callable::Eager(f) => Node::Dynamic(Arc::new(move |ctx: &Context| {
                let values = compiled
                    .iter()
                    .map(|arg| arg(ctx))
                    .collect::<EvalResult<Vec<_>>>()?;
                f(ctx, values)
            })),
            Callable::Lazy(f) => {
                let function = name.to_string();
                let expressions: Arc<[Expression]> = args.into();
                Node::Dynamic(Arc::new(move |ctx: &Context| {
                    f(
                        ctx,
                        &CompiledArguments {
                            function: &function,
                            args: &compiled,
                            expressions: &expressions,
                            context: ctx,
                        },
                    )
                }))
            }
        }
    }
}

struct CompiledArguments<'a> {
    function: &'a str,
    args: &'a [CompiledFn],
    expressions: &'a [Expression],
    context: &'a Context,
}

impl LazyArguments for CompiledArguments<'_> {
    fn len(&self) -> usize {
        self.args.len()
    }

    fn expression(&self, index: usize) -> Option<&Expression> {
        self.expressions.get(index)
    }

    fn evaluate(&self, index: usize) -> EvalResult<Value> {
        let arg = self
            .args
            .get(index)
            .ok_or_else(|| missing_argument(self.function, index))?;
        arg(self.context)
    }
}
