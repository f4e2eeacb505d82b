use std::sync::Arc;

use tracing::debug;

use super::{operators, Context, EvalResult};
use crate::{
    ast::{Expression, Segment, Template},
    callbacks::{module::missing_argument, Callable, CallbackRegistry, LazyArguments},
    value::Value,
};

/// Tree-walking evaluation.
#[derive(Debug, Clone)]
pub struct Evaluator {
    registry: Arc<CallbackRegistry>,
}

impl Evaluator {
    pub fn new(registry: Arc<CallbackRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn evaluate(&self, expr: &Expression, context: &Context) -> EvalResult<Value> {
        match expr {
            Expression::Literal(value) => Ok(value.clone()),
            Expression::Variable(path) => context.resolve(path).cloned(),
            Expression::Block(inner) => self.evaluate(inner, context),
            Expression::BinaryOp { op, left, right } => {
                let left = self.evaluate(left, context)?;
                let right = self.evaluate(right, context)?;
                operators::apply(*op, left, right)
            }
            Expression::FunctionCall { name, args } => self.eval_function_call(name, args, context),
            Expression::List(items) => items
                .iter()
                .map(|item| self.evaluate(item, context))
                .collect::<EvalResult<Vec<_>>>()
                .map(Value::List),
            Expression::Index { collection, index } => {
                let collection = self.evaluate(collection, context)?;
                let index = self.evaluate(index, context)?;
                operators::index(collection, index)
            }
        }
    }

    // 関数呼び出しの評価
    fn eval_function_call(
        &self,
        name: &str,
        args: &[Expression],
        context: &Context,
    ) -> EvalResult<Value> {
        // Resolution comes first: an unknown function fails before any of its
        // arguments run.
        let callable = self.registry.resolve(name, args.len())?;
        debug!("Calling {}/{}", name, args.len());

        match callable {
            Callable::Eager(f) => {
                let values = args
                    .iter()
                    .map(|arg| self.evaluate(arg, context))
                    .collect::<EvalResult<Vec<_>>>()?;
                f(context, values)
            }
            Callable::Lazy(f) => f(
                context,
                &TreeArguments {
                    evaluator: self,
                    function: name,
                    args,
                    context,
                },
            ),
        }
    }

    /// A template made of a single substitution keeps the substitution's
    /// type; anything else becomes the concatenated text.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn evaluate_template(&self, template: &Template, context: &Context) -> EvalResult<Value> {
        match template.single_substitution() {
            Some(expr) => self.evaluate(expr, context),
            None => self.evaluate_as_string(template, context).map(Value::String),
        }
    }

    /// One value per segment, in template order. Text segments are included
    /// as strings alongside the substitution values, so the output lines up
    /// with [`Template::segments`].
    pub fn evaluate_segments(
        &self,
        template: &Template,
        context: &Context,
    ) -> EvalResult<Vec<Value>> {
        template
            .segments
            .iter()
            .map(|segment| match segment {
                Segment::Text(text) => Ok(Value::String(text.clone())),
                Segment::Substitution(expr) => self.evaluate(expr, context),
            })
            .collect()
    }

    pub fn evaluate_as_string(&self, template: &Template, context: &Context) -> EvalResult<String> {
        let mut out = String::new();
        for segment in &template.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Substitution(expr) => {
                    out.push_str(&self.evaluate(expr, context)?.to_display_string())
                }
            }
        }
        Ok(out)
    }
}

struct TreeArguments<'a> {
    evaluator: &'a Evaluator,
    function: &'a str,
    args: &'a [Expression],
    context: &'a Context,
}

impl LazyArguments for TreeArguments<'_> {
    fn len(&self) -> usize {
        self.args.len()
    }

    fn expression(&self, index: usize) -> Option<&Expression> {
        self.args.get(index)
    }

    fn evaluate(&self, index: usize) -> EvalResult<Value> {
        let expr = self
            .args
            .get(index)
            .ok_or_else(|| missing_argument(self.function, index))?;
        self.evaluator.evaluate(expr, self.context)
    }
}
