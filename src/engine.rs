use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, warn};

use crate::{
    ast::{Expression, Template},
    callbacks::{CallbackModule, CallbackRegistry},
    config::EngineConfig,
    eval::{CompiledExpression, CompiledTemplate, Compiler, Context, ContextBuilder, EvalError, Evaluator},
    literal::LiteralCoercer,
    parser,
    value::Value,
    ExprResult,
};

/// Everything needed to turn template text into values: configuration,
/// function registry, both evaluation strategies, and a cache of compiled
/// templates.
///
/// An `Engine` is immutable after construction and can be shared across
/// threads behind an `Arc`.
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    registry: Arc<CallbackRegistry>,
    evaluator: Evaluator,
    compiler: Compiler,
    context_builder: ContextBuilder,
    templates: DashMap<String, Arc<CompiledTemplate>>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> ExprResult<Self> {
        Self::with_modules(config, Vec::new())
    }

    /// `modules` take priority over the built-in functions, in order.
    pub fn with_modules(config: EngineConfig, modules: Vec<CallbackModule>) -> ExprResult<Self> {
        let registry = Arc::new(CallbackRegistry::new(modules, &config)?);
        debug!("Engine modules: {:?}", registry.module_names());

        Ok(Self {
            evaluator: Evaluator::new(registry.clone()),
            compiler: Compiler::new(registry.clone()),
            context_builder: ContextBuilder::new(LiteralCoercer::from_config(&config)),
            templates: DashMap::new(),
            registry,
            config,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<CallbackRegistry> {
        &self.registry
    }

    pub fn evaluator(&self) -> &Evaluator {
        &self.evaluator
    }

    pub fn compiler(&self) -> &Compiler {
        &self.compiler
    }

    pub fn parse_template(&self, template: &str) -> ExprResult<Template> {
        Ok(parser::parse_template(template)?)
    }

    pub fn parse_block(&self, expression: &str) -> ExprResult<Expression> {
        Ok(parser::parse_block(expression)?)
    }

    pub fn build_context(&self, raw: &serde_json::Value) -> Context {
        self.context_builder.build(raw)
    }

    /// Parses and evaluates `template`. A template that is a single
    /// substitution yields that substitution's value; anything else yields a
    /// string.
    #[tracing::instrument(level = "debug", skip(self, context))]
    pub fn evaluate(&self, template: &str, context: &Context) -> ExprResult<Value> {
        let template = self.parse_template(template)?;
        Ok(self.evaluator.evaluate_template(&template, context)?)
    }

    pub fn evaluate_as_string(&self, template: &str, context: &Context) -> ExprResult<String> {
        let template = self.parse_template(template)?;
        Ok(self.evaluator.evaluate_as_string(&template, context)?)
    }

    pub fn evaluate_segments(&self, template: &str, context: &Context) -> ExprResult<Vec<Value>> {
        let template = self.parse_template(template)?;
        Ok(self.evaluator.evaluate_segments(&template, context)?)
    }

    /// Evaluates a bare expression, the body of an `@( ... )` block.
    pub fn evaluate_block(&self, expression: &str, context: &Context) -> ExprResult<Value> {
        let expr = self.parse_block(expression)?;
        Ok(self.evaluator.evaluate(&expr, context)?)
    }

    /// Evaluates `template` and reads the result as a boolean, the way
    /// flow conditions are checked.
    pub fn evaluate_as_boolean(&self, template: &str, context: &Context) -> ExprResult<bool> {
        let value = self.evaluate(template, context)?;
        value
            .as_bool()
            .ok_or_else(|| EvalError::type_mismatch("boolean", &value).into())
    }

    pub fn compile_block(&self, expr: &Expression) -> CompiledExpression {
        self.compiler.compile(expr)
    }

    /// Parses and compiles `template`, reusing an earlier compilation of the
    /// same text when there is one.
    pub fn compile_template(&self, template: &str) -> ExprResult<Arc<CompiledTemplate>> {
        if let Some(cached) = self.templates.get(template) {
            return Ok(cached.clone());
        }

        let parsed = self.parse_template(template)?;
        let compiled = Arc::new(self.compiler.compile_template(&parsed));

        if self.templates.len() < self.config.template_cache_capacity {
            self.templates.insert(template.to_string(), compiled.clone());
        } else {
            warn!(
                "Template cache is full ({} entries), not caching",
                self.config.template_cache_capacity
            );
        }
        Ok(compiled)
    }

    pub fn cached_templates(&self) -> usize {
        self.templates.len()
    }

    pub fn clear_cache(&self) {
        self.templates.clear();
    }
}
