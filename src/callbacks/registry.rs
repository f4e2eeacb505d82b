use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use super::{defaults, Arity, Callable, CallbackModule};
use crate::{config::EngineConfig, ExprResult};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    #[error("Function not implemented: {name}/{arity}")]
    NotImplemented { name: String, arity: usize },
}

/// Maps call-site names to lookup keys: lower-cased, with a `_` suffix when
/// the name is a reserved word (`IF` -> `if_`).
#[derive(Debug, Clone, Default)]
pub struct NameNormalizer {
    reserved: HashSet<String>,
}

impl NameNormalizer {
    pub fn new<I, S>(reserved_words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            reserved: reserved_words
                .into_iter()
                .map(|w| w.as_ref().to_lowercase())
                .collect(),
        }
    }

    pub fn normalize(&self, name: &str) -> String {
        let lower = name.to_lowercase();
        if self.reserved.contains(&lower) {
            format!("{}_", lower)
        } else {
            lower
        }
    }
}

#[derive(Debug, Clone)]
struct Registered {
    name: String,
    exact: HashMap<(String, usize), Callable>,
    variadic: HashMap<String, Callable>,
}

impl Registered {
    fn new(module: CallbackModule, normalizer: &NameNormalizer) -> Self {
        let mut exact = HashMap::new();
        let mut variadic = HashMap::new();
        for (name, arity, callable) in module.functions() {
            let key = normalizer.normalize(name);
            match arity {
                Arity::Exact(n) => {
                    exact.insert((key, n), callable.clone());
                }
                Arity::Variable => {
                    variadic.insert(key, callable.clone());
                }
            }
        }
        Self {
            name: module.name().to_string(),
            exact,
            variadic,
        }
    }
}

/// Ordered function lookup. Modules earlier in the list shadow later ones.
#[derive(Debug, Clone)]
pub struct CallbackRegistry {
    modules: Vec<Registered>,
    normalizer: NameNormalizer,
}

impl CallbackRegistry {
    /// `modules` in priority order, followed by the built-in library.
    pub fn new(modules: Vec<CallbackModule>, config: &EngineConfig) -> ExprResult<Self> {
        let mut all = modules;
        all.push(defaults::module(config)?);
        Ok(Self::without_defaults(all, &config.reserved_words))
    }

    /// A registry holding only `modules`.
    pub fn without_defaults<S: AsRef<str>>(
        modules: Vec<CallbackModule>,
        reserved_words: &[S],
    ) -> Self {
        let normalizer = NameNormalizer::new(reserved_words);
        let modules = modules
            .into_iter()
            .map(|module| Registered::new(module, &normalizer))
            .collect();
        Self {
            modules,
            normalizer,
        }
    }

    pub fn module_names(&self) -> Vec<&str> {
        self.modules.iter().map(|m| m.name.as_str()).collect()
    }

    /// Finds the function a call `name(arg1, ..., argN)` refers to. An exact
    /// arity match anywhere beats a variable-arity one.
    pub fn resolve(&self, name: &str, arity: usize) -> Result<Callable, DispatchError> {
        let key = self.normalizer.normalize(name);

        let exact_key = (key, arity);
        if let Some((module, callable)) = self
            .modules
            .iter()
            .find_map(|m| m.exact.get(&exact_key).map(|c| (m, c)))
        {
            debug!("resolved {}/{} in module {}", name, arity, module.name);
            return Ok(callable.clone());
        }

        let (key, _) = exact_key;
        if let Some((module, callable)) = self
            .modules
            .iter()
            .find_map(|m| m.variadic.get(&key).map(|c| (m, c)))
        {
            debug!("resolved {}/* in module {}", name, module.name);
            return Ok(callable.clone());
        }

        debug!("no function for {}/{}", name, arity);
        Err(DispatchError::NotImplemented {
            name: name.to_string(),
            arity,
        })
    }
}
