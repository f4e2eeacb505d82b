//! # Callbacks
//!
//! Named functions callable from expressions (`UPPER(x)`, `IF(a, b, c)`).
//!
//! Functions are grouped into [`CallbackModule`]s. A [`CallbackRegistry`]
//! holds an ordered list of modules, custom ones first and the built-in
//! [`defaults`] module last, and resolves a call site's name and argument
//! count to a [`Callable`]:
//!
//! 1. the first module with an exact `(name, arity)` registration wins
//! 2. otherwise the first variable-arity registration for `name`, in module
//!    order
//! 3. otherwise [`DispatchError::NotImplemented`]
//!
//! Names are case-insensitive. Names that collide with a reserved word (see
//! [`EngineConfig::reserved_words`](crate::config::EngineConfig)) are stored
//! with a `_` suffix; callers never see it.

pub mod defaults;
pub mod module;
pub mod registry;

pub use module::{Arity, Callable, CallbackModule, EagerFn, LazyArguments, LazyFn};
pub use registry::{CallbackRegistry, DispatchError, NameNormalizer};
