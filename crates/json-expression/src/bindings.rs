//! Variable bindings made visible to a running expression.

use std::collections::HashMap;

use serde_json::Value;

/// Name-to-value environment threaded through [`crate::backend::Backend::run`].
///
/// The tracer populates this with the meta-token identifiers it rewrites
/// (`_$_v`, `_$_k`, `_$_parent`, `_$_parentProperty`, ...) before invoking a
/// backend, plus whatever top-level root binding the call site wants exposed.
#[derive(Debug, Clone, Default)]
pub struct Bindings(HashMap<String, Value>);

impl Bindings {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }
}
