//! Pluggable compile/run backend for filter (`[?(...)]`) and script (`[(...)]`)
//! steps.
//!
//! The tracer never evaluates expression text itself; it hands the source
//! fragment and a [`Bindings`] environment to whichever [`Backend`] the
//! facade was configured with. This keeps the tracer ignorant of what
//! expression language is in play, and lets a caller swap in a host script
//! VM or a custom evaluator without touching the JSONPath engine proper.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::ast::Expr;
use crate::bindings::Bindings;
use crate::error::ExprError;
use crate::interp;
use crate::parser::Parser;

/// A compiled program. Opaque to callers; produced by [`Backend::compile`]
/// and consumed by [`Backend::run`].
#[derive(Debug, Clone)]
pub struct Program(Expr);

/// Evaluates filter and script expression text against a [`Bindings`]
/// environment.
///
/// Implementations are expected to memoize their own `compile` step where it
/// is useful (see [`SafeBackend`]); the trait does not impose a cache.
pub trait Backend {
    fn compile(&self, source: &str) -> Result<Program, ExprError>;
    fn run(&self, program: &Program, bindings: &Bindings) -> Result<Value, ExprError>;

    /// Convenience for callers that don't want to hold onto a `Program`.
    fn eval(&self, source: &str, bindings: &Bindings) -> Result<Value, ExprError> {
        let program = self.compile(source)?;
        self.run(&program, bindings)
    }
}

/// The default backend: parses and interprets the small safe grammar
/// described in [`crate::ast`]. Compiled programs are memoized per instance
/// keyed on source text, so a normalizer that revisits the same `[?(...)]`
/// step across many input values pays the parse cost once.
pub struct SafeBackend {
    cache: RefCell<HashMap<String, Program>>,
}

impl SafeBackend {
    pub fn new() -> Self {
        Self { cache: RefCell::new(HashMap::new()) }
    }
}

impl Default for SafeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for SafeBackend {
    fn compile(&self, source: &str) -> Result<Program, ExprError> {
        if let Some(program) = self.cache.borrow().get(source) {
            return Ok(program.clone());
        }
        let expr = Parser::parse(source).map_err(|e| ExprError::Compile {
            source: source.to_string(),
            message: e.0,
        })?;
        let program = Program(expr);
        self.cache
            .borrow_mut()
            .insert(source.to_string(), program.clone());
        Ok(program)
    }

    fn run(&self, program: &Program, bindings: &Bindings) -> Result<Value, ExprError> {
        interp::eval(&program.0, bindings)
    }
}

/// Rejects every filter/script step. Selecting this backend turns `[?(...)]`
/// and `[(...)]` into hard errors, matching a deployment that wants the
/// normalizer to accept query text but never actually execute arbitrary
/// expressions.
pub struct DisabledBackend;

impl Backend for DisabledBackend {
    fn compile(&self, _source: &str) -> Result<Program, ExprError> {
        Err(ExprError::Disabled)
    }

    fn run(&self, _program: &Program, _bindings: &Bindings) -> Result<Value, ExprError> {
        Err(ExprError::Disabled)
    }
}

/// Delegates compile/run to host-supplied closures, letting an embedder
/// plug in their own expression language (or a sandboxed superset of the
/// safe grammar) without forking this crate.
pub struct CustomBackend {
    compile_fn: Arc<dyn Fn(&str) -> Result<Program, ExprError> + Send + Sync>,
    run_fn: Arc<dyn Fn(&Program, &Bindings) -> Result<Value, ExprError> + Send + Sync>,
}

impl CustomBackend {
    pub fn new(
        compile_fn: impl Fn(&str) -> Result<Program, ExprError> + Send + Sync + 'static,
        run_fn: impl Fn(&Program, &Bindings) -> Result<Value, ExprError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            compile_fn: Arc::new(compile_fn),
            run_fn: Arc::new(run_fn),
        }
    }

    /// Builds an opaque [`Program`] wrapping source the closures understand
    /// directly, for embedders whose expression language doesn't round-trip
    /// through this crate's [`Expr`] AST.
    pub fn opaque_program(source: &str) -> Program {
        Program(Expr::Literal(Value::String(source.to_string())))
    }
}

impl Backend for CustomBackend {
    fn compile(&self, source: &str) -> Result<Program, ExprError> {
        (self.compile_fn)(source)
    }

    fn run(&self, program: &Program, bindings: &Bindings) -> Result<Value, ExprError> {
        (self.run_fn)(program, bindings)
    }
}

impl fmt::Debug for CustomBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomBackend").finish_non_exhaustive()
    }
}

/// Delegates to a host scripting VM (e.g. a JS engine embedding) supplied by
/// the caller. This crate does not bundle one: no example in the corpus
/// depends on a JS-engine crate, so rather than fabricate that dependency,
/// `NativeBackend` requires an injected evaluator of the same shape as
/// [`CustomBackend`] and reports [`ExprError::NativeUnavailable`] until one
/// is configured.
#[derive(Default)]
pub struct NativeBackend {
    inner: Option<CustomBackend>,
}

impl NativeBackend {
    pub fn unconfigured() -> Self {
        Self { inner: None }
    }

    pub fn with_vm(backend: CustomBackend) -> Self {
        Self { inner: Some(backend) }
    }
}

impl Backend for NativeBackend {
    fn compile(&self, source: &str) -> Result<Program, ExprError> {
        match &self.inner {
            Some(vm) => vm.compile(source),
            None => Err(ExprError::NativeUnavailable),
        }
    }

    fn run(&self, program: &Program, bindings: &Bindings) -> Result<Value, ExprError> {
        match &self.inner {
            Some(vm) => vm.run(program, bindings),
            None => Err(ExprError::NativeUnavailable),
        }
    }
}

/// A shareable handle to any [`Backend`] implementation, used by the facade
/// so a single configured backend can be cloned across tracer recursion
/// without re-wrapping trait objects at every step.
pub type SharedBackend = Rc<dyn Backend>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn safe_backend_compiles_once_per_source() {
        let backend = SafeBackend::new();
        let bindings = Bindings::new().with("v", serde_json::json!({"price": 5}));
        assert_eq!(
            backend.eval("v.price < 10", &bindings).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(backend.cache.borrow().len(), 1);
        backend.eval("v.price < 10", &bindings).unwrap();
        assert_eq!(backend.cache.borrow().len(), 1);
    }

    #[test]
    fn disabled_backend_rejects_everything() {
        let backend = DisabledBackend;
        assert_eq!(
            backend.eval("1 + 1", &Bindings::new()),
            Err(ExprError::Disabled)
        );
    }

    #[test]
    fn native_backend_without_vm_reports_unavailable() {
        let backend = NativeBackend::unconfigured();
        assert_eq!(
            backend.eval("1 + 1", &Bindings::new()),
            Err(ExprError::NativeUnavailable)
        );
    }

    #[test]
    fn custom_backend_delegates_to_closures() {
        let backend = CustomBackend::new(
            |source| Ok(CustomBackend::opaque_program(source)),
            |_program, _bindings| Ok(Value::Bool(true)),
        );
        assert_eq!(backend.eval("anything", &Bindings::new()), Ok(Value::Bool(true)));
    }
}
