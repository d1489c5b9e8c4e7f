//! Public Facade (C5): configuration defaults and the two query entry points
//! (spec.md §4.5).

use std::rc::Rc;

use json_expression::{Backend, CustomBackend, DisabledBackend, NativeBackend, SafeBackend};
use serde_json::Value;

use crate::normalizer::NormalizerCache;
use crate::shaper::{self, ResultType, ShapedMatch};
use crate::tracer::{self, TraceOptions};
use crate::types::{Error, PathComponent};

/// Backend selector mirroring spec.md §6's `eval` option.
pub enum EvalBackend {
    Safe,
    Native(NativeBackend),
    Custom(CustomBackend),
    Disabled,
}

impl Default for EvalBackend {
    fn default() -> Self {
        EvalBackend::Safe
    }
}

impl EvalBackend {
    fn into_dyn(self) -> Box<dyn Backend> {
        match self {
            EvalBackend::Safe => Box::new(SafeBackend::new()),
            EvalBackend::Native(backend) => Box::new(backend),
            EvalBackend::Custom(backend) => Box::new(backend),
            EvalBackend::Disabled => Box::new(DisabledBackend),
        }
    }
}

/// Per-query configuration. Constructed with [`Default`] and overridden
/// field-by-field, the way the teacher's option structs are built, rather
/// than a builder-macro crate.
pub struct JsonPathOptions {
    pub result_type: ResultType,
    pub flatten: bool,
    pub wrap: bool,
    pub eval: EvalBackend,
    pub ignore_eval_errors: bool,
    pub sandbox: serde_json::Map<String, Value>,
    pub other_type_callback: Option<Box<dyn Fn(&Value) -> bool>>,
    pub undefined_callback: Option<Box<dyn Fn(&[PathComponent]) -> Option<Value>>>,
    pub callback: Option<Box<dyn FnMut(&Value, &str, &ShapedMatch)>>,
    /// Seed values for the root frame, for queries embedded inside a larger
    /// trace that already knows its own parent/parentProperty.
    pub parent: Option<Value>,
    pub parent_property: Option<PathComponent>,
}

impl Default for JsonPathOptions {
    fn default() -> Self {
        Self {
            result_type: ResultType::Value,
            flatten: false,
            wrap: true,
            eval: EvalBackend::Safe,
            ignore_eval_errors: false,
            sandbox: serde_json::Map::new(),
            other_type_callback: None,
            undefined_callback: None,
            callback: None,
            parent: None,
            parent_property: None,
        }
    }
}

/// Holds the normalizer's token cache across repeated queries. Construct
/// once per caller (not a process-global), per spec.md §9's guidance against
/// a global singleton cache.
#[derive(Default)]
pub struct JsonPath {
    cache: NormalizerCache,
}

impl JsonPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `expr` (consulting the instance cache) and traces it against
    /// `document`, shaping the result per `options`. Honors `options.wrap`
    /// as configured — a single non-multi-match result unwraps to a scalar
    /// when `wrap` is false.
    pub fn query(&self, expr: &str, document: &Value, mut options: JsonPathOptions) -> Result<Value, Error> {
        let tokens = self.cache.tokenize(expr);
        let tokens = if matches!(tokens.first(), Some(crate::types::Token::Root)) { &tokens[1..] } else { &tokens[..] };

        let eval = std::mem::replace(&mut options.eval, EvalBackend::Safe);
        let backend = eval.into_dyn();
        let trace_opts = TraceOptions {
            backend: backend.as_ref(),
            ignore_eval_errors: options.ignore_eval_errors,
            sandbox: &options.sandbox,
            other_type_callback: options.other_type_callback.as_deref(),
            undefined_callback: options.undefined_callback.as_deref(),
        };

        let records = tracer::trace(tokens, document, options.parent.clone(), options.parent_property.clone(), &trace_opts)?;

        let result_type = options.result_type;
        let wrap = options.wrap;
        let flatten = options.flatten;
        let callback = options.callback.as_deref_mut();
        Ok(shaper::shape_results(&records, result_type, wrap, flatten, callback))
    }

    /// Identical to [`JsonPath::query`] except `wrap` is always forced to
    /// `false` internally, regardless of what `options.wrap` says — the
    /// explicit alternative to the host-language "constructor returns a bare
    /// scalar" quirk described in spec.md §9's Open Questions.
    pub fn query_scalar(&self, expr: &str, document: &Value, mut options: JsonPathOptions) -> Result<Value, Error> {
        options.wrap = false;
        self.query(expr, document, options)
    }
}

/// Convenience free function for a one-off query with default options and a
/// throwaway cache, for callers that don't hold a long-lived [`JsonPath`].
pub fn query(expr: &str, document: &Value, options: JsonPathOptions) -> Result<Value, Error> {
    JsonPath::new().query(expr, document, options)
}

pub fn query_scalar(expr: &str, document: &Value, options: JsonPathOptions) -> Result<Value, Error> {
    JsonPath::new().query_scalar(expr, document, options)
}

/// A shareable handle, for embedders that want one cache behind an `Rc`
/// rather than owning a [`JsonPath`] directly.
pub type SharedJsonPath = Rc<JsonPath>;
