//! Core data model: the tagged token representation of a compiled path, the
//! match records the tracer produces, and the error enum shared by every
//! component.
//!
//! Tokens are a tagged variant rather than a string the tracer re-parses on
//! every dispatch — the normalizer already knows which grammar production it
//! saw, so that tag is carried forward instead of re-testing string prefixes
//! in the tracer's hot path.

use serde_json::Value;
use thiserror::Error;

/// One atomic step of a compiled path.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// `$` — the document root.
    Root,
    /// A plain property name or an integer-as-string array index. Numeric
    /// components stay strings here; the tracer decides index-vs-key from
    /// the runtime type of the value it is descending into, not from the
    /// token itself.
    Property(String),
    /// `` `name` `` — a property name that bypasses operator interpretation
    /// entirely, even if it happens to look like `*`, `~`, or a number.
    LiteralProperty(String),
    /// `*` — every immediate child.
    Wildcard,
    /// `..` — recursive descent.
    Descendant,
    /// `^` — one step toward the root. A run of `^^^` becomes that many
    /// separate `Parent` tokens.
    Parent,
    /// `~` — yield the current property name instead of the current value.
    PropertyName,
    /// `[a:b:c]` — Python-style array slice; `None` fields take the usual
    /// defaults (`0`, array length, `1`) at trace time, once the array's
    /// length is known.
    Slice { start: Option<i64>, end: Option<i64>, step: Option<i64> },
    /// `[?(src)]` — keep children for which `src` evaluates truthy.
    Filter(String),
    /// `[(src)]` — evaluate `src` once; its result becomes the next token.
    Script(String),
    /// `@<kind>()` — a fixed type-classifier test against the current value.
    TypePredicate(TypeKind),
    /// `a,b,c` — alternative steps, each tried in turn against the same
    /// location. Members are always simple non-recursing selectors
    /// (`Property`/`LiteralProperty`/slices), per the grammar's union rule.
    Union(Vec<Token>),
}

/// The classifier tested by a `@<kind>()` type predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeKind {
    Null,
    Boolean,
    Number,
    String,
    Integer,
    Undefined,
    NonFinite,
    Scalar,
    Array,
    Object,
    Function,
    Other,
}

impl TypeKind {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "null" => TypeKind::Null,
            "boolean" => TypeKind::Boolean,
            "number" => TypeKind::Number,
            "string" => TypeKind::String,
            "integer" => TypeKind::Integer,
            "undefined" => TypeKind::Undefined,
            "nonFinite" => TypeKind::NonFinite,
            "scalar" => TypeKind::Scalar,
            "array" => TypeKind::Array,
            "object" => TypeKind::Object,
            "function" => TypeKind::Function,
            "other" => TypeKind::Other,
            _ => return None,
        })
    }
}

/// A single concrete descent step recorded in a match's `path`. Unlike
/// [`Token`], this only ever names a location that was actually visited —
/// operators that don't locate a child (`~`, `^`, a type predicate) never
/// appear here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathComponent {
    Key(String),
    Index(usize),
}

impl PathComponent {
    pub fn as_pointer_segment(&self) -> String {
        match self {
            PathComponent::Key(k) => k.clone(),
            PathComponent::Index(i) => i.to_string(),
        }
    }

    pub fn as_value(&self) -> Value {
        match self {
            PathComponent::Key(k) => Value::String(k.clone()),
            PathComponent::Index(i) => Value::from(*i as u64),
        }
    }
}

/// Whether a terminal match was reached via an ordinary descent step or via
/// the `~` property-name selector (spec.md's callback `"value"`/`"property"`
/// distinction).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchKind {
    Value,
    Property,
}

/// A terminal location the tracer selected.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchRecord {
    pub path: Vec<PathComponent>,
    pub value: Value,
    pub parent: Option<Value>,
    pub parent_property: Option<PathComponent>,
    /// True when any step traversed to reach this match was a multi-match
    /// step (wildcard, descendant, slice, union, filter). The shaper uses
    /// this to decide whether a lone result may be unwrapped.
    pub has_arr_expr: bool,
    pub kind: MatchKind,
}

/// An intermediate, non-terminal record produced when the tracer hits `^`.
/// Never surfaced to a caller — resolved one frame up, against the value
/// that was active when the `^` token was reached.
#[derive(Debug, Clone, PartialEq)]
pub struct ParentSentinel {
    pub truncated_path: Vec<PathComponent>,
    pub remaining: Vec<Token>,
}

/// Everything one dispatch step can hand back to its caller: a completed
/// location, or a deferred parent-selector resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum TraceOutcome {
    Match(MatchRecord),
    Sentinel(ParentSentinel),
}

/// Errors surfaced by the normalizer, tracer, shaper, or facade.
///
/// The "sentinel error" kind of spec.md §7 has no variant here: it existed
/// to unwind a host-language constructor-returns-scalar quirk that this
/// crate replaces with the two explicit entry points `query`/`query_scalar`
/// (see spec.md §9's Open Questions) — there is no control-flow signal left
/// to model. There is likewise no `Config` variant: every option this crate
/// exposes (`ResultType`, `EvalBackend`, …) is a Rust enum, so "unknown
/// option value" is rejected by the type system at the call site rather than
/// surfacing as a runtime error here.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("policy error: {0}")]
    Policy(String),

    #[error("classifier error: {0}")]
    Classifier(String),

    #[error("expression error in `{source_fragment}`: {message}")]
    Expression { message: String, source_fragment: String },
}
