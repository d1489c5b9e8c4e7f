//! Pluggable filter/script expression backend for the JSONPath engine.
//!
//! A JSONPath query's `[?(...)]` filter steps and `[(...)]` script steps
//! carry arbitrary expression text. This crate owns compiling and running
//! that text; the JSONPath tracer owns rewriting JSONPath meta-tokens
//! (`@`, `@parentProperty`, ...) into the plain identifiers this crate
//! understands (`_$_v`, `_$_parentProperty`, ...) before handing the
//! fragment over. That split keeps this crate ignorant of JSONPath syntax
//! and keeps the tracer ignorant of expression syntax.
//!
//! Four backends are provided, selected by the facade's configuration:
//!
//! - [`SafeBackend`] — the default. Parses and interprets a small,
//!   intentionally limited grammar (literals, identifiers, member/index
//!   access, arithmetic, comparison, equality, logical and/or). No function
//!   calls, no assignment, no loops, so it is safe to run on untrusted
//!   filter text.
//! - [`DisabledBackend`] — rejects every filter/script step outright.
//! - [`CustomBackend`] — delegates to host-supplied compile/run closures.
//! - [`NativeBackend`] — delegates to an injected host script VM; reports
//!   [`ExprError::NativeUnavailable`] until one is configured, since this
//!   crate does not bundle a JS engine.

pub mod ast;
pub mod backend;
pub mod bindings;
pub mod error;
pub mod interp;
pub mod parser;

pub use ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
pub use backend::{Backend, CustomBackend, DisabledBackend, NativeBackend, Program, SafeBackend, SharedBackend};
pub use bindings::Bindings;
pub use error::ExprError;
pub use interp::is_truthy;
pub use parser::{ParseError, Parser};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_runs_through_the_public_api() {
        let backend = SafeBackend::new();
        let bindings = Bindings::new().with("_$_v", serde_json::json!({"category": "fiction"}));
        let result = backend.eval("_$_v.category == 'fiction'", &bindings).unwrap();
        assert_eq!(result, serde_json::Value::Bool(true));
    }
}
