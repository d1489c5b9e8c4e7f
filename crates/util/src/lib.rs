//! json-joy-util - shared helpers for the JSONPath engine crates.
//!
//! Trimmed from the upstream `json-joy` util package down to the one concern
//! the path engine actually needs: deep structural equality, used by
//! `json-expression`'s `==`/`!=` filter operators. The upstream package's
//! string-escaping helpers had no caller left once the canonical-path
//! quoting moved into `json-joy-json-path::normalizer` (a different escape
//! dialect — single-quoted bracket segments, not JSON-string double-quote
//! escaping), so they were dropped rather than kept as unused public API.

pub mod json_equal;

// Re-exports for convenience
pub use json_equal::deep_equal;
