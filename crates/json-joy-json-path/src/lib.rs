//! JSONPath query engine.
//!
//! Given a path expression and a JSON document, returns the locations
//! and/or values that match. Supports descendant recursion (`..`),
//! wildcards (`*`), array slicing (`[a:b:c]`), union lists (`a,b,c`),
//! filter (`[?(...)]`) and script (`[(...)]`) sub-expressions, parent (`^`)
//! and property-name (`~`) selectors, and type predicates (`@t()`). This is
//! the JSONPath-Plus-flavored superset grammar, not strict RFC 9535.
//!
//! Five pieces, in dependency order:
//! - [`normalizer`] (C1) — expression text → a tagged [`types::Token`]
//!   sequence, memoized per [`facade::JsonPath`] instance.
//! - `json_expression` (C2, a sibling crate) — compiles and runs the
//!   `[?(...)]`/`[(...)]` fragments the tracer hands it.
//! - [`tracer`] (C3) — recursive descent over the document, producing
//!   [`types::MatchRecord`]s and resolving `^` sentinels.
//! - [`shaper`] (C4) — raw matches → the configured result shape
//!   (`value`/`path`/`pointer`/`parent`/`parentProperty`/`all`), wrap and
//!   flatten.
//! - [`facade`] (C5) — [`facade::JsonPathOptions`] defaults and the two
//!   query entry points.
//!
//! # Example
//!
//! ```
//! use json_joy_json_path::{JsonPath, JsonPathOptions};
//! use serde_json::json;
//!
//! let jp = JsonPath::new();
//! let doc = json!({
//!     "store": {
//!         "books": [
//!             {"author": "Nigel Rees", "price": 8},
//!             {"author": "Evelyn Waugh", "price": 12}
//!         ]
//!     }
//! });
//!
//! let authors = jp
//!     .query("$.store.books[?(@.price<10)].author", &doc, JsonPathOptions::default())
//!     .unwrap();
//! assert_eq!(authors, json!(["Nigel Rees"]));
//! ```

pub mod facade;
pub mod normalizer;
pub mod shaper;
pub mod tracer;
pub mod types;

pub use facade::{query, query_scalar, EvalBackend, JsonPath, JsonPathOptions, SharedJsonPath};
pub use normalizer::{canonical_path_string, tokenize, NormalizerCache};
pub use shaper::{shape_results, ResultType, ShapedMatch, NOT_FOUND};
pub use tracer::{trace, TraceOptions};
pub use types::{Error, MatchKind, MatchRecord, ParentSentinel, PathComponent, Token, TraceOutcome, TypeKind};
