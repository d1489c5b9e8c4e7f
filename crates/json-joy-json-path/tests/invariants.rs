//! The six testable properties against a handful of small fixture documents.

use json_joy_json_path::{
    canonical_path_string, tokenize, JsonPath, JsonPathOptions, NormalizerCache, ResultType,
};
use serde_json::{json, Value};

fn all_records(expr: &str, doc: &Value) -> Vec<Value> {
    let mut opts = JsonPathOptions::default();
    opts.result_type = ResultType::All;
    let result = JsonPath::new().query(expr, doc, opts).unwrap();
    result.as_array().unwrap().clone()
}

fn follow_pointer<'a>(doc: &'a Value, pointer: &str) -> Option<&'a Value> {
    if pointer.is_empty() {
        return Some(doc);
    }
    doc.pointer(pointer)
}

fn fixtures() -> Vec<(Value, &'static str)> {
    vec![
        (json!({"a": {"b": {"c": 7}}}), "$.a.b.c"),
        (json!({"a": [1, 2, 3, 4, 5]}), "$.a[1:4]"),
        (json!({"x": [{"n": 1}, {"n": 2}, {"n": 3}]}), "$.x[?(@.n>1)].n"),
        (json!({"a": {"b": 1, "c": 2}, "d": {"b": 3}}), "$..b"),
        (json!({"a": 1, "b": 2, "c": 3}), "$['a','c']"),
    ]
}

/// 1. Following `r.path` (here, its RFC 6901 pointer form) from the root of
/// the document yields exactly `r.value`.
#[test]
fn path_resolves_back_to_value() {
    for (doc, expr) in fixtures() {
        for record in all_records(expr, &doc) {
            let pointer = record["pointer"].as_str().unwrap();
            let resolved = follow_pointer(&doc, pointer).cloned();
            assert_eq!(resolved, Some(record["value"].clone()), "expr {expr} pointer {pointer}");
        }
    }
}

/// 2. `r.parent` and `r.parentProperty` are mutually consistent with
/// `r.path`: `parent[parentProperty] == value` for every non-root match.
#[test]
fn parent_and_parent_property_are_consistent() {
    for (doc, expr) in fixtures() {
        for record in all_records(expr, &doc) {
            let parent = &record["parent"];
            let parent_property = &record["parentProperty"];
            if parent.is_null() && parent_property.is_null() {
                continue;
            }
            let resolved = match parent_property {
                Value::String(key) => parent.get(key),
                Value::Number(n) => parent.get(n.as_u64().unwrap() as usize),
                _ => None,
            };
            assert_eq!(resolved, Some(&record["value"]), "expr {expr}");
        }
    }
}

/// 3. Two consecutive calls with the same expression produce identical
/// token lists (cache determinism).
#[test]
fn cache_is_deterministic() {
    let cache = NormalizerCache::new();
    for (_, expr) in fixtures() {
        let first = cache.tokenize(expr);
        let second = cache.tokenize(expr);
        assert_eq!(first, second, "expr {expr}");
    }
}

/// 4. The canonical path string of a match's path round-trips through the
/// normalizer to the same token list a fresh tokenize of that string would
/// produce.
#[test]
fn canonical_path_round_trips_through_normalizer() {
    for (doc, expr) in fixtures() {
        for record in all_records(expr, &doc) {
            let path = record["path"].as_str().unwrap();
            let retokenized = tokenize(path);
            assert_eq!(canonical_path_string(&retokenized), path, "expr {expr} path {path}");
        }
    }
}

/// 5. `resultType = "pointer"` outputs conform to RFC 6901 (escape `~` and
/// `/`).
#[test]
fn pointer_result_type_escapes_tilde_and_slash() {
    let doc = json!({"a/b": {"c~d": 42}});
    let mut opts = JsonPathOptions::default();
    opts.result_type = ResultType::Pointer;
    let result = JsonPath::new().query("$['a/b']['c~d']", &doc, opts).unwrap();
    assert_eq!(result, json!(["/a~1b/c~0d"]));
}

/// 6. With `wrap = false` and a single non-multi-match result, the value is
/// unwrapped; with any multi-match step in the path, the result stays a
/// sequence even at length 1.
#[test]
fn wrap_false_unwraps_only_non_multi_match_results() {
    let doc = json!({"a": {"b": 7}});
    let scalar = JsonPath::new().query_scalar("$.a.b", &doc, JsonPathOptions::default()).unwrap();
    assert_eq!(scalar, json!(7));

    let doc = json!({"a": [7]});
    let via_wildcard = JsonPath::new().query_scalar("$.a[*]", &doc, JsonPathOptions::default()).unwrap();
    assert_eq!(via_wildcard, json!([7]));
}
