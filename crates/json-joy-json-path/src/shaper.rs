//! Result Shaper (C4): raw match records → the user-facing result shape
//! (spec.md §4.4).

use serde_json::Value;

use crate::normalizer::canonical_path_string;
use crate::types::{MatchKind, MatchRecord, PathComponent, Token};

/// Which field of a [`MatchRecord`] (or combination thereof) a query returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultType {
    #[default]
    Value,
    Path,
    Pointer,
    Parent,
    ParentProperty,
    All,
}

/// Everything a `callback`/`otherTypeCallback`/etc.-style hook needs to see
/// about one shaped match — mirrors the `all` result shape.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapedMatch {
    pub value: Value,
    pub path: String,
    pub pointer: String,
    pub parent: Value,
    pub parent_property: Value,
    pub kind: MatchKind,
}

fn path_tokens(path: &[PathComponent]) -> Vec<Token> {
    let mut tokens = vec![Token::Root];
    tokens.extend(path.iter().map(|c| match c {
        PathComponent::Key(k) => Token::Property(k.clone()),
        PathComponent::Index(i) => Token::Property(i.to_string()),
    }));
    tokens
}

fn pointer_string(path: &[PathComponent]) -> String {
    let segments: Vec<String> = path.iter().map(|c| c.as_pointer_segment()).collect();
    json_joy_json_pointer::format_json_pointer(&segments)
}

fn shape(record: &MatchRecord) -> ShapedMatch {
    ShapedMatch {
        value: record.value.clone(),
        path: canonical_path_string(&path_tokens(&record.path)),
        pointer: pointer_string(&record.path),
        parent: record.parent.clone().unwrap_or(Value::Null),
        parent_property: record.parent_property.as_ref().map(|p| p.as_value()).unwrap_or(Value::Null),
        kind: record.kind,
    }
}

fn select(shaped: &ShapedMatch, result_type: ResultType) -> Value {
    match result_type {
        ResultType::Value => shaped.value.clone(),
        ResultType::Path => Value::String(shaped.path.clone()),
        ResultType::Pointer => Value::String(shaped.pointer.clone()),
        ResultType::Parent => shaped.parent.clone(),
        ResultType::ParentProperty => shaped.parent_property.clone(),
        ResultType::All => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), shaped.value.clone());
            map.insert("path".to_string(), Value::String(shaped.path.clone()));
            map.insert("pointer".to_string(), Value::String(shaped.pointer.clone()));
            map.insert("parent".to_string(), shaped.parent.clone());
            map.insert("parentProperty".to_string(), shaped.parent_property.clone());
            Value::Object(map)
        }
    }
}

/// `wrap = false` output for an empty match list: the nullary "not found"
/// sentinel (spec.md §4.4). `serde_json::Value` already has a unit-like
/// variant for this, `Value::Null` — a second "not found" constant would be
/// indistinguishable from a legitimate `null` document value, so this engine
/// uses `Null` for both, matching `serde_json`'s own collapsed
/// nothing-vs-null representation.
pub const NOT_FOUND: Value = Value::Null;

/// Shapes the raw match list into the final result, applying wrap/flatten,
/// and invoking `callback` once per match in traversal order.
pub fn shape_results(
    records: &[MatchRecord],
    result_type: ResultType,
    wrap: bool,
    flatten: bool,
    mut callback: Option<&mut dyn FnMut(&Value, &str, &ShapedMatch)>,
) -> Value {
    let shaped: Vec<ShapedMatch> = records.iter().map(shape).collect();
    let values: Vec<Value> = shaped.iter().map(|s| select(s, result_type)).collect();

    for (value, s) in values.iter().zip(shaped.iter()) {
        if let Some(cb) = callback.as_deref_mut() {
            let kind = match s.kind {
                MatchKind::Value => "value",
                MatchKind::Property => "property",
            };
            cb(value, kind, s);
        }
    }

    if !wrap {
        if values.is_empty() {
            return NOT_FOUND;
        }
        if values.len() == 1 && !records[0].has_arr_expr {
            return values.into_iter().next().unwrap();
        }
    }

    if flatten {
        let mut flattened = Vec::with_capacity(values.len());
        for v in values {
            match v {
                Value::Array(inner) => flattened.extend(inner),
                other => flattened.push(other),
            }
        }
        return Value::Array(flattened);
    }

    Value::Array(values)
}
