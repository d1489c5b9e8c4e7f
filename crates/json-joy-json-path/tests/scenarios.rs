//! The scenario table, each `Doc`/`Expr` pair checked against its expected
//! `value`-mode result.

use json_joy_json_path::{JsonPath, JsonPathOptions};
use serde_json::{json, Value};

fn run(expr: &str, doc: &Value) -> Value {
    JsonPath::new().query(expr, doc, JsonPathOptions::default()).unwrap()
}

#[test]
fn scenario_1_direct_property_chain() {
    let doc = json!({"a": {"b": {"c": 7}}});
    assert_eq!(run("$.a.b.c", &doc), json!([7]));
}

#[test]
fn scenario_2_array_slice() {
    let doc = json!({"a": [1, 2, 3, 4, 5]});
    assert_eq!(run("$.a[1:4]", &doc), json!([2, 3, 4]));
}

#[test]
fn scenario_3_filter_then_property() {
    let doc = json!({"x": [{"n": 1}, {"n": 2}, {"n": 3}]});
    assert_eq!(run("$.x[?(@.n>1)].n", &doc), json!([2, 3]));
}

#[test]
fn scenario_4_descendant_search() {
    let doc = json!({"a": {"b": 1, "c": 2}, "d": {"b": 3}});
    assert_eq!(run("$..b", &doc), json!([1, 3]));
}

#[test]
fn scenario_5_parent_selector() {
    let doc = json!({"a": {"b": {"c": {"d": 9}}}});
    assert_eq!(run("$.a.b.c.d.^", &doc), json!([{"d": 9}]));
}

#[test]
fn scenario_6_property_name_selector() {
    let doc = json!({"k": "v"});
    assert_eq!(run("$.k~", &doc), json!(["k"]));
}

#[test]
fn scenario_7_union_list() {
    let doc = json!({"a": 1, "b": 2, "c": 3});
    assert_eq!(run("$['a','c']", &doc), json!([1, 3]));
}

#[test]
fn scenario_8_negative_index_via_slice() {
    let doc = json!([10, 20, 30]);
    assert_eq!(run("$[-1::1]", &doc), json!([30]));
}
