use json_joy_json_pointer::{find, find_by_pointer, parse_json_pointer};
use serde_json::json;

#[test]
fn test_find_by_pointer_empty_component() {
    let doc = json!({"": "value", "foo": "bar"});

    // Pointer to empty key
    let result = find_by_pointer("/", &doc);
    assert!(result.is_ok(), "Should find empty key");

    // Pointer to nested empty key
    let result = find_by_pointer("/foo/", &doc);
    assert!(result.is_ok(), "Should handle trailing slash");
}

#[test]
fn test_find_by_pointer_tilde_escaping() {
    let doc = json!({"a~b": {"c/d": "value"}});

    let (_, key) = find_by_pointer("/a~0b/c~1d", &doc).unwrap();
    assert_eq!(key, "c/d");

    let result = find(&doc, &parse_json_pointer("/a~0b/c~1d"));
    assert_eq!(result.unwrap().val, Some(json!("value")));
}

#[test]
fn test_find_by_pointer_multiple_slashes() {
    let doc = json!({"foo": {"": "value"}});
    let result = find_by_pointer("/foo//", &doc);
    assert!(result.is_ok(), "Should handle multiple consecutive slashes");
}
