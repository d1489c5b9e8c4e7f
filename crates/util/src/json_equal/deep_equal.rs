use serde_json::Value;

/// Performs a deep equality check between two JSON values.
///
/// This function compares values recursively, checking equality for:
/// - Primitives (null, bool, number, string)
/// - Arrays (element-by-element comparison)
/// - Objects (key-by-key comparison)
///
/// # Examples
///
/// ```
/// use serde_json::json;
/// use json_joy_util::json_equal::deep_equal;
///
/// let a = json!({"foo": [1, 2, 3]});
/// let b = json!({"foo": [1, 2, 3]});
/// let c = json!({"foo": [1, 2, 4]});
///
/// assert!(deep_equal(&a, &b));
/// assert!(!deep_equal(&a, &c));
/// ```
pub fn deep_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        (Value::Number(a), Value::Number(b)) => a == b,
        (Value::String(a), Value::String(b)) => a == b,

        // Arrays
        (Value::Array(arr_a), Value::Array(arr_b)) => {
            if arr_a.len() != arr_b.len() {
                return false;
            }
            for i in 0..arr_a.len() {
                if !deep_equal(&arr_a[i], &arr_b[i]) {
                    return false;
                }
            }
            true
        }

        // Objects
        (Value::Object(obj_a), Value::Object(obj_b)) => {
            if obj_a.len() != obj_b.len() {
                return false;
            }
            for (key, val_a) in obj_a {
                match obj_b.get(key) {
                    Some(val_b) => {
                        if !deep_equal(val_a, val_b) {
                            return false;
                        }
                    }
                    None => return false,
                }
            }
            true
        }

        // Different types are never equal
        _ => false,
    }
}
