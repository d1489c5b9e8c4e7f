//! Tree-walking evaluator for the safe expression grammar.

use serde_json::Value;

use crate::ast::{BinaryOp, Expr, LogicalOp, UnaryOp};
use crate::bindings::Bindings;
use crate::error::ExprError;

pub fn eval(expr: &Expr, bindings: &Bindings) -> Result<Value, ExprError> {
    match expr {
        Expr::Literal(v) => Ok(v.clone()),
        Expr::Ident(name) => bindings
            .get(name)
            .cloned()
            .ok_or_else(|| ExprError::UnknownIdentifier(name.clone())),
        Expr::Member(base, name) => {
            let base = eval(base, bindings)?;
            Ok(base.get(name).cloned().unwrap_or(Value::Null))
        }
        Expr::Index(base, index) => {
            let base = eval(base, bindings)?;
            let index = eval(index, bindings)?;
            Ok(index_value(&base, &index))
        }
        Expr::Unary(op, operand) => eval_unary(*op, eval(operand, bindings)?),
        Expr::Binary(op, left, right) => {
            eval_binary(*op, eval(left, bindings)?, eval(right, bindings)?)
        }
        Expr::Logical(op, left, right) => eval_logical(*op, left, right, bindings),
    }
}

fn index_value(base: &Value, index: &Value) -> Value {
    match (base, index) {
        (Value::Array(arr), Value::Number(n)) => {
            let i = n.as_f64().unwrap_or(0.0);
            if i < 0.0 {
                return Value::Null;
            }
            arr.get(i as usize).cloned().unwrap_or(Value::Null)
        }
        (Value::Object(obj), Value::String(key)) => obj.get(key).cloned().unwrap_or(Value::Null),
        (Value::Object(obj), Value::Number(n)) => {
            obj.get(&n.to_string()).cloned().unwrap_or(Value::Null)
        }
        _ => Value::Null,
    }
}

fn eval_unary(op: UnaryOp, operand: Value) -> Result<Value, ExprError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!is_truthy(&operand))),
        UnaryOp::Neg => as_number(&operand)
            .map(|n| Value::from(-n))
            .ok_or_else(|| ExprError::Run {
                source: "-".to_string(),
                message: "operand is not a number".to_string(),
            }),
    }
}

fn eval_logical(op: LogicalOp, left: &Expr, right: &Expr, bindings: &Bindings) -> Result<Value, ExprError> {
    let left = eval(left, bindings)?;
    match op {
        LogicalOp::And => {
            if !is_truthy(&left) {
                Ok(left)
            } else {
                eval(right, bindings)
            }
        }
        LogicalOp::Or => {
            if is_truthy(&left) {
                Ok(left)
            } else {
                eval(right, bindings)
            }
        }
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, ExprError> {
    match op {
        BinaryOp::Add => {
            if let (Value::String(a), Value::String(b)) = (&left, &right) {
                return Ok(Value::String(format!("{a}{b}")));
            }
            numeric_op(op, &left, &right)
        }
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => numeric_op(op, &left, &right),
        BinaryOp::Eq => Ok(Value::Bool(json_joy_util::deep_equal(&left, &right))),
        BinaryOp::Ne => Ok(Value::Bool(!json_joy_util::deep_equal(&left, &right))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => compare(op, &left, &right),
    }
}

fn numeric_op(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    let (a, b) = (
        as_number(left).ok_or_else(|| ExprError::Run {
            source: op_symbol(op).to_string(),
            message: "left operand is not a number".to_string(),
        })?,
        as_number(right).ok_or_else(|| ExprError::Run {
            source: op_symbol(op).to_string(),
            message: "right operand is not a number".to_string(),
        })?,
    );
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a / b
        }
        BinaryOp::Rem => {
            if b == 0.0 {
                return Err(ExprError::DivisionByZero);
            }
            a % b
        }
        _ => unreachable!("numeric_op called with non-numeric operator"),
    };
    Ok(Value::from(result))
}

fn compare(op: BinaryOp, left: &Value, right: &Value) -> Result<Value, ExprError> {
    if let (Value::String(a), Value::String(b)) = (left, right) {
        let ordering = a.cmp(b);
        return Ok(Value::Bool(ordering_matches(op, ordering)));
    }
    let (a, b) = (
        as_number(left).ok_or_else(|| ExprError::Run {
            source: op_symbol(op).to_string(),
            message: "left operand is not comparable".to_string(),
        })?,
        as_number(right).ok_or_else(|| ExprError::Run {
            source: op_symbol(op).to_string(),
            message: "right operand is not comparable".to_string(),
        })?,
    );
    let ordering = a.partial_cmp(&b).ok_or_else(|| ExprError::Run {
        source: op_symbol(op).to_string(),
        message: "NaN is not comparable".to_string(),
    })?;
    Ok(Value::Bool(ordering_matches(op, ordering)))
}

fn ordering_matches(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    use std::cmp::Ordering::*;
    match op {
        BinaryOp::Lt => ordering == Less,
        BinaryOp::Le => ordering != Greater,
        BinaryOp::Gt => ordering == Greater,
        BinaryOp::Ge => ordering != Less,
        _ => unreachable!("ordering_matches called with non-comparison operator"),
    }
}

fn op_symbol(op: BinaryOp) -> &'static str {
    match op {
        BinaryOp::Add => "+",
        BinaryOp::Sub => "-",
        BinaryOp::Mul => "*",
        BinaryOp::Div => "/",
        BinaryOp::Rem => "%",
        BinaryOp::Eq => "==",
        BinaryOp::Ne => "!=",
        BinaryOp::Lt => "<",
        BinaryOp::Le => "<=",
        BinaryOp::Gt => ">",
        BinaryOp::Ge => ">=",
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// JS-like truthiness: `false`, `null`, `0`, `""`, and missing values are
/// falsy; everything else (including empty arrays/objects) is truthy.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn run(src: &str, bindings: Bindings) -> Value {
        let expr = Parser::parse(src).unwrap();
        eval(&expr, &bindings).unwrap()
    }

    #[test]
    fn arithmetic() {
        assert_eq!(run("1 + 2 * 3", Bindings::new()), Value::from(7.0));
    }

    #[test]
    fn comparison_and_logic() {
        let bindings = Bindings::new().with("v", serde_json::json!({"price": 12}));
        assert_eq!(run("v.price > 10 && v.price < 20", bindings), Value::Bool(true));
    }

    #[test]
    fn equality_uses_deep_equal() {
        let bindings = Bindings::new().with("v", serde_json::json!({"a": 1, "b": 2}));
        assert_eq!(run("v == v", bindings), Value::Bool(true));
    }

    #[test]
    fn division_by_zero_errors() {
        let expr = Parser::parse("1 / 0").unwrap();
        assert_eq!(eval(&expr, &Bindings::new()), Err(ExprError::DivisionByZero));
    }

    #[test]
    fn truthiness_matches_js_semantics() {
        assert!(!is_truthy(&Value::from(0.0)));
        assert!(!is_truthy(&Value::String(String::new())));
        assert!(is_truthy(&serde_json::json!([])));
    }
}
