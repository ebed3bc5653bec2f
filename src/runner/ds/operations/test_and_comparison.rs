use std::cmp::Ordering;

use crate::runner::ds::value::{NumberType, Value};

/// Whether two values can be compared without calling any method on them.
pub fn is_directly_comparable(a: &Value, b: &Value) -> bool {
    matches!(
        (a, b),
        (Value::Null, _)
            | (_, Value::Null)
            | (Value::Number(_), Value::Number(_))
            | (Value::String(_), Value::String(_))
            | (Value::Boolean(_), Value::Boolean(_))
    )
}

/// Ordering of directly comparable values. `null` sorts before everything.
pub fn compare_direct(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        (Value::Null, _) => Some(Ordering::Less),
        (_, Value::Null) => Some(Ordering::Greater),
        (Value::Number(x), Value::Number(y)) => compare_numbers(x, y),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Boolean(x), Value::Boolean(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

pub fn compare_numbers(a: &NumberType, b: &NumberType) -> Option<Ordering> {
    match (a, b) {
        (NumberType::Integer(x), NumberType::Integer(y)) => Some(x.cmp(y)),
        _ => a.as_f64().partial_cmp(&b.as_f64()),
    }
}

pub fn ordering_to_value(o: Ordering) -> Value {
    Value::from(match o {
        Ordering::Less => -1,
        Ordering::Equal => 0,
        Ordering::Greater => 1,
    })
}

/// Interpret the result of a `compareTo` call.
pub fn ordering_from_value(v: &Value) -> Option<Ordering> {
    match v {
        Value::Number(n) => n.as_f64().partial_cmp(&0.0),
        _ => None,
    }
}
