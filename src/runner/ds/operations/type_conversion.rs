use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::value::{NumberType, Value};

pub const TYPE_STR_NULL: &str = "null";
pub const TYPE_STR_BOOLEAN: &str = "Boolean";
pub const TYPE_STR_INTEGER: &str = "Integer";
pub const TYPE_STR_FLOAT: &str = "Float";
pub const TYPE_STR_NUMBER: &str = "Number";
pub const TYPE_STR_STRING: &str = "String";
pub const TYPE_STR_LIST: &str = "List";
pub const TYPE_STR_MAP: &str = "Map";
pub const TYPE_STR_CLASS: &str = "Class";
pub const TYPE_STR_FUNCTION: &str = "Function";
pub const TYPE_STR_MARKER: &str = "ConstructorMarker";

/// Runtime type name; instances report their class name.
pub fn get_type(a: &Value) -> String {
    match a {
        Value::Null => TYPE_STR_NULL.to_string(),
        Value::Boolean(_) => TYPE_STR_BOOLEAN.to_string(),
        Value::Number(NumberType::Integer(_)) => TYPE_STR_INTEGER.to_string(),
        Value::Number(NumberType::Float(_)) => TYPE_STR_FLOAT.to_string(),
        Value::String(_) => TYPE_STR_STRING.to_string(),
        Value::List(_) => TYPE_STR_LIST.to_string(),
        Value::Map(_) => TYPE_STR_MAP.to_string(),
        Value::Object(o) => o.borrow().class.name.clone(),
        Value::Class(_) => TYPE_STR_CLASS.to_string(),
        Value::Function(_) => TYPE_STR_FUNCTION.to_string(),
        Value::Marker(_) => TYPE_STR_MARKER.to_string(),
    }
}

/// Key into the built-in method table; every number shares one key.
pub fn builtin_type_key(a: &Value) -> &'static str {
    match a {
        Value::Null => TYPE_STR_NULL,
        Value::Boolean(_) => TYPE_STR_BOOLEAN,
        Value::Number(_) => TYPE_STR_NUMBER,
        Value::String(_) => TYPE_STR_STRING,
        Value::List(_) => TYPE_STR_LIST,
        Value::Map(_) => TYPE_STR_MAP,
        Value::Object(_) => "Object",
        Value::Class(_) => TYPE_STR_CLASS,
        Value::Function(_) => TYPE_STR_FUNCTION,
        Value::Marker(_) => TYPE_STR_MARKER,
    }
}

/// Truthiness: null, false, zero, and empty strings/lists/maps are false.
pub fn to_boolean(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Boolean(b) => *b,
        Value::Number(n) => n.as_f64() != 0.0,
        Value::String(s) => !s.is_empty(),
        Value::List(l) => !l.borrow().is_empty(),
        Value::Map(m) => !m.borrow().is_empty(),
        _ => true,
    }
}

pub fn to_number(v: &Value) -> SandboxResult<NumberType> {
    match v {
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(NumberType::Integer(if *b { 1 } else { 0 })),
        Value::String(s) => {
            let t = s.trim();
            if let Ok(i) = t.parse::<i64>() {
                Ok(NumberType::Integer(i))
            } else if let Ok(f) = t.parse::<f64>() {
                Ok(NumberType::Float(f))
            } else {
                Err(SandboxError::TypeError(format!(
                    "Cannot cast String '{}' to Number",
                    s
                )))
            }
        }
        _ => Err(SandboxError::TypeError(format!(
            "Cannot cast {} to Number",
            get_type(v)
        ))),
    }
}

pub fn to_integer(v: &Value) -> SandboxResult<i64> {
    match to_number(v)? {
        NumberType::Integer(i) => Ok(i),
        NumberType::Float(f) => Ok(f as i64),
    }
}

/// The target of a cast.
#[derive(Clone)]
pub enum CastTarget {
    Boolean,
    Integer,
    Number,
    String,
    List,
    Map,
    Class(ClassRef),
}
impl CastTarget {
    pub fn name(&self) -> String {
        match self {
            CastTarget::Boolean => TYPE_STR_BOOLEAN.to_string(),
            CastTarget::Integer => TYPE_STR_INTEGER.to_string(),
            CastTarget::Number => TYPE_STR_NUMBER.to_string(),
            CastTarget::String => TYPE_STR_STRING.to_string(),
            CastTarget::List => TYPE_STR_LIST.to_string(),
            CastTarget::Map => TYPE_STR_MAP.to_string(),
            CastTarget::Class(c) => c.name.clone(),
        }
    }

    /// How the target travels as the argument of an `asType` call.
    pub fn to_value(&self) -> Value {
        match self {
            CastTarget::Class(c) => Value::Class(c.clone()),
            _ => Value::String(self.name()),
        }
    }

    pub fn from_value(v: &Value) -> SandboxResult<CastTarget> {
        match v {
            Value::Class(c) => Ok(CastTarget::Class(c.clone())),
            Value::String(s) => match s.as_str() {
                TYPE_STR_BOOLEAN => Ok(CastTarget::Boolean),
                TYPE_STR_INTEGER => Ok(CastTarget::Integer),
                TYPE_STR_NUMBER | TYPE_STR_FLOAT => Ok(CastTarget::Number),
                TYPE_STR_STRING => Ok(CastTarget::String),
                TYPE_STR_LIST => Ok(CastTarget::List),
                TYPE_STR_MAP => Ok(CastTarget::Map),
                other => Err(SandboxError::TypeError(format!(
                    "Unknown cast target '{}'",
                    other
                ))),
            },
            _ => Err(SandboxError::TypeError(format!(
                "{} is not a cast target",
                get_type(v)
            ))),
        }
    }

    /// Whether `v` already has this type, so casting it converts nothing.
    pub fn matches(&self, v: &Value) -> bool {
        match (self, v) {
            (CastTarget::Boolean, Value::Boolean(_)) => true,
            (CastTarget::Integer, Value::Number(NumberType::Integer(_))) => true,
            (CastTarget::Number, Value::Number(_)) => true,
            (CastTarget::String, Value::String(_)) => true,
            (CastTarget::List, Value::List(_)) => true,
            (CastTarget::Map, Value::Map(_)) => true,
            (CastTarget::Class(c), Value::Object(o)) => o.borrow().class.is_subclass_of(c),
            _ => false,
        }
    }
}

/// Conversion performed by the built-in `asType` of primitive values.
pub fn convert(v: &Value, target: &CastTarget) -> SandboxResult<Value> {
    if target.matches(v) {
        return Ok(v.clone());
    }
    match target {
        CastTarget::Boolean => Ok(Value::Boolean(to_boolean(v))),
        CastTarget::Integer => Ok(Value::from(to_integer(v)?)),
        CastTarget::Number => Ok(Value::Number(to_number(v)?)),
        CastTarget::String => Ok(Value::String(v.to_string())),
        CastTarget::List => match v {
            Value::String(s) => Ok(Value::list(
                s.chars().map(|c| Value::String(c.to_string())).collect(),
            )),
            Value::Map(m) => Ok(Value::list(
                m.borrow()
                    .iter()
                    .map(|(k, v)| Value::list(vec![Value::from(k.as_str()), v.clone()]))
                    .collect(),
            )),
            _ => Ok(Value::list(vec![v.clone()])),
        },
        _ => Err(SandboxError::TypeError(format!(
            "Cannot cast {} to {}",
            get_type(v),
            target.name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truthiness() {
        assert!(!to_boolean(&Value::Null));
        assert!(!to_boolean(&Value::from("")));
        assert!(!to_boolean(&Value::from(0)));
        assert!(to_boolean(&Value::list(vec![Value::Null])));
    }

    #[test]
    fn test_convert_string_to_number_and_list() {
        assert_eq!(
            convert(&Value::from("42"), &CastTarget::Integer).unwrap(),
            Value::from(42)
        );
        assert_eq!(
            convert(&Value::from("ab"), &CastTarget::List).unwrap(),
            Value::list(vec![Value::from("a"), Value::from("b")])
        );
        assert!(convert(&Value::from("x1"), &CastTarget::Number).is_err());
    }
}
