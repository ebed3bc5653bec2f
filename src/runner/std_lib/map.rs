//! Map built-ins.

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::type_conversion::{get_type, TYPE_STR_MAP};
use crate::runner::ds::value::{MapRef, Value};
use crate::runner::sandbox::context::ExecutionContext;

use super::check_arity;
use super::registry::{BuiltinRegistry, BuiltinType};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register_type(
        BuiltinType::new(TYPE_STR_MAP)
            .add_method("size", map_size)
            .add_method("isEmpty", map_is_empty)
            .add_method("get", map_get)
            .add_method("put", map_put)
            .add_method("containsKey", map_contains_key)
            .add_method("keySet", map_key_set)
            .add_method("values", map_values),
    );
}

fn this_map(this: &Value) -> SandboxResult<&MapRef> {
    match this {
        Value::Map(m) => Ok(m),
        _ => Err(SandboxError::TypeError(format!(
            "{} is not a map",
            get_type(this)
        ))),
    }
}

/// Map keys are strings; other keys are used in their display form.
fn key(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn map_size(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::from(this_map(this)?.borrow().len() as i64))
}

fn map_is_empty(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::Boolean(this_map(this)?.borrow().is_empty()))
}

fn map_get(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("get", &args, 1)?;
    Ok(this_map(this)?
        .borrow()
        .get(&key(&args[0]))
        .cloned()
        .unwrap_or(Value::Null))
}

/// Returns the previous value, or null.
fn map_put(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("put", &args, 2)?;
    let old = this_map(this)?
        .borrow_mut()
        .insert(key(&args[0]), args[1].clone());
    Ok(old.unwrap_or(Value::Null))
}

fn map_contains_key(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("containsKey", &args, 1)?;
    Ok(Value::Boolean(this_map(this)?.borrow().contains_key(&key(&args[0]))))
}

fn map_key_set(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    let keys = this_map(this)?
        .borrow()
        .keys()
        .map(|k| Value::from(k.as_str()))
        .collect();
    Ok(Value::list(keys))
}

fn map_values(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    let values = this_map(this)?
        .borrow()
        .iter()
        .map(|(_, v)| v.clone())
        .collect();
    Ok(Value::list(values))
}
