//! Methods every value answers to, plus the class, function and boolean built-ins.

use std::cmp::Ordering;

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::test_and_comparison::{compare_direct, ordering_to_value};
use crate::runner::ds::operations::type_conversion::{
    convert, get_type, to_boolean, CastTarget, TYPE_STR_BOOLEAN, TYPE_STR_CLASS,
    TYPE_STR_FUNCTION,
};
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;

use super::check_arity;
use super::registry::{BuiltinRegistry, BuiltinType};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register_type(
        BuiltinType::new("Object")
            .add_method("equals", object_equals)
            .add_method("compareTo", object_compare_to)
            .add_method("toString", object_to_string)
            .add_method("asType", object_as_type)
            .add_method("getClass", object_get_class),
    );
    registry.register_type(
        BuiltinType::new(TYPE_STR_BOOLEAN)
            .add_method("and", boolean_and)
            .add_method("or", boolean_or)
            .add_method("xor", boolean_xor),
    );
    registry.register_type(
        BuiltinType::new(TYPE_STR_CLASS)
            .add_method("getName", class_get_name)
            .add_method("getSimpleName", class_get_name)
            .add_method("getSuperclass", class_get_superclass),
    );
    registry.register_type(
        BuiltinType::new(TYPE_STR_FUNCTION)
            .add_method("call", function_call)
            .add_method("getName", function_get_name),
    );
}

fn object_equals(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("equals", &args, 1)?;
    Ok(Value::Boolean(*this == args[0]))
}

fn object_compare_to(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("compareTo", &args, 1)?;
    match compare_direct(this, &args[0]) {
        Some(o) => Ok(ordering_to_value(o)),
        None if *this == args[0] => Ok(ordering_to_value(Ordering::Equal)),
        None => Err(SandboxError::TypeError(format!(
            "Cannot compare {} with {}",
            get_type(this),
            get_type(&args[0])
        ))),
    }
}

fn object_to_string(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    Ok(Value::String(this.to_string()))
}

fn object_as_type(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("asType", &args, 1)?;
    let target = CastTarget::from_value(&args[0])?;
    convert(this, &target)
}

fn object_get_class(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this {
        Value::Object(o) => Ok(Value::Class(o.borrow().class.clone())),
        _ => Err(SandboxError::TypeError(format!(
            "getClass() is not available on {}",
            get_type(this)
        ))),
    }
}

fn boolean_binary(
    method: &str,
    this: &Value,
    args: &[Value],
    op: fn(bool, bool) -> bool,
) -> SandboxResult<Value> {
    check_arity(method, args, 1)?;
    Ok(Value::Boolean(op(to_boolean(this), to_boolean(&args[0]))))
}

fn boolean_and(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    boolean_binary("and", this, &args, |a, b| a && b)
}

fn boolean_or(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    boolean_binary("or", this, &args, |a, b| a || b)
}

fn boolean_xor(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    boolean_binary("xor", this, &args, |a, b| a ^ b)
}

fn class_get_name(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this {
        Value::Class(c) => Ok(Value::String(c.name.clone())),
        _ => Err(SandboxError::TypeError("getName() needs a class".to_string())),
    }
}

fn class_get_superclass(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this {
        Value::Class(c) => Ok(c
            .superclass
            .as_ref()
            .map_or(Value::Null, |s| Value::Class(s.clone()))),
        _ => Err(SandboxError::TypeError(
            "getSuperclass() needs a class".to_string(),
        )),
    }
}

fn function_call(ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    match this {
        Value::Function(f) => f.call(ctx, args),
        _ => Err(SandboxError::TypeError(format!(
            "{} is not callable",
            get_type(this)
        ))),
    }
}

fn function_get_name(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this {
        Value::Function(f) => Ok(Value::String(f.name.clone())),
        _ => Err(SandboxError::TypeError("getName() needs a function".to_string())),
    }
}
