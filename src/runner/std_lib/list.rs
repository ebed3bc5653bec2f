//! List built-ins. Block-taking methods call the block with the context
//! they were given, so whatever the block does stays checked.

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::type_conversion::{
    get_type, to_boolean, to_integer, TYPE_STR_LIST,
};
use crate::runner::ds::function_object::FunctionRef;
use crate::runner::ds::value::{ListRef, Value};
use crate::runner::sandbox::context::ExecutionContext;

use super::check_arity;
use super::registry::{BuiltinRegistry, BuiltinType};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register_type(
        BuiltinType::new(TYPE_STR_LIST)
            .add_method("size", list_size)
            .add_method("isEmpty", list_is_empty)
            .add_method("get", list_get)
            .add_method("add", list_add)
            .add_method("leftShift", list_left_shift)
            .add_method("plus", list_plus)
            .add_method("minus", list_minus)
            .add_method("contains", list_contains)
            .add_method("join", list_join)
            .add_method("getFirst", list_first)
            .add_method("getLast", list_last)
            .add_method("each", list_each)
            .add_method("collect", list_collect)
            .add_method("findAll", list_find_all),
    );
}

fn this_list(this: &Value) -> SandboxResult<&ListRef> {
    match this {
        Value::List(l) => Ok(l),
        _ => Err(SandboxError::TypeError(format!(
            "{} is not a list",
            get_type(this)
        ))),
    }
}

fn block_arg(method: &str, args: &[Value]) -> SandboxResult<FunctionRef> {
    check_arity(method, args, 1)?;
    match &args[0] {
        Value::Function(f) => Ok(f.clone()),
        other => Err(SandboxError::TypeError(format!(
            "List.{}() expects a Function but got {}",
            method,
            get_type(other)
        ))),
    }
}

/// Snapshot of the elements; blocks may mutate the list while it is walked.
fn elements(this: &Value) -> SandboxResult<Vec<Value>> {
    Ok(this_list(this)?.borrow().clone())
}

fn list_size(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::from(this_list(this)?.borrow().len() as i64))
}

fn list_is_empty(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::Boolean(this_list(this)?.borrow().is_empty()))
}

fn list_get(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("get", &args, 1)?;
    let i = to_integer(&args[0])?;
    let l = this_list(this)?.borrow();
    if i < 0 || i as usize >= l.len() {
        return Err(SandboxError::RangeError(format!(
            "Index {} out of bounds for length {}",
            i,
            l.len()
        )));
    }
    Ok(l[i as usize].clone())
}

fn list_add(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("add", &args, 1)?;
    this_list(this)?.borrow_mut().extend(args);
    Ok(Value::Boolean(true))
}

/// `list << v` appends in place and yields the list itself.
fn list_left_shift(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("leftShift", &args, 1)?;
    this_list(this)?.borrow_mut().extend(args);
    Ok(this.clone())
}

fn list_plus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("plus", &args, 1)?;
    let mut items = elements(this)?;
    match &args[0] {
        Value::List(other) => items.extend(other.borrow().iter().cloned()),
        v => items.push(v.clone()),
    }
    Ok(Value::list(items))
}

fn list_minus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("minus", &args, 1)?;
    let removed: Vec<Value> = match &args[0] {
        Value::List(other) => other.borrow().clone(),
        v => vec![v.clone()],
    };
    let items = elements(this)?
        .into_iter()
        .filter(|v| !removed.contains(v))
        .collect();
    Ok(Value::list(items))
}

fn list_contains(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("contains", &args, 1)?;
    Ok(Value::Boolean(this_list(this)?.borrow().contains(&args[0])))
}

fn list_join(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let sep = match args.first() {
        Some(v) => v.to_string(),
        None => String::new(),
    };
    let parts: Vec<String> = this_list(this)?.borrow().iter().map(|v| v.to_string()).collect();
    Ok(Value::String(parts.join(&sep)))
}

fn list_first(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    this_list(this)?
        .borrow()
        .first()
        .cloned()
        .ok_or_else(|| SandboxError::RangeError("Cannot access first() of an empty list".to_string()))
}

fn list_last(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    this_list(this)?
        .borrow()
        .last()
        .cloned()
        .ok_or_else(|| SandboxError::RangeError("Cannot access last() of an empty list".to_string()))
}

fn list_each(ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let block = block_arg("each", &args)?;
    for item in elements(this)? {
        block.call(ctx, vec![item])?;
    }
    Ok(this.clone())
}

fn list_collect(ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let block = block_arg("collect", &args)?;
    let mut out = Vec::new();
    for item in elements(this)? {
        out.push(block.call(ctx, vec![item])?);
    }
    Ok(Value::list(out))
}

fn list_find_all(ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let block = block_arg("findAll", &args)?;
    let mut out = Vec::new();
    for item in elements(this)? {
        if to_boolean(&block.call(ctx, vec![item.clone()])?) {
            out.push(item);
        }
    }
    Ok(Value::list(out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::function_object::FunctionObject;

    #[test]
    fn test_left_shift_appends_in_place() {
        let mut ctx = ExecutionContext::new();
        let l = Value::list(vec![]);
        let r = list_left_shift(&mut ctx, &l, vec![Value::from(1)]).unwrap();
        assert!(r.same(&l));
        assert_eq!(l, Value::list(vec![Value::from(1)]));
    }

    #[test]
    fn test_collect_calls_block_per_element() {
        let mut ctx = ExecutionContext::new();
        let double = FunctionObject::new("double", |_, args| match &args[0] {
            Value::Number(n) => Ok(Value::from(n.as_f64() * 2.0)),
            _ => Ok(Value::Null),
        });
        let l = Value::list(vec![Value::from(1), Value::from(2)]);
        let r = list_collect(&mut ctx, &l, vec![Value::Function(double)]).unwrap();
        assert_eq!(r, Value::list(vec![Value::from(2), Value::from(4)]));
    }
}
