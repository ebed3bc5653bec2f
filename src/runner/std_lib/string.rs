//! String built-ins.

use std::convert::TryFrom;

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::test_and_comparison::ordering_to_value;
use crate::runner::ds::operations::type_conversion::{get_type, to_integer, TYPE_STR_STRING};
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;

use super::check_arity;
use super::registry::{BuiltinRegistry, BuiltinType};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register_type(
        BuiltinType::new(TYPE_STR_STRING)
            .add_method("plus", string_plus)
            .add_method("multiply", string_multiply)
            .add_method("minus", string_minus)
            .add_method("compareTo", string_compare_to)
            .add_method("length", string_length)
            .add_method("size", string_length)
            .add_method("isEmpty", string_is_empty)
            .add_method("toUpperCase", string_to_upper_case)
            .add_method("toLowerCase", string_to_lower_case)
            .add_method("trim", string_trim)
            .add_method("contains", string_contains)
            .add_method("startsWith", string_starts_with)
            .add_method("endsWith", string_ends_with)
            .add_method("reverse", string_reverse)
            .add_method("split", string_split)
            .add_method("replace", string_replace),
    );
}

fn this_str(this: &Value) -> SandboxResult<&str> {
    this.as_str().ok_or_else(|| {
        SandboxError::TypeError(format!("{} is not a string", get_type(this)))
    })
}

fn string_arg<'a>(method: &str, args: &'a [Value], index: usize) -> SandboxResult<&'a str> {
    match args.get(index) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(other) => Err(SandboxError::TypeError(format!(
            "String.{}() expects a String but got {}",
            method,
            get_type(other)
        ))),
        None => Err(SandboxError::TypeError(format!(
            "String.{}() is missing argument {}",
            method,
            index + 1
        ))),
    }
}

/// Anything added to a string is appended in its display form.
fn string_plus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("plus", &args, 1)?;
    Ok(Value::String(format!("{}{}", this_str(this)?, args[0])))
}

fn string_multiply(
    ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("multiply", &args, 1)?;
    let n = to_integer(&args[0])?;
    if n < 0 {
        return Err(SandboxError::RangeError(format!(
            "Cannot repeat a string {} times",
            n
        )));
    }
    let s = this_str(this)?;
    let limit = ctx.config().max_collection_size;
    match usize::try_from(n).ok().and_then(|n| s.len().checked_mul(n)) {
        Some(total) if total <= limit => Ok(Value::String(s.repeat(n as usize))),
        _ => Err(SandboxError::RangeError(format!(
            "Repeating a string of length {} {} times exceeds the limit of {}",
            s.len(),
            n,
            limit
        ))),
    }
}

/// Removes the first occurrence.
fn string_minus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    check_arity("minus", &args, 1)?;
    let s = this_str(this)?;
    let needle = args[0].to_string();
    Ok(Value::String(s.replacen(&needle, "", 1)))
}

fn string_compare_to(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("compareTo", &args, 1)?;
    let a = this_str(this)?;
    let b = string_arg("compareTo", &args, 0)?;
    Ok(ordering_to_value(a.cmp(b)))
}

fn string_length(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::from(this_str(this)?.chars().count() as i64))
}

fn string_is_empty(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    Ok(Value::Boolean(this_str(this)?.is_empty()))
}

fn string_to_upper_case(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    Ok(Value::String(this_str(this)?.to_uppercase()))
}

fn string_to_lower_case(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    Ok(Value::String(this_str(this)?.to_lowercase()))
}

fn string_trim(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    Ok(Value::from(this_str(this)?.trim()))
}

fn string_contains(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let needle = string_arg("contains", &args, 0)?;
    Ok(Value::Boolean(this_str(this)?.contains(needle)))
}

fn string_starts_with(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let prefix = string_arg("startsWith", &args, 0)?;
    Ok(Value::Boolean(this_str(this)?.starts_with(prefix)))
}

fn string_ends_with(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let suffix = string_arg("endsWith", &args, 0)?;
    Ok(Value::Boolean(this_str(this)?.ends_with(suffix)))
}

fn string_reverse(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    Ok(Value::String(this_str(this)?.chars().rev().collect()))
}

fn string_split(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let s = this_str(this)?;
    let parts: Vec<Value> = if args.is_empty() {
        s.split_whitespace().map(Value::from).collect()
    } else {
        let sep = string_arg("split", &args, 0)?;
        s.split(sep).map(Value::from).collect()
    };
    Ok(Value::list(parts))
}

fn string_replace(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    check_arity("replace", &args, 2)?;
    let from = string_arg("replace", &args, 0)?;
    let to = string_arg("replace", &args, 1)?;
    Ok(Value::String(this_str(this)?.replace(from, to)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plus_appends_display_form() {
        let mut ctx = ExecutionContext::new();
        let r = string_plus(&mut ctx, &Value::from("n="), vec![Value::from(3)]).unwrap();
        assert_eq!(r, Value::from("n=3"));
    }

    #[test]
    fn test_split_and_multiply() {
        let mut ctx = ExecutionContext::new();
        let r = string_split(&mut ctx, &Value::from("a,b"), vec![Value::from(",")]).unwrap();
        assert_eq!(r, Value::list(vec![Value::from("a"), Value::from("b")]));
        let r = string_multiply(&mut ctx, &Value::from("ab"), vec![Value::from(2)]).unwrap();
        assert_eq!(r, Value::from("abab"));
    }
}
