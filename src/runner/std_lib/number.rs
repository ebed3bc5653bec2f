//! Number built-ins: the arithmetic, bitwise and comparison methods
//! operators dispatch to, plus a few conversions.
//!
//! Integer arithmetic stays integral until it overflows, which is a range
//! error. Mixing an integer with a float yields a float.

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::test_and_comparison::{compare_numbers, ordering_to_value};
use crate::runner::ds::operations::type_conversion::{get_type, TYPE_STR_NUMBER};
use crate::runner::ds::value::{NumberType, Value};
use crate::runner::sandbox::context::ExecutionContext;

use super::check_arity;
use super::registry::{BuiltinRegistry, BuiltinType};

pub fn register(registry: &mut BuiltinRegistry) {
    registry.register_type(
        BuiltinType::new(TYPE_STR_NUMBER)
            .add_method("plus", number_plus)
            .add_method("minus", number_minus)
            .add_method("multiply", number_multiply)
            .add_method("div", number_div)
            .add_method("mod", number_mod)
            .add_method("power", number_power)
            .add_method("leftShift", number_left_shift)
            .add_method("rightShift", number_right_shift)
            .add_method("and", number_and)
            .add_method("or", number_or)
            .add_method("xor", number_xor)
            .add_method("compareTo", number_compare_to)
            .add_method("abs", number_abs)
            .add_method("negative", number_negative)
            .add_method("next", number_next)
            .add_method("previous", number_previous)
            .add_method("intValue", number_int_value),
    );
}

fn this_number(this: &Value) -> SandboxResult<NumberType> {
    match this {
        Value::Number(n) => Ok(*n),
        _ => Err(SandboxError::TypeError(format!(
            "{} is not a number",
            get_type(this)
        ))),
    }
}

fn single_number(method: &str, args: &[Value]) -> SandboxResult<NumberType> {
    check_arity(method, args, 1)?;
    match &args[0] {
        Value::Number(n) => Ok(*n),
        other => Err(SandboxError::TypeError(format!(
            "No signature of method: Number.{}() is applicable for argument types: ({})",
            method,
            get_type(other)
        ))),
    }
}

fn overflow(method: &str, a: i64, b: i64) -> SandboxError {
    SandboxError::RangeError(format!("Integer overflow in {}({}, {})", method, a, b))
}

/// Apply an arithmetic operator, integral when both sides are integers.
fn arithmetic(
    method: &str,
    a: NumberType,
    b: NumberType,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> f64,
) -> SandboxResult<Value> {
    match (a, b) {
        (NumberType::Integer(x), NumberType::Integer(y)) => int_op(x, y)
            .map(Value::from)
            .ok_or_else(|| overflow(method, x, y)),
        _ => Ok(Value::from(float_op(a.as_f64(), b.as_f64()))),
    }
}

fn number_plus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let a = this_number(this)?;
    // Adding a string concatenates.
    if let [Value::String(s)] = args.as_slice() {
        return Ok(Value::String(format!("{}{}", this, s)));
    }
    let b = single_number("plus", &args)?;
    arithmetic("plus", a, b, i64::checked_add, |x, y| x + y)
}

fn number_minus(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("minus", &args)?;
    arithmetic("minus", a, b, i64::checked_sub, |x, y| x - y)
}

fn number_multiply(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("multiply", &args)?;
    arithmetic("multiply", a, b, i64::checked_mul, |x, y| x * y)
}

/// Integer division stays integral only when it is exact.
fn number_div(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("div", &args)?;
    match (a, b) {
        (NumberType::Integer(_), NumberType::Integer(0)) => {
            Err(SandboxError::RangeError("Division by zero".to_string()))
        }
        (NumberType::Integer(x), NumberType::Integer(y)) if x.checked_rem(y) == Some(0) => {
            x.checked_div(y).map(Value::from).ok_or_else(|| overflow("div", x, y))
        }
        _ => Ok(Value::from(a.as_f64() / b.as_f64())),
    }
}

fn number_mod(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("mod", &args)?;
    match (a, b) {
        (NumberType::Integer(_), NumberType::Integer(0)) => {
            Err(SandboxError::RangeError("Division by zero".to_string()))
        }
        _ => arithmetic("mod", a, b, i64::checked_rem, |x, y| x % y),
    }
}

fn number_power(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("power", &args)?;
    match (a, b) {
        (NumberType::Integer(x), NumberType::Integer(y)) if y >= 0 && y <= u32::MAX as i64 => x
            .checked_pow(y as u32)
            .map(Value::from)
            .ok_or_else(|| overflow("power", x, y)),
        _ => Ok(Value::from(a.as_f64().powf(b.as_f64()))),
    }
}

fn integers(method: &str, this: &Value, args: &[Value]) -> SandboxResult<(i64, i64)> {
    match (this_number(this)?, single_number(method, args)?) {
        (NumberType::Integer(x), NumberType::Integer(y)) => Ok((x, y)),
        _ => Err(SandboxError::TypeError(format!(
            "{}() is only defined for integers",
            method
        ))),
    }
}

fn shift_amount(method: &str, y: i64) -> SandboxResult<u32> {
    if (0..64).contains(&y) {
        Ok(y as u32)
    } else {
        Err(SandboxError::RangeError(format!(
            "{}() shift amount {} out of range",
            method, y
        )))
    }
}

fn number_left_shift(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let (x, y) = integers("leftShift", this, &args)?;
    Ok(Value::from(x << shift_amount("leftShift", y)?))
}

fn number_right_shift(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let (x, y) = integers("rightShift", this, &args)?;
    Ok(Value::from(x >> shift_amount("rightShift", y)?))
}

fn number_and(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let (x, y) = integers("and", this, &args)?;
    Ok(Value::from(x & y))
}

fn number_or(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let (x, y) = integers("or", this, &args)?;
    Ok(Value::from(x | y))
}

fn number_xor(_ctx: &mut ExecutionContext, this: &Value, args: Vec<Value>) -> SandboxResult<Value> {
    let (x, y) = integers("xor", this, &args)?;
    Ok(Value::from(x ^ y))
}

fn number_compare_to(
    _ctx: &mut ExecutionContext,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let a = this_number(this)?;
    let b = single_number("compareTo", &args)?;
    compare_numbers(&a, &b)
        .map(ordering_to_value)
        .ok_or_else(|| SandboxError::TypeError("NaN is not comparable".to_string()))
}

fn number_abs(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    match this_number(this)? {
        NumberType::Integer(x) => x
            .checked_abs()
            .map(Value::from)
            .ok_or_else(|| overflow("abs", x, 0)),
        NumberType::Float(f) => Ok(Value::from(f.abs())),
    }
}

fn number_negative(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this_number(this)? {
        NumberType::Integer(x) => x
            .checked_neg()
            .map(Value::from)
            .ok_or_else(|| overflow("negative", x, 0)),
        NumberType::Float(f) => Ok(Value::from(-f)),
    }
}

fn number_next(_ctx: &mut ExecutionContext, this: &Value, _args: Vec<Value>) -> SandboxResult<Value> {
    arithmetic("next", this_number(this)?, NumberType::Integer(1), i64::checked_add, |x, y| x + y)
}

fn number_previous(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    arithmetic("previous", this_number(this)?, NumberType::Integer(1), i64::checked_sub, |x, y| x - y)
}

fn number_int_value(
    _ctx: &mut ExecutionContext,
    this: &Value,
    _args: Vec<Value>,
) -> SandboxResult<Value> {
    match this_number(this)? {
        NumberType::Integer(x) => Ok(Value::from(x)),
        NumberType::Float(f) => Ok(Value::from(f.trunc() as i64)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(f: super::super::BuiltinFn, this: Value, arg: Value) -> SandboxResult<Value> {
        let mut ctx = ExecutionContext::new();
        f(&mut ctx, &this, vec![arg])
    }

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(call(number_plus, Value::from(2), Value::from(3)).unwrap(), Value::from(5));
        assert_eq!(call(number_div, Value::from(6), Value::from(3)).unwrap(), Value::from(2));
        assert_eq!(call(number_div, Value::from(7), Value::from(2)).unwrap(), Value::from(3.5));
        assert_eq!(call(number_power, Value::from(2), Value::from(10)).unwrap(), Value::from(1024));
    }

    #[test]
    fn test_overflow_and_zero_division_are_range_errors() {
        assert!(matches!(
            call(number_plus, Value::from(i64::MAX), Value::from(1)),
            Err(SandboxError::RangeError(_))
        ));
        assert!(matches!(
            call(number_mod, Value::from(1), Value::from(0)),
            Err(SandboxError::RangeError(_))
        ));
    }

    #[test]
    fn test_plus_string_concatenates() {
        assert_eq!(
            call(number_plus, Value::from(1), Value::from("a")).unwrap(),
            Value::from("1a")
        );
        assert!(call(number_minus, Value::from(1), Value::from("a")).is_err());
    }
}
