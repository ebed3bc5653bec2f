//! Tests for the built-in methods of primitive values.
//!
//! Built-ins are what the real operation falls back to when a receiver is
//! not a class instance. Blocks handed to them run under the caller's
//! policies like any other code.

extern crate just_sandbox;

use std::rc::Rc;

use just_sandbox::runner::ds::error::{SandboxError, SandboxResult};
use just_sandbox::runner::ds::function_object::FunctionObject;
use just_sandbox::runner::ds::value::Value;
use just_sandbox::runner::sandbox::{
    checked_call, ExecutionContext, OpFlags, Policy, RecordingPolicy, SandboxConfig,
};
use just_sandbox::runner::std_lib::registry::BuiltinRegistry;

struct Allow;
impl Policy for Allow {}

fn call_builtin(type_name: &str, method: &str, this: Value, args: Vec<Value>) -> SandboxResult<Value> {
    let registry = BuiltinRegistry::with_core();
    let f = registry
        .get_method(type_name, method)
        .unwrap_or_else(|| panic!("{}.{} should exist", type_name, method));
    let mut ctx = ExecutionContext::new();
    f(&mut ctx, &this, args)
}

fn call(method: &str, this: Value, args: Vec<Value>) -> SandboxResult<Value> {
    let mut ctx = ExecutionContext::new();
    ctx.register(Rc::new(Allow));
    checked_call(&mut ctx, this, method, args, OpFlags::NONE)
}

// ============================================================================
// Number tests
// ============================================================================

mod number_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_integer_arithmetic_stays_integral() {
        assert_eq!(call("plus", Value::from(2), vec![Value::from(3)]).unwrap(), Value::from(5));
        assert_eq!(call("div", Value::from(9), vec![Value::from(3)]).unwrap(), Value::from(3));
        assert_eq!(call("div", Value::from(7), vec![Value::from(2)]).unwrap(), Value::from(3.5));
        assert_eq!(call("power", Value::from(2), vec![Value::from(10)]).unwrap(), Value::from(1024));
    }

    #[test]
    fn test_division_by_zero_is_a_range_error() {
        let err = call_builtin("Number", "div", Value::from(1), vec![Value::from(0)]).unwrap_err();
        assert!(matches!(err, SandboxError::RangeError(_)));
    }

    #[test]
    fn test_overflow_is_a_range_error() {
        let err = call_builtin("Number", "multiply", Value::from(i64::MAX), vec![Value::from(2)]).unwrap_err();
        assert!(matches!(err, SandboxError::RangeError(_)));
        // Not exact in i64, so it falls back to floating point.
        let r = call_builtin("Number", "div", Value::from(i64::MIN), vec![Value::from(-1)]).unwrap();
        assert_eq!(r, Value::from(-(i64::MIN as f64)));
    }

    #[test]
    fn test_plus_string_concatenates() {
        assert_eq!(
            call("plus", Value::from(1), vec![Value::from("a")]).unwrap(),
            Value::from("1a")
        );
    }
}

// ============================================================================
// String tests
// ============================================================================

mod string_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_string_basics() {
        assert_eq!(call("length", Value::from("héllo"), vec![]).unwrap(), Value::from(5));
        assert_eq!(call("toUpperCase", Value::from("abc"), vec![]).unwrap(), Value::from("ABC"));
        assert_eq!(
            call("multiply", Value::from("ab"), vec![Value::from(3)]).unwrap(),
            Value::from("ababab")
        );
        assert_eq!(
            call("split", Value::from("a,b"), vec![Value::from(",")]).unwrap(),
            Value::list(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_repeat_past_the_size_limit_is_a_range_error() {
        let err = call("multiply", Value::from("ab"), vec![Value::from(1i64 << 62)]).unwrap_err();
        assert!(matches!(err, SandboxError::RangeError(_)));

        let config = SandboxConfig::parse("[sandbox]\nmax_collection_size = 4\n").unwrap();
        let mut ctx = ExecutionContext::with_config(config);
        ctx.register(Rc::new(Allow));
        assert_eq!(
            checked_call(&mut ctx, Value::from("ab"), "multiply", vec![Value::from(2)], OpFlags::NONE).unwrap(),
            Value::from("abab")
        );
        let err = checked_call(&mut ctx, Value::from("ab"), "multiply", vec![Value::from(3)], OpFlags::NONE)
            .unwrap_err();
        assert!(matches!(err, SandboxError::RangeError(_)));
    }

    #[test]
    fn test_unknown_method_is_a_reference_error() {
        let err = call("frobnicate", Value::from("x"), vec![Value::from(1)]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Uncaught reference error: No signature of method: String.frobnicate() is applicable for argument types: (Integer)"
        );
    }
}

// ============================================================================
// Collection tests
// ============================================================================

mod collection_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_list_left_shift_appends_in_place() {
        let list = Value::list(vec![Value::from(1)]);
        let r = call("leftShift", list.clone(), vec![Value::from(2)]).unwrap();
        assert!(r.same(&list));
        assert_eq!(list, Value::list(vec![Value::from(1), Value::from(2)]));
    }

    #[test]
    fn test_map_key_set() {
        let map = Value::map(vec![
            ("a".to_string(), Value::from(1)),
            ("b".to_string(), Value::from(2)),
        ]);
        assert_eq!(
            call("keySet", map, vec![]).unwrap(),
            Value::list(vec![Value::from("a"), Value::from("b")])
        );
    }

    #[test]
    fn test_blocks_run_under_the_callers_policies() {
        let double = FunctionObject::new("double", |ctx, args| {
            checked_call(ctx, args[0].clone(), "multiply", vec![Value::from(2)], OpFlags::NONE)
        });
        let recorder = Rc::new(RecordingPolicy::new());
        let mut ctx = ExecutionContext::new();
        ctx.register(recorder.clone());

        let r = checked_call(
            &mut ctx,
            Value::list(vec![Value::from(1), Value::from(2)]),
            "collect",
            vec![Value::Function(double)],
            OpFlags::NONE,
        )
        .unwrap();
        assert_eq!(r, Value::list(vec![Value::from(2), Value::from(4)]));
        assert_eq!(
            recorder.lines(),
            vec![
                "List.collect(Function)",
                "Integer.multiply(Integer)",
                "Integer.multiply(Integer)",
            ]
        );
    }
}
