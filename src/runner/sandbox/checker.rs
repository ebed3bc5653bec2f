//! The checked-operation facade: one entry point per operation kind.
//!
//! Every entry point funnels into [`checked`], which applies the null-safe
//! and broadcast rules, expands compound assignment, and otherwise runs the
//! context's policy chain with the real operation as its last link.

use std::cell::RefCell;
use std::rc::Rc;

use crate::runner::ds::class::{ChainTarget, ClassRef, ConstructorMarker, MarkerKind};
use crate::runner::ds::error::{OperationKind, SandboxError, SandboxResult};
use crate::runner::ds::operations::object::{
    get_attribute, get_index, get_property, instantiate, invoke_method, invoke_static,
    invoke_super, resolve_chain_target, resolve_constructor, set_attribute, set_index,
    set_property,
};
use crate::runner::ds::operations::test_and_comparison::{
    compare_direct, is_directly_comparable, ordering_from_value,
};
use crate::runner::ds::operations::type_conversion::{get_type, to_boolean, CastTarget};
use crate::runner::ds::value::Value;

use super::context::ExecutionContext;
use super::descriptor::{AssignOp, BinaryOp, ComparisonOp, OpFlags, Operation};
use super::invoker::Invoker;

/// Run one operation through the facade.
pub fn checked(ctx: &mut ExecutionContext, op: Operation) -> SandboxResult<Value> {
    if op.receiver.is_null() && op.flags.null_safe {
        return Ok(op.assigned_value());
    }
    if op.flags.broadcast {
        return broadcast(ctx, op);
    }
    if let Some(AssignOp::Compound(bin)) = op.assign {
        return compound_assign(ctx, op, bin);
    }
    if op.kind == OperationKind::Construct {
        // The constructor must exist before any policy hears about it.
        if let Value::Class(class) = &op.receiver {
            resolve_constructor(class, &op.args)?;
        }
    }

    let kind = op.kind;
    let declaring = op.declaring;
    dispatch(
        ctx,
        kind,
        declaring.as_ref(),
        op.receiver,
        op.name.as_deref(),
        op.args,
        |ctx, receiver, name, args| perform(ctx, kind, declaring.as_ref(), receiver, name, args),
    )
}

/// Drive the chain snapshot of `ctx`, ending in `fallback`.
fn dispatch<F>(
    ctx: &mut ExecutionContext,
    kind: OperationKind,
    declaring: Option<&ClassRef>,
    receiver: Value,
    name: Option<&str>,
    args: Vec<Value>,
    fallback: F,
) -> SandboxResult<Value>
where
    F: Fn(&mut ExecutionContext, Value, Option<&str>, Vec<Value>) -> SandboxResult<Value>,
{
    let chain = ctx.dispatch_chain(kind);
    ctx.enter_dispatch(kind)?;
    let result = Invoker::new(ctx, &chain[..], kind, declaring, &fallback).call(receiver, name, args);
    ctx.leave_dispatch();
    result
}

fn missing(kind: OperationKind, what: &str) -> SandboxError {
    SandboxError::Consistency(format!("{} reached the real operation without {}", kind, what))
}

fn class_receiver(kind: OperationKind, receiver: &Value) -> SandboxResult<&ClassRef> {
    receiver.as_class().ok_or_else(|| {
        SandboxError::TypeError(format!(
            "{} needs a class receiver, got {}",
            kind,
            get_type(receiver)
        ))
    })
}

fn single_arg(kind: OperationKind, args: Vec<Value>) -> SandboxResult<Value> {
    args.into_iter().next().ok_or_else(|| missing(kind, "a value"))
}

/// The unintercepted operation each kind stands for.
fn perform(
    ctx: &mut ExecutionContext,
    kind: OperationKind,
    declaring: Option<&ClassRef>,
    receiver: Value,
    name: Option<&str>,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let required_name = || name.ok_or_else(|| missing(kind, "a name"));
    match kind {
        OperationKind::MethodCall => invoke_method(ctx, &receiver, required_name()?, args),
        OperationKind::StaticCall => {
            invoke_static(ctx, class_receiver(kind, &receiver)?, required_name()?, args)
        }
        OperationKind::Construct => instantiate(ctx, class_receiver(kind, &receiver)?, args),
        OperationKind::SuperCall => {
            let declaring = declaring.ok_or_else(|| missing(kind, "a declaring class"))?;
            invoke_super(ctx, declaring, &receiver, required_name()?, args)
        }
        OperationKind::SuperConstruct => Err(SandboxError::Consistency(
            "super constructor calls only run as part of a constructor chain".to_string(),
        )),
        OperationKind::GetProperty => get_property(ctx, &receiver, required_name()?),
        OperationKind::SetProperty => {
            let value = single_arg(kind, args)?;
            set_property(ctx, &receiver, required_name()?, value)
        }
        OperationKind::GetAttribute => get_attribute(&receiver, required_name()?),
        OperationKind::SetAttribute => {
            let value = single_arg(kind, args)?;
            set_attribute(&receiver, required_name()?, value)
        }
        OperationKind::GetArray => {
            let index = single_arg(kind, args)?;
            get_index(ctx, &receiver, &index)
        }
        OperationKind::SetArray => {
            let mut it = args.into_iter();
            match (it.next(), it.next()) {
                (Some(index), Some(value)) => set_index(ctx, &receiver, &index, value),
                _ => Err(missing(kind, "an index and a value")),
            }
        }
    }
}

/// Apply the operation to each non-null element of the receiver.
fn broadcast(ctx: &mut ExecutionContext, op: Operation) -> SandboxResult<Value> {
    match op.kind {
        OperationKind::StaticCall
        | OperationKind::Construct
        | OperationKind::SuperCall
        | OperationKind::SuperConstruct => {
            return Err(SandboxError::Consistency(format!(
                "{} cannot be broadcast",
                op.kind
            )))
        }
        _ => {}
    }
    let elements: Vec<Value> = match &op.receiver {
        Value::List(l) => l.borrow().clone(),
        Value::Null => vec![],
        v => vec![v.clone()],
    };
    let is_set = op.kind.is_set();
    let mut results = Vec::new();
    for element in elements.into_iter().filter(|e| !e.is_null()) {
        let r = checked(ctx, op.for_element(element))?;
        if !is_set {
            results.push(r);
        }
    }
    if is_set {
        Ok(op.assigned_value())
    } else {
        Ok(Value::list(results))
    }
}

/// `a.x op= v` is a checked get, a checked operator call, then a checked set.
fn compound_assign(ctx: &mut ExecutionContext, op: Operation, bin: BinaryOp) -> SandboxResult<Value> {
    let get_kind = match op.kind {
        OperationKind::SetProperty => OperationKind::GetProperty,
        OperationKind::SetAttribute => OperationKind::GetAttribute,
        OperationKind::SetArray => OperationKind::GetArray,
        other => {
            return Err(SandboxError::Consistency(format!(
                "{} cannot carry a compound assignment",
                other
            )))
        }
    };
    let kind = op.kind;
    let mut args = op.args;
    let rhs = args
        .pop()
        .ok_or_else(|| missing(kind, "a value to assign"))?;
    let current = checked(
        ctx,
        Operation {
            kind: get_kind,
            receiver: op.receiver.clone(),
            name: op.name.clone(),
            args: args.clone(),
            flags: OpFlags::NONE,
            assign: None,
            declaring: None,
        },
    )?;
    let result = checked_binary_op(ctx, current, bin, rhs)?;
    args.push(result);
    checked(
        ctx,
        Operation {
            kind,
            receiver: op.receiver,
            name: op.name,
            args,
            flags: OpFlags::NONE,
            assign: Some(AssignOp::Assign),
            declaring: None,
        },
    )
}

pub fn checked_call(
    ctx: &mut ExecutionContext,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(ctx, Operation::method_call(receiver, method, args).with_flags(flags))
}

pub fn checked_static_call(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    method: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    checked(ctx, Operation::static_call(class, method, args))
}

pub fn checked_constructor(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    checked(ctx, Operation::construct(class, args))
}

pub fn checked_super_call(
    ctx: &mut ExecutionContext,
    declaring: &ClassRef,
    receiver: Value,
    method: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    checked(ctx, Operation::super_call(declaring, receiver, method, args))
}

pub fn checked_get_property(
    ctx: &mut ExecutionContext,
    receiver: Value,
    property: &str,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(ctx, Operation::get_property(receiver, property).with_flags(flags))
}

pub fn checked_set_property(
    ctx: &mut ExecutionContext,
    receiver: Value,
    property: &str,
    assign: AssignOp,
    value: Value,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(
        ctx,
        Operation::set_property(receiver, property, value)
            .with_assign(assign)
            .with_flags(flags),
    )
}

pub fn checked_get_attribute(
    ctx: &mut ExecutionContext,
    receiver: Value,
    attribute: &str,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(ctx, Operation::get_attribute(receiver, attribute).with_flags(flags))
}

pub fn checked_set_attribute(
    ctx: &mut ExecutionContext,
    receiver: Value,
    attribute: &str,
    assign: AssignOp,
    value: Value,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(
        ctx,
        Operation::set_attribute(receiver, attribute, value)
            .with_assign(assign)
            .with_flags(flags),
    )
}

pub fn checked_get_array(
    ctx: &mut ExecutionContext,
    receiver: Value,
    index: Value,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(ctx, Operation::get_array(receiver, index).with_flags(flags))
}

pub fn checked_set_array(
    ctx: &mut ExecutionContext,
    receiver: Value,
    index: Value,
    assign: AssignOp,
    value: Value,
    flags: OpFlags,
) -> SandboxResult<Value> {
    checked(
        ctx,
        Operation::set_array(receiver, index, value)
            .with_assign(assign)
            .with_flags(flags),
    )
}

/// `value as Target`. Null and values already of the target type pass
/// through untouched; anything else is a checked `asType` call.
pub fn checked_cast(
    ctx: &mut ExecutionContext,
    value: Value,
    target: &CastTarget,
) -> SandboxResult<Value> {
    if value.is_null() || target.matches(&value) {
        return Ok(value);
    }
    checked_call(ctx, value, "asType", vec![target.to_value()], OpFlags::NONE)
}

/// `lhs op rhs`, dispatched as a method call on `lhs`.
pub fn checked_binary_op(
    ctx: &mut ExecutionContext,
    lhs: Value,
    op: BinaryOp,
    rhs: Value,
) -> SandboxResult<Value> {
    checked_call(ctx, lhs, op.method_name(), vec![rhs], OpFlags::NONE)
}

/// Numbers, strings, booleans and nulls compare directly; anything else
/// goes through a checked `equals` or `compareTo` call.
pub fn checked_comparison(
    ctx: &mut ExecutionContext,
    lhs: Value,
    op: ComparisonOp,
    rhs: Value,
) -> SandboxResult<bool> {
    if is_directly_comparable(&lhs, &rhs) {
        return Ok(match op {
            ComparisonOp::Eq => lhs == rhs,
            ComparisonOp::Ne => lhs != rhs,
            _ => compare_direct(&lhs, &rhs).map_or(false, |o| op.holds(o)),
        });
    }
    if op.is_equality() {
        let equal = to_boolean(&checked_call(ctx, lhs, "equals", vec![rhs], OpFlags::NONE)?);
        return Ok(if op == ComparisonOp::Eq { equal } else { !equal });
    }
    let lhs_type = get_type(&lhs);
    let result = checked_call(ctx, lhs, "compareTo", vec![rhs], OpFlags::NONE)?;
    match ordering_from_value(&result) {
        Some(o) => Ok(op.holds(o)),
        None => Err(SandboxError::TypeError(format!(
            "{}.compareTo() returned {} instead of a number",
            lhs_type,
            get_type(&result)
        ))),
    }
}

/// Check the arguments of a chained constructor call and wrap them in a
/// marker for the synthesized overload that performs it.
///
/// The chained target is resolved first, so an impossible call fails before
/// any policy runs. Policies see the call with the receiving class; the
/// arguments the last link is handed become the marker's arguments, and a
/// policy that returns without forwarding leaves the originals in place.
fn checked_chain(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    target: ChainTarget,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let (receiver, kind, marker_kind) = match resolve_chain_target(class, target, &args)? {
        Some((t, _)) => match target {
            ChainTarget::Super => (t, OperationKind::SuperConstruct, MarkerKind::Super),
            ChainTarget::This => (t, OperationKind::Construct, MarkerKind::This),
        },
        None => {
            return Err(SandboxError::Resolution(format!(
                "{} has no superclass to chain to",
                class.name
            )))
        }
    };
    let observed: RefCell<Option<Vec<Value>>> = RefCell::new(None);
    dispatch(
        ctx,
        kind,
        Some(class),
        Value::Class(receiver),
        None,
        args.clone(),
        |_ctx, _receiver, _name, args| {
            *observed.borrow_mut() = Some(args);
            Ok(Value::Null)
        },
    )?;
    let final_args = observed.into_inner().unwrap_or(args);
    Ok(Value::Marker(Rc::new(ConstructorMarker::new(
        marker_kind,
        final_args,
    ))))
}

/// `super(args)` inside a constructor of `class`.
pub fn checked_super_constructor(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    checked_chain(ctx, class, ChainTarget::Super, args)
}

/// `this(args)` inside a constructor of `class`.
pub fn checked_this_constructor(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    checked_chain(ctx, class, ChainTarget::This, args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::sandbox::policy::Policy;

    struct Allow;
    impl Policy for Allow {}

    fn allowing() -> ExecutionContext {
        let mut ctx = ExecutionContext::new();
        ctx.register(Rc::new(Allow));
        ctx
    }

    #[test]
    fn test_null_safe_set_returns_supplied_value() {
        let mut ctx = ExecutionContext::new();
        let r = checked_set_property(
            &mut ctx,
            Value::Null,
            "x",
            AssignOp::Assign,
            Value::from(3),
            OpFlags::NULL_SAFE,
        )
        .unwrap();
        assert_eq!(r, Value::from(3));
    }

    #[test]
    fn test_unguarded_null_is_dispatched() {
        let mut ctx = allowing();
        let err = checked_call(&mut ctx, Value::Null, "foo", vec![], OpFlags::NONE).unwrap_err();
        assert!(matches!(err, SandboxError::TypeError(_)));
    }

    #[test]
    fn test_direct_comparison_needs_no_policy() {
        let mut ctx = ExecutionContext::new();
        assert!(checked_comparison(&mut ctx, Value::from(1), ComparisonOp::Lt, Value::from(2.5)).unwrap());
        assert!(checked_comparison(&mut ctx, Value::Null, ComparisonOp::Ne, Value::from("a")).unwrap());
        assert!(checked_comparison(&mut ctx, Value::list(vec![]), ComparisonOp::Eq, Value::list(vec![])).is_err());
    }

    #[test]
    fn test_list_equality_goes_through_equals() {
        let mut ctx = allowing();
        let a = Value::list(vec![Value::from(1)]);
        let b = Value::list(vec![Value::from(1)]);
        assert!(checked_comparison(&mut ctx, a, ComparisonOp::Eq, b).unwrap());
    }

    #[test]
    fn test_compound_set_array() {
        let mut ctx = allowing();
        let l = Value::list(vec![Value::from(1), Value::from(2)]);
        let r = checked_set_array(
            &mut ctx,
            l.clone(),
            Value::from(1),
            AssignOp::Compound(BinaryOp::Multiply),
            Value::from(10),
            OpFlags::NONE,
        )
        .unwrap();
        assert_eq!(r, Value::from(20));
        assert_eq!(l, Value::list(vec![Value::from(1), Value::from(20)]));
    }

    #[test]
    fn test_null_safe_array_access_dispatches_nothing() {
        let mut ctx = ExecutionContext::new();
        let r = checked_get_array(&mut ctx, Value::Null, Value::from(0), OpFlags::NULL_SAFE).unwrap();
        assert_eq!(r, Value::Null);
        let r = checked_set_array(
            &mut ctx,
            Value::Null,
            Value::from(0),
            AssignOp::Assign,
            Value::from(4),
            OpFlags::NULL_SAFE,
        )
        .unwrap();
        assert_eq!(r, Value::from(4));
    }

    struct SealedBase;
    impl Policy for SealedBase {
        fn on_super_constructor(
            &self,
            _invoker: &mut Invoker<'_>,
            class: ClassRef,
            _args: Vec<Value>,
        ) -> SandboxResult<Value> {
            Err(SandboxError::Rejected(crate::runner::ds::error::Rejection::new(
                OperationKind::SuperConstruct,
                class.name.clone(),
                None,
                vec![],
                "sealed",
            )))
        }
    }

    #[test]
    fn test_marker_cannot_be_smuggled_into_construction() {
        use crate::runner::ds::class::{ClassBuilder, Constructor, ParamType};
        use crate::runner::sandbox::ctor_bridge::prepare_sandboxed_class;

        let base = ClassBuilder::new("Base")
            .constructor(Constructor::new(vec![ParamType::Any]))
            .build();
        let derived = prepare_sandboxed_class(
            ClassBuilder::new("Derived")
                .extends(&base)
                .constructor(
                    Constructor::new(vec![ParamType::Number])
                        .chain_super(|_, _, args| Ok(vec![args[0].clone()])),
                )
                .into_def(),
        )
        .unwrap();
        let mut ctx = allowing();
        ctx.register(Rc::new(SealedBase));

        let err = checked_constructor(&mut ctx, &derived, vec![Value::from(1)]).unwrap_err();
        assert!(matches!(err, SandboxError::Rejected(_)));

        let forged = Value::Marker(Rc::new(ConstructorMarker::new(
            MarkerKind::Super,
            vec![Value::from("EVIL")],
        )));
        let err = checked_constructor(&mut ctx, &derived, vec![forged, Value::from(1)]).unwrap_err();
        match err {
            SandboxError::Resolution(msg) => assert!(msg.contains("[Derived(Number)]"), "{}", msg),
            other => panic!("expected a resolution error, got {}", other),
        }
    }

    #[test]
    fn test_broadcast_static_call_is_inconsistent() {
        let mut ctx = allowing();
        let c = crate::runner::ds::class::ClassBuilder::new("A").build();
        let err = checked(&mut ctx, Operation::static_call(&c, "x", vec![]).broadcast()).unwrap_err();
        assert!(matches!(err, SandboxError::Consistency(_)));
    }
}
