//! The policy that stands in for an empty chain.

use crate::runner::ds::class::{argument_types, ClassRef};
use crate::runner::ds::error::{OperationKind, Rejection, SandboxError, SandboxResult};
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::value::Value;

use super::invoker::Invoker;
use super::policy::{Policy, SuperReceiver};

pub const NO_POLICY_REASON: &str = "no sandbox policy is registered for this context";

/// Rejects every operation, naming what was attempted. A context with no
/// registered policy dispatches to this instead of the real operation.
#[derive(Debug, Default, Clone, Copy)]
pub struct RejectAllPolicy;

fn deny(kind: OperationKind, receiver_type: String, name: Option<&str>, args: &[Value]) -> SandboxError {
    SandboxError::Rejected(Rejection::new(
        kind,
        receiver_type,
        name,
        argument_types(args),
        NO_POLICY_REASON,
    ))
}

impl Policy for RejectAllPolicy {
    fn on_method_call(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::MethodCall, get_type(&receiver), Some(method), &args))
    }

    fn on_static_call(
        &self,
        _invoker: &mut Invoker<'_>,
        class: ClassRef,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::StaticCall, class.name.clone(), Some(method), &args))
    }

    fn on_new_instance(
        &self,
        _invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::Construct, class.name.clone(), None, &args))
    }

    fn on_super_call(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: SuperReceiver,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        Err(deny(
            OperationKind::SuperCall,
            receiver.declaring.name.clone(),
            Some(method),
            &args,
        ))
    }

    fn on_super_constructor(
        &self,
        _invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::SuperConstruct, class.name.clone(), None, &args))
    }

    fn on_get_property(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::GetProperty, get_type(&receiver), Some(property), &[]))
    }

    fn on_set_property(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        Err(deny(
            OperationKind::SetProperty,
            get_type(&receiver),
            Some(property),
            &[value],
        ))
    }

    fn on_get_attribute(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::GetAttribute, get_type(&receiver), Some(attribute), &[]))
    }

    fn on_set_attribute(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        Err(deny(
            OperationKind::SetAttribute,
            get_type(&receiver),
            Some(attribute),
            &[value],
        ))
    }

    fn on_get_array(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::GetArray, get_type(&receiver), None, &[index]))
    }

    fn on_set_array(
        &self,
        _invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
        value: Value,
    ) -> SandboxResult<Value> {
        Err(deny(OperationKind::SetArray, get_type(&receiver), None, &[index, value]))
    }

    fn name(&self) -> &str {
        "reject-all"
    }
}
