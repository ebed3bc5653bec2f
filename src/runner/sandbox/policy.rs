//! The policy extension surface.

use std::fmt;
use std::fmt::{Display, Formatter};

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::SandboxResult;
use crate::runner::ds::value::Value;

use super::invoker::Invoker;

/// The receiver of a `super.method(...)` call: the class whose code made
/// the call, and the instance the call runs on.
#[derive(Debug, Clone)]
pub struct SuperReceiver {
    pub declaring: ClassRef,
    pub instance: Value,
}
impl Display for SuperReceiver {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:super", self.declaring.name)
    }
}

/// A policy decides how an intercepted operation proceeds.
///
/// Every hook receives an [`Invoker`] bound to the rest of the chain plus
/// the operation's receiver, name and arguments. Calling the invoker
/// forwards, possibly with different values; returning without calling it
/// substitutes the result; returning an error vetoes the operation. The
/// default for every hook forwards unchanged, so a policy only overrides
/// the kinds it cares about.
///
/// Policies are shared as `Rc<dyn Policy>` and may sit in many chains at
/// once, so hooks take `&self`; keep mutable state behind a `RefCell` or `Cell`.
pub trait Policy {
    fn on_method_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, Some(method), args)
    }

    fn on_static_call(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        invoker.call(Value::Class(class), Some(method), args)
    }

    fn on_new_instance(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        invoker.call(Value::Class(class), None, args)
    }

    fn on_super_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: SuperReceiver,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        invoker.call(receiver.instance, Some(method), args)
    }

    /// `class` is the superclass whose constructor is about to run.
    fn on_super_constructor(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        invoker.call(Value::Class(class), None, args)
    }

    fn on_get_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, Some(property), vec![])
    }

    fn on_set_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, Some(property), vec![value])
    }

    fn on_get_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, Some(attribute), vec![])
    }

    fn on_set_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, Some(attribute), vec![value])
    }

    fn on_get_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, None, vec![index])
    }

    fn on_set_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
        value: Value,
    ) -> SandboxResult<Value> {
        invoker.call(receiver, None, vec![index, value])
    }

    /// Human-readable name for this policy (for logging).
    fn name(&self) -> &str {
        "policy"
    }

    /// Structural identity. Two policies reporting the same key are treated
    /// as the same policy by [`unregister`](super::context::ExecutionContext::unregister).
    fn key(&self) -> Option<&str> {
        None
    }
}
