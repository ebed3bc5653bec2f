//! A policy built from four value hooks, for policies that care about
//! which values flow through rather than the shape of the operation.

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::value::Value;

use super::invoker::Invoker;
use super::policy::{Policy, SuperReceiver};

/// Value hooks; each defaults to passing the value through. Returning an
/// error rejects the operation the value was part of.
pub trait ValueFilter {
    fn filter_receiver(&self, receiver: Value) -> SandboxResult<Value> {
        Ok(receiver)
    }

    fn filter_argument(&self, arg: Value) -> SandboxResult<Value> {
        Ok(arg)
    }

    fn filter_return_value(&self, value: Value) -> SandboxResult<Value> {
        Ok(value)
    }

    /// Array indexes are filtered as arguments unless overridden.
    fn filter_index(&self, index: Value) -> SandboxResult<Value> {
        self.filter_argument(index)
    }

    fn name(&self) -> &str {
        "value-filter"
    }
}

/// Adapts a [`ValueFilter`] to the full [`Policy`] surface.
pub struct FilterPolicy<F: ValueFilter> {
    filter: F,
}

impl<F: ValueFilter> FilterPolicy<F> {
    pub fn new(filter: F) -> Self {
        FilterPolicy { filter }
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    fn filter_arguments(&self, args: Vec<Value>) -> SandboxResult<Vec<Value>> {
        args.into_iter().map(|a| self.filter.filter_argument(a)).collect()
    }

    /// A class receiver must stay a class after filtering.
    fn filter_class(&self, class: ClassRef) -> SandboxResult<Value> {
        match self.filter.filter_receiver(Value::Class(class))? {
            v @ Value::Class(_) => Ok(v),
            other => Err(SandboxError::TypeError(format!(
                "receiver filter turned a class into {}",
                get_type(&other)
            ))),
        }
    }
}

impl<F: ValueFilter> Policy for FilterPolicy<F> {
    fn on_method_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let args = self.filter_arguments(args)?;
        let r = invoker.call(receiver, Some(method), args)?;
        self.filter.filter_return_value(r)
    }

    fn on_static_call(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        let receiver = self.filter_class(class)?;
        let args = self.filter_arguments(args)?;
        let r = invoker.call(receiver, Some(method), args)?;
        self.filter.filter_return_value(r)
    }

    fn on_new_instance(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        let receiver = self.filter_class(class)?;
        let args = self.filter_arguments(args)?;
        let r = invoker.call(receiver, None, args)?;
        self.filter.filter_return_value(r)
    }

    fn on_super_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: SuperReceiver,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        let instance = self.filter.filter_receiver(receiver.instance)?;
        let args = self.filter_arguments(args)?;
        let r = invoker.call(instance, Some(method), args)?;
        self.filter.filter_return_value(r)
    }

    /// Only the arguments are filtered; nothing is returned to the caller.
    fn on_super_constructor(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        let args = self.filter_arguments(args)?;
        invoker.call(Value::Class(class), None, args)
    }

    fn on_get_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let r = invoker.call(receiver, Some(property), vec![])?;
        self.filter.filter_return_value(r)
    }

    fn on_set_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let value = self.filter.filter_argument(value)?;
        let r = invoker.call(receiver, Some(property), vec![value])?;
        self.filter.filter_return_value(r)
    }

    fn on_get_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let r = invoker.call(receiver, Some(attribute), vec![])?;
        self.filter.filter_return_value(r)
    }

    fn on_set_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let value = self.filter.filter_argument(value)?;
        let r = invoker.call(receiver, Some(attribute), vec![value])?;
        self.filter.filter_return_value(r)
    }

    fn on_get_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let index = self.filter.filter_index(index)?;
        let r = invoker.call(receiver, None, vec![index])?;
        self.filter.filter_return_value(r)
    }

    fn on_set_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
        value: Value,
    ) -> SandboxResult<Value> {
        let receiver = self.filter.filter_receiver(receiver)?;
        let index = self.filter.filter_index(index)?;
        let value = self.filter.filter_argument(value)?;
        let r = invoker.call(receiver, None, vec![index, value])?;
        self.filter.filter_return_value(r)
    }

    fn name(&self) -> &str {
        self.filter.name()
    }
}
