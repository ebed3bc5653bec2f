//! A pass-through policy that writes down every operation it sees.

use std::cell::RefCell;

use crate::runner::ds::class::{argument_types, ClassRef};
use crate::runner::ds::error::SandboxResult;
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::value::Value;

use super::invoker::Invoker;
use super::policy::{Policy, SuperReceiver};

/// Appends one line per intercepted operation, then forwards it unchanged.
///
/// Lines use argument *types*, never values:
///
/// ```text
/// Widget.foo(Integer,String)     method call
/// Widget:make(String)            static call
/// new Widget(Integer)            construction
/// Derived:super.foo()            super call from Derived
/// super:Base(String)             superclass constructor
/// Widget.name / Widget.name=String
/// Widget.@x / Widget.@x=Integer  attributes
/// List[Integer] / List[Integer]=String
/// ```
#[derive(Default)]
pub struct RecordingPolicy {
    lines: RefCell<Vec<String>>,
}

impl RecordingPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<String> {
        self.lines.borrow().clone()
    }

    pub fn clear(&self) {
        self.lines.borrow_mut().clear();
    }

    fn record(&self, line: String) {
        self.lines.borrow_mut().push(line);
    }
}

fn types(args: &[Value]) -> String {
    argument_types(args).join(",")
}

impl Policy for RecordingPolicy {
    fn on_method_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.{}({})", get_type(&receiver), method, types(&args)));
        invoker.call(receiver, Some(method), args)
    }

    fn on_static_call(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        self.record(format!("{}:{}({})", class.name, method, types(&args)));
        invoker.call(Value::Class(class), Some(method), args)
    }

    fn on_new_instance(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        self.record(format!("new {}({})", class.name, types(&args)));
        invoker.call(Value::Class(class), None, args)
    }

    fn on_super_call(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: SuperReceiver,
        method: &str,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.{}({})", receiver, method, types(&args)));
        invoker.call(receiver.instance, Some(method), args)
    }

    fn on_super_constructor(
        &self,
        invoker: &mut Invoker<'_>,
        class: ClassRef,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        self.record(format!("super:{}({})", class.name, types(&args)));
        invoker.call(Value::Class(class), None, args)
    }

    fn on_get_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.{}", get_type(&receiver), property));
        invoker.call(receiver, Some(property), vec![])
    }

    fn on_set_property(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        property: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.{}={}", get_type(&receiver), property, get_type(&value)));
        invoker.call(receiver, Some(property), vec![value])
    }

    fn on_get_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.@{}", get_type(&receiver), attribute));
        invoker.call(receiver, Some(attribute), vec![])
    }

    fn on_set_attribute(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        attribute: &str,
        value: Value,
    ) -> SandboxResult<Value> {
        self.record(format!("{}.@{}={}", get_type(&receiver), attribute, get_type(&value)));
        invoker.call(receiver, Some(attribute), vec![value])
    }

    fn on_get_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
    ) -> SandboxResult<Value> {
        self.record(format!("{}[{}]", get_type(&receiver), get_type(&index)));
        invoker.call(receiver, None, vec![index])
    }

    fn on_set_array(
        &self,
        invoker: &mut Invoker<'_>,
        receiver: Value,
        index: Value,
        value: Value,
    ) -> SandboxResult<Value> {
        self.record(format!(
            "{}[{}]={}",
            get_type(&receiver),
            get_type(&index),
            get_type(&value)
        ));
        invoker.call(receiver, None, vec![index, value])
    }

    fn name(&self) -> &str {
        "recorder"
    }
}
