use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::error::SandboxResult;
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;

pub type FunctionRef = Rc<FunctionObject>;

pub type NativeFn = Rc<dyn Fn(&mut ExecutionContext, Vec<Value>) -> SandboxResult<Value>>;

/// A first-class block of code. It captures its outer scope by value when
/// created but takes the execution context when called, so it always runs
/// under the policies of whoever invokes it.
pub struct FunctionObject {
    pub name: String,
    body: NativeFn,
}
impl FunctionObject {
    pub fn new<F>(name: impl Into<String>, body: F) -> FunctionRef
    where
        F: Fn(&mut ExecutionContext, Vec<Value>) -> SandboxResult<Value> + 'static,
    {
        Rc::new(FunctionObject {
            name: name.into(),
            body: Rc::new(body),
        })
    }

    pub fn call(&self, ctx: &mut ExecutionContext, args: Vec<Value>) -> SandboxResult<Value> {
        (self.body)(ctx, args)
    }
}
impl Display for FunctionObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "function {}", self.name)
    }
}
