//! The invoker chain: one link per policy, then the real operation.

use std::rc::Rc;

use tracing::trace;

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::{OperationKind, SandboxError, SandboxResult};
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::value::Value;

use super::context::ExecutionContext;
use super::policy::{Policy, SuperReceiver};

/// The real operation, run once every policy has forwarded.
pub type Fallback<'a> =
    dyn Fn(&mut ExecutionContext, Value, Option<&str>, Vec<Value>) -> SandboxResult<Value> + 'a;

/// A capability bound to one position in a dispatch over a chain snapshot.
///
/// `call` advances exactly one link: while policies remain it runs the next
/// policy's hook with an invoker for the position after it; once the chain is
/// exhausted it performs the real operation. An invoker borrows its context
/// and snapshot, so it cannot outlive the dispatch that created it.
pub struct Invoker<'a> {
    ctx: &'a mut ExecutionContext,
    chain: &'a [Rc<dyn Policy>],
    index: usize,
    kind: OperationKind,
    declaring: Option<&'a ClassRef>,
    fallback: &'a Fallback<'a>,
}

impl<'a> Invoker<'a> {
    pub(crate) fn new(
        ctx: &'a mut ExecutionContext,
        chain: &'a [Rc<dyn Policy>],
        kind: OperationKind,
        declaring: Option<&'a ClassRef>,
        fallback: &'a Fallback<'a>,
    ) -> Self {
        Invoker {
            ctx,
            chain,
            index: 0,
            kind,
            declaring,
            fallback,
        }
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// Whether another policy follows; `false` means the next `call` runs
    /// the real operation.
    pub fn has_next(&self) -> bool {
        self.index < self.chain.len()
    }

    /// The execution context of this dispatch. Checked operations a policy
    /// performs through it are themselves dispatched over the whole chain.
    pub fn context(&mut self) -> &mut ExecutionContext {
        self.ctx
    }

    /// Forward to the next link. May be called any number of times.
    pub fn call(
        &mut self,
        receiver: Value,
        name: Option<&str>,
        args: Vec<Value>,
    ) -> SandboxResult<Value> {
        match self.chain.get(self.index) {
            Some(policy) => {
                let policy = policy.clone();
                if self.ctx.config().trace_dispatch {
                    trace!(
                        context = %self.ctx.id(),
                        kind = %self.kind,
                        link = self.index,
                        policy = policy.name(),
                        receiver = %get_type(&receiver),
                        "dispatch"
                    );
                }
                let mut next = Invoker {
                    ctx: &mut *self.ctx,
                    chain: self.chain,
                    index: self.index + 1,
                    kind: self.kind,
                    declaring: self.declaring,
                    fallback: self.fallback,
                };
                invoke_hook(&*policy, &mut next, receiver, name, args)
            }
            None => {
                if self.ctx.config().trace_dispatch {
                    trace!(context = %self.ctx.id(), kind = %self.kind, "real operation");
                }
                (self.fallback)(&mut *self.ctx, receiver, name, args)
            }
        }
    }
}

fn required_name(kind: OperationKind, name: Option<&str>) -> SandboxResult<&str> {
    name.ok_or_else(|| SandboxError::Consistency(format!("{} forwarded without a name", kind)))
}

fn required_class(kind: OperationKind, receiver: Value) -> SandboxResult<ClassRef> {
    match receiver {
        Value::Class(c) => Ok(c),
        other => Err(SandboxError::TypeError(format!(
            "{} needs a class receiver, got {}",
            kind,
            get_type(&other)
        ))),
    }
}

fn take_one(kind: OperationKind, args: Vec<Value>) -> SandboxResult<Value> {
    let mut it = args.into_iter();
    match (it.next(), it.next()) {
        (Some(v), None) => Ok(v),
        _ => Err(SandboxError::Consistency(format!(
            "{} expects exactly one argument",
            kind
        ))),
    }
}

fn take_two(kind: OperationKind, args: Vec<Value>) -> SandboxResult<(Value, Value)> {
    let mut it = args.into_iter();
    match (it.next(), it.next(), it.next()) {
        (Some(a), Some(b), None) => Ok((a, b)),
        _ => Err(SandboxError::Consistency(format!(
            "{} expects an index and a value",
            kind
        ))),
    }
}

/// Run the hook of `policy` matching the invoker's operation kind.
fn invoke_hook(
    policy: &dyn Policy,
    invoker: &mut Invoker<'_>,
    receiver: Value,
    name: Option<&str>,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let kind = invoker.kind;
    match kind {
        OperationKind::MethodCall => {
            policy.on_method_call(invoker, receiver, required_name(kind, name)?, args)
        }
        OperationKind::StaticCall => policy.on_static_call(
            invoker,
            required_class(kind, receiver)?,
            required_name(kind, name)?,
            args,
        ),
        OperationKind::Construct => {
            policy.on_new_instance(invoker, required_class(kind, receiver)?, args)
        }
        OperationKind::SuperCall => {
            let declaring = invoker.declaring.cloned().ok_or_else(|| {
                SandboxError::Consistency("super call without a declaring class".to_string())
            })?;
            let sr = SuperReceiver {
                declaring,
                instance: receiver,
            };
            policy.on_super_call(invoker, sr, required_name(kind, name)?, args)
        }
        OperationKind::SuperConstruct => {
            policy.on_super_constructor(invoker, required_class(kind, receiver)?, args)
        }
        OperationKind::GetProperty => {
            policy.on_get_property(invoker, receiver, required_name(kind, name)?)
        }
        OperationKind::SetProperty => policy.on_set_property(
            invoker,
            receiver,
            required_name(kind, name)?,
            take_one(kind, args)?,
        ),
        OperationKind::GetAttribute => {
            policy.on_get_attribute(invoker, receiver, required_name(kind, name)?)
        }
        OperationKind::SetAttribute => policy.on_set_attribute(
            invoker,
            receiver,
            required_name(kind, name)?,
            take_one(kind, args)?,
        ),
        OperationKind::GetArray => policy.on_get_array(invoker, receiver, take_one(kind, args)?),
        OperationKind::SetArray => {
            let (index, value) = take_two(kind, args)?;
            policy.on_set_array(invoker, receiver, index, value)
        }
    }
}
