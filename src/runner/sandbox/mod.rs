//! Interception and dispatch of every dynamic operation sandboxed code performs.
//!
//! Code that has been rewritten for sandboxing never calls a method, builds
//! an object, or touches a property directly. It calls one of the
//! `checked_*` entry points instead, passing its [`ExecutionContext`]. The
//! context owns an ordered chain of [`Policy`] objects, and every operation
//! is routed through that chain before it is allowed to happen.
//!
//! ## Dispatch
//!
//! ```text
//! checked_call(ctx, obj, "foo", args)
//!      ↓
//! 1. receiver null and null-safe?    → null, nobody is asked
//! 2. broadcast?                      → repeat per non-null element
//! 3. snapshot the context's chain    → empty chain = [RejectAllPolicy]
//! 4. policy[0].on_method_call(invoker #1, ...)
//!      ↓ invoker.call(...)
//!    policy[1].on_method_call(invoker #2, ...)
//!      ↓ invoker.call(...)
//!    real operation (runner::ds::operations)
//! ```
//!
//! ### Key Components
//!
//! - **[`Policy`]**: one hook per operation kind, each defaulting to forward
//! - **[`Invoker`]**: the capability a hook uses to forward to the next link
//! - **[`ExecutionContext`]**: isolation boundary holding a [`PolicyChain`]
//! - **[`RejectAllPolicy`]**: what an empty chain dispatches to
//! - **[`FilterPolicy`]**: a policy assembled from four [`ValueFilter`] hooks
//! - **[`RecordingPolicy`]**: writes down each operation and forwards it
//! - **[`prepare_sandboxed_class`]**: makes chained constructor calls checkable
//!
//! ### Deciding
//!
//! A hook forwards by calling its invoker, optionally with a different
//! receiver or arguments. It substitutes a result by returning without
//! calling the invoker, and vetoes by returning an error; either way no
//! later policy and no real operation runs. A hook may also call the
//! invoker more than once.
//!
//! Registration during a dispatch is allowed, including a policy
//! unregistering itself. The dispatch in progress keeps the snapshot it
//! started with.
//!
//! ## Example
//!
//! ```
//! use std::rc::Rc;
//! use just_sandbox::runner::ds::class::ClassBuilder;
//! use just_sandbox::runner::ds::value::Value;
//! use just_sandbox::runner::sandbox::{
//!     checked_call, checked_constructor, ExecutionContext, OpFlags, RecordingPolicy,
//! };
//!
//! let widget = ClassBuilder::new("Widget")
//!     .method("foo", Some(2), |_, _, args| Ok(args[0].clone()))
//!     .build();
//!
//! // Nothing registered: every operation is refused.
//! let mut ctx = ExecutionContext::new();
//! assert!(checked_constructor(&mut ctx, &widget, vec![]).is_err());
//!
//! let recorder = Rc::new(RecordingPolicy::new());
//! ctx.register(recorder.clone());
//! let w = checked_constructor(&mut ctx, &widget, vec![]).unwrap();
//! let r = checked_call(&mut ctx, w, "foo", vec![Value::from(1), Value::from("x")], OpFlags::NONE)
//!     .unwrap();
//!
//! assert_eq!(r, Value::from(1));
//! assert_eq!(recorder.lines(), vec!["new Widget()", "Widget.foo(Integer,String)"]);
//! ```
//!
//! ## Why an explicit context
//!
//! Policies belong to a logical thread of control, so the chain lives in a
//! value that is passed to every checked operation. Closures receive the
//! context of their caller, which keeps deferred code under the same
//! policies as the code that runs it.

pub mod chain;
pub mod checker;
pub mod config;
pub mod context;
pub mod ctor_bridge;
pub mod default_policy;
pub mod descriptor;
pub mod filter;
pub mod invoker;
pub mod policy;
pub mod recorder;

pub use chain::{ChainSnapshot, PolicyChain};
pub use checker::{
    checked, checked_binary_op, checked_call, checked_cast, checked_comparison,
    checked_constructor, checked_get_array, checked_get_attribute, checked_get_property,
    checked_set_array, checked_set_attribute, checked_set_property, checked_static_call,
    checked_super_call, checked_super_constructor, checked_this_constructor,
};
pub use config::{ConfigError, SandboxConfig};
pub use context::ExecutionContext;
pub use ctor_bridge::{intercept_constructor_chains, prepare_sandboxed_class};
pub use default_policy::RejectAllPolicy;
pub use descriptor::{AssignOp, BinaryOp, ComparisonOp, OpFlags, Operation};
pub use filter::{FilterPolicy, ValueFilter};
pub use invoker::Invoker;
pub use policy::{Policy, SuperReceiver};
pub use recorder::RecordingPolicy;
