//! # just_sandbox - mediated dynamic dispatch
//!
//! An interception core for running untrusted, dynamically-dispatched code.
//! Every operation such code performs on the outside world (method calls,
//! construction, property, attribute and index access, casts and operators)
//! goes through a chain of embedder-supplied policies first:
//!
//! - Policies are visited in registration order, each deciding to forward,
//!   substitute a result, or refuse.
//! - A context with no policy refuses everything.
//! - Chained `this(...)` / `super(...)` constructor calls are checked too.
//!
//! ## Quick Start
//!
//! ```
//! use std::rc::Rc;
//! use just_sandbox::runner::ds::error::SandboxResult;
//! use just_sandbox::runner::ds::value::Value;
//! use just_sandbox::runner::sandbox::{checked_call, ExecutionContext, Invoker, OpFlags, Policy};
//!
//! /// Allows everything except `String.toUpperCase()`.
//! struct NoShouting;
//!
//! impl Policy for NoShouting {
//!     fn on_method_call(
//!         &self,
//!         invoker: &mut Invoker<'_>,
//!         receiver: Value,
//!         method: &str,
//!         args: Vec<Value>,
//!     ) -> SandboxResult<Value> {
//!         if method == "toUpperCase" {
//!             return Ok(receiver);
//!         }
//!         invoker.call(receiver, Some(method), args)
//!     }
//! }
//!
//! let mut ctx = ExecutionContext::new();
//! ctx.register(Rc::new(NoShouting));
//!
//! let quiet = checked_call(&mut ctx, Value::from("hi"), "toUpperCase", vec![], OpFlags::NONE);
//! assert_eq!(quiet.unwrap(), Value::from("hi"));
//! let n = checked_call(&mut ctx, Value::from(2), "plus", vec![Value::from(3)], OpFlags::NONE);
//! assert_eq!(n.unwrap(), Value::from(5));
//! ```
//!
//! ## Architecture
//!
//! - **[`runner::sandbox`]** - policies, the invoker chain, the checked-operation facade
//! - **[`runner::ds`]** - the host object model and its real operations
//! - **[`runner::std_lib`]** - built-in methods of primitive values

#[macro_use]
extern crate lazy_static;

pub mod runner;
