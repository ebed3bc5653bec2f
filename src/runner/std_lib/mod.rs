//! Built-in methods of the primitive value types.
//!
//! These are what a method call on a string, number, list, map, boolean,
//! class or function reaches once no user-defined method matches. Every
//! built-in is a plain `fn` keyed by the receiver's type and the method
//! name; the table is assembled once and shared.

pub mod core;
pub mod registry;
pub mod object;
pub mod list;
pub mod map;
pub mod string;
pub mod number;

pub use self::core::register_core_builtins;
pub use self::registry::{lookup, BuiltinFn, BuiltinRegistry, BuiltinType};

use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::value::Value;

/// Fail unless exactly `expected` arguments were passed.
pub(crate) fn check_arity(method: &str, args: &[Value], expected: usize) -> SandboxResult<()> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(SandboxError::TypeError(format!(
            "{}() takes {} argument(s) but {} were given",
            method,
            expected,
            args.len()
        )))
    }
}
