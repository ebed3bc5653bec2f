//! Sandboxed execution: the host object model, its built-ins, and the
//! interception layer in front of them.

pub mod ds;
pub mod sandbox;
pub mod std_lib;
