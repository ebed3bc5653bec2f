//! Core built-ins registration.

use super::registry::BuiltinRegistry;

use super::list;
use super::map;
use super::number;
use super::object;
use super::string;

/// Register every built-in type with the registry.
pub fn register_core_builtins(registry: &mut BuiltinRegistry) {
    // "Object" holds the methods every other type falls back to.
    object::register(registry);
    list::register(registry);
    map::register(registry);
    string::register(registry);
    number::register(registry);
}
