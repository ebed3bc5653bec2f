//! Registry of built-in methods, keyed by type and method name.

use std::collections::HashMap;

use crate::runner::ds::error::SandboxResult;
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;

use super::core::register_core_builtins;

/// A built-in method. `this` is the receiver the call was made on.
pub type BuiltinFn = fn(&mut ExecutionContext, &Value, Vec<Value>) -> SandboxResult<Value>;

/// The built-in methods of one value type.
pub struct BuiltinType {
    pub name: &'static str,
    methods: HashMap<&'static str, BuiltinFn>,
}

impl BuiltinType {
    pub fn new(name: &'static str) -> Self {
        BuiltinType {
            name,
            methods: HashMap::new(),
        }
    }

    pub fn add_method(mut self, name: &'static str, func: BuiltinFn) -> Self {
        self.methods.insert(name, func);
        self
    }

    pub fn method_names(&self) -> Vec<&'static str> {
        let mut names: Vec<&'static str> = self.methods.keys().copied().collect();
        names.sort_unstable();
        names
    }
}

pub struct BuiltinRegistry {
    types: HashMap<&'static str, BuiltinType>,
}

impl BuiltinRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        BuiltinRegistry {
            types: HashMap::new(),
        }
    }

    /// Create a registry holding every core built-in.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_builtins(&mut registry);
        registry
    }

    /// Register a type. Methods of an already registered type with the
    /// same name are merged, later registrations winning.
    pub fn register_type(&mut self, t: BuiltinType) {
        match self.types.get_mut(t.name) {
            Some(existing) => existing.methods.extend(t.methods),
            None => {
                self.types.insert(t.name, t);
            }
        }
    }

    pub fn get_method(&self, type_name: &str, method: &str) -> Option<BuiltinFn> {
        self.types.get(type_name)?.methods.get(method).copied()
    }

    pub fn has_method(&self, type_name: &str, method: &str) -> bool {
        self.get_method(type_name, method).is_some()
    }

    pub fn get_type(&self, type_name: &str) -> Option<&BuiltinType> {
        self.types.get(type_name)
    }
}

impl Default for BuiltinRegistry {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    static ref CORE_BUILTINS: BuiltinRegistry = BuiltinRegistry::with_core();
}

/// Look up a core built-in method.
pub fn lookup(type_name: &str, method: &str) -> Option<BuiltinFn> {
    CORE_BUILTINS.get_method(type_name, method)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_registry_has_operator_methods() {
        for name in &["plus", "minus", "multiply", "div", "compareTo"] {
            assert!(lookup("Number", name).is_some(), "Number.{}", name);
        }
        assert!(lookup("String", "plus").is_some());
        assert!(lookup("Object", "asType").is_some());
        assert!(lookup("Number", "nope").is_none());
    }

    #[test]
    fn test_later_registration_merges() {
        fn forty_two(
            _: &mut ExecutionContext,
            _: &Value,
            _: Vec<Value>,
        ) -> SandboxResult<Value> {
            Ok(Value::from(42))
        }
        let mut registry = BuiltinRegistry::with_core();
        registry.register_type(BuiltinType::new("String").add_method("size", forty_two));
        assert!(registry.has_method("String", "trim"));
        let f = registry.get_method("String", "size").unwrap();
        let mut ctx = ExecutionContext::new();
        assert_eq!(f(&mut ctx, &Value::from("ab"), vec![]).unwrap(), Value::from(42));
    }
}
