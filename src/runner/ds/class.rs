//! Class definitions for the host object model.
//!
//! A class carries instance methods, static methods, declared fields with
//! their initial values, an optional superclass, and constructors. A
//! constructor's chained `this(...)` / `super(...)` call is a structural
//! part of the [`Constructor`], not an expression in its body: the runtime
//! evaluates it first and runs the target constructor on the same instance
//! without going through the checked-operation facade.

use std::collections::HashMap;
use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use crate::runner::ds::error::SandboxResult;
use crate::runner::ds::operations::type_conversion::get_type;
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;

pub type ClassRef = Rc<ClassDef>;

/// Body of an instance or static method. Static methods receive the class as `this`.
pub type MethodBody = Rc<dyn Fn(&mut ExecutionContext, &Value, Vec<Value>) -> SandboxResult<Value>>;

/// Statements a constructor runs after its chained call.
pub type ConstructorBody = Rc<dyn Fn(&mut ExecutionContext, &Value, &[Value]) -> SandboxResult<()>>;

/// Evaluates the arguments of a chained constructor call from the
/// constructor's own parameters. The class is the one declaring the constructor.
pub type ChainArgsFn =
    Rc<dyn Fn(&mut ExecutionContext, &ClassRef, &[Value]) -> SandboxResult<Vec<Value>>>;

#[derive(Clone)]
pub struct Method {
    pub name: String,
    /// `None` accepts any number of arguments.
    pub arity: Option<usize>,
    pub body: MethodBody,
}
impl Method {
    pub fn accepts(&self, argc: usize) -> bool {
        self.arity.map_or(true, |a| a == argc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    /// Chains to another constructor of the same class.
    This,
    /// Chains to a constructor of the superclass.
    Super,
}

/// Pre-checked arguments for a chained constructor call, consumed by the
/// synthesized constructor overload.
pub struct ConstructorMarker {
    pub kind: MarkerKind,
    args: Vec<Value>,
}
impl ConstructorMarker {
    pub(crate) fn new(kind: MarkerKind, args: Vec<Value>) -> Self {
        ConstructorMarker { kind, args }
    }

    pub fn arg(&self, index: usize) -> Option<&Value> {
        self.args.get(index)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }
}
impl Display for ConstructorMarker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self.kind {
            MarkerKind::This => write!(f, "<this-chain {} args>", self.args.len()),
            MarkerKind::Super => write!(f, "<super-chain {} args>", self.args.len()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    Any,
    Boolean,
    Number,
    String,
    List,
    Map,
    Function,
    /// An instance of the named class or one of its subclasses.
    Object(String),
    Marker(MarkerKind),
}
impl ParamType {
    /// Whether `value` can be bound to a parameter of this type. `Null`
    /// binds to every reference type. Marker parameters bind to anything;
    /// the constructor resolver gates them separately.
    pub fn accepts(&self, value: &Value) -> bool {
        match (self, value) {
            (ParamType::Any, _) | (ParamType::Marker(_), _) => true,
            (ParamType::Boolean, Value::Boolean(_)) => true,
            (ParamType::Number, Value::Number(_)) => true,
            (_, Value::Null) => !matches!(self, ParamType::Boolean | ParamType::Number),
            (ParamType::String, Value::String(_)) => true,
            (ParamType::List, Value::List(_)) => true,
            (ParamType::Map, Value::Map(_)) => true,
            (ParamType::Function, Value::Function(_)) => true,
            (ParamType::Object(name), Value::Object(o)) => o.borrow().class.is_a(name),
            _ => false,
        }
    }
}
impl Display for ParamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Any => write!(f, "Object"),
            ParamType::Boolean => write!(f, "Boolean"),
            ParamType::Number => write!(f, "Number"),
            ParamType::String => write!(f, "String"),
            ParamType::List => write!(f, "List"),
            ParamType::Map => write!(f, "Map"),
            ParamType::Function => write!(f, "Function"),
            ParamType::Object(name) => write!(f, "{}", name),
            ParamType::Marker(MarkerKind::This) => write!(f, "ThisConstructorMarker"),
            ParamType::Marker(MarkerKind::Super) => write!(f, "SuperConstructorMarker"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChainTarget {
    This,
    Super,
}

#[derive(Clone)]
pub enum ChainArgs {
    Computed(ChainArgsFn),
    /// Positional extraction from the leading marker argument.
    FromMarker,
}

#[derive(Clone)]
pub struct ChainCall {
    pub target: ChainTarget,
    pub args: ChainArgs,
}

#[derive(Clone)]
pub struct Constructor {
    pub params: Vec<ParamType>,
    pub chain: Option<ChainCall>,
    pub body: Option<ConstructorBody>,
    /// Set on overloads synthesized by the constructor-chaining bridge.
    pub synthetic: Option<MarkerKind>,
}
impl Constructor {
    pub fn new(params: Vec<ParamType>) -> Self {
        Constructor {
            params,
            chain: None,
            body: None,
            synthetic: None,
        }
    }

    pub fn chain_this<F>(mut self, args: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &ClassRef, &[Value]) -> SandboxResult<Vec<Value>> + 'static,
    {
        self.chain = Some(ChainCall {
            target: ChainTarget::This,
            args: ChainArgs::Computed(Rc::new(args)),
        });
        self
    }

    pub fn chain_super<F>(mut self, args: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &ClassRef, &[Value]) -> SandboxResult<Vec<Value>> + 'static,
    {
        self.chain = Some(ChainCall {
            target: ChainTarget::Super,
            args: ChainArgs::Computed(Rc::new(args)),
        });
        self
    }

    pub fn body<F>(mut self, body: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &Value, &[Value]) -> SandboxResult<()> + 'static,
    {
        self.body = Some(Rc::new(body));
        self
    }

    pub fn accepts(&self, args: &[Value]) -> bool {
        self.params.len() == args.len()
            && self.params.iter().zip(args).all(|(p, a)| p.accepts(a))
    }

    pub fn signature(&self, class_name: &str) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
        format!("{}({})", class_name, params.join(", "))
    }
}

pub struct ClassDef {
    pub name: String,
    pub superclass: Option<ClassRef>,
    pub fields: Vec<(String, Value)>,
    pub methods: HashMap<String, Vec<Method>>,
    pub static_methods: HashMap<String, Vec<Method>>,
    pub constructors: Vec<Constructor>,
}
impl ClassDef {
    /// Instance method lookup, walking up the superclass chain.
    pub fn find_method(&self, name: &str, argc: usize) -> Option<Method> {
        match self
            .methods
            .get(name)
            .and_then(|ms| ms.iter().find(|m| m.accepts(argc)))
        {
            Some(m) => Some(m.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|s| s.find_method(name, argc)),
        }
    }

    pub fn find_static_method(&self, name: &str, argc: usize) -> Option<Method> {
        match self
            .static_methods
            .get(name)
            .and_then(|ms| ms.iter().find(|m| m.accepts(argc)))
        {
            Some(m) => Some(m.clone()),
            None => self
                .superclass
                .as_ref()
                .and_then(|s| s.find_static_method(name, argc)),
        }
    }

    pub fn declares_field(&self, name: &str) -> bool {
        self.fields.iter().any(|(f, _)| f == name)
            || self
                .superclass
                .as_ref()
                .map_or(false, |s| s.declares_field(name))
    }

    /// Whether this class is `name` or inherits from it.
    pub fn is_a(&self, name: &str) -> bool {
        self.name == name || self.superclass.as_ref().map_or(false, |s| s.is_a(name))
    }

    pub fn is_subclass_of(&self, other: &ClassDef) -> bool {
        std::ptr::eq(self, other)
            || self
                .superclass
                .as_ref()
                .map_or(false, |s| s.is_subclass_of(other))
    }

    /// Field initial values, superclass fields first.
    pub fn initial_fields(&self) -> Vec<(String, Value)> {
        let mut fields = match &self.superclass {
            Some(s) => s.initial_fields(),
            None => Vec::new(),
        };
        for (name, value) in &self.fields {
            match fields.iter_mut().find(|(n, _)| n == name) {
                Some(slot) => slot.1 = value.clone(),
                None => fields.push((name.clone(), value.clone())),
            }
        }
        fields
    }

    /// Signatures of the constructors callers may legitimately use.
    pub fn public_constructor_signatures(&self) -> Vec<String> {
        self.constructors
            .iter()
            .filter(|c| c.synthetic.is_none())
            .map(|c| c.signature(&self.name))
            .collect()
    }
}

impl fmt::Debug for ClassDef {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassDef")
            .field("name", &self.name)
            .field("superclass", &self.superclass.as_ref().map(|s| &s.name))
            .field("constructors", &self.constructors.len())
            .finish()
    }
}

/// The result of matching call arguments against a class's constructors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConstructorMatch {
    Exact(usize),
    /// No constructor takes the single map argument; run the no-argument
    /// constructor at this index and then assign each entry as a property.
    MapProperties(usize),
}

pub struct ClassBuilder {
    def: ClassDef,
}
impl ClassBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        ClassBuilder {
            def: ClassDef {
                name: name.into(),
                superclass: None,
                fields: Vec::new(),
                methods: HashMap::new(),
                static_methods: HashMap::new(),
                constructors: Vec::new(),
            },
        }
    }

    pub fn extends(mut self, superclass: &ClassRef) -> Self {
        self.def.superclass = Some(superclass.clone());
        self
    }

    pub fn field(mut self, name: impl Into<String>, initial: Value) -> Self {
        self.def.fields.push((name.into(), initial));
        self
    }

    pub fn method<F>(mut self, name: impl Into<String>, arity: Option<usize>, body: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &Value, Vec<Value>) -> SandboxResult<Value> + 'static,
    {
        let name = name.into();
        self.def
            .methods
            .entry(name.clone())
            .or_insert_with(Vec::new)
            .push(Method {
                name,
                arity,
                body: Rc::new(body),
            });
        self
    }

    pub fn static_method<F>(mut self, name: impl Into<String>, arity: Option<usize>, body: F) -> Self
    where
        F: Fn(&mut ExecutionContext, &Value, Vec<Value>) -> SandboxResult<Value> + 'static,
    {
        let name = name.into();
        self.def
            .static_methods
            .entry(name.clone())
            .or_insert_with(Vec::new)
            .push(Method {
                name,
                arity,
                body: Rc::new(body),
            });
        self
    }

    pub fn constructor(mut self, constructor: Constructor) -> Self {
        self.def.constructors.push(constructor);
        self
    }

    /// Finish the definition, adding a public no-argument constructor when
    /// none was declared.
    pub fn into_def(mut self) -> ClassDef {
        if self.def.constructors.is_empty() {
            self.def.constructors.push(Constructor::new(vec![]));
        }
        self.def
    }

    pub fn build(self) -> ClassRef {
        Rc::new(self.into_def())
    }
}

/// Describes argument types the way error messages and policies see them.
pub fn argument_types(args: &[Value]) -> Vec<String> {
    args.iter().map(|a| get_type(a)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_adds_default_constructor() {
        let c = ClassBuilder::new("Widget").build();
        assert_eq!(c.constructors.len(), 1);
        assert!(c.constructors[0].params.is_empty());
        assert_eq!(c.public_constructor_signatures(), vec!["Widget()".to_string()]);
    }

    #[test]
    fn test_method_lookup_walks_superclass() {
        let base = ClassBuilder::new("Base")
            .method("hello", Some(0), |_, _, _| Ok(Value::from("base")))
            .build();
        let derived = ClassBuilder::new("Derived").extends(&base).build();
        assert!(derived.find_method("hello", 0).is_some());
        assert!(derived.find_method("hello", 1).is_none());
        assert!(derived.is_a("Base"));
        assert!(derived.is_subclass_of(&base));
        assert!(!base.is_subclass_of(&derived));
    }

    #[test]
    fn test_initial_fields_are_overridden_by_subclass() {
        let base = ClassBuilder::new("Base")
            .field("x", Value::from(1))
            .field("y", Value::from(2))
            .build();
        let derived = ClassBuilder::new("Derived")
            .extends(&base)
            .field("y", Value::from(3))
            .build();
        let fields = derived.initial_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields[1], ("y".to_string(), Value::from(3)));
    }

    #[test]
    fn test_param_types_accept_null_for_references_only() {
        assert!(ParamType::String.accepts(&Value::Null));
        assert!(!ParamType::Number.accepts(&Value::Null));
        assert!(ParamType::Marker(MarkerKind::Super).accepts(&Value::from(1)));
    }
}
