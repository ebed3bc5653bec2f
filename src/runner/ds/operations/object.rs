//! The real, unintercepted operations of the host object model. These are
//! what the last invoker of a policy chain performs.

use crate::runner::ds::class::{
    argument_types, ChainArgs, ChainTarget, ClassRef, ConstructorMatch, MarkerKind,
};
use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::object::Instance;
use crate::runner::ds::operations::type_conversion::{builtin_type_key, get_type, to_integer};
use crate::runner::ds::value::Value;
use crate::runner::sandbox::context::ExecutionContext;
use crate::runner::std_lib;

/// `getName` for `("get", "name")`.
pub fn accessor_name(prefix: &str, property: &str) -> String {
    let mut chars = property.chars();
    match chars.next() {
        Some(first) => format!("{}{}{}", prefix, first.to_uppercase(), chars.as_str()),
        None => prefix.to_string(),
    }
}

fn missing_method(receiver: &Value, name: &str, args: &[Value]) -> SandboxError {
    SandboxError::ReferenceError(format!(
        "No signature of method: {}.{}() is applicable for argument types: ({})",
        get_type(receiver),
        name,
        argument_types(args).join(", ")
    ))
}

fn missing_property(receiver: &Value, name: &str) -> SandboxError {
    SandboxError::ReferenceError(format!(
        "No such property: {} for class: {}",
        name,
        get_type(receiver)
    ))
}

pub fn invoke_method(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    match receiver {
        Value::Null => {
            return Err(SandboxError::TypeError(format!(
                "Cannot invoke method {}() on null object",
                name
            )))
        }
        Value::Object(o) => {
            let class = o.borrow().class.clone();
            if let Some(m) = class.find_method(name, args.len()) {
                return (m.body)(ctx, receiver, args);
            }
            // A field holding a function is callable like a method.
            let field = o.borrow().get_field(name).cloned();
            if let Some(Value::Function(f)) = field {
                return f.call(ctx, args);
            }
        }
        Value::Class(c) => {
            if let Some(m) = c.find_static_method(name, args.len()) {
                return (m.body)(ctx, receiver, args);
            }
        }
        Value::Function(f) if name == "call" => return f.call(ctx, args),
        Value::Map(m) => {
            let entry = m.borrow().get(name).cloned();
            if let Some(Value::Function(f)) = entry {
                return f.call(ctx, args);
            }
        }
        _ => {}
    }
    invoke_builtin(ctx, receiver, name, args)
}

fn invoke_builtin(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let builtin = std_lib::lookup(builtin_type_key(receiver), name)
        .or_else(|| std_lib::lookup("Object", name));
    match builtin {
        Some(f) => f(ctx, receiver, args),
        None => Err(missing_method(receiver, name, &args)),
    }
}

pub fn invoke_static(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    name: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let receiver = Value::Class(class.clone());
    match class.find_static_method(name, args.len()) {
        Some(m) => (m.body)(ctx, &receiver, args),
        None => invoke_builtin(ctx, &receiver, name, args),
    }
}

/// `super.name(args)` from a method declared in `sender`.
pub fn invoke_super(
    ctx: &mut ExecutionContext,
    sender: &ClassRef,
    receiver: &Value,
    name: &str,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let is_instance = match receiver {
        Value::Object(o) => o.borrow().class.is_subclass_of(sender),
        _ => false,
    };
    if !is_instance {
        return Err(SandboxError::TypeError(format!(
            "super.{}() from {} called on {}",
            name,
            sender.name,
            get_type(receiver)
        )));
    }
    let method = sender
        .superclass
        .as_ref()
        .and_then(|s| s.find_method(name, args.len()));
    match method {
        Some(m) => (m.body)(ctx, receiver, args),
        None => match std_lib::lookup("Object", name) {
            Some(f) => f(ctx, receiver, args),
            None => Err(missing_method(receiver, name, &args)),
        },
    }
}

pub fn instantiate(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    args: Vec<Value>,
) -> SandboxResult<Value> {
    let found = resolve_constructor(class, &args)?;
    let this = Value::Object(Instance::allocate(class));
    construct_into(ctx, class, found, &this, args)?;
    Ok(this)
}

fn illegal_synthetic_call(class: &ClassRef, index: usize) -> SandboxError {
    SandboxError::Resolution(format!(
        "Rejecting illegal call to synthetic constructor {}. Perhaps you meant to use one of [{}]",
        class.constructors[index].signature(&class.name),
        class.public_constructor_signatures().join(", ")
    ))
}

/// Pick the constructor `new Class(args)` would run. Markers are never
/// accepted here; only a constructor chain may hand one over.
pub fn resolve_constructor(class: &ClassRef, args: &[Value]) -> SandboxResult<ConstructorMatch> {
    if args.iter().any(|a| matches!(a, Value::Marker(_))) {
        return Err(SandboxError::Resolution(format!(
            "Constructor markers may not be passed to new {}(); candidates are [{}]",
            class.name,
            class.public_constructor_signatures().join(", ")
        )));
    }
    select_constructor(class, args)
}

/// Constructor selection for chained calls. A synthesized overload is only
/// ever selected when the first argument is a marker of its exact kind.
fn select_constructor(class: &ClassRef, args: &[Value]) -> SandboxResult<ConstructorMatch> {
    if class.constructors.is_empty() {
        return Err(SandboxError::Consistency(format!(
            "{} has no constructors; default constructor synthesis must run first",
            class.name
        )));
    }
    if let Some(Value::Marker(marker)) = args.first() {
        if let Some(i) = class
            .constructors
            .iter()
            .position(|c| c.synthetic == Some(marker.kind) && c.accepts(args))
        {
            return Ok(ConstructorMatch::Exact(i));
        }
    }
    match class.constructors.iter().position(|c| c.accepts(args)) {
        Some(i) if class.constructors[i].synthetic.is_some() => {
            Err(illegal_synthetic_call(class, i))
        }
        Some(i) => Ok(ConstructorMatch::Exact(i)),
        None => {
            if let [Value::Map(_)] = args {
                if let Some(i) = class
                    .constructors
                    .iter()
                    .position(|c| c.synthetic.is_none() && c.params.is_empty())
                {
                    return Ok(ConstructorMatch::MapProperties(i));
                }
            }
            Err(SandboxError::Resolution(format!(
                "Could not find matching constructor for: {}({}); candidates are [{}]",
                class.name,
                argument_types(args).join(", "),
                class.public_constructor_signatures().join(", ")
            )))
        }
    }
}

/// Run a resolved constructor against an already allocated instance.
pub fn construct_into(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    found: ConstructorMatch,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<()> {
    match found {
        ConstructorMatch::Exact(i) => run_constructor(ctx, class, i, this, args),
        ConstructorMatch::MapProperties(i) => {
            run_constructor(ctx, class, i, this, vec![])?;
            let entries: Vec<(String, Value)> = match args.first() {
                Some(Value::Map(m)) => m.borrow().iter().cloned().collect(),
                _ => {
                    return Err(SandboxError::Consistency(
                        "map constructor form without a map argument".to_string(),
                    ))
                }
            };
            for (k, v) in entries {
                set_property(ctx, this, &k, v)?;
            }
            Ok(())
        }
    }
}

fn run_constructor(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    index: usize,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<()> {
    let ctor = class.constructors.get(index).ok_or_else(|| {
        SandboxError::Consistency(format!("{} has no constructor #{}", class.name, index))
    })?;
    let marker = match ctor.synthetic {
        Some(kind) => match args.first() {
            Some(Value::Marker(m)) if m.kind == kind => Some(m.clone()),
            _ => {
                return Err(SandboxError::Consistency(format!(
                    "synthetic constructor {} entered without its {} marker",
                    ctor.signature(&class.name),
                    if kind == MarkerKind::This { "this-chain" } else { "super-chain" }
                )))
            }
        },
        None => None,
    };

    match &ctor.chain {
        Some(chain) => {
            let chain_args = match &chain.args {
                ChainArgs::Computed(f) => f(ctx, class, &args)?,
                ChainArgs::FromMarker => match &marker {
                    Some(m) => m.args().to_vec(),
                    None => {
                        return Err(SandboxError::Consistency(format!(
                            "{} reads a marker it was not given",
                            ctor.signature(&class.name)
                        )))
                    }
                },
            };
            chain_to(ctx, class, chain.target, this, chain_args)?;
        }
        None => {
            if let Some(sup) = &class.superclass {
                let found = resolve_constructor(sup, &[])?;
                construct_into(ctx, sup, found, this, vec![])?;
            }
        }
    }

    if let Some(body) = &ctor.body {
        let body_args = if marker.is_some() {
            &args[1..]
        } else {
            &args[..]
        };
        body(ctx, this, body_args)?;
    }
    Ok(())
}

/// The class a chained call lands in; `None` for `super(...)` on a root class.
pub fn chain_target_class(class: &ClassRef, target: ChainTarget) -> Option<ClassRef> {
    match target {
        ChainTarget::This => Some(class.clone()),
        ChainTarget::Super => class.superclass.clone(),
    }
}

/// Resolve a chained constructor call without running it.
pub fn resolve_chain_target(
    class: &ClassRef,
    target: ChainTarget,
    args: &[Value],
) -> SandboxResult<Option<(ClassRef, ConstructorMatch)>> {
    match chain_target_class(class, target) {
        Some(t) => {
            let found = select_constructor(&t, args)?;
            Ok(Some((t, found)))
        }
        None if args.is_empty() => Ok(None),
        None => Err(SandboxError::Resolution(format!(
            "{} has no superclass constructor taking ({})",
            class.name,
            argument_types(args).join(", ")
        ))),
    }
}

fn chain_to(
    ctx: &mut ExecutionContext,
    class: &ClassRef,
    target: ChainTarget,
    this: &Value,
    args: Vec<Value>,
) -> SandboxResult<()> {
    match resolve_chain_target(class, target, &args)? {
        Some((t, found)) => construct_into(ctx, &t, found, this, args),
        None => Ok(()),
    }
}

pub fn get_property(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &str,
) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot get property '{}' on null object",
            name
        ))),
        Value::Object(o) => {
            let class = o.borrow().class.clone();
            let getter = class
                .find_method(&accessor_name("get", name), 0)
                .or_else(|| class.find_method(&accessor_name("is", name), 0));
            if let Some(getter) = getter {
                return (getter.body)(ctx, receiver, vec![]);
            }
            let field = o.borrow().get_field(name).cloned();
            field.ok_or_else(|| missing_property(receiver, name))
        }
        Value::Map(m) => Ok(m.borrow().get(name).cloned().unwrap_or(Value::Null)),
        _ => {
            let key = builtin_type_key(receiver);
            for getter in [accessor_name("get", name), accessor_name("is", name)].iter() {
                if let Some(f) = std_lib::lookup(key, getter) {
                    return f(ctx, receiver, vec![]);
                }
            }
            Err(missing_property(receiver, name))
        }
    }
}

pub fn set_property(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    name: &str,
    value: Value,
) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot set property '{}' on null object",
            name
        ))),
        Value::Object(o) => {
            let class = o.borrow().class.clone();
            if let Some(setter) = class.find_method(&accessor_name("set", name), 1) {
                (setter.body)(ctx, receiver, vec![value.clone()])?;
                return Ok(value);
            }
            if o.borrow_mut().set_field(name, value.clone()) {
                Ok(value)
            } else {
                Err(missing_property(receiver, name))
            }
        }
        Value::Map(m) => {
            m.borrow_mut().insert(name.to_string(), value.clone());
            Ok(value)
        }
        _ => Err(SandboxError::ReferenceError(format!(
            "Cannot set read-only property: {} for class: {}",
            name,
            get_type(receiver)
        ))),
    }
}

/// Direct field read, bypassing getters.
pub fn get_attribute(receiver: &Value, name: &str) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot get attribute '{}' on null object",
            name
        ))),
        Value::Object(o) => o
            .borrow()
            .get_field(name)
            .cloned()
            .ok_or_else(|| missing_property(receiver, name)),
        Value::Map(m) => Ok(m.borrow().get(name).cloned().unwrap_or(Value::Null)),
        _ => Err(missing_property(receiver, name)),
    }
}

/// Direct field write, bypassing setters.
pub fn set_attribute(receiver: &Value, name: &str, value: Value) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot set attribute '{}' on null object",
            name
        ))),
        Value::Object(o) => {
            if o.borrow_mut().set_field(name, value.clone()) {
                Ok(value)
            } else {
                Err(missing_property(receiver, name))
            }
        }
        Value::Map(m) => {
            m.borrow_mut().insert(name.to_string(), value.clone());
            Ok(value)
        }
        _ => Err(missing_property(receiver, name)),
    }
}

/// Negative indexes count from the end.
fn normalize_index(i: i64, len: usize) -> Option<usize> {
    if i < 0 {
        let j = len as i64 + i;
        if j < 0 {
            None
        } else {
            Some(j as usize)
        }
    } else {
        Some(i as usize)
    }
}

fn index_key(index: &Value) -> String {
    match index {
        Value::String(s) => s.clone(),
        v => v.to_string(),
    }
}

pub fn get_index(ctx: &mut ExecutionContext, receiver: &Value, index: &Value) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot get index [{}] on null object",
            index
        ))),
        Value::List(l) => {
            let i = to_integer(index)?;
            let l = l.borrow();
            Ok(normalize_index(i, l.len())
                .and_then(|i| l.get(i).cloned())
                .unwrap_or(Value::Null))
        }
        Value::Map(m) => Ok(m.borrow().get(&index_key(index)).cloned().unwrap_or(Value::Null)),
        Value::String(s) => {
            let i = to_integer(index)?;
            let chars: Vec<char> = s.chars().collect();
            normalize_index(i, chars.len())
                .and_then(|i| chars.get(i))
                .map(|c| Value::String(c.to_string()))
                .ok_or_else(|| SandboxError::RangeError(format!("String index out of range: {}", i)))
        }
        _ => invoke_method(ctx, receiver, "getAt", vec![index.clone()]),
    }
}

pub fn set_index(
    ctx: &mut ExecutionContext,
    receiver: &Value,
    index: &Value,
    value: Value,
) -> SandboxResult<Value> {
    match receiver {
        Value::Null => Err(SandboxError::TypeError(format!(
            "Cannot set index [{}] on null object",
            index
        ))),
        Value::List(l) => {
            let i = to_integer(index)?;
            let mut l = l.borrow_mut();
            let len = l.len();
            let idx = normalize_index(i, len).ok_or_else(|| {
                SandboxError::RangeError(format!(
                    "Negative index [{}] too large for list of size {}",
                    i, len
                ))
            })?;
            if idx >= len {
                let limit = ctx.config().max_collection_size;
                if idx >= limit {
                    return Err(SandboxError::RangeError(format!(
                        "Index [{}] would grow a list of size {} past the limit of {}",
                        i, len, limit
                    )));
                }
                l.resize(idx + 1, Value::Null);
            }
            l[idx] = value.clone();
            Ok(value)
        }
        Value::Map(m) => {
            m.borrow_mut().insert(index_key(index), value.clone());
            Ok(value)
        }
        _ => {
            invoke_method(ctx, receiver, "putAt", vec![index.clone(), value.clone()])?;
            Ok(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::class::{ClassBuilder, Constructor, ParamType};

    #[test]
    fn test_accessor_name() {
        assert_eq!(accessor_name("get", "name"), "getName");
        assert_eq!(accessor_name("set", "x"), "setX");
    }

    #[test]
    fn test_list_index_pads_and_counts_from_end() {
        let mut ctx = ExecutionContext::new();
        let l = Value::list(vec![Value::from(1)]);
        set_index(&mut ctx, &l, &Value::from(2), Value::from(3)).unwrap();
        assert_eq!(l, Value::list(vec![Value::from(1), Value::Null, Value::from(3)]));
        assert_eq!(get_index(&mut ctx, &l, &Value::from(-1)).unwrap(), Value::from(3));
        assert_eq!(get_index(&mut ctx, &l, &Value::from(10)).unwrap(), Value::Null);
        assert!(set_index(&mut ctx, &l, &Value::from(-9), Value::Null).is_err());
    }

    #[test]
    fn test_property_prefers_getter_over_field() {
        let c = ClassBuilder::new("Account")
            .field("balance", Value::from(10))
            .method("getBalance", Some(0), |_, _, _| Ok(Value::from(99)))
            .build();
        let mut ctx = ExecutionContext::new();
        let a = instantiate(&mut ctx, &c, vec![]).unwrap();
        assert_eq!(get_property(&mut ctx, &a, "balance").unwrap(), Value::from(99));
        assert_eq!(get_attribute(&a, "balance").unwrap(), Value::from(10));
    }

    #[test]
    fn test_map_argument_sets_properties() {
        let c = ClassBuilder::new("Point")
            .field("x", Value::from(0))
            .field("y", Value::from(0))
            .build();
        let mut ctx = ExecutionContext::new();
        let arg = Value::map(vec![("x".to_string(), Value::from(4))]);
        let p = instantiate(&mut ctx, &c, vec![arg]).unwrap();
        assert_eq!(get_attribute(&p, "x").unwrap(), Value::from(4));
    }

    #[test]
    fn test_unmatched_constructor_lists_candidates() {
        let c = ClassBuilder::new("Point")
            .constructor(Constructor::new(vec![ParamType::Number, ParamType::Number]))
            .build();
        let mut ctx = ExecutionContext::new();
        let err = instantiate(&mut ctx, &c, vec![Value::from("a")]).unwrap_err();
        match err {
            SandboxError::Resolution(msg) => assert!(msg.contains("Point(Number, Number)")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_missing_method_names_argument_types() {
        let mut ctx = ExecutionContext::new();
        let err = invoke_method(&mut ctx, &Value::from(1), "frobnicate", vec![Value::from("x")])
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Uncaught reference error: No signature of method: Integer.frobnicate() is applicable for argument types: (String)"
        );
    }
}
