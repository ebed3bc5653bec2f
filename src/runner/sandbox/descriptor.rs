//! Operation descriptors: what the facade is asked to do, in one shape for
//! every kind of operation.

use crate::runner::ds::class::ClassRef;
use crate::runner::ds::error::OperationKind;
use crate::runner::ds::value::Value;

/// Call-site modifiers supplied by the code that routes into the facade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpFlags {
    /// `a?.b`: a null receiver short-circuits without any dispatch.
    pub null_safe: bool,
    /// `a*.b`: apply the operation to each element of the receiver.
    pub broadcast: bool,
}
impl OpFlags {
    pub const NONE: OpFlags = OpFlags {
        null_safe: false,
        broadcast: false,
    };
    pub const NULL_SAFE: OpFlags = OpFlags {
        null_safe: true,
        broadcast: false,
    };
    pub const BROADCAST: OpFlags = OpFlags {
        null_safe: false,
        broadcast: true,
    };
}

/// Arithmetic, bitwise and shift operators, each dispatched as a method call
/// on the left operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Plus,
    Minus,
    Multiply,
    Div,
    Mod,
    Power,
    LeftShift,
    RightShift,
    And,
    Or,
    Xor,
}
impl BinaryOp {
    pub fn method_name(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "plus",
            BinaryOp::Minus => "minus",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Power => "power",
            BinaryOp::LeftShift => "leftShift",
            BinaryOp::RightShift => "rightShift",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Plus => "+",
            BinaryOp::Minus => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Power => "**",
            BinaryOp::LeftShift => "<<",
            BinaryOp::RightShift => ">>",
            BinaryOp::And => "&",
            BinaryOp::Or => "|",
            BinaryOp::Xor => "^",
        }
    }
}

/// `=` or a compound assignment such as `+=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Compound(BinaryOp),
}
impl AssignOp {
    pub fn binary_op(&self) -> Option<BinaryOp> {
        match self {
            AssignOp::Assign => None,
            AssignOp::Compound(op) => Some(*op),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}
impl ComparisonOp {
    pub fn is_equality(&self) -> bool {
        matches!(self, ComparisonOp::Eq | ComparisonOp::Ne)
    }

    /// Whether an ordering satisfies this comparison.
    pub fn holds(&self, o: std::cmp::Ordering) -> bool {
        use std::cmp::Ordering::*;
        match self {
            ComparisonOp::Eq => o == Equal,
            ComparisonOp::Ne => o != Equal,
            ComparisonOp::Lt => o == Less,
            ComparisonOp::Le => o != Greater,
            ComparisonOp::Gt => o == Greater,
            ComparisonOp::Ge => o != Less,
        }
    }
}

/// One intercepted operation. Built fresh per call and consumed by
/// [`checked`](super::checker::checked).
///
/// Arguments follow a per-kind layout: set-style operations carry the
/// assigned value last, indexed operations carry the index first.
#[derive(Debug, Clone)]
pub struct Operation {
    pub kind: OperationKind,
    pub receiver: Value,
    pub name: Option<String>,
    pub args: Vec<Value>,
    pub flags: OpFlags,
    pub assign: Option<AssignOp>,
    /// The class whose code issued a super call.
    pub declaring: Option<ClassRef>,
}

impl Operation {
    fn new(kind: OperationKind, receiver: Value, name: Option<&str>, args: Vec<Value>) -> Self {
        Operation {
            kind,
            receiver,
            name: name.map(|n| n.to_string()),
            args,
            flags: OpFlags::NONE,
            assign: None,
            declaring: None,
        }
    }

    pub fn method_call(receiver: Value, method: &str, args: Vec<Value>) -> Self {
        Self::new(OperationKind::MethodCall, receiver, Some(method), args)
    }

    pub fn static_call(class: &ClassRef, method: &str, args: Vec<Value>) -> Self {
        Self::new(
            OperationKind::StaticCall,
            Value::Class(class.clone()),
            Some(method),
            args,
        )
    }

    pub fn construct(class: &ClassRef, args: Vec<Value>) -> Self {
        Self::new(OperationKind::Construct, Value::Class(class.clone()), None, args)
    }

    pub fn super_call(declaring: &ClassRef, receiver: Value, method: &str, args: Vec<Value>) -> Self {
        let mut op = Self::new(OperationKind::SuperCall, receiver, Some(method), args);
        op.declaring = Some(declaring.clone());
        op
    }

    pub fn get_property(receiver: Value, property: &str) -> Self {
        Self::new(OperationKind::GetProperty, receiver, Some(property), vec![])
    }

    pub fn set_property(receiver: Value, property: &str, value: Value) -> Self {
        Self::new(OperationKind::SetProperty, receiver, Some(property), vec![value])
            .with_assign(AssignOp::Assign)
    }

    pub fn get_attribute(receiver: Value, attribute: &str) -> Self {
        Self::new(OperationKind::GetAttribute, receiver, Some(attribute), vec![])
    }

    pub fn set_attribute(receiver: Value, attribute: &str, value: Value) -> Self {
        Self::new(OperationKind::SetAttribute, receiver, Some(attribute), vec![value])
            .with_assign(AssignOp::Assign)
    }

    pub fn get_array(receiver: Value, index: Value) -> Self {
        Self::new(OperationKind::GetArray, receiver, None, vec![index])
    }

    pub fn set_array(receiver: Value, index: Value, value: Value) -> Self {
        Self::new(OperationKind::SetArray, receiver, None, vec![index, value])
            .with_assign(AssignOp::Assign)
    }

    pub fn with_flags(mut self, flags: OpFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn null_safe(mut self) -> Self {
        self.flags.null_safe = true;
        self
    }

    pub fn broadcast(mut self) -> Self {
        self.flags.broadcast = true;
        self
    }

    pub fn with_assign(mut self, assign: AssignOp) -> Self {
        self.assign = Some(assign);
        self
    }

    /// The value a set-style operation assigns; `Null` for other kinds.
    pub fn assigned_value(&self) -> Value {
        if self.kind.is_set() {
            self.args.last().cloned().unwrap_or(Value::Null)
        } else {
            Value::Null
        }
    }

    /// The same operation aimed at one element of a broadcast receiver.
    pub(crate) fn for_element(&self, element: Value) -> Self {
        Operation {
            kind: self.kind,
            receiver: element,
            name: self.name.clone(),
            args: self.args.clone(),
            flags: OpFlags::NULL_SAFE,
            assign: self.assign,
            declaring: self.declaring.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_operations_carry_value_last() {
        let op = Operation::set_array(Value::list(vec![]), Value::from(0), Value::from("v"));
        assert_eq!(op.assigned_value(), Value::from("v"));
        assert_eq!(op.assign, Some(AssignOp::Assign));
        let op = Operation::get_property(Value::Null, "x").null_safe();
        assert_eq!(op.assigned_value(), Value::Null);
        assert!(op.flags.null_safe);
    }

    #[test]
    fn test_compound_assign_maps_to_method() {
        let op = AssignOp::Compound(BinaryOp::LeftShift);
        assert_eq!(op.binary_op().map(|b| b.method_name()), Some("leftShift"));
        assert!(ComparisonOp::Le.holds(std::cmp::Ordering::Equal));
        assert!(!ComparisonOp::Gt.holds(std::cmp::Ordering::Less));
    }
}
