use std::fmt;
use std::fmt::{Display, Formatter};

use thiserror::Error;

/// The kind of dynamic operation an error or a policy decision refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    MethodCall,
    StaticCall,
    Construct,
    SuperCall,
    SuperConstruct,
    GetProperty,
    SetProperty,
    GetAttribute,
    SetAttribute,
    GetArray,
    SetArray,
}
impl OperationKind {
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            OperationKind::SetProperty | OperationKind::SetAttribute | OperationKind::SetArray
        )
    }
}
impl Display for OperationKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            OperationKind::MethodCall => "method call",
            OperationKind::StaticCall => "static call",
            OperationKind::Construct => "construct",
            OperationKind::SuperCall => "super call",
            OperationKind::SuperConstruct => "super constructor call",
            OperationKind::GetProperty => "property get",
            OperationKind::SetProperty => "property set",
            OperationKind::GetAttribute => "attribute get",
            OperationKind::SetAttribute => "attribute set",
            OperationKind::GetArray => "array get",
            OperationKind::SetArray => "array set",
        };
        write!(f, "{}", s)
    }
}

/// Identifies a refused operation: what was attempted, on what, with what.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub kind: OperationKind,
    pub receiver_type: String,
    pub name: Option<String>,
    pub argument_types: Vec<String>,
    pub reason: String,
}
impl Rejection {
    pub fn new(
        kind: OperationKind,
        receiver_type: impl Into<String>,
        name: Option<&str>,
        argument_types: Vec<String>,
        reason: impl Into<String>,
    ) -> Self {
        Rejection {
            kind,
            receiver_type: receiver_type.into(),
            name: name.map(|n| n.to_string()),
            argument_types,
            reason: reason.into(),
        }
    }

    /// Signature-like rendering, e.g. `Widget.foo(Integer,String)`.
    pub fn signature(&self) -> String {
        let args = self.argument_types.join(",");
        match (self.kind, &self.name) {
            (OperationKind::Construct, _) | (OperationKind::SuperConstruct, _) => {
                format!("new {}({})", self.receiver_type, args)
            }
            (OperationKind::GetArray, _) | (OperationKind::SetArray, _) => {
                format!("{}[{}]", self.receiver_type, args)
            }
            (OperationKind::GetProperty, Some(n))
            | (OperationKind::SetProperty, Some(n))
            | (OperationKind::GetAttribute, Some(n))
            | (OperationKind::SetAttribute, Some(n)) => {
                format!("{}.{}", self.receiver_type, n)
            }
            (_, Some(n)) => format!("{}.{}({})", self.receiver_type, n, args),
            (_, None) => format!("{}({})", self.receiver_type, args),
        }
    }
}
impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {}: {}", self.kind, self.signature(), self.reason)
    }
}

#[derive(Debug, Error)]
pub enum SandboxError {
    /// A policy (or the fail-closed default) refused the operation.
    #[error("Rejected {0}")]
    Rejected(Rejection),
    /// No real operation matches the receiver/argument shapes.
    #[error("Unresolved: {0}")]
    Resolution(String),
    /// An internal invariant was violated. Never retried.
    #[error("Internal consistency failure: {0}")]
    Consistency(String),
    /// A class cannot be prepared for sandboxed use.
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Uncaught reference error: {0}")]
    ReferenceError(String),
    #[error("Uncaught type error: {0}")]
    TypeError(String),
    #[error("Uncaught range error: {0}")]
    RangeError(String),
    /// Caller code re-wrapping an error; the original stays reachable as `source()`.
    #[error("{message}")]
    Wrapped {
        message: String,
        #[source]
        source: Box<SandboxError>,
    },
}
impl SandboxError {
    pub fn wrap(self, message: impl Into<String>) -> Self {
        SandboxError::Wrapped {
            message: message.into(),
            source: Box::new(self),
        }
    }

    pub fn is_rejection(&self) -> bool {
        self.rejection().is_some()
    }

    /// The denial behind this error, looking through any wrapping.
    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            SandboxError::Rejected(r) => Some(r),
            SandboxError::Wrapped { source, .. } => source.rejection(),
            _ => None,
        }
    }

    /// The innermost error, looking through any wrapping.
    pub fn root_cause(&self) -> &SandboxError {
        match self {
            SandboxError::Wrapped { source, .. } => source.root_cause(),
            e => e,
        }
    }
}

pub type SandboxResult<T> = Result<T, SandboxError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_signature_rendering() {
        let r = Rejection::new(
            OperationKind::MethodCall,
            "Widget",
            Some("foo"),
            vec!["Integer".to_string(), "String".to_string()],
            "no policy",
        );
        assert_eq!(r.signature(), "Widget.foo(Integer,String)");

        let r = Rejection::new(OperationKind::Construct, "Widget", None, vec![], "no");
        assert_eq!(r.signature(), "new Widget()");

        let r = Rejection::new(
            OperationKind::SetArray,
            "List",
            None,
            vec!["Integer".to_string(), "String".to_string()],
            "no",
        );
        assert_eq!(r.signature(), "List[Integer,String]");
    }

    #[test]
    fn test_wrapped_keeps_cause() {
        let e = SandboxError::Rejected(Rejection::new(
            OperationKind::GetProperty,
            "Widget",
            Some("secret"),
            vec![],
            "denied",
        ))
        .wrap("script failed");
        assert!(e.is_rejection());
        assert!(e.source().is_some());
        assert!(matches!(e.root_cause(), SandboxError::Rejected(_)));
        assert_eq!(e.to_string(), "script failed");
    }
}
