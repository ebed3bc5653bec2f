//! Checking the arguments of chained constructor calls.
//!
//! A constructor's `this(...)` or `super(...)` call runs before its body
//! and is performed by the runtime directly on the instance being built;
//! it cannot be swapped for a checked call. Instead every such constructor
//! is split in two:
//!
//! ```text
//! A(p) { super(f(p)); body }
//!
//! A(p)                      { this(checked_super_constructor(A, [f(p)]), p) }
//! A(SuperConstructorMarker m, p) { super(m[0]); body }     // synthesized
//! ```
//!
//! The rewritten public constructor evaluates the chained arguments, runs
//! them past the policies, and hands them over in a marker. The synthesized
//! overload unpacks the marker positionally. The constructor resolver only
//! ever selects a synthesized overload when the first argument is a marker
//! of its exact kind, so it cannot be called from sandboxed code.

use std::rc::Rc;

use crate::runner::ds::class::{
    ChainArgs, ChainCall, ChainTarget, ClassDef, ClassRef, Constructor, MarkerKind, ParamType,
};
use crate::runner::ds::error::{SandboxError, SandboxResult};
use crate::runner::ds::value::Value;

use super::checker::{checked_super_constructor, checked_this_constructor};
use super::context::ExecutionContext;

/// Name of the host finalizer hook, which sandboxed classes may not define.
pub const FINALIZER_METHOD: &str = "finalize";

fn marker_kind(target: ChainTarget) -> MarkerKind {
    match target {
        ChainTarget::This => MarkerKind::This,
        ChainTarget::Super => MarkerKind::Super,
    }
}

/// Split every chaining constructor of `def` into a checked public half and
/// a marker-gated synthesized half.
///
/// `super(...)` on a class without a superclass has no constructor to
/// guard and is left as it is.
pub fn intercept_constructor_chains(def: ClassDef) -> SandboxResult<ClassDef> {
    if def.constructors.is_empty() {
        return Err(SandboxError::Consistency(format!(
            "{} has no constructors; default constructor synthesis must run first",
            def.name
        )));
    }
    let has_superclass = def.superclass.is_some();
    let mut constructors = Vec::with_capacity(def.constructors.len());
    let mut synthesized = Vec::new();

    for ctor in def.constructors {
        let chain = match ctor.chain.clone() {
            Some(chain)
                if ctor.synthetic.is_none()
                    && (chain.target == ChainTarget::This || has_superclass) =>
            {
                chain
            }
            _ => {
                constructors.push(ctor);
                continue;
            }
        };
        let original_args = match chain.args {
            ChainArgs::Computed(f) => f,
            ChainArgs::FromMarker => {
                return Err(SandboxError::Consistency(format!(
                    "{} reads a marker but is not synthesized",
                    ctor.signature(&def.name)
                )))
            }
        };
        let kind = marker_kind(chain.target);

        let mut params = Vec::with_capacity(ctor.params.len() + 1);
        params.push(ParamType::Marker(kind));
        params.extend(ctor.params.iter().cloned());
        synthesized.push(Constructor {
            params,
            chain: Some(ChainCall {
                target: chain.target,
                args: ChainArgs::FromMarker,
            }),
            body: ctor.body.clone(),
            synthetic: Some(kind),
        });

        let checked_chain = move |ctx: &mut ExecutionContext,
                                  class: &ClassRef,
                                  args: &[Value]|
              -> SandboxResult<Vec<Value>> {
            let chained = original_args(ctx, class, args)?;
            let marker = match kind {
                MarkerKind::Super => checked_super_constructor(ctx, class, chained)?,
                MarkerKind::This => checked_this_constructor(ctx, class, chained)?,
            };
            let mut forwarded = Vec::with_capacity(args.len() + 1);
            forwarded.push(marker);
            forwarded.extend_from_slice(args);
            Ok(forwarded)
        };
        constructors.push(Constructor {
            params: ctor.params,
            chain: Some(ChainCall {
                target: ChainTarget::This,
                args: ChainArgs::Computed(Rc::new(checked_chain)),
            }),
            body: None,
            synthetic: None,
        });
    }

    constructors.extend(synthesized);
    Ok(ClassDef {
        constructors,
        ..def
    })
}

/// Everything a class needs before sandboxed code may use it.
pub fn prepare_sandboxed_class(def: ClassDef) -> SandboxResult<ClassRef> {
    let overrides_finalizer = def
        .methods
        .get(FINALIZER_METHOD)
        .map_or(false, |ms| ms.iter().any(|m| m.accepts(0)));
    if overrides_finalizer {
        return Err(SandboxError::Unsupported(format!(
            "{} may not define {}()",
            def.name, FINALIZER_METHOD
        )));
    }
    Ok(Rc::new(intercept_constructor_chains(def)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::class::ClassBuilder;

    #[test]
    fn test_chaining_constructor_is_split() {
        let base = ClassBuilder::new("Base")
            .constructor(Constructor::new(vec![ParamType::Any]))
            .build();
        let def = ClassBuilder::new("Derived")
            .extends(&base)
            .constructor(
                Constructor::new(vec![ParamType::Number]).chain_super(|_, _, args| Ok(args.to_vec())),
            )
            .into_def();
        let def = intercept_constructor_chains(def).unwrap();
        assert_eq!(def.constructors.len(), 2);
        assert!(def.constructors[0].body.is_none());
        assert_eq!(def.constructors[1].synthetic, Some(MarkerKind::Super));
        assert_eq!(
            def.constructors[1].signature("Derived"),
            "Derived(SuperConstructorMarker, Number)"
        );
    }

    #[test]
    fn test_root_super_chain_is_left_alone() {
        let def = ClassBuilder::new("Root")
            .constructor(Constructor::new(vec![]).chain_super(|_, _, _| Ok(vec![])))
            .into_def();
        let def = intercept_constructor_chains(def).unwrap();
        assert_eq!(def.constructors.len(), 1);
        assert!(def.constructors[0].synthetic.is_none());
    }

    #[test]
    fn test_empty_constructor_list_is_inconsistent() {
        let mut def = ClassBuilder::new("Bare").into_def();
        def.constructors.clear();
        assert!(matches!(
            intercept_constructor_chains(def),
            Err(SandboxError::Consistency(_))
        ));
    }

    #[test]
    fn test_finalizer_is_rejected() {
        let def = ClassBuilder::new("Sneaky")
            .method(FINALIZER_METHOD, Some(0), |_, _, _| Ok(Value::Null))
            .into_def();
        assert!(matches!(
            prepare_sandboxed_class(def),
            Err(SandboxError::Unsupported(_))
        ));
    }
}
