//! Execution contexts: the isolation boundary that owns a policy chain.

use std::rc::Rc;

use tracing::debug;
use uuid::Uuid;

use crate::runner::ds::error::{OperationKind, SandboxError, SandboxResult};

use super::chain::{ChainSnapshot, PolicyChain};
use super::config::SandboxConfig;
use super::default_policy::RejectAllPolicy;
use super::policy::Policy;

/// One logical thread of control running sandboxed code.
///
/// Every checked operation takes the context explicitly; closures that run
/// later receive the context of whoever calls them. A context is `!Send`,
/// so its chain is never shared between threads.
pub struct ExecutionContext {
    id: Uuid,
    chain: PolicyChain,
    fail_closed: ChainSnapshot,
    config: SandboxConfig,
    depth: usize,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::with_config(SandboxConfig::default())
    }

    pub fn with_config(config: SandboxConfig) -> Self {
        let reject_all: Rc<dyn Policy> = Rc::new(RejectAllPolicy);
        ExecutionContext {
            id: Uuid::new_v4(),
            chain: PolicyChain::new(),
            fail_closed: Rc::new(vec![reject_all]),
            config,
            depth: 0,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Append `policy` to this context's chain.
    pub fn register(&mut self, policy: Rc<dyn Policy>) {
        debug!(context = %self.id, policy = policy.name(), "registering policy");
        self.chain.register(policy);
    }

    /// Remove the first matching registration. Dispatches already in
    /// progress keep seeing the chain they started with.
    pub fn unregister(&mut self, policy: &dyn Policy) -> bool {
        let removed = self.chain.unregister(policy);
        debug!(context = %self.id, policy = policy.name(), removed, "unregistering policy");
        removed
    }

    /// Run `f` with `policy` registered, unregistering it afterwards
    /// whatever `f` returns.
    pub fn with_policy<T, F>(&mut self, policy: Rc<dyn Policy>, f: F) -> T
    where
        F: FnOnce(&mut ExecutionContext) -> T,
    {
        self.register(policy.clone());
        let result = f(self);
        self.unregister(&*policy);
        result
    }

    /// The registered policies, in dispatch order. Empty when nothing is registered.
    pub fn active_chain(&self) -> ChainSnapshot {
        self.chain.snapshot()
    }

    /// The chain a dispatch runs over: the registered policies, or the
    /// reject-all policy alone when there are none.
    pub(crate) fn dispatch_chain(&self, kind: OperationKind) -> ChainSnapshot {
        if self.chain.is_empty() {
            debug!(context = %self.id, kind = %kind, "no policy registered, failing closed");
            self.fail_closed.clone()
        } else {
            self.chain.snapshot()
        }
    }

    pub fn dispatch_depth(&self) -> usize {
        self.depth
    }

    pub(crate) fn enter_dispatch(&mut self, kind: OperationKind) -> SandboxResult<()> {
        if self.depth >= self.config.max_dispatch_depth {
            return Err(SandboxError::RangeError(format!(
                "Maximum dispatch depth {} exceeded at {}",
                self.config.max_dispatch_depth, kind
            )));
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave_dispatch(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Quiet;
    impl Policy for Quiet {}

    #[test]
    fn test_with_policy_unregisters_afterwards() {
        let mut ctx = ExecutionContext::new();
        let p: Rc<dyn Policy> = Rc::new(Quiet);
        let seen = ctx.with_policy(p, |ctx| ctx.active_chain().len());
        assert_eq!(seen, 1);
        assert!(ctx.active_chain().is_empty());
    }

    #[test]
    fn test_empty_chain_dispatches_to_reject_all() {
        let ctx = ExecutionContext::new();
        let chain = ctx.dispatch_chain(OperationKind::MethodCall);
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].name(), "reject-all");
    }

    #[test]
    fn test_contexts_have_distinct_ids() {
        assert_ne!(ExecutionContext::new().id(), ExecutionContext::new().id());
    }
}
