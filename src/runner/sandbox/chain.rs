//! Ordered, copy-on-write policy storage.

use std::rc::Rc;

use super::policy::Policy;

/// A point-in-time view of a chain. Holding one keeps it stable no matter
/// what is registered or unregistered afterwards.
pub type ChainSnapshot = Rc<Vec<Rc<dyn Policy>>>;

/// The policies of one execution context, in dispatch order.
///
/// Storage is shared with every snapshot handed out. A mutation while a
/// snapshot is alive copies the vector first, so an in-flight dispatch keeps
/// iterating the chain it started with.
#[derive(Clone)]
pub struct PolicyChain {
    policies: ChainSnapshot,
}

impl PolicyChain {
    pub fn new() -> Self {
        PolicyChain {
            policies: Rc::new(Vec::new()),
        }
    }

    /// Append a policy. The same policy may be registered more than once.
    pub fn register(&mut self, policy: Rc<dyn Policy>) {
        Rc::make_mut(&mut self.policies).push(policy);
    }

    /// Remove the first entry that is `policy` itself or reports the same
    /// [`key`](Policy::key). Returns whether an entry was removed.
    pub fn unregister(&mut self, policy: &dyn Policy) -> bool {
        match self.policies.iter().position(|p| same_policy(p, policy)) {
            Some(i) => {
                Rc::make_mut(&mut self.policies).remove(i);
                true
            }
            None => false,
        }
    }

    pub fn snapshot(&self) -> ChainSnapshot {
        self.policies.clone()
    }

    pub fn len(&self) -> usize {
        self.policies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.policies.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.policies.iter().map(|p| p.name().to_string()).collect()
    }
}

impl Default for PolicyChain {
    fn default() -> Self {
        Self::new()
    }
}

fn same_policy(entry: &Rc<dyn Policy>, policy: &dyn Policy) -> bool {
    let a = Rc::as_ptr(entry) as *const ();
    let b = policy as *const _ as *const ();
    if a == b {
        return true;
    }
    match (entry.key(), policy.key()) {
        (Some(x), Some(y)) => x == y,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);
    impl Policy for Named {
        fn name(&self) -> &str {
            self.0
        }
    }

    struct Keyed(&'static str);
    impl Policy for Keyed {
        fn key(&self) -> Option<&str> {
            Some(self.0)
        }
    }

    #[test]
    fn test_duplicates_are_kept_and_removed_one_at_a_time() {
        let mut chain = PolicyChain::new();
        let p: Rc<dyn Policy> = Rc::new(Named("a"));
        chain.register(p.clone());
        chain.register(Rc::new(Named("b")));
        chain.register(p.clone());
        assert_eq!(chain.names(), vec!["a", "b", "a"]);
        assert!(chain.unregister(&*p));
        assert_eq!(chain.names(), vec!["b", "a"]);
    }

    #[test]
    fn test_snapshot_is_unaffected_by_later_changes() {
        let mut chain = PolicyChain::new();
        let p: Rc<dyn Policy> = Rc::new(Named("a"));
        chain.register(p.clone());
        let snap = chain.snapshot();
        chain.unregister(&*p);
        chain.register(Rc::new(Named("c")));
        assert_eq!(snap.len(), 1);
        assert_eq!(chain.names(), vec!["c"]);
    }

    #[test]
    fn test_unregister_by_key() {
        let mut chain = PolicyChain::new();
        chain.register(Rc::new(Keyed("audit")));
        assert!(!chain.unregister(&Keyed("other")));
        assert!(chain.unregister(&Keyed("audit")));
        assert!(chain.is_empty());
    }
}
