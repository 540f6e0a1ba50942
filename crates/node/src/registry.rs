//! Identity registry - one wrapper per node identifier
//!
//! There is no eviction: an entry lives until the wrapper is destroyed. Nodes
//! removed from the document keep their wrappers (and the wrappers keep their
//! side data) until someone calls `destroy`, so long-lived pages that churn
//! through nodes should destroy what they remove.

use crate::node::Node;
use ahash::AHashMap;

#[derive(Default)]
pub struct Registry {
    instances: AHashMap<String, Node>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, uid: &str, node: Node) {
        tracing::trace!("[Registry] register {}", uid);
        self.instances.insert(uid.to_string(), node);
    }

    pub fn lookup(&self, uid: &str) -> Option<Node> {
        self.instances.get(uid).cloned()
    }

    pub fn unregister(&mut self, uid: &str) -> Option<Node> {
        let removed = self.instances.remove(uid);
        if removed.is_some() {
            tracing::trace!("[Registry] unregister {}", uid);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }
}
