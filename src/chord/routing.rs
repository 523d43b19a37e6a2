use crate::chord::types::{Node, NodeId, BITS};
use log::debug;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// A cloned view of the routing table, for diagnostics and tests.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouterSnapshot {
    pub local: Node,
    pub successors: Vec<Option<Node>>,
    pub predecessor: Option<Node>,
}

struct FingerTable {
    successors: Vec<Option<Node>>,
    predecessor: Option<Node>,
}

impl FingerTable {
    fn empty() -> Self {
        Self {
            successors: vec![None; BITS],
            predecessor: None,
        }
    }

    fn closest_preceding_node(&self, local: &Node, id: &NodeId) -> Option<Node> {
        self.successors
            .iter()
            .rev()
            .flatten()
            .find(|finger| finger.id.between(&local.id, id))
            .cloned()
    }
}

/// Per-process routing table: `BITS` successor fingers plus the predecessor.
///
/// Slots hold `None` while unknown and readers fall back to the local node.
/// Writes compact the table: installing a node at index `i` also overwrites
/// every lower slot that held the value being replaced.
pub struct Router {
    local: Node,
    table: Mutex<FingerTable>,
}

impl Router {
    pub fn new(local: Node) -> Self {
        Self {
            local,
            table: Mutex::new(FingerTable::empty()),
        }
    }

    pub fn local(&self) -> &Node {
        &self.local
    }

    fn table(&self) -> MutexGuard<'_, FingerTable> {
        // Every mutation leaves the table consistent, so a poisoned lock is still usable.
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Forgets every peer; the node becomes a ring of one.
    pub fn reset(&self) {
        *self.table() = FingerTable::empty();
        debug!("Router of {} reset", self.local);
    }

    pub fn successor(&self, index: usize) -> Node {
        self.successor_entry(index)
            .unwrap_or_else(|| self.local.clone())
    }

    pub fn successor_entry(&self, index: usize) -> Option<Node> {
        self.table().successors[index].clone()
    }

    pub fn predecessor(&self) -> Node {
        self.predecessor_entry()
            .unwrap_or_else(|| self.local.clone())
    }

    pub fn predecessor_entry(&self) -> Option<Node> {
        self.table().predecessor.clone()
    }

    pub fn set_successor(&self, index: usize, node: Node) {
        let mut table = self.table();
        let replaced = table.successors[index].replace(node.clone());
        if replaced.as_ref() == Some(&node) {
            return;
        }
        for slot in table.successors[..index].iter_mut() {
            if *slot == replaced {
                *slot = Some(node.clone());
            }
        }
        debug!("Finger {} of {} set to {}", index, self.local.id, node);
    }

    /// Returns slot `index` to the unknown state.
    pub fn clear_successor(&self, index: usize) {
        self.table().successors[index] = None;
    }

    /// Installs `node` as predecessor and returns the one it replaced.
    pub fn set_predecessor(&self, node: Node) -> Option<Node> {
        debug!("Predecessor of {} set to {}", self.local.id, node);
        self.table().predecessor.replace(node)
    }

    pub fn clear_predecessor(&self) -> Option<Node> {
        self.table().predecessor.take()
    }

    /// Drops every reference to `id`.
    ///
    /// Each slot holding `id` takes the nearest entry above it that is a
    /// different known peer, or becomes unknown when there is none. The
    /// predecessor is cleared if it is `id`.
    pub fn remove(&self, id: &NodeId) {
        let mut table = self.table();
        let mut replacement: Option<Node> = None;
        for slot in table.successors.iter_mut().rev() {
            match slot {
                Some(node) if node.id == *id => *slot = replacement.clone(),
                Some(node) => replacement = Some(node.clone()),
                None => {}
            }
        }
        if table.predecessor.as_ref().is_some_and(|p| p.id == *id) {
            table.predecessor = None;
        }
        debug!("Removed {} from router of {}", id, self.local.id);
    }

    /// The known node that most closely precedes `id`, or the local node.
    pub fn closest_preceding_node(&self, id: &NodeId) -> Node {
        self.table()
            .closest_preceding_node(&self.local, id)
            .unwrap_or_else(|| self.local.clone())
    }

    /// Whether slot 0 holds a peer other than the local node.
    pub fn has_successor(&self) -> bool {
        self.table().successors[0]
            .as_ref()
            .is_some_and(|s| *s != self.local)
    }

    pub fn has_predecessor(&self) -> bool {
        self.table().predecessor.is_some()
    }

    pub fn snapshot(&self) -> RouterSnapshot {
        let table = self.table();
        RouterSnapshot {
            local: self.local.clone(),
            successors: table.successors.clone(),
            predecessor: table.predecessor.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: u64) -> Node {
        Node::new(id, format!("127.0.0.1:{}", 7000 + id))
    }

    #[test]
    fn test_unknown_entries_fall_back_to_self() {
        let router = Router::new(node(1));
        assert_eq!(router.successor(0), node(1));
        assert_eq!(router.predecessor(), node(1));
        assert!(!router.has_successor());
        assert!(!router.has_predecessor());
    }

    #[test]
    fn test_set_successor_compacts_lower_slots() {
        let router = Router::new(node(1));
        router.set_successor(0, node(5));
        assert_eq!(router.successor(0), node(5));

        router.set_successor(3, node(9));
        // Slots 1 and 2 were unknown, like slot 3, so they follow it.
        assert_eq!(router.successor_entry(1), Some(node(9)));
        assert_eq!(router.successor_entry(2), Some(node(9)));
        assert_eq!(router.successor_entry(0), Some(node(5)));

        router.set_successor(3, node(7));
        assert_eq!(router.successor_entry(1), Some(node(7)));
        assert_eq!(router.successor_entry(2), Some(node(7)));
        assert_eq!(router.successor_entry(4), None);
    }

    #[test]
    fn test_set_successor_zero_replaces_only_itself() {
        let router = Router::new(node(1));
        router.set_successor(0, node(5));
        router.set_successor(0, node(3));
        assert_eq!(router.successor(0), node(3));
        assert!(router.has_successor());
    }

    #[test]
    fn test_remove_substitutes_next_higher_entry() {
        let router = Router::new(node(1));
        router.set_successor(4, node(20));
        router.set_successor(1, node(5));
        router.set_successor(0, node(5));
        router.set_predecessor(node(5));

        router.remove(&NodeId::from(5u64));

        assert_eq!(router.successor_entry(0), Some(node(20)));
        assert_eq!(router.successor_entry(1), Some(node(20)));
        assert_eq!(router.successor_entry(4), Some(node(20)));
        assert!(!router.has_predecessor());
    }

    #[test]
    fn test_remove_without_replacement_disconnects_slot() {
        let router = Router::new(node(1));
        router.set_successor(2, node(5));
        router.remove(&NodeId::from(5u64));
        for i in 0..=2 {
            assert_eq!(router.successor_entry(i), None);
        }
        assert!(!router.has_successor());
        assert_eq!(router.successor(0), node(1));
    }

    #[test]
    fn test_remove_keeps_unrelated_predecessor() {
        let router = Router::new(node(1));
        router.set_predecessor(node(9));
        router.remove(&NodeId::from(5u64));
        assert_eq!(router.predecessor_entry(), Some(node(9)));
    }

    #[test]
    fn test_closest_preceding_node() {
        let router = Router::new(node(999));
        for i in 0..=100u64 {
            router.set_successor(i as usize, node(i));
        }
        assert_eq!(router.closest_preceding_node(&NodeId::from(50u64)), node(49));
        assert_eq!(router.closest_preceding_node(&NodeId::from(200u64)), node(100));
    }

    #[test]
    fn test_closest_preceding_node_defaults_to_self() {
        let router = Router::new(node(10));
        assert_eq!(router.closest_preceding_node(&NodeId::from(3u64)), node(10));
        router.set_successor(0, node(20));
        // 20 is not strictly between 10 and 15.
        assert_eq!(router.closest_preceding_node(&NodeId::from(15u64)), node(10));
    }

    #[test]
    fn test_reset_forgets_peers() {
        let router = Router::new(node(1));
        router.set_successor(0, node(2));
        router.set_predecessor(node(3));
        router.reset();
        let snapshot = router.snapshot();
        assert!(snapshot.successors.iter().all(Option::is_none));
        assert_eq!(snapshot.predecessor, None);
    }
}
