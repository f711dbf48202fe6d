//! Causal parentage between resources.
//!
//! Every resource records, once and at creation time, the resource that was
//! executing when it was created. Because a trigger must already be recorded
//! before anything can name it, the graph is acyclic by construction and
//! every chain ends at [`AsyncId::ROOT`].

use hashbrown::HashMap;
use lineage_core::error::TrackerError;
use lineage_core::id::AsyncId;

/// Parent links from each resource to its trigger.
#[derive(Debug, Clone, Default)]
pub struct TriggerGraph {
    parents: HashMap<AsyncId, AsyncId>,
    /// Reverse edges, in creation order.
    children: HashMap<AsyncId, Vec<AsyncId>>,
}

impl TriggerGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `trigger` caused `uid`.
    ///
    /// # Errors
    ///
    /// - [`TrackerError::DuplicateRegistration`] if `uid` already has a trigger
    /// - [`TrackerError::UnknownResource`] if `trigger` is neither the root nor recorded
    /// - [`TrackerError::ReservedId`] if `uid` is the root
    pub fn record_trigger(&mut self, uid: AsyncId, trigger: AsyncId) -> Result<(), TrackerError> {
        if uid.is_root() {
            return Err(TrackerError::ReservedId { uid });
        }
        if self.parents.contains_key(&uid) {
            return Err(TrackerError::DuplicateRegistration { uid });
        }
        if !trigger.is_root() && !self.parents.contains_key(&trigger) {
            return Err(TrackerError::UnknownResource { uid: trigger });
        }
        self.parents.insert(uid, trigger);
        self.children.entry(trigger).or_default().push(uid);
        Ok(())
    }

    /// Returns the trigger of `uid`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] if `uid` was never recorded.
    pub fn trigger_of(&self, uid: AsyncId) -> Result<AsyncId, TrackerError> {
        self.parents
            .get(&uid)
            .copied()
            .ok_or(TrackerError::UnknownResource { uid })
    }

    /// Walks trigger links from `uid` to the root: `[uid, parent, ..., ROOT]`.
    ///
    /// # Errors
    ///
    /// [`TrackerError::UnknownResource`] if `uid` was never recorded.
    pub fn chain_to(&self, uid: AsyncId) -> Result<Vec<AsyncId>, TrackerError> {
        if uid.is_root() {
            return Ok(vec![AsyncId::ROOT]);
        }
        let mut chain = vec![uid];
        let mut current = self.trigger_of(uid)?;
        // A chain can never be longer than the number of recorded resources.
        for _ in 0..self.parents.len() {
            chain.push(current);
            if current.is_root() {
                break;
            }
            current = self.trigger_of(current)?;
        }
        Ok(chain)
    }

    /// Returns the resources directly caused by `uid`, in creation order.
    #[must_use]
    pub fn children_of(&self, uid: AsyncId) -> &[AsyncId] {
        self.children.get(&uid).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns `true` if `uid` has a recorded trigger.
    #[must_use]
    pub fn contains(&self, uid: AsyncId) -> bool {
        self.parents.contains_key(&uid)
    }

    /// Returns the number of recorded resources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parents.len()
    }

    /// Returns `true` if nothing has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(raw: u64) -> AsyncId {
        AsyncId::new(raw)
    }

    #[test]
    fn chain_walks_to_root() {
        let mut graph = TriggerGraph::new();
        graph.record_trigger(id(2), AsyncId::ROOT).unwrap();
        graph.record_trigger(id(3), id(2)).unwrap();
        graph.record_trigger(id(4), id(3)).unwrap();

        assert_eq!(
            graph.chain_to(id(4)).unwrap(),
            vec![id(4), id(3), id(2), AsyncId::ROOT]
        );
        assert_eq!(graph.chain_to(id(2)).unwrap(), vec![id(2), AsyncId::ROOT]);
        assert_eq!(graph.chain_to(AsyncId::ROOT).unwrap(), vec![AsyncId::ROOT]);
    }

    #[test]
    fn parentage_is_immutable() {
        let mut graph = TriggerGraph::new();
        graph.record_trigger(id(2), AsyncId::ROOT).unwrap();
        graph.record_trigger(id(3), AsyncId::ROOT).unwrap();
        let err = graph.record_trigger(id(3), id(2)).unwrap_err();
        assert_eq!(err, TrackerError::DuplicateRegistration { uid: id(3) });
        assert_eq!(graph.trigger_of(id(3)).unwrap(), AsyncId::ROOT);
    }

    #[test]
    fn trigger_cannot_point_to_the_future() {
        let mut graph = TriggerGraph::new();
        let err = graph.record_trigger(id(2), id(3)).unwrap_err();
        assert_eq!(err, TrackerError::UnknownResource { uid: id(3) });
        assert!(graph.is_empty());
    }

    #[test]
    fn unknown_lookups_fail() {
        let graph = TriggerGraph::new();
        assert_eq!(
            graph.trigger_of(id(7)).unwrap_err(),
            TrackerError::UnknownResource { uid: id(7) }
        );
        assert!(graph.chain_to(id(7)).is_err());
    }

    #[test]
    fn children_keep_creation_order() {
        let mut graph = TriggerGraph::new();
        graph.record_trigger(id(2), AsyncId::ROOT).unwrap();
        graph.record_trigger(id(3), id(2)).unwrap();
        graph.record_trigger(id(4), AsyncId::ROOT).unwrap();
        graph.record_trigger(id(5), id(2)).unwrap();

        assert_eq!(graph.children_of(id(2)), &[id(3), id(5)]);
        assert_eq!(graph.children_of(AsyncId::ROOT), &[id(2), id(4)]);
        assert!(graph.children_of(id(5)).is_empty());
        assert_eq!(graph.len(), 4);
    }
}
