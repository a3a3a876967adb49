use std::fmt;
use std::sync::Arc;

use crate::SharedFlag;

/// One participant's node in a static combining-tree barrier.
///
/// The participants of a barrier form two trees over the same node set: an
/// *arrival* tree, climbed leaf-to-root as participants arrive, and a
/// *departure* tree, descended root-to-leaf to release them. Each node packs
/// everything its thread needs for both phases:
///
/// * `arrival_slots` - one [`SharedFlag`] per arrival child. A child
///   publishes its (subtree's) arrival by storing its local sense here.
/// * `arrival_parent` - the slot inside this node's parent that this node
///   publishes to. `None` at the root.
/// * `departure_sense` - the cell this node's departure parent stores to
///   when it is time to leave.
/// * `departure_links` - the departure-sense cells of this node's departure
///   children, stored to during fan-out.
///
/// Nodes are produced wired-together by [`build_tree`][crate::build_tree];
/// the shape and the participant-to-node assignment embed the tree into the
/// physical core map. Every cell is an individually heap-allocated
/// cache-line-sized block: one writer per cell per phase, no false sharing,
/// and nothing for a sequential prefetcher to stream.
///
/// Arrival slots are never reset. Successive episodes alternate the value
/// that means "arrived" by flipping each node's local sense, which saves one
/// store per child per episode.
///
/// A node is permanently bound to the tree it was built in: using a node
/// whose tree reaches fewer participants than the builder was asked for
/// (or mixing nodes of different trees) deadlocks every participant. The
/// builder owns that invariant.
pub struct TreeNode {
    pub(crate) departure_sense: Arc<SharedFlag>,
    pub(crate) arrival_parent: Option<Arc<SharedFlag>>,
    pub(crate) arrival_slots: Box<[Arc<SharedFlag>]>,
    pub(crate) departure_links: Box<[Arc<SharedFlag>]>,
    pub(crate) local_sense: bool,
}

impl TreeNode {
    /// Blocks (spinning) until every participant of the tree has arrived.
    ///
    /// Arrival: gather the children's publications, then publish the whole
    /// subtree's arrival one level up. Departure: wait for the parent's
    /// release, then fan it out to the departure children. The root skips
    /// both parent interactions - once its children have arrived, the whole
    /// tree has.
    ///
    /// All memory effects any participant performed before its `wait()` are
    /// visible to every participant after `wait()` returns, via the
    /// release/acquire chain along the path through the tree.
    pub fn wait(&mut self) {
        for slot in &self.arrival_slots {
            slot.spin_until_is(self.local_sense);
        }

        if let Some(parent_slot) = &self.arrival_parent {
            parent_slot.publish(self.local_sense);

            self.departure_sense.spin_until_is(self.local_sense);
        }

        for child_sense in &self.departure_links {
            child_sense.publish(self.local_sense);
        }

        self.local_sense = !self.local_sense;
    }

    /// Whether this node is the root of the arrival tree.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.arrival_parent.is_none()
    }

    /// The episode parity of this node: `false` before the first episode,
    /// alternating thereafter.
    #[must_use]
    pub fn local_sense(&self) -> bool {
        self.local_sense
    }

    /// The slot in the parent node this node publishes arrivals to.
    #[must_use]
    pub fn arrival_parent(&self) -> Option<&Arc<SharedFlag>> {
        self.arrival_parent.as_ref()
    }

    /// The per-child arrival slots owned by this node, in child order.
    #[must_use]
    pub fn arrival_slots(&self) -> &[Arc<SharedFlag>] {
        &self.arrival_slots
    }

    /// This node's departure-sense cell, written by its departure parent.
    #[must_use]
    pub fn departure_sense(&self) -> &Arc<SharedFlag> {
        &self.departure_sense
    }

    /// The departure-sense cells of this node's departure children.
    #[must_use]
    pub fn departure_links(&self) -> &[Arc<SharedFlag>] {
        &self.departure_links
    }
}

impl fmt::Debug for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TreeNode")
            .field("is_root", &self.is_root())
            .field("arrival_children", &self.arrival_slots.len())
            .field("departure_children", &self.departure_links.len())
            .field("local_sense", &self.local_sense)
            .finish()
    }
}
