use std::fmt;
use std::sync::Arc;

use crate::SharedFlag;

/// One participant's node in a static-tree barrier with a global departure
/// flag.
///
/// The arrival phase is identical to [`TreeNode`][crate::TreeNode]: per-child
/// arrival slots climbed leaf-to-root. The departure tree is replaced by a
/// single [`SharedFlag`] shared by the whole group - the root publishes once
/// and every other participant spins on the same cell.
///
/// That collapses the O(log N) departure stores into one broadcast, at the
/// price of N−1 readers sharing one cache line. For small groups placed on
/// one package, one coherence broadcast frequently beats walking the
/// departure tree; across packages the shared line becomes the bottleneck.
///
/// Nodes are produced wired-together by
/// [`build_global_tree`][crate::build_global_tree]. The same configuration
/// invariant applies as for `TreeNode`: a node is only valid within the tree
/// it was built in.
pub struct GlobalTreeNode {
    pub(crate) global_sense: Arc<SharedFlag>,
    pub(crate) arrival_parent: Option<Arc<SharedFlag>>,
    pub(crate) arrival_slots: Box<[Arc<SharedFlag>]>,
    pub(crate) local_sense: bool,
}

impl GlobalTreeNode {
    /// Blocks (spinning) until every participant of the tree has arrived.
    ///
    /// Non-root nodes publish their subtree's arrival upward and then spin
    /// on the global sense flag. The root, having observed all arrivals,
    /// release-stores its local sense into the global flag, releasing
    /// everyone in one step. The root takes no acquire on the departure
    /// path - it is the publisher, and the end-of-episode flip realigns its
    /// expectations for the next episode.
    pub fn wait(&mut self) {
        for slot in &self.arrival_slots {
            slot.spin_until_is(self.local_sense);
        }

        if let Some(parent_slot) = &self.arrival_parent {
            parent_slot.publish(self.local_sense);

            self.global_sense.spin_until_is(self.local_sense);
        } else {
            self.global_sense.publish(self.local_sense);
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

    /// The departure flag shared by every node of this tree.
    #[must_use]
    pub fn global_sense(&self) -> &Arc<SharedFlag> {
        &self.global_sense
    }
}

impl fmt::Debug for GlobalTreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlobalTreeNode")
            .field("is_root", &self.is_root())
            .field("arrival_children", &self.arrival_slots.len())
            .field("local_sense", &self.local_sense)
            .finish()
    }
}
