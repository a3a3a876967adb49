use std::num::NonZero;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::{Error, GlobalTreeNode, SharedFlag, TreeNode};

/// How the tree shape is embedded into the physical core map.
///
/// Both layouts have the same shape class (a balanced binary tree of depth
/// ⌈log₂N⌉); they differ in which participant index occupies which tree
/// position. Participant `i` is assumed to be pinned to logical core `i`,
/// cores filled left to right.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Locality {
    /// Parent/child edges connect participants whose cores are physically
    /// adjacent (siblings sharing a cache level), so barrier traffic stays
    /// close.
    Good,

    /// Edges deliberately cross physical core-group boundaries, forcing
    /// every hop of the barrier onto the interconnect.
    Bad,
}

/// A parent assignment: `(child, parent)`.
///
/// Within each table, a parent's children appear in the order of their
/// arrival-slot indices: the first `(c, p)` entry for a given `p` assigns
/// slot 0, the next slot 1.
type Edge = (usize, usize);

/// Good-locality parent assignments, indexed by participant count − 1.
const GOOD_EDGES: [&[Edge]; MAX_PARTICIPANTS] = [
    &[],
    &[(1, 0)],
    &[(1, 0), (2, 0)],
    &[(1, 0), (2, 0), (3, 2)],
    &[(4, 0), (2, 0), (1, 4), (3, 2)],
    &[(4, 0), (2, 0), (1, 4), (5, 4), (3, 2)],
    &[(4, 0), (2, 0), (1, 4), (5, 4), (3, 2), (6, 2)],
    &[(4, 0), (2, 0), (1, 4), (5, 4), (3, 2), (6, 2), (7, 3)],
];

/// Bad-locality parent assignments. Same edge counts as [`GOOD_EDGES`],
/// indices permuted to break core adjacency. Up to three participants there
/// is no adjacency to break.
const BAD_EDGES: [&[Edge]; MAX_PARTICIPANTS] = [
    &[],
    &[(1, 0)],
    &[(1, 0), (2, 0)],
    &[(3, 0), (2, 0), (1, 2)],
    &[(3, 0), (2, 0), (1, 2), (4, 3)],
    &[(3, 0), (2, 0), (1, 2), (5, 2), (4, 3)],
    &[(3, 0), (2, 0), (1, 2), (5, 2), (4, 3), (6, 4)],
    &[(3, 0), (2, 0), (1, 2), (5, 2), (4, 3), (6, 4), (7, 4)],
];

/// Largest participant count the layout tables cover.
pub const MAX_PARTICIPANTS: usize = 8;

fn edge_table(participants: usize, locality: Locality) -> Result<&'static [Edge]> {
    let tables = match locality {
        Locality::Good => &GOOD_EDGES,
        Locality::Bad => &BAD_EDGES,
    };

    tables
        .get(participants.wrapping_sub(1))
        .copied()
        .ok_or(Error::UnsupportedParticipantCount { participants })
}

/// Arrival-tree wiring shared by both barrier variants.
struct ArrivalWiring {
    /// Per node, that node's per-child arrival slots in slot order.
    slots: Vec<Vec<Arc<SharedFlag>>>,

    /// Per node, the slot inside its parent it publishes to. `None` at the
    /// root.
    parent_slot: Vec<Option<Arc<SharedFlag>>>,

    /// Per node, its children in slot order.
    children: Vec<Vec<usize>>,
}

fn wire_arrivals(participants: usize, edges: &[Edge]) -> ArrivalWiring {
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); participants];

    for &(child, parent) in edges {
        children[parent].push(child);
    }

    // Every arrival slot is its own cache-line-aligned heap allocation: one
    // slot per child, initialized true, never part of a larger array that a
    // sequential prefetcher could stream through.
    let slots: Vec<Vec<Arc<SharedFlag>>> = children
        .iter()
        .map(|node_children| {
            node_children
                .iter()
                .map(|_| Arc::new(SharedFlag::new(true)))
                .collect()
        })
        .collect();

    let mut parent_slot: Vec<Option<Arc<SharedFlag>>> = vec![None; participants];

    for (parent, node_children) in children.iter().enumerate() {
        for (slot_index, &child) in node_children.iter().enumerate() {
            debug_assert!(
                parent_slot[child].is_none(),
                "participant {child} has two arrival parents"
            );
            parent_slot[child] = Some(Arc::clone(&slots[parent][slot_index]));
        }
    }

    debug_assert!(
        parent_slot.iter().skip(1).all(Option::is_some),
        "disconnected arrival tree"
    );

    ArrivalWiring {
        slots,
        parent_slot,
        children,
    }
}

/// Builds the node set of a static-tree barrier with tree-based departure.
///
/// Returns one [`TreeNode`] per participant; `nodes[i]` is the node for the
/// participant pinned to logical slot `i`. Node 0 is the root. The departure
/// tree mirrors the arrival tree: a node releases exactly the children whose
/// arrivals it gathered.
///
/// After wiring, every arrival slot and every departure-sense cell holds
/// `true` and every local sense is `false`. Construction is not atomic with
/// use: hand the nodes to their threads through a release/acquire
/// publication (a channel, a spawned-thread closure, or an explicit start
/// gate) before anyone calls [`wait()`](TreeNode::wait).
///
/// # Errors
///
/// Returns [`Error::UnsupportedParticipantCount`] when `participants` is not
/// in `1..=8` - the layouts are embedded by hand into an eight-slot core
/// map. Callers treat this as a fatal configuration error.
pub fn build_tree(participants: NonZero<usize>, locality: Locality) -> Result<Vec<TreeNode>> {
    let count = participants.get();
    let edges = edge_table(count, locality)?;
    let wiring = wire_arrivals(count, edges);

    // One departure-sense cell per node, each in its own allocation.
    let senses: Vec<Arc<SharedFlag>> = (0..count)
        .map(|_| Arc::new(SharedFlag::new(true)))
        .collect();

    debug!(participants = count, ?locality, "wired static-tree barrier");

    Ok(wiring
        .slots
        .into_iter()
        .zip(wiring.parent_slot)
        .zip(wiring.children)
        .enumerate()
        .map(|(index, ((slots, parent_slot), children))| TreeNode {
            departure_sense: Arc::clone(&senses[index]),
            arrival_parent: parent_slot,
            arrival_slots: slots.into_boxed_slice(),
            departure_links: children
                .iter()
                .map(|&child| Arc::clone(&senses[child]))
                .collect(),
            local_sense: false,
        })
        .collect())
}

/// Builds the node set of a static-tree barrier with a global departure
/// flag.
///
/// The arrival tree is identical to [`build_tree`]'s; the departure tree is
/// replaced by one shared [`SharedFlag`] that the root publishes to and all
/// other participants spin on. The same indexing, initialization, and
/// publication rules apply.
///
/// # Errors
///
/// Returns [`Error::UnsupportedParticipantCount`] when `participants` is not
/// in `1..=8`.
pub fn build_global_tree(
    participants: NonZero<usize>,
    locality: Locality,
) -> Result<Vec<GlobalTreeNode>> {
    let count = participants.get();
    let edges = edge_table(count, locality)?;
    let wiring = wire_arrivals(count, edges);

    let global_sense = Arc::new(SharedFlag::new(true));

    debug!(
        participants = count,
        ?locality,
        "wired static-tree barrier with global departure"
    );

    Ok(wiring
        .slots
        .into_iter()
        .zip(wiring.parent_slot)
        .map(|(slots, parent_slot)| GlobalTreeNode {
            global_sense: Arc::clone(&global_sense),
            arrival_parent: parent_slot,
            arrival_slots: slots.into_boxed_slice(),
            local_sense: false,
        })
        .collect())
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::collections::HashSet;

    use new_zealand::nz;

    use super::*;
    use crate::CACHE_LINE_SIZE;

    fn all_counts() -> impl Iterator<Item = NonZero<usize>> {
        (1..=MAX_PARTICIPANTS).map(|n| NonZero::new(n).unwrap())
    }

    /// `nodes[child]` publishes arrivals into slot `slot` of `nodes[parent]`.
    fn assert_arrival_edge(nodes: &[TreeNode], child: usize, parent: usize, slot: usize) {
        let child_target = nodes[child]
            .arrival_parent()
            .expect("child node must have an arrival parent");

        assert!(
            Arc::ptr_eq(child_target, &nodes[parent].arrival_slots()[slot]),
            "participant {child} does not publish into slot {slot} of participant {parent}"
        );
    }

    #[test]
    fn four_participants_good_locality_matches_documented_shape() {
        let nodes = build_tree(nz!(4), Locality::Good).unwrap();

        assert!(nodes[0].is_root());
        assert_arrival_edge(&nodes, 1, 0, 0);
        assert_arrival_edge(&nodes, 2, 0, 1);
        assert_arrival_edge(&nodes, 3, 2, 0);

        // Departure mirrors arrival: 0 releases 1 and 2; 2 releases 3.
        assert!(Arc::ptr_eq(
            &nodes[0].departure_links()[0],
            nodes[1].departure_sense()
        ));
        assert!(Arc::ptr_eq(
            &nodes[0].departure_links()[1],
            nodes[2].departure_sense()
        ));
        assert!(Arc::ptr_eq(
            &nodes[2].departure_links()[0],
            nodes[3].departure_sense()
        ));
        assert!(nodes[1].departure_links().is_empty());
        assert!(nodes[3].departure_links().is_empty());
    }

    #[test]
    fn eight_participants_good_locality_matches_documented_shape() {
        let nodes = build_tree(nz!(8), Locality::Good).unwrap();

        assert_arrival_edge(&nodes, 4, 0, 0);
        assert_arrival_edge(&nodes, 2, 0, 1);
        assert_arrival_edge(&nodes, 1, 4, 0);
        assert_arrival_edge(&nodes, 5, 4, 1);
        assert_arrival_edge(&nodes, 3, 2, 0);
        assert_arrival_edge(&nodes, 6, 2, 1);
        assert_arrival_edge(&nodes, 7, 3, 0);
    }

    #[test]
    fn eight_participants_bad_locality_matches_documented_shape() {
        let nodes = build_tree(nz!(8), Locality::Bad).unwrap();

        assert_arrival_edge(&nodes, 3, 0, 0);
        assert_arrival_edge(&nodes, 2, 0, 1);
        assert_arrival_edge(&nodes, 1, 2, 0);
        assert_arrival_edge(&nodes, 5, 2, 1);
        assert_arrival_edge(&nodes, 4, 3, 0);
        assert_arrival_edge(&nodes, 6, 4, 0);
        assert_arrival_edge(&nodes, 7, 4, 1);
    }

    #[test]
    fn layouts_share_shape_class_but_differ_in_placement() {
        for participants in all_counts().filter(|n| n.get() >= 4) {
            let good = edge_table(participants.get(), Locality::Good).unwrap();
            let bad = edge_table(participants.get(), Locality::Bad).unwrap();

            assert_eq!(good.len(), bad.len());
            assert_ne!(good, bad, "layouts must differ for {participants}");
        }
    }

    #[test]
    fn node_zero_is_always_the_only_root() {
        for participants in all_counts() {
            for locality in [Locality::Good, Locality::Bad] {
                let nodes = build_tree(participants, locality).unwrap();

                assert!(nodes[0].is_root());
                assert_eq!(
                    nodes.iter().filter(|node| node.is_root()).count(),
                    1,
                    "exactly one root for {participants} / {locality:?}"
                );
            }
        }
    }

    #[test]
    fn every_arrival_slot_has_exactly_one_publisher() {
        for participants in all_counts() {
            for locality in [Locality::Good, Locality::Bad] {
                let nodes = build_tree(participants, locality).unwrap();

                let slots: Vec<_> = nodes
                    .iter()
                    .flat_map(|node| node.arrival_slots())
                    .map(Arc::as_ptr)
                    .collect();
                let publishers: Vec<_> = nodes
                    .iter()
                    .filter_map(TreeNode::arrival_parent)
                    .map(Arc::as_ptr)
                    .collect();

                // Same multiset, no duplicates: each slot is targeted by
                // exactly one child.
                assert_eq!(slots.len(), publishers.len());
                assert_eq!(
                    publishers.iter().collect::<HashSet<_>>().len(),
                    publishers.len()
                );
                assert_eq!(
                    slots.iter().collect::<HashSet<_>>(),
                    publishers.iter().collect::<HashSet<_>>()
                );
            }
        }
    }

    #[test]
    fn fresh_trees_have_canonical_initial_state() {
        for participants in all_counts() {
            let nodes = build_tree(participants, Locality::Good).unwrap();

            for node in &nodes {
                assert!(!node.local_sense());
                assert!(node.departure_sense().peek());
                assert!(node.arrival_slots().iter().all(|slot| slot.peek()));
            }
        }
    }

    #[test]
    fn every_shared_cell_occupies_a_private_cache_line() {
        let nodes = build_tree(nz!(8), Locality::Good).unwrap();

        let mut lines = HashSet::new();

        for node in &nodes {
            let mut addresses = vec![Arc::as_ptr(node.departure_sense()) as usize];
            addresses.extend(
                node.arrival_slots()
                    .iter()
                    .map(|slot| Arc::as_ptr(slot) as usize),
            );

            for address in addresses {
                assert_eq!(address % CACHE_LINE_SIZE, 0, "cell not line-aligned");
                assert!(
                    lines.insert(address / CACHE_LINE_SIZE),
                    "two shared cells on one cache line"
                );
            }
        }
    }

    #[test]
    fn global_tree_shares_one_departure_flag() {
        let nodes = build_global_tree(nz!(8), Locality::Good).unwrap();

        let flag = nodes[0].global_sense();
        assert!(
            nodes
                .iter()
                .all(|node| Arc::ptr_eq(node.global_sense(), flag))
        );
        assert!(flag.peek());
    }

    #[test]
    fn global_tree_arrival_shape_matches_tree_barrier() {
        for participants in all_counts() {
            for locality in [Locality::Good, Locality::Bad] {
                let tree = build_tree(participants, locality).unwrap();
                let global = build_global_tree(participants, locality).unwrap();

                for (a, b) in tree.iter().zip(&global) {
                    assert_eq!(a.is_root(), b.is_root());
                    assert_eq!(a.arrival_slots().len(), b.arrival_slots().len());
                }
            }
        }
    }

    #[test]
    fn nine_participants_is_a_configuration_error() {
        let result = build_tree(nz!(9), Locality::Good);

        assert!(matches!(
            result,
            Err(Error::UnsupportedParticipantCount { participants: 9 })
        ));

        assert!(build_global_tree(nz!(9), Locality::Bad).is_err());
    }

    #[test]
    fn single_participant_tree_is_a_lone_root() {
        let nodes = build_tree(nz!(1), Locality::Good).unwrap();

        assert_eq!(nodes.len(), 1);
        assert!(nodes[0].is_root());
        assert!(nodes[0].arrival_slots().is_empty());
        assert!(nodes[0].departure_links().is_empty());
    }
}
