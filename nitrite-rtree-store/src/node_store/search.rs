//! Bounding-box search over the persisted node graph.
//!
//! Every node links to the next node of the same step through `sibling_id`
//! and to its first child through `child_id`. A negative `child_id` holds a
//! leaf entry. The traversal uses an explicit stack, so deep or degenerate
//! trees cannot exhaust the call stack.

use std::collections::HashSet;

use super::store_types::{Node, NodeId, StoreError, StoreResult};
use crate::bounding_box::BoundingBox;

/// Collects the leaf entries reachable from `start` whose path intersects
/// `query`.
///
/// `load` fetches a node by id and `intersects` decides whether a node
/// boundary matches the query. Nodes without a boundary never match. The
/// order of the returned entries is unspecified.
pub fn search_nodes<L, P>(
    start: NodeId,
    query: &BoundingBox,
    mut load: L,
    intersects: P,
) -> StoreResult<Vec<NodeId>>
where
    L: FnMut(NodeId) -> StoreResult<Node>,
    P: Fn(&BoundingBox, &BoundingBox) -> bool,
{
    let mut results = Vec::new();
    let mut stack = vec![start];
    let mut visited = HashSet::new();

    while let Some(id) = stack.pop() {
        if !visited.insert(id) {
            return Err(StoreError::InvariantViolation(format!(
                "node {} is reachable more than once",
                id
            )));
        }

        let node = load(id)?;
        if node.sibling_id != 0 {
            stack.push(node.sibling_id);
        }

        let hit = match &node.boundary {
            Some(boundary) => intersects(boundary, query),
            None => false,
        };
        if !hit {
            continue;
        }

        match node.child_id {
            child if child > 0 => stack.push(child),
            0 => {
                return Err(StoreError::InvariantViolation(format!(
                    "node {} intersects the query but has no child",
                    id
                )))
            }
            entry => match entry.checked_neg() {
                Some(entry) => results.push(entry),
                None => {
                    return Err(StoreError::InvariantViolation(format!(
                        "node {} holds an out of range leaf entry {}",
                        id, entry
                    )))
                }
            },
        }
    }

    log::trace!("Search from node {} matched {} entries", start, results.len());
    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn tree() -> HashMap<NodeId, Node> {
        let mut nodes = HashMap::new();
        nodes.insert(
            1,
            Node::new(1)
                .with_boundary(BoundingBox::new(&[0.0, 10.0, 0.0, 10.0]))
                .with_child(2)
                .with_child_count(2),
        );
        nodes.insert(
            2,
            Node::new(2)
                .with_boundary(BoundingBox::new(&[0.0, 5.0, 0.0, 5.0]))
                .with_parent(1)
                .with_sibling(3)
                .with_entry(1),
        );
        nodes.insert(
            3,
            Node::new(3)
                .with_boundary(BoundingBox::new(&[5.0, 10.0, 5.0, 10.0]))
                .with_parent(1)
                .with_entry(2),
        );
        nodes
    }

    fn run(nodes: &HashMap<NodeId, Node>, query: &[f64]) -> StoreResult<Vec<NodeId>> {
        search_nodes(
            1,
            &BoundingBox::new(query),
            |id| {
                nodes
                    .get(&id)
                    .cloned()
                    .ok_or(StoreError::InvalidNodeId(id))
            },
            BoundingBox::intersects,
        )
    }

    #[test]
    fn test_both_leaves_match() {
        let mut found = run(&tree(), &[4.0, 6.0, 4.0, 6.0]).unwrap();
        found.sort();
        assert_eq!(found, vec![1, 2]);
    }

    #[test]
    fn test_one_leaf_matches() {
        let found = run(&tree(), &[1.0, 2.0, 1.0, 2.0]).unwrap();
        assert_eq!(found, vec![1]);
    }

    #[test]
    fn test_disjoint_query_is_empty() {
        let found = run(&tree(), &[20.0, 30.0, 20.0, 30.0]).unwrap();
        assert!(found.is_empty());
    }

    #[test]
    fn test_zero_child_is_invariant_violation() {
        let mut nodes = tree();
        nodes.get_mut(&3).unwrap().child_id = 0;
        let err = run(&nodes, &[6.0, 7.0, 6.0, 7.0]).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
        // the broken node is pruned when it does not intersect
        assert_eq!(run(&nodes, &[1.0, 2.0, 1.0, 2.0]).unwrap(), vec![1]);
    }

    #[test]
    fn test_unrepresentable_entry_is_invariant_violation() {
        let mut nodes = tree();
        nodes.get_mut(&2).unwrap().child_id = i32::MIN;
        let err = run(&nodes, &[1.0, 2.0, 1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
        assert_eq!(run(&nodes, &[6.0, 7.0, 6.0, 7.0]).unwrap(), vec![2]);
    }

    #[test]
    fn test_cycle_is_detected() {
        let mut nodes = tree();
        nodes.get_mut(&3).unwrap().sibling_id = 2;
        let err = run(&nodes, &[1.0, 2.0, 1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StoreError::InvariantViolation(_)));
    }

    #[test]
    fn test_missing_boundary_is_pruned() {
        let mut nodes = tree();
        nodes.get_mut(&2).unwrap().boundary = None;
        assert_eq!(run(&nodes, &[0.0, 10.0, 0.0, 10.0]).unwrap(), vec![2]);
    }

    #[test]
    fn test_deep_sibling_chain() {
        let mut nodes = HashMap::new();
        let n = 50_000;
        for id in 1..=n {
            let sibling = if id < n { id + 1 } else { 0 };
            nodes.insert(
                id,
                Node::new(id)
                    .with_boundary(BoundingBox::new(&[id as f64, id as f64 + 0.5]))
                    .with_sibling(sibling)
                    .with_entry(id),
            );
        }
        let found = search_nodes(
            1,
            &BoundingBox::new(&[0.0, n as f64 + 1.0]),
            |id| Ok(nodes[&id].clone()),
            BoundingBox::intersects,
        )
        .unwrap();
        assert_eq!(found.len(), n as usize);
    }
}
