//! Unweighted shortest paths over forward adjacency.

use std::collections::{HashMap, VecDeque};

use super::graph_store::GraphStore;
use super::models::Direction;

/// Breadth-first path search following `from → to` adjacency only.
///
/// Bidirectional edges are followable both ways because they populate the
/// forward adjacency of both endpoints.
pub struct PathFinder<'a> {
    store: &'a GraphStore,
}

impl<'a> PathFinder<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self { store }
    }

    /// Shortest hop-count path from `from` to `to`, endpoints included.
    ///
    /// Among equal-length paths the first one discovered wins; neighbor
    /// order is insertion order. `None` when either node is unknown or no
    /// forward path exists (the nodes may still be connected undirected).
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        if !self.store.contains_node(from) || !self.store.contains_node(to) {
            return None;
        }
        if from == to {
            return Some(vec![from.to_string()]);
        }

        let mut parent: HashMap<&str, &str> = HashMap::new();
        let mut queue = VecDeque::from([from]);
        parent.insert(from, from);

        while let Some(current) = queue.pop_front() {
            for next in self.store.neighbor_ids(current, Direction::Out) {
                if parent.contains_key(next) {
                    continue;
                }
                parent.insert(next, current);
                if next == to {
                    return Some(Self::unwind(&parent, from, to));
                }
                queue.push_back(next);
            }
        }
        None
    }

    /// Hop distance from `source` to every node reachable from it (source excluded).
    pub fn distances_from(&self, source: &str) -> HashMap<&'a str, usize> {
        let mut dist: HashMap<&'a str, usize> = HashMap::new();
        let Some(node) = self.store.get_node(source) else {
            return dist;
        };
        let start: &'a str = node.id.as_str();
        let mut queue = VecDeque::from([(start, 0usize)]);
        dist.insert(start, 0);

        while let Some((current, d)) = queue.pop_front() {
            for next in self.store.neighbor_ids(current, Direction::Out) {
                if !dist.contains_key(next) {
                    dist.insert(next, d + 1);
                    queue.push_back((next, d + 1));
                }
            }
        }
        dist.remove(start);
        dist
    }

    fn unwind(parent: &HashMap<&str, &str>, from: &str, to: &str) -> Vec<String> {
        let mut path = vec![to.to_string()];
        let mut cursor = to;
        while cursor != from {
            cursor = parent[cursor];
            path.push(cursor.to_string());
        }
        path.reverse();
        path
    }
}

impl GraphStore {
    /// Shortest forward path between two nodes. See [`PathFinder::find_path`].
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        PathFinder::new(self).find_path(from, to)
    }
}
