//! Indexed in-memory graph store.
//!
//! `GraphStore` owns every node and edge and keeps four derived indices in
//! lock-step with them:
//!
//! ```text
//! nodes ──► type_index[type]            (one bucket per node)
//! edges ──► adjacency[from] ∋ to        (+ adjacency[to] ∋ from if bidirectional)
//!       ──► reverse_adjacency[to] ∋ from (+ reverse_adjacency[from] ∋ to if bidirectional)
//!       ──► incident[node] ∋ edge key   (cascade deletion / link recomputation)
//! ```
//!
//! All maps are insertion-ordered so traversal results are deterministic.
//! Access is single-writer; callers serialize concurrent mutation.

use chrono::Utc;
use indexmap::{IndexMap, IndexSet};
use std::collections::{BTreeMap, HashMap};

use super::models::{
    Direction, Edge, EdgeKey, EdgeMetadata, EdgeSpec, GraphStats, Node, NodeMetadata, NodeSpec,
    NodeType, NodeUpdate, DEFAULT_CREATED_BY, DEFAULT_EDGE_STRENGTH,
};
use super::query::QueryConfig;
use crate::error::{GraphError, GraphResult};

/// Connected components keyed by the id of the node each search started from.
pub type Clusters = IndexMap<String, IndexSet<String>>;

/// Owner of all nodes and edges plus their adjacency and type indices.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
    nodes: IndexMap<String, Node>,
    edges: IndexMap<EdgeKey, Edge>,
    adjacency: HashMap<String, IndexSet<String>>,
    reverse_adjacency: HashMap<String, IndexSet<String>>,
    type_index: HashMap<NodeType, IndexSet<String>>,
    incident: HashMap<String, IndexSet<EdgeKey>>,
    revision: u64,
    query_config: QueryConfig,
}

impl GraphStore {
    /// Create an empty store with default query settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store with explicit query settings.
    pub fn with_query_config(query_config: QueryConfig) -> Self {
        Self {
            query_config,
            ..Self::default()
        }
    }

    pub fn query_config(&self) -> &QueryConfig {
        &self.query_config
    }

    // ========================================================================
    // Nodes
    // ========================================================================

    /// Insert or overwrite a node.
    ///
    /// Re-adding an existing id replaces the node entirely (metadata defaults
    /// are recomputed unless supplied) and keeps its edges.
    pub fn add_node(&mut self, spec: NodeSpec) -> &Node {
        let now = Utc::now();
        let node = Node {
            id: spec.id,
            node_type: spec.node_type,
            properties: spec.properties,
            metadata: NodeMetadata {
                created_at: spec.metadata.created_at.unwrap_or(now),
                updated_at: spec.metadata.updated_at.unwrap_or(now),
                created_by: spec
                    .metadata
                    .created_by
                    .unwrap_or_else(|| DEFAULT_CREATED_BY.to_string()),
                source: spec.metadata.source,
                confidence: spec.metadata.confidence,
            },
        };

        let id = node.id.clone();
        let previous_type = self.nodes.get(&id).map(|n| n.node_type);
        if let Some(old_type) = previous_type.filter(|t| *t != node.node_type) {
            self.remove_from_type_index(old_type, &id);
        }
        self.type_index
            .entry(node.node_type)
            .or_default()
            .insert(id.clone());
        self.adjacency.entry(id.clone()).or_default();
        self.reverse_adjacency.entry(id.clone()).or_default();
        self.incident.entry(id.clone()).or_default();

        tracing::debug!(node_id = %id, node_type = %node.node_type, "node upserted");
        self.nodes.insert(id.clone(), node);
        self.touch(&[id.as_str()]);
        &self.nodes[&id]
    }

    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    /// Apply a partial update. Returns `None` if the node does not exist.
    pub fn update_node(&mut self, id: &str, update: NodeUpdate) -> Option<&Node> {
        let node = self.nodes.get_mut(id)?;
        let old_type = node.node_type;

        if let Some(node_type) = update.node_type {
            node.node_type = node_type;
        }
        if let Some(properties) = update.properties {
            node.properties = properties;
        }
        if let Some(created_by) = update.created_by {
            node.metadata.created_by = created_by;
        }
        if update.source.is_some() {
            node.metadata.source = update.source;
        }
        if update.confidence.is_some() {
            node.metadata.confidence = update.confidence;
        }
        node.metadata.updated_at = Utc::now();
        let new_type = node.node_type;

        if new_type != old_type {
            self.remove_from_type_index(old_type, id);
            self.type_index
                .entry(new_type)
                .or_default()
                .insert(id.to_string());
        }

        tracing::debug!(node_id = %id, "node updated");
        self.touch(&[id]);
        self.nodes.get(id)
    }

    /// Remove a node and every edge touching it.
    pub fn delete_node(&mut self, id: &str) -> bool {
        let Some(node) = self.nodes.shift_remove(id) else {
            return false;
        };
        self.remove_from_type_index(node.node_type, id);

        let keys = self.incident.remove(id).unwrap_or_default();
        let removed_edges = keys.len();
        for key in keys {
            self.edges.shift_remove(&key);
            let other = if key.from == id { &key.to } else { &key.from };
            if let Some(set) = self.incident.get_mut(other) {
                set.shift_remove(&key);
            }
        }

        for neighbor in self.adjacency.remove(id).unwrap_or_default() {
            if let Some(set) = self.reverse_adjacency.get_mut(&neighbor) {
                set.shift_remove(id);
            }
        }
        for neighbor in self.reverse_adjacency.remove(id).unwrap_or_default() {
            if let Some(set) = self.adjacency.get_mut(&neighbor) {
                set.shift_remove(id);
            }
        }

        tracing::debug!(node_id = %id, removed_edges, "node deleted");
        self.touch(&[id]);
        true
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn get_nodes_by_type(&self, node_type: NodeType) -> Vec<&Node> {
        self.type_index
            .get(&node_type)
            .map(|ids| ids.iter().filter_map(|id| self.nodes.get(id)).collect())
            .unwrap_or_default()
    }

    /// Ids in the type bucket, in insertion order.
    pub(crate) fn type_bucket(&self, node_type: NodeType) -> impl Iterator<Item = &String> {
        self.type_index
            .get(&node_type)
            .into_iter()
            .flat_map(|ids| ids.iter())
    }

    // ========================================================================
    // Edges
    // ========================================================================

    /// Insert or overwrite the edge identified by `(from, type, to)`.
    ///
    /// Both endpoints must already exist.
    pub fn add_edge(&mut self, spec: EdgeSpec) -> GraphResult<&Edge> {
        let key = spec.key();
        for endpoint in [&spec.from, &spec.to] {
            if !self.nodes.contains_key(endpoint) {
                return Err(GraphError::MissingEndpoint {
                    edge: key.id(),
                    node: endpoint.clone(),
                });
            }
        }

        let edge = Edge {
            id: key.id(),
            edge_type: spec.edge_type,
            from: spec.from,
            to: spec.to,
            properties: spec.properties,
            metadata: EdgeMetadata {
                created_at: spec.metadata.created_at.unwrap_or_else(Utc::now),
                strength: spec.metadata.strength.unwrap_or(DEFAULT_EDGE_STRENGTH),
                bidirectional: spec.metadata.bidirectional.unwrap_or(false),
            },
        };

        self.incident
            .entry(edge.from.clone())
            .or_default()
            .insert(key.clone());
        self.incident
            .entry(edge.to.clone())
            .or_default()
            .insert(key.clone());
        let (from, to) = (edge.from.clone(), edge.to.clone());
        let replaced = self.edges.insert(key.clone(), edge).is_some();

        self.sync_link(&from, &to);
        self.sync_link(&to, &from);

        tracing::debug!(edge_id = %key, replaced, "edge upserted");
        self.touch(&[from.as_str(), to.as_str()]);
        Ok(&self.edges[&key])
    }

    /// Look up an edge by its wire id (`from-TYPE-to`). Linear in edge count.
    pub fn get_edge(&self, id: &str) -> Option<&Edge> {
        self.edges.values().find(|e| e.id == id)
    }

    pub fn get_edge_by_key(&self, key: &EdgeKey) -> Option<&Edge> {
        self.edges.get(key)
    }

    /// Delete an edge by its wire id.
    pub fn delete_edge(&mut self, id: &str) -> bool {
        let key = match self.get_edge(id) {
            Some(edge) => edge.key(),
            None => return false,
        };
        self.delete_edge_by_key(&key)
    }

    pub fn delete_edge_by_key(&mut self, key: &EdgeKey) -> bool {
        let Some(edge) = self.edges.shift_remove(key) else {
            return false;
        };
        for endpoint in [&edge.from, &edge.to] {
            if let Some(set) = self.incident.get_mut(endpoint) {
                set.shift_remove(key);
            }
        }
        self.sync_link(&edge.from, &edge.to);
        self.sync_link(&edge.to, &edge.from);

        tracing::debug!(edge_id = %key, "edge deleted");
        self.touch(&[edge.from.as_str(), edge.to.as_str()]);
        true
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> impl Iterator<Item = &Edge> {
        self.edges.values()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Every edge where `id` is an endpoint.
    pub fn edges_of(&self, id: &str) -> Vec<&Edge> {
        self.incident
            .get(id)
            .map(|keys| keys.iter().filter_map(|k| self.edges.get(k)).collect())
            .unwrap_or_default()
    }

    // ========================================================================
    // Adjacency reads
    // ========================================================================

    pub fn get_neighbors(&self, id: &str, direction: Direction) -> Vec<&Node> {
        self.neighbor_ids(id, direction)
            .into_iter()
            .filter_map(|n| self.nodes.get(n))
            .collect()
    }

    /// Neighbor ids without resolving nodes. `Both` lists outgoing first.
    pub fn neighbor_ids(&self, id: &str, direction: Direction) -> Vec<&str> {
        let out = self.adjacency.get(id).into_iter().flatten();
        let inc = self.reverse_adjacency.get(id).into_iter().flatten();
        match direction {
            Direction::Out => out.map(String::as_str).collect(),
            Direction::In => inc.map(String::as_str).collect(),
            Direction::Both => {
                let mut seen: IndexSet<&str> = out.map(String::as_str).collect();
                seen.extend(inc.map(String::as_str));
                seen.into_iter().collect()
            }
        }
    }

    /// Unnormalized degree: `|reverse_adjacency[id]| + |adjacency[id]|`.
    ///
    /// A bidirectional edge contributes to both sets on both endpoints.
    pub fn get_centrality_score(&self, id: &str) -> usize {
        let out = self.adjacency.get(id).map_or(0, IndexSet::len);
        let inc = self.reverse_adjacency.get(id).map_or(0, IndexSet::len);
        out + inc
    }

    /// Connected components over the undirected union of both adjacencies.
    ///
    /// Iterative DFS; seeds are taken in node insertion order.
    pub fn find_clusters(&self) -> Clusters {
        let mut visited: IndexSet<&str> = IndexSet::with_capacity(self.nodes.len());
        let mut clusters = Clusters::new();

        for seed in self.nodes.keys() {
            if visited.contains(seed.as_str()) {
                continue;
            }
            let mut members = IndexSet::new();
            let mut stack = vec![seed.as_str()];
            while let Some(current) = stack.pop() {
                if !visited.insert(current) {
                    continue;
                }
                members.insert(current.to_string());
                for next in self.neighbor_ids(current, Direction::Both) {
                    if !visited.contains(next) {
                        stack.push(next);
                    }
                }
            }
            clusters.insert(seed.clone(), members);
        }
        clusters
    }

    pub fn get_stats(&self) -> GraphStats {
        let mut node_types = BTreeMap::new();
        for (node_type, ids) in &self.type_index {
            if !ids.is_empty() {
                node_types.insert(*node_type, ids.len());
            }
        }
        let node_count = self.nodes.len();
        let edge_count = self.edges.len();
        GraphStats {
            node_count,
            edge_count,
            node_types,
            avg_degree: if node_count > 0 {
                2.0 * edge_count as f64 / node_count as f64
            } else {
                0.0
            },
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Drop every node, edge and index entry. Query settings are kept.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
        self.adjacency.clear();
        self.reverse_adjacency.clear();
        self.type_index.clear();
        self.incident.clear();
        self.touch(&[]);
        tracing::debug!("graph cleared");
    }

    /// Monotonic counter bumped by every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Verify that every index mirrors the node and edge sets.
    ///
    /// Returns a description of each violation; empty means consistent.
    pub fn check_invariants(&self) -> Vec<String> {
        let mut violations = Vec::new();

        for (node_type, ids) in &self.type_index {
            for id in ids {
                match self.nodes.get(id) {
                    Some(node) if node.node_type == *node_type => {}
                    Some(node) => violations.push(format!(
                        "{} indexed as {} but has type {}",
                        id, node_type, node.node_type
                    )),
                    None => violations.push(format!("{} indexed as {} but missing", id, node_type)),
                }
            }
        }
        for node in self.nodes.values() {
            let bucketed = self
                .type_index
                .get(&node.node_type)
                .is_some_and(|ids| ids.contains(&node.id));
            if !bucketed {
                violations.push(format!("{} missing from its type bucket", node.id));
            }
        }

        // Expected adjacency derived from the edge set.
        let mut expected: IndexSet<(&str, &str)> = IndexSet::new();
        for edge in self.edges.values() {
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(endpoint) {
                    violations.push(format!("edge {} has dangling endpoint {}", edge.id, endpoint));
                }
            }
            expected.insert((edge.from.as_str(), edge.to.as_str()));
            if edge.metadata.bidirectional {
                expected.insert((edge.to.as_str(), edge.from.as_str()));
            }
        }

        let mut actual_forward: IndexSet<(&str, &str)> = IndexSet::new();
        for (from, targets) in &self.adjacency {
            for to in targets {
                actual_forward.insert((from.as_str(), to.as_str()));
            }
        }
        let mut actual_reverse: IndexSet<(&str, &str)> = IndexSet::new();
        for (to, sources) in &self.reverse_adjacency {
            for from in sources {
                actual_reverse.insert((from.as_str(), to.as_str()));
            }
        }

        for pair in &expected {
            if !actual_forward.contains(pair) {
                violations.push(format!("adjacency missing {} -> {}", pair.0, pair.1));
            }
            if !actual_reverse.contains(pair) {
                violations.push(format!("reverse adjacency missing {} -> {}", pair.0, pair.1));
            }
        }
        for pair in actual_forward.iter().chain(actual_reverse.iter()) {
            if !expected.contains(pair) {
                violations.push(format!("stale adjacency {} -> {}", pair.0, pair.1));
            }
        }

        violations
    }

    // ========================================================================
    // Internal helpers
    // ========================================================================

    /// Recompute whether `b` belongs in `adjacency[a]` (and `a` in
    /// `reverse_adjacency[b]`) from the edges still incident to `a`.
    fn sync_link(&mut self, a: &str, b: &str) {
        let linked = self.incident.get(a).is_some_and(|keys| {
            keys.iter()
                .filter_map(|k| self.edges.get(k))
                .any(|e| e.links(a, b))
        });

        if linked {
            self.adjacency
                .entry(a.to_string())
                .or_default()
                .insert(b.to_string());
            self.reverse_adjacency
                .entry(b.to_string())
                .or_default()
                .insert(a.to_string());
        } else {
            if let Some(set) = self.adjacency.get_mut(a) {
                set.shift_remove(b);
            }
            if let Some(set) = self.reverse_adjacency.get_mut(b) {
                set.shift_remove(a);
            }
        }
    }

    fn remove_from_type_index(&mut self, node_type: NodeType, id: &str) {
        if let Some(ids) = self.type_index.get_mut(&node_type) {
            ids.shift_remove(id);
        }
    }

    /// Bump the revision and, in debug builds, verify the index entries of
    /// the nodes a mutation touched. O(degree) per node.
    fn touch(&mut self, touched: &[&str]) {
        self.revision += 1;
        debug_assert!(
            touched.iter().all(|id| self.local_violations(id).is_empty()),
            "graph index invariants violated: {:?}",
            touched
                .iter()
                .flat_map(|id| self.local_violations(id))
                .collect::<Vec<_>>()
        );
    }

    /// Index consistency for a single node: its type bucket, and its
    /// adjacency sets against the edges incident to it.
    fn local_violations(&self, id: &str) -> Vec<String> {
        let mut violations = Vec::new();
        let Some(node) = self.nodes.get(id) else {
            if self.type_index.values().any(|ids| ids.contains(id)) {
                violations.push(format!("deleted node {} still in a type bucket", id));
            }
            if self.adjacency.contains_key(id)
                || self.reverse_adjacency.contains_key(id)
                || self.incident.contains_key(id)
            {
                violations.push(format!("deleted node {} still has index entries", id));
            }
            return violations;
        };

        for (node_type, ids) in &self.type_index {
            if ids.contains(id) != (*node_type == node.node_type) {
                violations.push(format!("{} misfiled in type bucket {}", id, node_type));
            }
        }
        if !self.type_index.contains_key(&node.node_type) {
            violations.push(format!("{} missing from its type bucket", id));
        }

        let mut expected_out: IndexSet<&str> = IndexSet::new();
        let mut expected_in: IndexSet<&str> = IndexSet::new();
        for key in self.incident.get(id).into_iter().flatten() {
            let Some(edge) = self.edges.get(key) else {
                violations.push(format!("{} lists missing edge {}", id, key));
                continue;
            };
            for endpoint in [&edge.from, &edge.to] {
                if !self.nodes.contains_key(endpoint) {
                    violations.push(format!("edge {} has dangling endpoint {}", edge.id, endpoint));
                }
            }
            let other = if edge.from == id { &edge.to } else { &edge.from };
            if edge.from == id || edge.metadata.bidirectional {
                expected_out.insert(other.as_str());
            }
            if edge.to == id || edge.metadata.bidirectional {
                let source = if edge.to == id { &edge.from } else { &edge.to };
                expected_in.insert(source.as_str());
            }
        }

        let actual_out: IndexSet<&str> = self.neighbor_ids(id, Direction::Out).into_iter().collect();
        let actual_in: IndexSet<&str> = self.neighbor_ids(id, Direction::In).into_iter().collect();
        if actual_out != expected_out {
            violations.push(format!(
                "adjacency of {} is {:?}, edges imply {:?}",
                id, actual_out, expected_out
            ));
        }
        if actual_in != expected_in {
            violations.push(format!(
                "reverse adjacency of {} is {:?}, edges imply {:?}",
                id, actual_in, expected_in
            ));
        }
        violations
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::{EdgeType, PropertyValue};

    fn ids(nodes: &[&Node]) -> Vec<String> {
        nodes.iter().map(|n| n.id.clone()).collect()
    }

    /// Service `api` depends on database `db`.
    fn make_service_db() -> GraphStore {
        let mut store = GraphStore::new();
        store.add_node(NodeSpec::new("api", NodeType::Service).with_property("name", "API"));
        store.add_node(NodeSpec::new("db", NodeType::Database));
        store
            .add_edge(EdgeSpec::new("api", EdgeType::DependsOn, "db"))
            .unwrap();
        store
    }

    /// Hub with three spokes, the last one pointing back at the hub.
    fn make_hub() -> GraphStore {
        let mut store = GraphStore::new();
        for id in ["hub", "s1", "s2", "s3"] {
            store.add_node(NodeSpec::new(id, NodeType::Service));
        }
        store
            .add_edge(EdgeSpec::new("hub", EdgeType::ConnectsTo, "s1"))
            .unwrap();
        store
            .add_edge(EdgeSpec::new("hub", EdgeType::ConnectsTo, "s2"))
            .unwrap();
        store
            .add_edge(EdgeSpec::new("s3", EdgeType::ConnectsTo, "hub"))
            .unwrap();
        store
    }

    #[test]
    fn test_add_node_stamps_defaults() {
        let mut store = GraphStore::new();
        let node = store.add_node(NodeSpec::new("svc", NodeType::Service)).clone();
        assert_eq!(node.metadata.created_by, DEFAULT_CREATED_BY);
        assert!(node.metadata.source.is_none());
        assert_eq!(store.get_node("svc"), Some(&node));
        assert_eq!(store.node_count(), 1);
    }

    #[test]
    fn test_add_node_upsert_replaces_and_reindexes_type() {
        let mut store = make_service_db();
        store.add_node(NodeSpec::new("api", NodeType::Api).with_property("v", 2));

        assert_eq!(store.node_count(), 2);
        assert!(store.get_nodes_by_type(NodeType::Service).is_empty());
        assert_eq!(ids(&store.get_nodes_by_type(NodeType::Api)), vec!["api"]);
        let node = store.get_node("api").unwrap();
        assert!(node.property("name").is_none(), "upsert replaces the property bag");
        assert_eq!(node.property("v"), Some(&PropertyValue::Integer(2)));
        // edges survive the upsert
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.get_centrality_score("api"), 1);
    }

    #[test]
    fn test_update_node_merges_metadata_and_bumps_updated_at() {
        let mut store = GraphStore::new();
        let created = store
            .add_node(NodeSpec::new("svc", NodeType::Service).created_by("extractor"))
            .clone();

        let updated = store
            .update_node(
                "svc",
                NodeUpdate {
                    node_type: Some(NodeType::Deployment),
                    confidence: Some(0.7),
                    ..Default::default()
                },
            )
            .unwrap()
            .clone();

        assert_eq!(updated.metadata.created_at, created.metadata.created_at);
        assert!(updated.metadata.updated_at >= created.metadata.updated_at);
        assert_eq!(updated.metadata.created_by, "extractor");
        assert_eq!(updated.metadata.confidence, Some(0.7));
        assert_eq!(ids(&store.get_nodes_by_type(NodeType::Deployment)), vec!["svc"]);
        assert!(store.get_nodes_by_type(NodeType::Service).is_empty());
    }

    #[test]
    fn test_update_missing_node_is_none() {
        let mut store = GraphStore::new();
        assert!(store.update_node("ghost", NodeUpdate::default()).is_none());
        assert_eq!(store.revision(), 0);
    }

    #[test]
    fn test_add_edge_populates_adjacency() {
        let store = make_service_db();
        assert_eq!(ids(&store.get_neighbors("api", Direction::Out)), vec!["db"]);
        assert_eq!(ids(&store.get_neighbors("db", Direction::In)), vec!["api"]);
        assert!(store.get_neighbors("api", Direction::In).is_empty());
        assert_eq!(store.get_centrality_score("api"), 1);
        assert_eq!(store.get_centrality_score("db"), 1);

        let edge = store.get_edge("api-DEPENDS_ON-db").unwrap();
        assert_eq!(edge.metadata.strength, 1.0);
        assert!(!edge.metadata.bidirectional);
    }

    #[test]
    fn test_add_edge_same_triple_overwrites() {
        let mut store = make_service_db();
        store
            .add_edge(EdgeSpec::new("api", EdgeType::DependsOn, "db").strength(0.3))
            .unwrap();
        assert_eq!(store.edge_count(), 1);
        assert_eq!(store.get_edge("api-DEPENDS_ON-db").unwrap().metadata.strength, 0.3);
        assert_eq!(store.get_centrality_score("api"), 1);
    }

    #[test]
    fn test_add_edge_missing_endpoint_rejected() {
        let mut store = make_service_db();
        let err = store
            .add_edge(EdgeSpec::new("api", EdgeType::Owns, "nowhere"))
            .unwrap_err();
        assert!(matches!(err, GraphError::MissingEndpoint { ref node, .. } if node == "nowhere"));
        assert_eq!(store.edge_count(), 1);
    }

    #[test]
    fn test_bidirectional_edge_mirrors_both_directions() {
        let mut store = GraphStore::new();
        store.add_node(NodeSpec::new("a", NodeType::Service));
        store.add_node(NodeSpec::new("b", NodeType::Service));
        store
            .add_edge(EdgeSpec::new("a", EdgeType::ConnectsTo, "b").bidirectional())
            .unwrap();

        assert_eq!(ids(&store.get_neighbors("b", Direction::Out)), vec!["a"]);
        assert_eq!(ids(&store.get_neighbors("a", Direction::In)), vec!["b"]);
        // counted in both sets on both endpoints
        assert_eq!(store.get_centrality_score("a"), 2);
        assert_eq!(store.get_centrality_score("b"), 2);

        // downgrading to directed drops the mirror entries
        store
            .add_edge(EdgeSpec::new("a", EdgeType::ConnectsTo, "b"))
            .unwrap();
        assert!(store.get_neighbors("b", Direction::Out).is_empty());
        assert_eq!(store.get_centrality_score("a"), 1);
    }

    #[test]
    fn test_delete_edge_keeps_link_backed_by_other_edge() {
        let mut store = make_service_db();
        store
            .add_edge(EdgeSpec::new("api", EdgeType::ConnectsTo, "db"))
            .unwrap();
        assert!(store.delete_edge("api-DEPENDS_ON-db"));
        assert_eq!(ids(&store.get_neighbors("api", Direction::Out)), vec!["db"]);

        assert!(store.delete_edge("api-CONNECTS_TO-db"));
        assert!(store.get_neighbors("api", Direction::Out).is_empty());
        assert!(store.get_neighbors("db", Direction::In).is_empty());
        assert!(!store.delete_edge("api-CONNECTS_TO-db"));
    }

    #[test]
    fn test_delete_node_cascades() {
        let mut store = make_hub();
        assert!(store.delete_node("hub"));

        assert!(store.get_node("hub").is_none());
        assert_eq!(store.edge_count(), 0);
        assert!(store.edges().all(|e| !e.touches("hub")));
        for spoke in ["s1", "s2", "s3"] {
            assert_eq!(store.get_centrality_score(spoke), 0);
            assert!(store.edges_of(spoke).is_empty());
        }
        assert!(store.check_invariants().is_empty());
        assert!(!store.delete_node("hub"));
    }

    #[test]
    fn test_hub_single_cluster() {
        let store = make_hub();
        let clusters = store.find_clusters();
        assert_eq!(clusters.len(), 1);
        assert_eq!(clusters["hub"].len(), 4);
        assert_eq!(store.get_centrality_score("hub"), 3);
    }

    #[test]
    fn test_find_clusters_separates_components() {
        let mut store = make_service_db();
        store.add_node(NodeSpec::new("lonely", NodeType::Secret));
        let clusters = store.find_clusters();
        assert_eq!(clusters.len(), 2);
        assert_eq!(clusters["api"].len(), 2);
        assert_eq!(clusters["lonely"].len(), 1);
    }

    #[test]
    fn test_neighbors_both_dedups() {
        let mut store = make_service_db();
        store
            .add_edge(EdgeSpec::new("db", EdgeType::Notifies, "api"))
            .unwrap();
        assert_eq!(ids(&store.get_neighbors("api", Direction::Both)), vec!["db"]);
        assert_eq!(store.get_centrality_score("api"), 2);
    }

    #[test]
    fn test_self_loop() {
        let mut store = GraphStore::new();
        store.add_node(NodeSpec::new("a", NodeType::Task));
        store.add_edge(EdgeSpec::new("a", EdgeType::Blocks, "a")).unwrap();
        assert_eq!(store.get_centrality_score("a"), 2);
        assert!(store.delete_node("a"));
        assert_eq!(store.edge_count(), 0);
    }

    #[test]
    fn test_stats() {
        let store = make_hub();
        let stats = store.get_stats();
        assert_eq!(stats.node_count, 4);
        assert_eq!(stats.edge_count, 3);
        assert_eq!(stats.node_types[&NodeType::Service], 4);
        assert!((stats.avg_degree - 1.5).abs() < f64::EPSILON);

        let empty = GraphStore::new().get_stats();
        assert_eq!(empty.avg_degree, 0.0);
        assert!(empty.node_types.is_empty());
    }

    #[test]
    fn test_lookup_misses() {
        let mut store = GraphStore::new();
        assert!(store.get_node("x").is_none());
        assert!(store.get_edge("x-OWNS-y").is_none());
        assert!(store.get_neighbors("x", Direction::Both).is_empty());
        assert_eq!(store.get_centrality_score("x"), 0);
        assert!(!store.delete_edge("x-OWNS-y"));
    }

    #[test]
    fn test_clear_and_revision() {
        let mut store = make_hub();
        let before = store.revision();
        assert!(before >= 7);
        store.clear();
        assert!(store.revision() > before);
        assert_eq!(store.node_count(), 0);
        assert!(store.find_clusters().is_empty());
    }

    #[test]
    fn test_local_violations_detect_drift() {
        let mut store = make_service_db();
        assert!(store.local_violations("api").is_empty());
        assert!(store.local_violations("db").is_empty());

        store
            .adjacency
            .get_mut("db")
            .unwrap()
            .insert("api".to_string());
        assert!(!store.local_violations("db").is_empty());
        assert!(!store.check_invariants().is_empty());

        let mut store = make_service_db();
        store
            .type_index
            .entry(NodeType::Team)
            .or_default()
            .insert("api".to_string());
        assert!(!store.local_violations("api").is_empty());
    }

    #[test]
    fn test_bulk_load_is_linear() {
        let ids: Vec<String> = (0..3000).map(|i| format!("svc-{}", i)).collect();
        let start = std::time::Instant::now();

        let mut store = GraphStore::new();
        for id in &ids {
            store.add_node(NodeSpec::new(id.as_str(), NodeType::Service));
        }
        for pair in ids.windows(2) {
            store
                .add_edge(EdgeSpec::new(pair[0].as_str(), EdgeType::DependsOn, pair[1].as_str()))
                .unwrap();
        }
        assert!(store.delete_node("svc-1500"));
        let elapsed = start.elapsed();

        assert_eq!(store.node_count(), 2999);
        assert_eq!(store.edge_count(), 2997);
        assert!(store.check_invariants().is_empty());
        // Limit sized for debug builds.
        assert!(
            elapsed.as_millis() < 5000,
            "3000-node chain load took {}ms (limit: 5000ms for debug build)",
            elapsed.as_millis()
        );
    }
}
