//! Lossless JSON export/import of the node and edge sets.
//!
//! Wire format: `{ "nodes": [Node], "edges": [Edge] }` with ISO-8601
//! timestamps. Indices are never serialized; import replays every node and
//! edge through `add_node` / `add_edge` so they are rebuilt by the same code
//! path as live mutation.

use serde::{Deserialize, Serialize};
use std::path::Path;

use super::graph_store::GraphStore;
use super::models::{Edge, EdgeSpec, Node, NodeSpec};
use super::query::QueryConfig;
use crate::error::{GraphError, GraphResult};

/// Borrowed view used when writing a snapshot.
#[derive(Serialize)]
struct SnapshotRef<'a> {
    nodes: Vec<&'a Node>,
    edges: Vec<&'a Edge>,
}

/// Owned snapshot read back from JSON.
#[derive(Debug, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub edges: Vec<Edge>,
}

impl GraphStore {
    fn snapshot_ref(&self) -> SnapshotRef<'_> {
        SnapshotRef {
            nodes: self.nodes().collect(),
            edges: self.edges().collect(),
        }
    }

    /// Serialize every node and edge, in insertion order.
    pub fn to_json(&self) -> GraphResult<String> {
        Ok(serde_json::to_string(&self.snapshot_ref())?)
    }

    pub fn to_json_pretty(&self) -> GraphResult<String> {
        Ok(serde_json::to_string_pretty(&self.snapshot_ref())?)
    }

    /// Rebuild a store from [`GraphStore::to_json`] output.
    pub fn from_json(json: &str) -> GraphResult<Self> {
        Self::from_json_with_config(json, QueryConfig::default())
    }

    pub fn from_json_with_config(json: &str, query_config: QueryConfig) -> GraphResult<Self> {
        let snapshot: Snapshot = serde_json::from_str(json)?;
        let mut store = GraphStore::with_query_config(query_config);
        store.load(snapshot)?;
        Ok(store)
    }

    /// Replay a snapshot into this store (upserting on id/key collisions).
    pub fn load(&mut self, snapshot: Snapshot) -> GraphResult<()> {
        let (node_count, edge_count) = (snapshot.nodes.len(), snapshot.edges.len());
        for node in snapshot.nodes {
            self.add_node(NodeSpec::from(node));
        }
        for edge in snapshot.edges {
            self.add_edge(EdgeSpec::from(edge))?;
        }
        debug_assert!(
            self.check_invariants().is_empty(),
            "snapshot replay left inconsistent indices: {:?}",
            self.check_invariants()
        );
        tracing::debug!(nodes = node_count, edges = edge_count, "snapshot loaded");
        Ok(())
    }

    /// Write a pretty-printed snapshot to `path`.
    pub fn write_to_path(&self, path: &Path) -> GraphResult<()> {
        let json = self.to_json_pretty()?;
        std::fs::write(path, json).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn read_from_path(path: &Path, query_config: QueryConfig) -> GraphResult<Self> {
        let json = std::fs::read_to_string(path).map_err(|source| GraphError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_with_config(&json, query_config)
    }
}
