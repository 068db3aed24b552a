//! Filter and depth-expansion queries over the store's indices.
//!
//! Evaluation order is part of the contract:
//!
//! 1. candidates: the type bucket for `node_type`, or every node
//! 2. property predicates: literal equality or `{ "$regex": pattern }`
//! 3. depth expansion: BFS over the undirected adjacency union
//! 4. `limit`: truncates the node list
//! 5. edges: every edge with both endpoints in the final node set
//!    (and matching `edge_type` if given)
//!
//! Because `limit` runs before step 5, the returned edges only connect the
//! retained nodes.

use indexmap::{IndexMap, IndexSet};
use regex::{Regex, RegexBuilder};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::VecDeque;

use super::graph_store::GraphStore;
use super::models::{Direction, Edge, EdgeType, Node, NodeType, PropertyValue};
use crate::error::{GraphError, GraphResult};

/// Default compiled-program size limit for `$regex` filters (1 MiB).
pub const DEFAULT_REGEX_SIZE_LIMIT: usize = 1 << 20;

/// Tuning for query evaluation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Upper bound on the compiled size of a `$regex` filter, in bytes
    pub regex_size_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            regex_size_limit: DEFAULT_REGEX_SIZE_LIMIT,
        }
    }
}

/// A single property filter.
///
/// On the wire a predicate is either `{ "$regex": "pattern" }` (optionally
/// with `"$options": "imsxU"`) or any other value, which is compared for
/// equality. A map carrying `$regex` never falls back to equality: a
/// non-string pattern, bad options or an unknown sibling key is an error.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum PropertyPredicate {
    Regex {
        #[serde(rename = "$regex")]
        pattern: String,
        #[serde(rename = "$options", skip_serializing_if = "Option::is_none")]
        options: Option<String>,
    },
    Equals(PropertyValue),
}

const REGEX_KEY: &str = "$regex";
const OPTIONS_KEY: &str = "$options";
const REGEX_FLAGS: &str = "imsxU";

impl PropertyPredicate {
    pub fn regex(pattern: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            options: None,
        }
    }

    /// Regex with inline flags: `i` case-insensitive, `m` multi-line,
    /// `s` dot matches newline, `x` ignore whitespace, `U` swap greed.
    pub fn regex_with_options(pattern: impl Into<String>, options: impl Into<String>) -> Self {
        Self::Regex {
            pattern: pattern.into(),
            options: Some(options.into()),
        }
    }

    pub fn equals(value: impl Into<PropertyValue>) -> Self {
        Self::Equals(value.into())
    }
}

impl<'de> Deserialize<'de> for PropertyPredicate {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = PropertyValue::deserialize(deserializer)?;
        let map = match value {
            PropertyValue::Map(map) if map.contains_key(REGEX_KEY) => map,
            other => return Ok(Self::Equals(other)),
        };

        let mut pattern = None;
        let mut options = None;
        for (key, value) in map {
            match (key.as_str(), value) {
                (REGEX_KEY, PropertyValue::String(p)) => pattern = Some(p),
                (REGEX_KEY, other) => {
                    return Err(D::Error::custom(format!(
                        "`$regex` must be a string, got {}",
                        other
                    )))
                }
                (OPTIONS_KEY, PropertyValue::String(flags)) => {
                    if let Some(bad) = flags.chars().find(|c| !REGEX_FLAGS.contains(*c)) {
                        return Err(D::Error::custom(format!(
                            "unsupported `$options` flag '{}' (expected any of {})",
                            bad, REGEX_FLAGS
                        )));
                    }
                    options = Some(flags);
                }
                (OPTIONS_KEY, other) => {
                    return Err(D::Error::custom(format!(
                        "`$options` must be a string, got {}",
                        other
                    )))
                }
                (other, _) => {
                    return Err(D::Error::custom(format!(
                        "unexpected key `{}` next to `$regex`",
                        other
                    )))
                }
            }
        }
        let pattern = pattern.ok_or_else(|| D::Error::missing_field(REGEX_KEY))?;
        Ok(Self::Regex { pattern, options })
    }
}

/// Query parameters. Every field is optional; the default query returns
/// the whole graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct GraphQuery {
    pub node_type: Option<NodeType>,
    pub edge_type: Option<EdgeType>,
    pub properties: IndexMap<String, PropertyPredicate>,
    pub depth: Option<usize>,
    pub limit: Option<usize>,
}

impl GraphQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node_type(mut self, node_type: NodeType) -> Self {
        self.node_type = Some(node_type);
        self
    }

    pub fn edge_type(mut self, edge_type: EdgeType) -> Self {
        self.edge_type = Some(edge_type);
        self
    }

    pub fn property(mut self, key: impl Into<String>, predicate: PropertyPredicate) -> Self {
        self.properties.insert(key.into(), predicate);
        self
    }

    pub fn depth(mut self, depth: usize) -> Self {
        self.depth = Some(depth);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Nodes and edges selected by a query.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphQueryResult {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

/// Query evaluator bound to a store.
pub struct QueryEngine<'a> {
    store: &'a GraphStore,
    config: &'a QueryConfig,
}

/// A predicate with its regex compiled once per query.
enum CompiledPredicate<'q> {
    Regex(Regex),
    Equals(&'q PropertyValue),
}

impl<'a> QueryEngine<'a> {
    pub fn new(store: &'a GraphStore) -> Self {
        Self {
            store,
            config: store.query_config(),
        }
    }

    /// Run `query` against the store.
    ///
    /// Fails only when a `$regex` predicate does not compile.
    pub fn execute(&self, query: &GraphQuery) -> GraphResult<GraphQueryResult> {
        let predicates = self.compile(query)?;

        // 1. candidates
        let candidates: Vec<&Node> = match query.node_type {
            Some(node_type) => self
                .store
                .type_bucket(node_type)
                .filter_map(|id| self.store.get_node(id))
                .collect(),
            None => self.store.nodes().collect(),
        };

        // 2. property predicates
        let matched: IndexSet<&str> = candidates
            .into_iter()
            .filter(|node| Self::matches(node, &predicates))
            .map(|node| node.id.as_str())
            .collect();

        // 3. depth expansion
        let depth = query.depth.unwrap_or(0);
        let mut selected = if depth > 0 {
            self.expand(matched, depth)
        } else {
            matched
        };

        // 4. limit
        if let Some(limit) = query.limit {
            selected.truncate(limit);
        }

        // 5. edges among the retained nodes
        let edges: Vec<Edge> = self
            .store
            .edges()
            .filter(|e| selected.contains(e.from.as_str()) && selected.contains(e.to.as_str()))
            .filter(|e| query.edge_type.map_or(true, |t| e.edge_type == t))
            .cloned()
            .collect();

        let nodes: Vec<Node> = selected
            .iter()
            .filter_map(|id| self.store.get_node(id))
            .cloned()
            .collect();

        tracing::trace!(
            nodes = nodes.len(),
            edges = edges.len(),
            depth,
            "query evaluated"
        );
        Ok(GraphQueryResult { nodes, edges })
    }

    fn compile<'q>(
        &self,
        query: &'q GraphQuery,
    ) -> GraphResult<Vec<(&'q str, CompiledPredicate<'q>)>> {
        query
            .properties
            .iter()
            .map(|(key, predicate)| {
                let compiled = match predicate {
                    PropertyPredicate::Regex { pattern, options } => {
                        let flags = options.as_deref().unwrap_or_default();
                        let regex = RegexBuilder::new(pattern)
                            .size_limit(self.config.regex_size_limit)
                            .case_insensitive(flags.contains('i'))
                            .multi_line(flags.contains('m'))
                            .dot_matches_new_line(flags.contains('s'))
                            .ignore_whitespace(flags.contains('x'))
                            .swap_greed(flags.contains('U'))
                            .build()
                            .map_err(|source| GraphError::InvalidPattern {
                                property: key.clone(),
                                pattern: pattern.clone(),
                                source,
                            })?;
                        CompiledPredicate::Regex(regex)
                    }
                    PropertyPredicate::Equals(value) => CompiledPredicate::Equals(value),
                };
                Ok((key.as_str(), compiled))
            })
            .collect()
    }

    fn matches(node: &Node, predicates: &[(&str, CompiledPredicate<'_>)]) -> bool {
        predicates.iter().all(|(key, predicate)| {
            let Some(value) = node.property(key) else {
                return false;
            };
            match predicate {
                CompiledPredicate::Regex(regex) => regex.is_match(&value.to_string()),
                CompiledPredicate::Equals(expected) => value.loosely_equals(expected),
            }
        })
    }

    /// Widen `seeds` by up to `depth` hops, keeping discovery order.
    fn expand(&self, seeds: IndexSet<&'a str>, depth: usize) -> IndexSet<&'a str> {
        let mut selected = seeds;
        let mut frontier: VecDeque<(&'a str, usize)> =
            selected.iter().map(|id| (*id, 0)).collect();

        while let Some((current, hops)) = frontier.pop_front() {
            if hops >= depth {
                continue;
            }
            for next in self.store.neighbor_ids(current, Direction::Both) {
                if selected.insert(next) {
                    frontier.push_back((next, hops + 1));
                }
            }
        }
        selected
    }
}

impl GraphStore {
    /// Evaluate a query. See [`QueryEngine`] for the evaluation order.
    pub fn query(&self, query: &GraphQuery) -> GraphResult<GraphQueryResult> {
        QueryEngine::new(self).execute(query)
    }
}

// ============================================================================
// Tests
// ============================================================================
