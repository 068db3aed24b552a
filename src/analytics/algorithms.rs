//! Graph analytics algorithms.
//!
//! Every metric is a pure function over a [`GraphView`], a `petgraph`
//! snapshot built once per pass from the store's public read operations
//! (`query`, `get_centrality_score`). Nothing here reads the store's
//! private indices.
//!
//! - **Structure**: density, clustering coefficient, directed hop distances
//!   via `petgraph::algo::dijkstra` with unit weights
//! - **Distributions**: centrality buckets, degree histogram
//! - **Communities**: weakly connected components with density/cohesion, modularity
//! - **Temporal**: growth rate and daily activity spikes
//! - **Anomalies / predictions**: threshold heuristics

use chrono::{DateTime, NaiveDate, TimeDelta, Utc};
use indexmap::IndexMap;
use petgraph::algo::dijkstra;
use petgraph::graph::{DiGraph, EdgeIndex, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use super::models::{
    ActivitySpike, AnalyticsConfig, Anomaly, AnomalyType, CentralityBucket, CommunityInfo,
    GraphAnalytics, Prediction, PredictionType, Severity, TemporalMetrics,
};
use crate::error::GraphResult;
use crate::store::{EdgeType, GraphQuery, GraphStore, NodeType};

// ============================================================================
// Snapshot view
// ============================================================================

/// Node weight: the fields analytics needs from a store node.
#[derive(Debug, Clone)]
pub struct ViewNode {
    pub id: String,
    pub node_type: NodeType,
    pub created_at: DateTime<Utc>,
    /// Store centrality score (|out| + |in| distinct neighbors)
    pub centrality: usize,
}

/// Edge weight. Parallel edges of different types between the same pair are
/// kept, matching the store's `(from, type, to)` identity.
#[derive(Debug, Clone)]
pub struct ViewEdge {
    pub id: String,
    pub edge_type: EdgeType,
}

/// `petgraph::DiGraph` snapshot with an id → `NodeIndex` map.
///
/// Node and edge indices follow store insertion order.
#[derive(Debug, Clone, Default)]
pub struct GraphView {
    pub graph: DiGraph<ViewNode, ViewEdge>,
    pub id_to_index: HashMap<String, NodeIndex>,
}

impl GraphView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        Self {
            graph: DiGraph::with_capacity(nodes, edges),
            id_to_index: HashMap::with_capacity(nodes),
        }
    }

    /// Add a node, or return the index of the node already holding its id.
    pub fn add_node(&mut self, node: ViewNode) -> NodeIndex {
        if let Some(&idx) = self.id_to_index.get(&node.id) {
            return idx;
        }
        let id = node.id.clone();
        let idx = self.graph.add_node(node);
        self.id_to_index.insert(id, idx);
        idx
    }

    /// `None` when either endpoint is not in the view.
    pub fn add_edge(&mut self, from_id: &str, to_id: &str, edge: ViewEdge) -> Option<EdgeIndex> {
        let from = *self.id_to_index.get(from_id)?;
        let to = *self.id_to_index.get(to_id)?;
        Some(self.graph.add_edge(from, to, edge))
    }

    pub fn from_store(store: &GraphStore) -> GraphResult<Self> {
        let snapshot = store.query(&GraphQuery::default())?;
        let mut view = Self::with_capacity(snapshot.nodes.len(), snapshot.edges.len());

        for node in &snapshot.nodes {
            view.add_node(ViewNode {
                id: node.id.clone(),
                node_type: node.node_type,
                created_at: node.metadata.created_at,
                centrality: store.get_centrality_score(&node.id),
            });
        }
        for edge in &snapshot.edges {
            view.add_edge(
                &edge.from,
                &edge.to,
                ViewEdge {
                    id: edge.id.clone(),
                    edge_type: edge.edge_type,
                },
            );
        }
        Ok(view)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.id_to_index.get(id).copied()
    }

    pub fn centrality(&self, idx: NodeIndex) -> usize {
        self.graph[idx].centrality
    }

    pub fn mean_centrality(&self) -> f64 {
        if self.node_count() == 0 {
            return 0.0;
        }
        let total: usize = self.graph.node_weights().map(|n| n.centrality).sum();
        total as f64 / self.node_count() as f64
    }

    pub fn max_centrality(&self) -> usize {
        self.graph
            .node_weights()
            .map(|n| n.centrality)
            .max()
            .unwrap_or(0)
    }

    /// Distinct forward neighbors.
    pub fn out_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .filter(|n| seen.insert(*n))
            .collect()
    }

    /// Distinct neighbors in either direction, self excluded.
    pub fn undirected_neighbors(&self, idx: NodeIndex) -> Vec<NodeIndex> {
        let mut seen = HashSet::new();
        self.graph
            .neighbors_directed(idx, Direction::Outgoing)
            .chain(self.graph.neighbors_directed(idx, Direction::Incoming))
            .filter(|n| *n != idx && seen.insert(*n))
            .collect()
    }

    /// Hop distances over forward edges from `source` (source included at 0).
    pub fn hop_distances(&self, source: NodeIndex) -> HashMap<NodeIndex, usize> {
        dijkstra(&self.graph, source, None, |_| 1usize)
    }

    /// Number of nodes reachable from `source` over forward edges, excluding itself.
    pub fn reachable_count(&self, source: NodeIndex) -> usize {
        self.hop_distances(source).len().saturating_sub(1)
    }
}

// ============================================================================
// Structure
// ============================================================================

/// `2·|E| / (|V|·(|V|-1))`; 0 for fewer than two nodes.
pub fn density(view: &GraphView) -> f64 {
    let n = view.node_count();
    if n < 2 {
        return 0.0;
    }
    2.0 * view.edge_count() as f64 / (n as f64 * (n as f64 - 1.0))
}

/// Mean local clustering coefficient over the undirected view.
///
/// Nodes with fewer than two neighbors are skipped. 0 when no node qualifies.
pub fn clustering_coefficient(view: &GraphView) -> f64 {
    let g = &view.graph;
    let mut total = 0.0;
    let mut qualifying = 0usize;

    for idx in g.node_indices() {
        let neighbors = view.undirected_neighbors(idx);
        let k = neighbors.len();
        if k < 2 {
            continue;
        }
        let mut links = 0usize;
        for i in 0..k {
            for j in (i + 1)..k {
                let (u, v) = (neighbors[i], neighbors[j]);
                if g.contains_edge(u, v) || g.contains_edge(v, u) {
                    links += 1;
                }
            }
        }
        let possible = (k * (k - 1) / 2) as f64;
        total += links as f64 / possible;
        qualifying += 1;
    }

    if qualifying == 0 {
        0.0
    } else {
        total / qualifying as f64
    }
}

/// `(average path length, diameter)` over finite directed hop distances.
///
/// Pairs with no forward path and the zero-length self pair are excluded.
pub fn path_lengths(view: &GraphView) -> (f64, usize) {
    let mut sum = 0usize;
    let mut count = 0usize;
    let mut diameter = 0usize;
    for source in view.graph.node_indices() {
        for d in view.hop_distances(source).into_values() {
            if d > 0 {
                sum += d;
                count += 1;
                diameter = diameter.max(d);
            }
        }
    }
    let average = if count == 0 {
        0.0
    } else {
        sum as f64 / count as f64
    };
    (average, diameter)
}

// ============================================================================
// Distributions
// ============================================================================

/// Histogram of centrality scores in fixed-width buckets, ordered by `min`.
///
/// Only non-empty buckets are reported.
pub fn centrality_distribution(view: &GraphView, bucket_width: usize) -> Vec<CentralityBucket> {
    let width = bucket_width.max(1);
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    for node in view.graph.node_weights() {
        *counts.entry(node.centrality / width * width).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .map(|(min, count)| CentralityBucket {
            min,
            max: min + width - 1,
            count,
        })
        .collect()
}

/// Node count per raw degree (centrality score).
pub fn degree_distribution(view: &GraphView) -> BTreeMap<usize, usize> {
    let mut histogram = BTreeMap::new();
    for node in view.graph.node_weights() {
        *histogram.entry(node.centrality).or_insert(0) += 1;
    }
    histogram
}

// ============================================================================
// Communities
// ============================================================================

/// Weakly connected components (edges treated as undirected).
///
/// Returns the component index per `NodeIndex::index()` and the components
/// in discovery order, each listing its members in node index order.
pub fn connected_components(view: &GraphView) -> (Vec<usize>, Vec<Vec<NodeIndex>>) {
    let g = &view.graph;
    let mut component_of: Vec<Option<usize>> = vec![None; g.node_count()];
    let mut component_count = 0usize;

    for start in g.node_indices() {
        if component_of[start.index()].is_some() {
            continue;
        }
        let mut queue = VecDeque::from([start]);
        component_of[start.index()] = Some(component_count);
        while let Some(current) = queue.pop_front() {
            for neighbor in view.undirected_neighbors(current) {
                if component_of[neighbor.index()].is_none() {
                    component_of[neighbor.index()] = Some(component_count);
                    queue.push_back(neighbor);
                }
            }
        }
        component_count += 1;
    }

    let membership: Vec<usize> = component_of.into_iter().map(|c| c.unwrap_or(0)).collect();
    let mut components: Vec<Vec<NodeIndex>> = vec![Vec::new(); component_count];
    for idx in g.node_indices() {
        components[membership[idx.index()]].push(idx);
    }
    (membership, components)
}

/// Summarize components, largest first (ties keep discovery order).
pub fn communities(
    view: &GraphView,
    membership: &[usize],
    components: &[Vec<NodeIndex>],
) -> Vec<CommunityInfo> {
    let mut internal = vec![0usize; components.len()];
    let mut external = vec![0usize; components.len()];
    for edge in view.graph.edge_references() {
        let (a, b) = (
            membership[edge.source().index()],
            membership[edge.target().index()],
        );
        if a == b {
            internal[a] += 1;
        } else {
            external[a] += 1;
            external[b] += 1;
        }
    }

    let mut result: Vec<CommunityInfo> = components
        .iter()
        .enumerate()
        .map(|(id, members)| {
            let size = members.len();
            let density = if size < 2 {
                0.0
            } else {
                2.0 * internal[id] as f64 / (size as f64 * (size as f64 - 1.0))
            };
            let touching = internal[id] + external[id];
            let cohesion = if touching == 0 {
                0.0
            } else {
                internal[id] as f64 / touching as f64
            };
            CommunityInfo {
                id,
                size,
                members: members.iter().map(|&i| view.graph[i].id.clone()).collect(),
                density,
                dominant_type: dominant_type(view, members),
                cohesion,
                internal_edges: internal[id],
                external_edges: external[id],
            }
        })
        .collect();

    result.sort_by(|a, b| b.size.cmp(&a.size));
    result
}

fn dominant_type(view: &GraphView, members: &[NodeIndex]) -> Option<NodeType> {
    let mut counts: IndexMap<NodeType, usize> = IndexMap::new();
    for &m in members {
        *counts.entry(view.graph[m].node_type).or_insert(0) += 1;
    }
    let mut best: Option<(NodeType, usize)> = None;
    for (node_type, count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((node_type, count));
        }
    }
    best.map(|(t, _)| t)
}

/// Simplified modularity over a partition.
///
/// For every edge whose endpoints share a community, accumulates
/// `1 - deg(u)·deg(v) / 2m`, then divides by `2m`. Degrees are centrality
/// scores. 0 for an edgeless graph.
pub fn modularity(view: &GraphView, membership: &[usize]) -> f64 {
    let m = view.edge_count();
    if m == 0 {
        return 0.0;
    }
    let two_m = 2.0 * m as f64;
    let sum: f64 = view
        .graph
        .edge_references()
        .filter(|e| membership[e.source().index()] == membership[e.target().index()])
        .map(|e| {
            let degrees = view.centrality(e.source()) * view.centrality(e.target());
            1.0 - degrees as f64 / two_m
        })
        .sum();
    sum / two_m
}

// ============================================================================
// Temporal
// ============================================================================

/// Growth rate over the trailing window and per-day creation spikes.
///
/// A window reaching past the representable time range counts every node
/// as recent.
pub fn temporal_metrics(
    view: &GraphView,
    now: DateTime<Utc>,
    config: &AnalyticsConfig,
) -> TemporalMetrics {
    let n = view.node_count();
    if n == 0 {
        return TemporalMetrics::default();
    }

    let window_start = TimeDelta::try_days(config.growth_window_days)
        .and_then(|window| now.checked_sub_signed(window));
    let recent = match window_start {
        Some(start) => view
            .graph
            .node_weights()
            .filter(|node| node.created_at >= start)
            .count(),
        None => n,
    };
    let growth_rate = recent as f64 / n as f64 * 100.0;

    let mut daily_creations: BTreeMap<NaiveDate, usize> = BTreeMap::new();
    for node in view.graph.node_weights() {
        *daily_creations
            .entry(node.created_at.date_naive())
            .or_insert(0) += 1;
    }

    let (first, last) = match (
        daily_creations.keys().next(),
        daily_creations.keys().next_back(),
    ) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return TemporalMetrics::default(),
    };
    let span_days = (last - first).num_days() + 1;
    let mean_daily_creations = n as f64 / span_days as f64;

    let activity_spikes = daily_creations
        .iter()
        .filter(|(_, count)| **count as f64 > config.spike_factor * mean_daily_creations)
        .map(|(date, count)| ActivitySpike {
            date: *date,
            count: *count,
            ratio: *count as f64 / mean_daily_creations,
        })
        .collect();

    TemporalMetrics {
        growth_rate,
        daily_creations,
        mean_daily_creations,
        activity_spikes,
    }
}

// ============================================================================
// Anomalies
// ============================================================================

pub fn detect_anomalies(view: &GraphView, config: &AnalyticsConfig) -> Vec<Anomaly> {
    let g = &view.graph;
    let mut anomalies = Vec::new();

    for node in g.node_weights().filter(|n| n.centrality == 0) {
        anomalies.push(Anomaly {
            anomaly_type: AnomalyType::IsolatedNode,
            severity: Severity::Low,
            description: format!("{} '{}' has no connections", node.node_type, node.id),
            entities: vec![node.id.clone()],
        });
    }

    let mean = view.mean_centrality();
    let threshold = config.over_connected_factor * mean;
    if mean > 0.0 {
        for node in g.node_weights() {
            let c = node.centrality as f64;
            if c > threshold {
                let severity = if c > 2.0 * threshold {
                    Severity::High
                } else {
                    Severity::Medium
                };
                anomalies.push(Anomaly {
                    anomaly_type: AnomalyType::OverConnectedNode,
                    severity,
                    description: format!(
                        "'{}' has centrality {} (graph mean {:.2})",
                        node.id, node.centrality, mean
                    ),
                    entities: vec![node.id.clone()],
                });
            }
        }
    }

    let m = view.edge_count();
    if m > 0 && 1.0 / (m as f64) < config.rare_relationship_ratio {
        let mut triples: IndexMap<(NodeType, EdgeType, NodeType), Vec<EdgeIndex>> =
            IndexMap::new();
        for edge in g.edge_references() {
            triples
                .entry((
                    g[edge.source()].node_type,
                    edge.weight().edge_type,
                    g[edge.target()].node_type,
                ))
                .or_default()
                .push(edge.id());
        }
        for ((from_type, edge_type, to_type), occurrences) in triples {
            if let [only] = occurrences.as_slice() {
                anomalies.push(Anomaly {
                    anomaly_type: AnomalyType::RareRelationship,
                    severity: Severity::Low,
                    description: format!(
                        "{} -{}-> {} appears once among {} edges",
                        from_type, edge_type, to_type, m
                    ),
                    entities: vec![g[*only].id.clone()],
                });
            }
        }
    }

    anomalies
}

// ============================================================================
// Predictions
// ============================================================================

/// Projected growth over four more windows at the current rate.
const FORECAST_WINDOWS: f64 = 4.0;

pub fn predict(view: &GraphView, temporal: &TemporalMetrics) -> Vec<Prediction> {
    let g = &view.graph;
    let mut predictions = Vec::new();
    if view.node_count() == 0 {
        return predictions;
    }

    let projected = temporal.growth_rate * FORECAST_WINDOWS;
    let impact = if projected > 50.0 {
        Severity::High
    } else if projected > 20.0 {
        Severity::Medium
    } else {
        Severity::Low
    };
    predictions.push(Prediction {
        prediction_type: PredictionType::GrowthForecast,
        description: format!(
            "Graph projected to grow {:.1}% at the current rate of {:.1}% per window",
            projected, temporal.growth_rate
        ),
        confidence: 0.6,
        impact,
        entities: vec![],
        projected: Some(projected),
    });

    let has_database = g.node_weights().any(|n| n.node_type == NodeType::Database);
    if has_database {
        let mut connected = vec![false; view.node_count()];
        for edge in g.edge_references() {
            if matches!(
                edge.weight().edge_type,
                EdgeType::DependsOn | EdgeType::ConnectsTo
            ) && g[edge.target()].node_type == NodeType::Database
            {
                connected[edge.source().index()] = true;
            }
        }
        let missing: Vec<String> = g
            .node_indices()
            .filter(|idx| g[*idx].node_type == NodeType::Service && !connected[idx.index()])
            .map(|idx| g[idx].id.clone())
            .collect();
        if !missing.is_empty() {
            predictions.push(Prediction {
                prediction_type: PredictionType::MissingConnection,
                description: format!(
                    "{} service(s) have no DEPENDS_ON/CONNECTS_TO edge to a database",
                    missing.len()
                ),
                confidence: 0.5,
                impact: Severity::Medium,
                entities: missing,
                projected: None,
            });
        }
    }

    predictions
}

// ============================================================================
// Full pass
// ============================================================================

/// Run every graph-wide metric over `view`.
///
/// Cost is dominated by the all-pairs search in [`path_lengths`],
/// O(|V|·(|E| + |V|·log|V|)). `computation_ms` is left at 0 for the caller to fill.
pub fn compute_all(
    view: &GraphView,
    config: &AnalyticsConfig,
    now: DateTime<Utc>,
) -> GraphAnalytics {
    if view.node_count() == 0 {
        return GraphAnalytics::empty(now);
    }

    let (average_path_length, diameter) = path_lengths(view);
    let (membership, components) = connected_components(view);
    let temporal = temporal_metrics(view, now, config);
    let predictions = predict(view, &temporal);

    GraphAnalytics {
        node_count: view.node_count(),
        edge_count: view.edge_count(),
        density: density(view),
        clustering_coefficient: clustering_coefficient(view),
        average_path_length,
        diameter,
        centrality_distribution: centrality_distribution(view, config.centrality_bucket_width),
        degree_distribution: degree_distribution(view),
        communities: communities(view, &membership, &components),
        modularity: modularity(view, &membership),
        temporal,
        anomalies: detect_anomalies(view, config),
        predictions,
        computed_at: now,
        computation_ms: 0,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{EdgeSpec, NodeSpec};
    use chrono::TimeZone;

    fn make_store(nodes: &[(&str, NodeType)], edges: &[(&str, EdgeType, &str)]) -> GraphStore {
        let mut store = GraphStore::new();
        for (id, node_type) in nodes {
            store.add_node(NodeSpec::new(*id, *node_type));
        }
        for (from, edge_type, to) in edges {
            store
                .add_edge(EdgeSpec::new(*from, *edge_type, *to))
                .unwrap();
        }
        store
    }

    fn make_view(nodes: &[(&str, NodeType)], edges: &[(&str, EdgeType, &str)]) -> GraphView {
        GraphView::from_store(&make_store(nodes, edges)).unwrap()
    }

    fn services(ids: &[&'static str]) -> Vec<(&'static str, NodeType)> {
        ids.iter().map(|id| (*id, NodeType::Service)).collect()
    }

    #[test]
    fn test_view_mirrors_store_reads() {
        let view = make_view(
            &services(&["a", "b", "c"]),
            &[("a", EdgeType::DependsOn, "b"), ("c", EdgeType::DependsOn, "b")],
        );
        let ids: Vec<&str> = view.graph.node_weights().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        let (a, b, c) = (
            view.index_of("a").unwrap(),
            view.index_of("b").unwrap(),
            view.index_of("c").unwrap(),
        );
        assert_eq!(view.out_neighbors(a), vec![b]);
        assert!(view.out_neighbors(b).is_empty());
        let mut around_b = view.undirected_neighbors(b);
        around_b.sort();
        assert_eq!(around_b, vec![a, c]);
        let centrality: Vec<usize> = view.graph.node_weights().map(|n| n.centrality).collect();
        assert_eq!(centrality, vec![1, 2, 1]);
        assert_eq!(view.edge_count(), 2);
        assert!(view.index_of("ghost").is_none());
    }

    #[test]
    fn test_parallel_edges_share_one_neighbor() {
        let view = make_view(
            &services(&["a", "b"]),
            &[("a", EdgeType::DependsOn, "b"), ("a", EdgeType::ConnectsTo, "b")],
        );
        let (a, b) = (view.index_of("a").unwrap(), view.index_of("b").unwrap());
        assert_eq!(view.edge_count(), 2);
        assert_eq!(view.out_neighbors(a), vec![b]);
        assert_eq!(view.undirected_neighbors(b), vec![a]);
        assert_eq!(view.centrality(a), 1);
        assert_eq!(view.reachable_count(a), 1);
        assert_eq!(view.hop_distances(a).get(&b), Some(&1));
    }

    #[test]
    fn test_add_node_keeps_first_index() {
        let mut view = GraphView::new();
        let node = ViewNode {
            id: "a".into(),
            node_type: NodeType::Service,
            created_at: Utc::now(),
            centrality: 0,
        };
        let first = view.add_node(node.clone());
        assert_eq!(view.add_node(node), first);
        assert_eq!(view.node_count(), 1);
        let edge = ViewEdge {
            id: "a-DEPENDS_ON-missing".into(),
            edge_type: EdgeType::DependsOn,
        };
        assert!(view.add_edge("a", "missing", edge).is_none());
    }

    #[test]
    fn test_density() {
        let view = make_view(&services(&["a", "b", "c"]), &[("a", EdgeType::DependsOn, "b")]);
        assert!((density(&view) - 1.0 / 3.0).abs() < 1e-9);
        assert_eq!(density(&make_view(&services(&["a"]), &[])), 0.0);
    }

    #[test]
    fn test_clustering_triangle_and_star() {
        let triangle = make_view(
            &services(&["a", "b", "c"]),
            &[
                ("a", EdgeType::DependsOn, "b"),
                ("b", EdgeType::DependsOn, "c"),
                ("c", EdgeType::DependsOn, "a"),
            ],
        );
        assert!((clustering_coefficient(&triangle) - 1.0).abs() < 1e-9);

        let star = make_view(
            &services(&["hub", "x", "y"]),
            &[("hub", EdgeType::DependsOn, "x"), ("hub", EdgeType::DependsOn, "y")],
        );
        assert_eq!(clustering_coefficient(&star), 0.0);
        assert_eq!(clustering_coefficient(&make_view(&services(&["a"]), &[])), 0.0);
    }

    #[test]
    fn test_path_lengths_chain() {
        let view = make_view(
            &services(&["a", "b", "c"]),
            &[("a", EdgeType::DependsOn, "b"), ("b", EdgeType::DependsOn, "c")],
        );
        // a→b 1, a→c 2, b→c 1
        let (avg, diameter) = path_lengths(&view);
        assert!((avg - 4.0 / 3.0).abs() < 1e-9);
        assert_eq!(diameter, 2);
    }

    #[test]
    fn test_centrality_distribution_buckets() {
        let mut edges = Vec::new();
        let leaves = ["l1", "l2", "l3", "l4", "l5", "l6"];
        for leaf in leaves {
            edges.push(("hub", EdgeType::DependsOn, leaf));
        }
        let mut nodes = services(&["hub"]);
        nodes.extend(services(&leaves));
        let view = make_view(&nodes, &edges);

        let buckets = centrality_distribution(&view, 5);
        assert_eq!(
            buckets,
            vec![
                CentralityBucket { min: 0, max: 4, count: 6 },
                CentralityBucket { min: 5, max: 9, count: 1 },
            ]
        );
        let degrees = degree_distribution(&view);
        assert_eq!(degrees.get(&1), Some(&6));
        assert_eq!(degrees.get(&6), Some(&1));
    }

    #[test]
    fn test_components_and_cohesion() {
        let view = make_view(
            &[
                ("svc", NodeType::Service),
                ("db", NodeType::Database),
                ("api", NodeType::Service),
                ("lonely", NodeType::Team),
            ],
            &[("svc", EdgeType::DependsOn, "db"), ("api", EdgeType::Requires, "svc")],
        );
        let (membership, components) = connected_components(&view);
        assert_eq!(components.len(), 2);
        assert_eq!(membership[0], membership[2]);
        assert_ne!(membership[0], membership[3]);

        let infos = communities(&view, &membership, &components);
        assert_eq!(infos[0].size, 3);
        assert_eq!(infos[0].dominant_type, Some(NodeType::Service));
        assert_eq!(infos[0].internal_edges, 2);
        assert_eq!(infos[0].members, vec!["svc", "db", "api"]);
        assert!((infos[0].cohesion - 1.0).abs() < 1e-9);
        assert!((infos[0].density - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(infos[1].members, vec!["lonely"]);
        assert_eq!(infos[1].cohesion, 0.0);
        assert_eq!(infos[1].density, 0.0);
    }

    #[test]
    fn test_modularity_prefers_disjoint_pairs() {
        let pairs = make_view(
            &services(&["a", "b", "c", "d", "e", "f"]),
            &[
                ("a", EdgeType::DependsOn, "b"),
                ("c", EdgeType::DependsOn, "d"),
                ("e", EdgeType::DependsOn, "f"),
            ],
        );
        let (pair_membership, _) = connected_components(&pairs);
        let pair_q = modularity(&pairs, &pair_membership);
        // each edge: 1 - 1/6, three edges, over 6
        assert!((pair_q - (3.0 * (1.0 - 1.0 / 6.0)) / 6.0).abs() < 1e-9);

        let star = make_view(
            &services(&["hub", "x", "y", "z"]),
            &[
                ("hub", EdgeType::DependsOn, "x"),
                ("hub", EdgeType::DependsOn, "y"),
                ("hub", EdgeType::DependsOn, "z"),
            ],
        );
        let (star_membership, _) = connected_components(&star);
        let star_q = modularity(&star, &star_membership);
        assert!((star_q - 0.25).abs() < 1e-9);
        assert!(pair_q > star_q);

        assert_eq!(modularity(&make_view(&services(&["a"]), &[]), &[0]), 0.0);
    }

    #[test]
    fn test_temporal_growth_and_spike() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let mut store = GraphStore::new();
        // one node per day on days 1..=9 of June, five extra on June 5
        for day in 1..=9 {
            let t = Utc.with_ymd_and_hms(2024, 6, day, 8, 0, 0).unwrap();
            store.add_node(NodeSpec::new(format!("d{}", day), NodeType::Service).created_at(t));
        }
        let burst = Utc.with_ymd_and_hms(2024, 6, 5, 9, 0, 0).unwrap();
        for i in 0..5 {
            store.add_node(NodeSpec::new(format!("burst{}", i), NodeType::Service).created_at(burst));
        }
        store.add_node(NodeSpec::new("fresh", NodeType::Service).created_at(now));

        let view = GraphView::from_store(&store).unwrap();
        let temporal = temporal_metrics(&view, now, &AnalyticsConfig::default());

        // 15 nodes, 1 inside the 7-day window
        assert!((temporal.growth_rate - 100.0 / 15.0).abs() < 1e-9);
        // span June 1..=June 30 = 30 days
        assert!((temporal.mean_daily_creations - 0.5).abs() < 1e-9);
        assert_eq!(temporal.activity_spikes.len(), 1);
        assert_eq!(
            temporal.activity_spikes[0].date,
            NaiveDate::from_ymd_opt(2024, 6, 5).unwrap()
        );
        assert_eq!(temporal.activity_spikes[0].count, 6);
    }

    #[test]
    fn test_temporal_empty_graph() {
        let view = GraphView::default();
        let temporal = temporal_metrics(&view, Utc::now(), &AnalyticsConfig::default());
        assert_eq!(temporal, TemporalMetrics::default());
    }

    #[test]
    fn test_temporal_unrepresentable_window_counts_all_nodes() {
        let now = Utc.with_ymd_and_hms(2024, 6, 30, 12, 0, 0).unwrap();
        let mut store = GraphStore::new();
        let old = Utc.with_ymd_and_hms(2001, 1, 1, 0, 0, 0).unwrap();
        store.add_node(NodeSpec::new("old", NodeType::Service).created_at(old));
        store.add_node(NodeSpec::new("new", NodeType::Service).created_at(now));
        let view = GraphView::from_store(&store).unwrap();

        for days in [1_000_000_000_000, i64::MAX, 100_000_000] {
            let config = AnalyticsConfig {
                growth_window_days: days,
                ..Default::default()
            };
            let temporal = temporal_metrics(&view, now, &config);
            assert!((temporal.growth_rate - 100.0).abs() < 1e-9, "window {}", days);
        }
    }

    #[test]
    fn test_anomalies_isolated_and_over_connected() {
        let leaves: Vec<String> = (0..8).map(|i| format!("leaf{}", i)).collect();
        let mut store = GraphStore::new();
        store.add_node(NodeSpec::new("hub", NodeType::Service));
        store.add_node(NodeSpec::new("loner", NodeType::Team));
        for leaf in &leaves {
            store.add_node(NodeSpec::new(leaf.as_str(), NodeType::Service));
            store
                .add_edge(EdgeSpec::new("hub", EdgeType::DependsOn, leaf.as_str()))
                .unwrap();
        }
        let view = GraphView::from_store(&store).unwrap();
        let anomalies = detect_anomalies(&view, &AnalyticsConfig::default());

        let isolated: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::IsolatedNode)
            .collect();
        assert_eq!(isolated.len(), 1);
        assert_eq!(isolated[0].entities, vec!["loner"]);

        // mean centrality = 16/10 = 1.6, hub has 8 > 4.8
        let hubs: Vec<_> = anomalies
            .iter()
            .filter(|a| a.anomaly_type == AnomalyType::OverConnectedNode)
            .collect();
        assert_eq!(hubs.len(), 1);
        assert_eq!(hubs[0].entities, vec!["hub"]);
        assert_eq!(hubs[0].severity, Severity::Medium);
    }

    #[test]
    fn test_rare_relationship_needs_large_edge_set() {
        let mut store = GraphStore::new();
        store.add_node(NodeSpec::new("team", NodeType::Team));
        store.add_node(NodeSpec::new("svc", NodeType::Service));
        for i in 0..25 {
            let id = format!("dep{}", i);
            store.add_node(NodeSpec::new(id.as_str(), NodeType::Service));
            store
                .add_edge(EdgeSpec::new("svc", EdgeType::DependsOn, id.as_str()))
                .unwrap();
        }
        store
            .add_edge(EdgeSpec::new("team", EdgeType::Owns, "svc"))
            .unwrap();
        let view = GraphView::from_store(&store).unwrap();
        let rare: Vec<_> = detect_anomalies(&view, &AnalyticsConfig::default())
            .into_iter()
            .filter(|a| a.anomaly_type == AnomalyType::RareRelationship)
            .collect();
        assert_eq!(rare.len(), 1);
        assert_eq!(rare[0].entities, vec!["team-OWNS-svc"]);

        // with only two edges, 1/2 is not below the ratio
        let small = make_view(
            &[("t", NodeType::Team), ("s", NodeType::Service), ("d", NodeType::Database)],
            &[("t", EdgeType::Owns, "s"), ("s", EdgeType::DependsOn, "d")],
        );
        assert!(detect_anomalies(&small, &AnalyticsConfig::default())
            .iter()
            .all(|a| a.anomaly_type != AnomalyType::RareRelationship));
    }

    #[test]
    fn test_predictions_missing_database_connection() {
        let view = make_view(
            &[
                ("orders", NodeType::Service),
                ("billing", NodeType::Service),
                ("pg", NodeType::Database),
            ],
            &[("orders", EdgeType::ConnectsTo, "pg")],
        );
        let temporal = temporal_metrics(&view, Utc::now(), &AnalyticsConfig::default());
        let predictions = predict(&view, &temporal);

        assert_eq!(predictions[0].prediction_type, PredictionType::GrowthForecast);
        // all nodes are brand new: 100% × 4 windows
        assert_eq!(predictions[0].impact, Severity::High);

        let missing = predictions
            .iter()
            .find(|p| p.prediction_type == PredictionType::MissingConnection)
            .unwrap();
        assert_eq!(missing.entities, vec!["billing"]);
    }

    #[test]
    fn test_predictions_skip_connection_check_without_databases() {
        let view = make_view(&services(&["a", "b"]), &[]);
        let temporal = temporal_metrics(&view, Utc::now(), &AnalyticsConfig::default());
        let predictions = predict(&view, &temporal);
        assert_eq!(predictions.len(), 1);
        assert!(predict(&GraphView::default(), &TemporalMetrics::default()).is_empty());
    }

    #[test]
    fn test_compute_all_empty_and_small() {
        let now = Utc::now();
        let empty = compute_all(&GraphView::default(), &AnalyticsConfig::default(), now);
        assert_eq!(empty, GraphAnalytics::empty(now));

        let view = make_view(
            &services(&["a", "b", "c"]),
            &[("a", EdgeType::DependsOn, "b"), ("b", EdgeType::DependsOn, "c")],
        );
        let report = compute_all(&view, &AnalyticsConfig::default(), now);
        assert_eq!(report.node_count, 3);
        assert_eq!(report.edge_count, 2);
        assert_eq!(report.diameter, 2);
        assert_eq!(report.communities.len(), 1);
        assert_eq!(report.computed_at, now);
        assert!(report.anomalies.is_empty());
    }
}
