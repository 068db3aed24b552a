//! Graph analytics data models.
//!
//! ## Output types
//! - [`GraphAnalytics`]: aggregated result of a full analytics pass
//! - [`CommunityInfo`]: one connected component with density/cohesion summary
//! - [`CentralityBucket`]: histogram bin of centrality scores
//! - [`TemporalMetrics`] / [`ActivitySpike`]: growth and creation activity
//! - [`Anomaly`]: isolated nodes, over-connected hubs, rare relationship shapes
//! - [`Prediction`]: growth forecast and missing-connection heuristics
//! - [`InfluenceAnalysis`] / [`NetworkPosition`]: per-node influence report
//! - [`PathAnalysis`]: shortest path with bottleneck/reliability summary
//!
//! ## Configuration
//! - [`AnalyticsConfig`]: cache TTL and heuristic thresholds

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::NodeType;

// ============================================================================
// Aggregated report
// ============================================================================

/// Complete result of an analytics pass over the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphAnalytics {
    pub node_count: usize,
    pub edge_count: usize,
    /// `2·|E| / (|V|·(|V|-1))`
    pub density: f64,
    /// Mean local clustering over nodes with at least two neighbors
    pub clustering_coefficient: f64,
    /// Mean finite directed hop distance over ordered pairs
    pub average_path_length: f64,
    /// Longest finite directed hop distance
    pub diameter: usize,
    pub centrality_distribution: Vec<CentralityBucket>,
    /// Raw degree (centrality score) → node count
    pub degree_distribution: BTreeMap<usize, usize>,
    pub communities: Vec<CommunityInfo>,
    /// Simplified modularity heuristic, see `algorithms::modularity`
    pub modularity: f64,
    pub temporal: TemporalMetrics,
    pub anomalies: Vec<Anomaly>,
    pub predictions: Vec<Prediction>,
    pub computed_at: DateTime<Utc>,
    /// Computation time in milliseconds
    pub computation_ms: u64,
}

impl GraphAnalytics {
    /// Report for a graph with no nodes.
    pub fn empty(computed_at: DateTime<Utc>) -> Self {
        Self {
            node_count: 0,
            edge_count: 0,
            density: 0.0,
            clustering_coefficient: 0.0,
            average_path_length: 0.0,
            diameter: 0,
            centrality_distribution: vec![],
            degree_distribution: BTreeMap::new(),
            communities: vec![],
            modularity: 0.0,
            temporal: TemporalMetrics::default(),
            anomalies: vec![],
            predictions: vec![],
            computed_at,
            computation_ms: 0,
        }
    }

    /// Anomalies of one kind.
    pub fn anomalies_of(&self, kind: AnomalyType) -> impl Iterator<Item = &Anomaly> {
        self.anomalies.iter().filter(move |a| a.anomaly_type == kind)
    }
}

/// Histogram bin `[min, max]` of centrality scores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CentralityBucket {
    pub min: usize,
    pub max: usize,
    pub count: usize,
}

impl CentralityBucket {
    /// Range label, e.g. `"5-9"`.
    pub fn label(&self) -> String {
        format!("{}-{}", self.min, self.max)
    }
}

/// A connected component summarized for reporting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityInfo {
    /// Discovery index of the component
    pub id: usize,
    pub size: usize,
    pub members: Vec<String>,
    /// `2·internalEdges / (n·(n-1))`, 0 for singletons
    pub density: f64,
    /// Plurality node type (ties go to the type seen first)
    pub dominant_type: Option<NodeType>,
    /// `internalEdges / (internalEdges + externalEdges)`, 0 when edgeless
    pub cohesion: f64,
    pub internal_edges: usize,
    pub external_edges: usize,
}

// ============================================================================
// Temporal metrics
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemporalMetrics {
    /// Percentage of nodes created inside the trailing growth window
    pub growth_rate: f64,
    /// Node creations per calendar day (UTC)
    pub daily_creations: BTreeMap<NaiveDate, usize>,
    /// Mean creations per day across the first..last creation day span
    pub mean_daily_creations: f64,
    pub activity_spikes: Vec<ActivitySpike>,
}

/// A day whose creation count exceeds the spike threshold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivitySpike {
    pub date: NaiveDate,
    pub count: usize,
    /// `count / mean_daily_creations`
    pub ratio: f64,
}

// ============================================================================
// Anomalies and predictions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    /// No adjacency in either direction
    IsolatedNode,
    /// Centrality far above the graph mean
    OverConnectedNode,
    /// `(fromType, edgeType, toType)` seen exactly once in a large edge set
    RareRelationship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Anomaly {
    #[serde(rename = "type")]
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    /// Node ids (or the edge id for rare relationships)
    pub entities: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PredictionType {
    GrowthForecast,
    MissingConnection,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    #[serde(rename = "type")]
    pub prediction_type: PredictionType,
    pub description: String,
    pub confidence: f64,
    pub impact: Severity,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entities: Vec<String>,
    /// Projected value (percent growth for forecasts)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub projected: Option<f64>,
}

// ============================================================================
// Per-node and per-path reports
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkPosition {
    /// Centrality 0
    Isolated,
    /// Centrality above `core_factor` × mean
    Core,
    /// Sole 2-hop connector between two of its neighbors
    Bridge,
    Periphery,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InfluenceAnalysis {
    pub node_id: String,
    pub centrality: usize,
    /// Nodes reachable over forward adjacency (self excluded)
    pub reachable: usize,
    /// `reachable / (|V| - 1)`
    pub reachability: f64,
    /// Blend of normalized centrality and reachability, in `[0, 1]`
    pub influence_score: f64,
    /// Estimated removal impact from centrality and bridge status, in `[0, 1]`
    pub criticality: f64,
    pub position: NetworkPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathAnalysis {
    pub from: String,
    pub to: String,
    /// `None` when no forward path exists
    pub path: Option<Vec<String>>,
    pub hops: usize,
    /// Intermediate nodes classified as bridges
    pub bottlenecks: Vec<String>,
    /// `1 - bottlenecks / path length`; 0 when there is no path
    pub reliability: f64,
}

impl PathAnalysis {
    pub fn no_path(from: &str, to: &str) -> Self {
        Self {
            from: from.to_string(),
            to: to.to_string(),
            path: None,
            hops: 0,
            bottlenecks: vec![],
            reliability: 0.0,
        }
    }
}

// ============================================================================
// Configuration
// ============================================================================

/// Cache and heuristic tuning for the analytics engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Report cache lifetime in seconds (default: 300)
    pub cache_ttl_secs: u64,
    /// Drop the cached report when the store revision changed (default: false)
    pub invalidate_on_write: bool,
    /// Trailing window for the growth rate, in days (default: 7)
    pub growth_window_days: i64,
    /// Day is a spike when its count exceeds this × mean (default: 2.0)
    pub spike_factor: f64,
    /// Node is over-connected above this × mean centrality (default: 3.0)
    pub over_connected_factor: f64,
    /// Rare relationships must be below this share of all edges (default: 0.05)
    pub rare_relationship_ratio: f64,
    /// Node is `core` above this × mean centrality (default: 2.0)
    pub core_factor: f64,
    /// Width of centrality histogram buckets (default: 5)
    pub centrality_bucket_width: usize,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: 300,
            invalidate_on_write: false,
            growth_window_days: 7,
            spike_factor: 2.0,
            over_connected_factor: 3.0,
            rare_relationship_ratio: 0.05,
            core_factor: 2.0,
            centrality_bucket_width: 5,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
