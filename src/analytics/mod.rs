//! Graph analytics over the knowledge graph.
//!
//! Structural, community and temporal metrics plus anomaly and prediction
//! heuristics, computed from the store's public read operations only.
//!
//! ## Architecture
//!
//! ```text
//! GraphStore ──(query / get_neighbors / get_centrality_score)──► GraphView
//!                                                                   │
//!                                                             compute_all
//!                                                                   │
//!                                     TtlCache ◄── GraphAnalyticsEngine ──► consumers
//!                                                        │
//!                                  analyze_influence / analyze_path (find_path)
//! ```
//!
//! ## Modules
//!
//! - [`models`]: report types and `AnalyticsConfig`
//! - [`algorithms`]: pure metric functions over a `GraphView` snapshot
//! - [`cache`]: TTL cache with hit/miss counters
//! - [`engine`]: `AnalyticsEngine` trait and `GraphAnalyticsEngine`

pub mod algorithms;
pub mod cache;
pub mod engine;
pub mod models;

pub use algorithms::{GraphView, ViewEdge, ViewNode};
pub use cache::{CacheStats, TtlCache, MAX_TTL};
pub use engine::{is_bridge, AnalyticsEngine, GraphAnalyticsEngine};
pub use models::{
    ActivitySpike, AnalyticsConfig, Anomaly, AnomalyType, CentralityBucket, CommunityInfo,
    GraphAnalytics, InfluenceAnalysis, NetworkPosition, PathAnalysis, Prediction,
    PredictionType, Severity, TemporalMetrics,
};
