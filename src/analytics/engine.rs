//! Analytics engine: cached full-graph reports and per-node/per-path analysis.
//!
//! The `AnalyticsEngine` trait is the entry point for analytics consumers
//! (planners, recommendation and UI layers). `GraphAnalyticsEngine` runs:
//!
//! 1. **Snapshot**: `GraphStore` public reads → [`GraphView`]
//! 2. **Computation**: [`compute_all`] over the view
//! 3. **Memoization**: one report under a single key in a [`TtlCache`]
//!
//! Cached reports are NOT invalidated by store mutations unless
//! `invalidate_on_write` is enabled; otherwise they live for the full TTL.
//! Use [`GraphAnalyticsEngine::compute_analytics_fresh`] or
//! [`GraphAnalyticsEngine::clear_cache`] when results must reflect writes.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use super::algorithms::{compute_all, GraphView};
use super::cache::{CacheStats, TtlCache};
use super::models::{
    AnalyticsConfig, GraphAnalytics, InfluenceAnalysis, NetworkPosition, PathAnalysis,
};
use crate::error::GraphResult;
use crate::store::{Direction, GraphStore};

const ANALYTICS_CACHE_KEY: &str = "graph_analytics";

/// Bonus added to normalized centrality when the node is a bridge.
const BRIDGE_CRITICALITY: f64 = 0.5;

// ============================================================================
// Trait
// ============================================================================

/// Analytics over a [`GraphStore`].
///
/// Consumers take `&dyn AnalyticsEngine` so they can be tested against
/// canned reports.
pub trait AnalyticsEngine: Send + Sync {
    /// Full-graph report, served from cache while it is unexpired.
    fn compute_analytics(&self, store: &GraphStore) -> GraphResult<Arc<GraphAnalytics>>;

    /// Influence summary for one node, `None` if the node is unknown.
    fn analyze_influence(
        &self,
        store: &GraphStore,
        node_id: &str,
    ) -> GraphResult<Option<InfluenceAnalysis>>;

    /// Shortest forward path with bottleneck and reliability summary.
    fn analyze_path(&self, store: &GraphStore, from: &str, to: &str) -> GraphResult<PathAnalysis>;
}

// ============================================================================
// Concrete implementation
// ============================================================================

#[derive(Clone)]
struct CachedReport {
    revision: u64,
    report: Arc<GraphAnalytics>,
}

pub struct GraphAnalyticsEngine {
    config: AnalyticsConfig,
    cache: TtlCache<&'static str, CachedReport>,
}

impl GraphAnalyticsEngine {
    pub fn new(config: AnalyticsConfig) -> Self {
        let cache = TtlCache::new(Duration::from_secs(config.cache_ttl_secs));
        Self { config, cache }
    }

    pub fn config(&self) -> &AnalyticsConfig {
        &self.config
    }

    /// Recompute the report, ignoring and then replacing the cached one.
    pub fn compute_analytics_fresh(&self, store: &GraphStore) -> GraphResult<Arc<GraphAnalytics>> {
        let report = Arc::new(self.compute_analytics_at(store, Utc::now())?);
        self.cache.insert(
            ANALYTICS_CACHE_KEY,
            CachedReport {
                revision: store.revision(),
                report: report.clone(),
            },
        );
        Ok(report)
    }

    /// Uncached pass with an explicit clock (growth window end).
    pub fn compute_analytics_at(
        &self,
        store: &GraphStore,
        now: DateTime<Utc>,
    ) -> GraphResult<GraphAnalytics> {
        let started = Instant::now();
        let view = GraphView::from_store(store)?;
        let mut report = compute_all(&view, &self.config, now);
        report.computation_ms = started.elapsed().as_millis() as u64;

        info!(
            nodes = report.node_count,
            edges = report.edge_count,
            communities = report.communities.len(),
            anomalies = report.anomalies.len(),
            elapsed_ms = report.computation_ms,
            "Analytics computed"
        );
        Ok(report)
    }

    pub fn clear_cache(&self) {
        self.cache.invalidate_all();
        debug!("Analytics cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn influence_in(
        &self,
        view: &GraphView,
        store: &GraphStore,
        node_id: &str,
    ) -> Option<InfluenceAnalysis> {
        let idx = view.index_of(node_id)?;
        let centrality = view.centrality(idx);
        let max_centrality = view.max_centrality();
        let normalized = if max_centrality == 0 {
            0.0
        } else {
            centrality as f64 / max_centrality as f64
        };

        let reachable = view.reachable_count(idx);
        let reachability = if view.node_count() > 1 {
            reachable as f64 / (view.node_count() - 1) as f64
        } else {
            0.0
        };

        let bridge = is_bridge(store, node_id);
        let position = if centrality == 0 {
            NetworkPosition::Isolated
        } else if centrality as f64 > self.config.core_factor * view.mean_centrality() {
            NetworkPosition::Core
        } else if bridge {
            NetworkPosition::Bridge
        } else {
            NetworkPosition::Periphery
        };

        let criticality = (normalized + if bridge { BRIDGE_CRITICALITY } else { 0.0 }).min(1.0);

        Some(InfluenceAnalysis {
            node_id: node_id.to_string(),
            centrality,
            reachable,
            reachability,
            influence_score: 0.5 * normalized + 0.5 * reachability,
            criticality,
            position,
        })
    }
}

impl AnalyticsEngine for GraphAnalyticsEngine {
    fn compute_analytics(&self, store: &GraphStore) -> GraphResult<Arc<GraphAnalytics>> {
        if let Some(cached) = self.cache.get(&ANALYTICS_CACHE_KEY) {
            if !self.config.invalidate_on_write || cached.revision == store.revision() {
                debug!(revision = cached.revision, "Analytics cache hit");
                return Ok(cached.report);
            }
            debug!(
                cached = cached.revision,
                current = store.revision(),
                "Analytics cache stale after write"
            );
        } else {
            debug!("Analytics cache miss");
        }
        self.compute_analytics_fresh(store)
    }

    fn analyze_influence(
        &self,
        store: &GraphStore,
        node_id: &str,
    ) -> GraphResult<Option<InfluenceAnalysis>> {
        let view = GraphView::from_store(store)?;
        Ok(self.influence_in(&view, store, node_id))
    }

    fn analyze_path(&self, store: &GraphStore, from: &str, to: &str) -> GraphResult<PathAnalysis> {
        let Some(path) = store.find_path(from, to) else {
            return Ok(PathAnalysis::no_path(from, to));
        };

        let bottlenecks: Vec<String> = match path.as_slice() {
            [_, intermediate @ .., _] => intermediate
                .iter()
                .filter(|id| is_bridge(store, id))
                .cloned()
                .collect(),
            _ => vec![],
        };
        let reliability = 1.0 - bottlenecks.len() as f64 / path.len() as f64;

        Ok(PathAnalysis {
            from: from.to_string(),
            to: to.to_string(),
            hops: path.len() - 1,
            path: Some(path),
            bottlenecks,
            reliability,
        })
    }
}

/// `node_id` is a bridge when, for some ordered pair of its neighbors, the
/// shortest forward path is `[a, node_id, b]` and no other node offers a
/// two-hop route from `a` to `b`.
///
/// O(k²) path searches for a node with k neighbors.
pub fn is_bridge(store: &GraphStore, node_id: &str) -> bool {
    let neighbors = store.neighbor_ids(node_id, Direction::Both);
    for &a in &neighbors {
        for &b in &neighbors {
            if a == b || a == node_id || b == node_id {
                continue;
            }
            let through = store
                .find_path(a, b)
                .is_some_and(|p| p.len() == 3 && p[1] == node_id);
            if through && sole_two_hop_route(store, a, node_id, b) {
                return true;
            }
        }
    }
    false
}

fn sole_two_hop_route(store: &GraphStore, a: &str, via: &str, b: &str) -> bool {
    !store
        .neighbor_ids(a, Direction::Out)
        .into_iter()
        .filter(|w| *w != via && *w != b)
        .any(|w| store.neighbor_ids(w, Direction::Out).contains(&b))
}

// ============================================================================
// Tests
// ============================================================================
