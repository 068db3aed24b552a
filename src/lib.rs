//! Infrastructure Knowledge Graph
//!
//! An in-memory knowledge graph of infrastructure entities with:
//! - Typed nodes and edges with insertion-ordered adjacency indices
//! - Filter/depth queries with literal and `$regex` property predicates
//! - BFS shortest paths over forward adjacency
//! - Cached structural, community and temporal analytics
//! - Lossless JSON snapshots

pub mod analytics;
pub mod error;
pub mod store;

pub use analytics::{AnalyticsConfig, AnalyticsEngine, GraphAnalytics, GraphAnalyticsEngine};
pub use error::{GraphError, GraphResult};
pub use store::{
    Direction, Edge, EdgeSpec, EdgeType, GraphQuery, GraphStore, Node, NodeSpec, NodeType,
    QueryConfig,
};

use chrono::TimeDelta;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

// ============================================================================
// YAML config (deserialization target)
// ============================================================================

/// Top-level YAML configuration file structure
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub analytics: AnalyticsConfig,
    pub query: QueryConfig,
}

// ============================================================================
// Runtime config
// ============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    pub analytics: AnalyticsConfig,
    pub query: QueryConfig,
}

impl Config {
    /// Load configuration from an optional YAML file, then override with env vars.
    ///
    /// Priority: env var > YAML > default
    ///
    /// If `yaml_path` is None, tries "config.yaml" in CWD. A missing or
    /// unparsable file falls back to defaults. Unparsable env values are ignored.
    pub fn from_yaml_and_env(yaml_path: Option<&Path>) -> GraphResult<Self> {
        let yaml = Self::load_yaml(yaml_path);

        let mut analytics = yaml.analytics;
        if let Some(ttl) = env_parse("KG_ANALYTICS_CACHE_TTL_SECS") {
            analytics.cache_ttl_secs = ttl;
        }
        if let Some(flag) = env_flag("KG_ANALYTICS_INVALIDATE_ON_WRITE") {
            analytics.invalidate_on_write = flag;
        }

        let mut query = yaml.query;
        if let Some(limit) = env_parse("KG_QUERY_REGEX_SIZE_LIMIT") {
            query.regex_size_limit = limit;
        }

        let config = Self { analytics, query };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot work with.
    pub fn validate(&self) -> GraphResult<()> {
        let a = &self.analytics;
        if a.cache_ttl_secs == 0 || a.cache_ttl_secs > analytics::MAX_TTL.as_secs() {
            return Err(GraphError::Config(format!(
                "analytics.cache_ttl_secs must be in 1..={}, got {}",
                analytics::MAX_TTL.as_secs(),
                a.cache_ttl_secs
            )));
        }
        if a.centrality_bucket_width == 0 {
            return Err(GraphError::Config(
                "analytics.centrality_bucket_width must be > 0".into(),
            ));
        }
        if a.growth_window_days <= 0 || TimeDelta::try_days(a.growth_window_days).is_none() {
            return Err(GraphError::Config(format!(
                "analytics.growth_window_days must be a positive, representable day count, got {}",
                a.growth_window_days
            )));
        }
        for (name, value) in [
            ("spike_factor", a.spike_factor),
            ("over_connected_factor", a.over_connected_factor),
            ("rare_relationship_ratio", a.rare_relationship_ratio),
            ("core_factor", a.core_factor),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GraphError::Config(format!(
                    "analytics.{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        if self.query.regex_size_limit == 0 {
            return Err(GraphError::Config("query.regex_size_limit must be > 0".into()));
        }
        Ok(())
    }

    /// Try to load and parse a YAML config file. Returns defaults on any failure.
    fn load_yaml(yaml_path: Option<&Path>) -> YamlConfig {
        let default_path = Path::new("config.yaml");
        let path = yaml_path.unwrap_or(default_path);

        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_yaml::from_str(&contents) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                    YamlConfig::default()
                }
            },
            Err(_) => {
                tracing::debug!(
                    "No config file at {}, using env vars / defaults",
                    path.display()
                );
                YamlConfig::default()
            }
        }
    }
}

fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}

fn env_flag(name: &str) -> Option<bool> {
    match std::env::var(name).ok()?.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ============================================================================
// Tests
// ============================================================================
