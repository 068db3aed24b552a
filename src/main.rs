//! kgraph - Infrastructure Knowledge Graph CLI
//!
//! Loads a JSON graph snapshot and prints query, path and analytics results
//! as JSON on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use infra_knowledge_graph::analytics::{AnalyticsEngine, GraphAnalyticsEngine};
use infra_knowledge_graph::store::{
    EdgeType, GraphQuery, GraphStore, NodeType, PropertyPredicate, PropertyValue,
};
use infra_knowledge_graph::Config;
use serde::Serialize;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "kgraph")]
#[command(about = "Query and analyze an infrastructure knowledge graph snapshot")]
struct Cli {
    /// Graph snapshot (JSON produced by the serializer)
    #[arg(short, long, env = "KG_GRAPH", default_value = "graph.json")]
    graph: PathBuf,

    /// YAML config file (defaults to ./config.yaml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Node/edge counts, per-type counts and average degree
    Stats,

    /// Filter nodes, optionally expand by depth, and return induced edges
    Query {
        #[arg(long)]
        node_type: Option<NodeType>,

        #[arg(long)]
        edge_type: Option<EdgeType>,

        /// Property equality filter, `key=value` (value parsed as JSON when possible)
        #[arg(long = "where", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        /// Property regex filter, `key=pattern`
        #[arg(long = "regex", value_name = "KEY=PATTERN")]
        regexes: Vec<String>,

        #[arg(long)]
        depth: Option<usize>,

        #[arg(long)]
        limit: Option<usize>,
    },

    /// Shortest forward path with bottleneck analysis
    Path { from: String, to: String },

    /// Full structural, community and temporal analytics report
    Analyze,

    /// Influence and network position of one node
    Influence { id: String },

    /// Connected components of the undirected graph
    Clusters,
}

fn main() -> Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,infra_knowledge_graph=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_yaml_and_env(cli.config.as_deref())?;

    let store = GraphStore::read_from_path(&cli.graph, config.query.clone())
        .with_context(|| format!("loading graph snapshot {}", cli.graph.display()))?;
    tracing::info!(
        nodes = store.node_count(),
        edges = store.edge_count(),
        "Graph loaded from {}",
        cli.graph.display()
    );

    let engine = GraphAnalyticsEngine::new(config.analytics);

    match cli.command {
        Commands::Stats => print_json(&store.get_stats()),
        Commands::Query {
            node_type,
            edge_type,
            filters,
            regexes,
            depth,
            limit,
        } => {
            let query = build_query(node_type, edge_type, &filters, &regexes, depth, limit)?;
            print_json(&store.query(&query)?)
        }
        Commands::Path { from, to } => print_json(&engine.analyze_path(&store, &from, &to)?),
        Commands::Analyze => print_json(engine.compute_analytics(&store)?.as_ref()),
        Commands::Influence { id } => {
            let analysis = engine
                .analyze_influence(&store, &id)?
                .with_context(|| format!("unknown node '{}'", id))?;
            print_json(&analysis)
        }
        Commands::Clusters => print_json(&store.find_clusters()),
    }
}

fn build_query(
    node_type: Option<NodeType>,
    edge_type: Option<EdgeType>,
    filters: &[String],
    regexes: &[String],
    depth: Option<usize>,
    limit: Option<usize>,
) -> Result<GraphQuery> {
    let mut query = GraphQuery::new();
    query.node_type = node_type;
    query.edge_type = edge_type;
    query.depth = depth;
    query.limit = limit;

    for filter in filters {
        let (key, raw) = split_pair(filter)?;
        let value = serde_json::from_str::<PropertyValue>(raw)
            .unwrap_or_else(|_| PropertyValue::String(raw.to_string()));
        query = query.property(key, PropertyPredicate::Equals(value));
    }
    for filter in regexes {
        let (key, pattern) = split_pair(filter)?;
        query = query.property(key, PropertyPredicate::regex(pattern));
    }
    Ok(query)
}

fn split_pair(raw: &str) -> Result<(&str, &str)> {
    raw.split_once('=')
        .filter(|(key, _)| !key.is_empty())
        .with_context(|| format!("expected KEY=VALUE, got '{}'", raw))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_query_parses_filters() {
        let query = build_query(
            Some(NodeType::Service),
            None,
            &["replicas=3".to_string(), "env=prod".to_string()],
            &["name=^api-".to_string()],
            Some(1),
            Some(10),
        )
        .unwrap();
        assert_eq!(query.node_type, Some(NodeType::Service));
        assert_eq!(
            query.properties["replicas"],
            PropertyPredicate::Equals(PropertyValue::Integer(3))
        );
        assert_eq!(
            query.properties["env"],
            PropertyPredicate::Equals(PropertyValue::String("prod".into()))
        );
        assert_eq!(query.properties["name"], PropertyPredicate::regex("^api-"));
        assert_eq!(query.depth, Some(1));
        assert_eq!(query.limit, Some(10));
    }

    #[test]
    fn test_split_pair_rejects_missing_key() {
        assert!(split_pair("novalue").is_err());
        assert!(split_pair("=x").is_err());
        assert_eq!(split_pair("a=b=c").unwrap(), ("a", "b=c"));
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from([
            "kgraph",
            "--graph",
            "g.json",
            "query",
            "--node-type",
            "Service",
            "--edge-type",
            "depends-on",
            "--where",
            "env=prod",
        ])
        .unwrap();
        assert_eq!(cli.graph, PathBuf::from("g.json"));
        match cli.command {
            Commands::Query {
                node_type,
                edge_type,
                filters,
                ..
            } => {
                assert_eq!(node_type, Some(NodeType::Service));
                assert_eq!(edge_type, Some(EdgeType::DependsOn));
                assert_eq!(filters, vec!["env=prod"]);
            }
            _ => panic!("expected query subcommand"),
        }
    }
}
