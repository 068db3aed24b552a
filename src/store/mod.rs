//! Graph store and its read primitives.
//!
//! ## Architecture
//!
//! ```text
//! extraction / ingestion ──► GraphStore (add / update / delete)
//!                                 │
//!                     ┌───────────┼────────────┐
//!                QueryEngine  PathFinder   Serializer
//!                     └───────────┬────────────┘
//!                                 │
//!                         AnalyticsEngine ──► planners / UI
//! ```
//!
//! ## Modules
//!
//! - [`models`]: Node/Edge types, property values, mutation specs
//! - [`graph_store`]: `GraphStore` with adjacency, reverse-adjacency and type indices
//! - [`query`]: `GraphQuery` evaluation (filters, depth expansion, limit)
//! - [`path`]: BFS shortest paths over forward adjacency
//! - [`serializer`]: JSON snapshot export/import

pub mod graph_store;
pub mod models;
pub mod path;
pub mod query;
pub mod serializer;

pub use graph_store::{Clusters, GraphStore};
pub use models::{
    Direction, Edge, EdgeKey, EdgeMetadata, EdgeMetadataSpec, EdgeSpec, EdgeType, GraphStats,
    Node, NodeMetadata, NodeMetadataSpec, NodeSpec, NodeType, NodeUpdate, Properties,
    PropertyValue,
};
pub use path::PathFinder;
pub use query::{GraphQuery, GraphQueryResult, PropertyPredicate, QueryConfig, QueryEngine};
pub use serializer::Snapshot;
