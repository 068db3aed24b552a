//! Knowledge graph data model.
//!
//! ## Entities
//! - [`NodeType`] / [`Node`]: infrastructure entities (services, databases, incidents, ...)
//! - [`EdgeType`] / [`Edge`]: typed, directed (optionally bidirectional) relationships
//! - [`EdgeKey`]: structured `(from, type, to)` identity of an edge
//! - [`PropertyValue`]: tagged union used for the schema-less property bag
//!
//! ## Mutation inputs
//! - [`NodeSpec`] / [`NodeUpdate`] / [`EdgeSpec`]: what extraction layers hand to the store
//!
//! The JSON wire names follow the persisted format: `type`, `createdAt`,
//! `updatedAt`, `createdBy`, node types in PascalCase, edge types in
//! SCREAMING_SNAKE_CASE.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Default `createdBy` stamped when the caller does not supply one.
pub const DEFAULT_CREATED_BY: &str = "system";

/// Default edge strength.
pub const DEFAULT_EDGE_STRENGTH: f64 = 1.0;

// ============================================================================
// Node and edge types
// ============================================================================

/// Closed set of entity kinds stored in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum NodeType {
    Service,
    Environment,
    Deployment,
    Configuration,
    User,
    Team,
    Project,
    Repository,
    Task,
    Issue,
    Incident,
    Error,
    Customer,
    Feature,
    Permission,
    Document,
    #[serde(rename = "API")]
    Api,
    Database,
    Secret,
}

impl NodeType {
    /// Every node type, in declaration order.
    pub const ALL: [NodeType; 19] = [
        Self::Service,
        Self::Environment,
        Self::Deployment,
        Self::Configuration,
        Self::User,
        Self::Team,
        Self::Project,
        Self::Repository,
        Self::Task,
        Self::Issue,
        Self::Incident,
        Self::Error,
        Self::Customer,
        Self::Feature,
        Self::Permission,
        Self::Document,
        Self::Api,
        Self::Database,
        Self::Secret,
    ];

    /// Wire name of this type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Service => "Service",
            Self::Environment => "Environment",
            Self::Deployment => "Deployment",
            Self::Configuration => "Configuration",
            Self::User => "User",
            Self::Team => "Team",
            Self::Project => "Project",
            Self::Repository => "Repository",
            Self::Task => "Task",
            Self::Issue => "Issue",
            Self::Incident => "Incident",
            Self::Error => "Error",
            Self::Customer => "Customer",
            Self::Feature => "Feature",
            Self::Permission => "Permission",
            Self::Document => "Document",
            Self::Api => "API",
            Self::Database => "Database",
            Self::Secret => "Secret",
        }
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("unknown node type: {}", s))
    }
}

/// Closed set of relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeType {
    Owns,
    Manages,
    DependsOn,
    Blocks,
    Requires,
    Provides,
    ConnectsTo,
    DeployedTo,
    PartOf,
    Affects,
    CausedBy,
    ResolvedBy,
    Mentions,
    Duplicates,
    RelatesTo,
    Notifies,
}

impl EdgeType {
    /// Every edge type, in declaration order.
    pub const ALL: [EdgeType; 16] = [
        Self::Owns,
        Self::Manages,
        Self::DependsOn,
        Self::Blocks,
        Self::Requires,
        Self::Provides,
        Self::ConnectsTo,
        Self::DeployedTo,
        Self::PartOf,
        Self::Affects,
        Self::CausedBy,
        Self::ResolvedBy,
        Self::Mentions,
        Self::Duplicates,
        Self::RelatesTo,
        Self::Notifies,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owns => "OWNS",
            Self::Manages => "MANAGES",
            Self::DependsOn => "DEPENDS_ON",
            Self::Blocks => "BLOCKS",
            Self::Requires => "REQUIRES",
            Self::Provides => "PROVIDES",
            Self::ConnectsTo => "CONNECTS_TO",
            Self::DeployedTo => "DEPLOYED_TO",
            Self::PartOf => "PART_OF",
            Self::Affects => "AFFECTS",
            Self::CausedBy => "CAUSED_BY",
            Self::ResolvedBy => "RESOLVED_BY",
            Self::Mentions => "MENTIONS",
            Self::Duplicates => "DUPLICATES",
            Self::RelatesTo => "RELATES_TO",
            Self::Notifies => "NOTIFIES",
        }
    }
}

impl fmt::Display for EdgeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EdgeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        Self::ALL
            .iter()
            .find(|t| t.as_str() == normalized)
            .copied()
            .ok_or_else(|| format!("unknown edge type: {}", s))
    }
}

// ============================================================================
// Property bag
// ============================================================================

/// Ordered, string-keyed property map.
pub type Properties = IndexMap<String, PropertyValue>;

/// A property value: scalar, array or nested map.
///
/// Serialized untagged so the JSON form is the plain value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    Array(Vec<PropertyValue>),
    Map(IndexMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Equality used by query filters. Numbers compare by value across
    /// integer/float representations.
    pub fn loosely_equals(&self, other: &PropertyValue) -> bool {
        match (self, other) {
            (Self::Integer(a), Self::Float(b)) | (Self::Float(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Array(a), Self::Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_equals(y))
            }
            (Self::Map(a), Self::Map(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.loosely_equals(w)))
            }
            _ => self == other,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Stringified form used by `$regex` filters: strings are raw, arrays are
/// comma-joined, maps render as JSON.
impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => f.write_str(s),
            Self::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{}", item)?;
                }
                Ok(())
            }
            Self::Map(_) => {
                let json = serde_json::to_string(self).map_err(|_| fmt::Error)?;
                f.write_str(&json)
            }
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<bool> for PropertyValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for PropertyValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for PropertyValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<f64> for PropertyValue {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl<T: Into<PropertyValue>> From<Vec<T>> for PropertyValue {
    fn from(items: Vec<T>) -> Self {
        Self::Array(items.into_iter().map(Into::into).collect())
    }
}

// ============================================================================
// Nodes
// ============================================================================

/// Provenance and timestamps attached to every node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeMetadata {
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

/// A typed entity in the knowledge graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    /// Globally unique identifier
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub properties: Properties,
    pub metadata: NodeMetadata,
}

impl Node {
    /// Convenience accessor for a property value.
    pub fn property(&self, key: &str) -> Option<&PropertyValue> {
        self.properties.get(key)
    }

    /// Display name: the `name` property when it is a string, else the id.
    pub fn name(&self) -> &str {
        self.property("name")
            .and_then(PropertyValue::as_str)
            .unwrap_or(&self.id)
    }
}

/// Caller-supplied node metadata. Missing fields are defaulted by the store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeMetadataSpec {
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub created_by: Option<String>,
    pub source: Option<String>,
    pub confidence: Option<f64>,
}

/// Input to `GraphStore::add_node`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeSpec {
    pub id: String,
    #[serde(rename = "type")]
    pub node_type: NodeType,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default)]
    pub metadata: NodeMetadataSpec,
}

impl NodeSpec {
    pub fn new(id: impl Into<String>, node_type: NodeType) -> Self {
        Self {
            id: id.into(),
            node_type,
            properties: Properties::new(),
            metadata: NodeMetadataSpec::default(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.created_at = Some(at);
        self
    }

    pub fn created_by(mut self, who: impl Into<String>) -> Self {
        self.metadata.created_by = Some(who.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.metadata.source = Some(source.into());
        self
    }

    pub fn confidence(mut self, confidence: f64) -> Self {
        self.metadata.confidence = Some(confidence);
        self
    }
}

impl From<Node> for NodeSpec {
    /// Replays an existing node with its metadata preserved verbatim.
    fn from(node: Node) -> Self {
        Self {
            id: node.id,
            node_type: node.node_type,
            properties: node.properties,
            metadata: NodeMetadataSpec {
                created_at: Some(node.metadata.created_at),
                updated_at: Some(node.metadata.updated_at),
                created_by: Some(node.metadata.created_by),
                source: node.metadata.source,
                confidence: node.metadata.confidence,
            },
        }
    }
}

/// Partial update for `GraphStore::update_node`.
///
/// `properties` replaces the whole bag when present. Metadata fields are
/// merged one by one; `createdAt` is never changed and `updatedAt` is bumped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NodeUpdate {
    #[serde(rename = "type")]
    pub node_type: Option<NodeType>,
    pub properties: Option<Properties>,
    pub created_by: Option<String>,
    pub source: Option<String>,
    pub confidence: Option<f64>,
}

// ============================================================================
// Edges
// ============================================================================

/// Structured identity of an edge.
///
/// Two edges with the same `(from, edge_type, to)` are the same edge. The
/// `Display` form `from-TYPE-to` is the wire id; it is ambiguous when node
/// ids themselves contain `-TYPE-` sequences.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: String,
    pub edge_type: EdgeType,
    pub to: String,
}

impl EdgeKey {
    pub fn new(from: impl Into<String>, edge_type: EdgeType, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            edge_type,
            to: to.into(),
        }
    }

    /// Wire id (`from-TYPE-to`).
    pub fn id(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for EdgeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}-{}", self.from, self.edge_type, self.to)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EdgeMetadata {
    pub created_at: DateTime<Utc>,
    #[serde(default = "default_strength")]
    pub strength: f64,
    #[serde(default)]
    pub bidirectional: bool,
}

fn default_strength() -> f64 {
    DEFAULT_EDGE_STRENGTH
}

/// A typed relationship between two nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    /// Wire id, always equal to `self.key().id()`
    pub id: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub from: String,
    pub to: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Properties>,
    pub metadata: EdgeMetadata,
}

impl Edge {
    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.edge_type, self.to.clone())
    }

    pub fn is_bidirectional(&self) -> bool {
        self.metadata.bidirectional
    }

    /// Whether this edge puts `to` in the forward adjacency of `from`.
    pub fn links(&self, from: &str, to: &str) -> bool {
        (self.from == from && self.to == to)
            || (self.metadata.bidirectional && self.from == to && self.to == from)
    }

    pub fn touches(&self, node_id: &str) -> bool {
        self.from == node_id || self.to == node_id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EdgeMetadataSpec {
    pub created_at: Option<DateTime<Utc>>,
    pub strength: Option<f64>,
    pub bidirectional: Option<bool>,
}

/// Input to `GraphStore::add_edge`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeSpec {
    pub from: String,
    #[serde(rename = "type")]
    pub edge_type: EdgeType,
    pub to: String,
    #[serde(default)]
    pub properties: Option<Properties>,
    #[serde(default)]
    pub metadata: EdgeMetadataSpec,
}

impl EdgeSpec {
    pub fn new(from: impl Into<String>, edge_type: EdgeType, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            edge_type,
            to: to.into(),
            properties: None,
            metadata: EdgeMetadataSpec::default(),
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.edge_type, self.to.clone())
    }

    pub fn bidirectional(mut self) -> Self {
        self.metadata.bidirectional = Some(true);
        self
    }

    pub fn strength(mut self, strength: f64) -> Self {
        self.metadata.strength = Some(strength);
        self
    }

    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.metadata.created_at = Some(at);
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties
            .get_or_insert_with(Properties::new)
            .insert(key.into(), value.into());
        self
    }
}

impl From<Edge> for EdgeSpec {
    fn from(edge: Edge) -> Self {
        Self {
            from: edge.from,
            edge_type: edge.edge_type,
            to: edge.to,
            properties: edge.properties,
            metadata: EdgeMetadataSpec {
                created_at: Some(edge.metadata.created_at),
                strength: Some(edge.metadata.strength),
                bidirectional: Some(edge.metadata.bidirectional),
            },
        }
    }
}

// ============================================================================
// Read API helper types
// ============================================================================

/// Which adjacency to follow when listing neighbors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Nodes with an edge pointing at this node
    In,
    /// Nodes this node points at
    Out,
    /// Union of both, outgoing first
    Both,
}

impl FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "in" => Ok(Self::In),
            "out" => Ok(Self::Out),
            "both" => Ok(Self::Both),
            other => Err(format!("unknown direction: {}", other)),
        }
    }
}

/// Summary counts returned by `GraphStore::get_stats`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphStats {
    pub node_count: usize,
    pub edge_count: usize,
    pub node_types: BTreeMap<NodeType, usize>,
    /// `2·|E| / |V|`, 0 for an empty graph
    pub avg_degree: f64,
}

// ============================================================================
// Tests
// ============================================================================
