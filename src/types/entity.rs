//! Entity types: nodes, edges and the ego.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Attribute values keyed by codebook variable id.
///
/// BTreeMap keeps iteration order stable so that derived column and key
/// orderings are deterministic.
pub type Attributes = BTreeMap<String, Value>;

/// Type key used for an ego entity that carries no explicit `type`.
pub const EGO_TYPE: &str = "ego";

/// The three entity domains a codebook describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    /// Alters nominated by the respondent.
    Node,
    /// Relationships between nodes.
    Edge,
    /// The respondent.
    Ego,
}

impl EntityKind {
    /// Lowercase name, as used in codebooks.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Ego => "ego",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node, edge or ego as collected in an interview session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Stable primary key (usually a UUID).
    #[serde(rename = "_uid")]
    pub uid: String,
    /// Codebook type key.
    #[serde(rename = "type", default)]
    pub entity_type: String,
    /// Variable values keyed by variable id.
    #[serde(default)]
    pub attributes: Attributes,
    /// Source node primary key (edges only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<String>,
    /// Target node primary key (edges only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
}

impl Entity {
    /// Create a node entity.
    pub fn node(uid: impl Into<String>, entity_type: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            entity_type: entity_type.into(),
            attributes: Attributes::new(),
            from: None,
            to: None,
        }
    }

    /// Create an edge entity between two node primary keys.
    pub fn edge(
        uid: impl Into<String>,
        entity_type: impl Into<String>,
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            uid: uid.into(),
            entity_type: entity_type.into(),
            attributes: Attributes::new(),
            from: Some(from.into()),
            to: Some(to.into()),
        }
    }

    /// Create an ego entity.
    pub fn ego(uid: impl Into<String>) -> Self {
        Self::node(uid, EGO_TYPE)
    }

    /// Builder-style attribute setter.
    pub fn with_attribute(mut self, variable_id: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(variable_id.into(), value.into());
        self
    }
}
