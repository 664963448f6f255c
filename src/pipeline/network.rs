//! Transformed networks: resequenced entities plus their session provenance.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::types::{Attributes, Entity, SessionVariables};

/// Human-readable integer id assigned during resequencing.
///
/// Unique and strictly increasing across one export run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ExportId(pub u64);

impl ExportId {
    /// Raw integer value.
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Resolved endpoints of an edge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Export id of the source node.
    pub from: ExportId,
    /// Export id of the target node.
    pub to: ExportId,
    /// Original primary key of the source node.
    pub from_uid: String,
    /// Original primary key of the target node.
    pub to_uid: String,
}

/// A node or edge after ego-stamping and resequencing.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportEntity {
    /// Resequenced id.
    pub export_id: ExportId,
    /// Original primary key.
    pub uid: String,
    /// Codebook type key.
    pub entity_type: String,
    /// Variable values keyed by variable id.
    pub attributes: Attributes,
    /// Primary key of the ego that nominated this entity.
    pub ego_uid: Option<String>,
    /// Originating session; set only under network union.
    pub session_id: Option<String>,
    /// Edge endpoints; `None` for nodes.
    pub endpoints: Option<Endpoints>,
}

/// Ego and metadata of one originating session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRecord {
    /// The session's ego, if any.
    pub ego: Option<Entity>,
    /// Session metadata.
    pub variables: SessionVariables,
}

impl SessionRecord {
    /// Session id, or empty when absent.
    pub fn session_id(&self) -> &str {
        self.variables.session_id.as_deref().unwrap_or_default()
    }
}

/// Where a network's entities came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// A single interview session.
    Session(SessionRecord),
    /// Several sessions of one protocol merged together, keyed by session id.
    Union(BTreeMap<String, SessionRecord>),
}

/// A network ready for partitioning and encoding.
///
/// Entity lists are shared behind `Arc` so that partitions and concurrently
/// running encode tasks read them without copying.
#[derive(Debug, Clone)]
pub struct ExportNetwork {
    /// Protocol the sessions were collected with.
    pub protocol_uid: String,
    /// Nodes in resequenced order.
    pub nodes: Arc<Vec<ExportEntity>>,
    /// Edges in resequenced order.
    pub edges: Arc<Vec<ExportEntity>>,
    /// Originating session(s).
    pub provenance: Provenance,
}

impl ExportNetwork {
    /// Whether this network merges several sessions.
    pub fn is_union(&self) -> bool {
        matches!(self.provenance, Provenance::Union(_))
    }

    /// Originating session records, in session id order under union.
    pub fn records(&self) -> Vec<&SessionRecord> {
        match &self.provenance {
            Provenance::Session(record) => vec![record],
            Provenance::Union(records) => records.values().collect(),
        }
    }

    /// The single originating session; `None` under union.
    pub fn session(&self) -> Option<&SessionRecord> {
        match &self.provenance {
            Provenance::Session(record) => Some(record),
            Provenance::Union(_) => None,
        }
    }
}
