//! Ego stamping: record which ego nominated each node and edge.

use crate::types::{Entity, Session};

use super::network::SessionRecord;

/// An entity tagged with its ego's primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedEntity {
    /// The untouched source entity.
    pub entity: Entity,
    /// Primary key of the session ego; `None` when the session has no ego.
    pub ego_uid: Option<String>,
}

/// A session whose nodes and edges carry their ego's primary key.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedSession {
    /// Stamped nodes, in input order.
    pub nodes: Vec<StampedEntity>,
    /// Stamped edges, in input order.
    pub edges: Vec<StampedEntity>,
    /// Ego and session metadata.
    pub record: SessionRecord,
}

/// Stamp every node and edge of a session with `ego._uid`.
///
/// The input session is not modified.
pub fn stamp_ego(session: &Session) -> StampedSession {
    let ego_uid = session.ego.as_ref().map(|ego| ego.uid.clone());
    let stamp = |entity: &Entity| StampedEntity {
        entity: entity.clone(),
        ego_uid: ego_uid.clone(),
    };

    StampedSession {
        nodes: session.nodes.iter().map(stamp).collect(),
        edges: session.edges.iter().map(stamp).collect(),
        record: SessionRecord {
            ego: session.ego.clone(),
            variables: session.session_variables.clone(),
        },
    }
}
