//! Export id resequencing.
//!
//! Replaces opaque primary keys with small integers that analysis tools can
//! use directly. Ids are assigned nodes-then-edges per session, sessions in
//! input order, from one counter shared by the whole run.

use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

use super::ego::{StampedEntity, StampedSession};
use super::network::{Endpoints, ExportEntity, ExportId, ExportNetwork, Provenance};

/// Primary key to export id table, threaded through one resequencing pass.
///
/// The counter spans the whole run; the key table is scoped to the current
/// session so that a key reused by another session never resolves across
/// session boundaries.
#[derive(Debug, Default)]
pub struct IdLookup {
    ids: HashMap<String, ExportId>,
    next: u64,
}

impl IdLookup {
    /// Create an empty lookup; the first assigned id is 1.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new session scope.
    pub fn begin_session(&mut self) {
        self.ids.clear();
    }

    /// Assign the next id to a primary key.
    pub fn assign(&mut self, uid: &str) -> ExportId {
        self.next += 1;
        let id = ExportId(self.next);
        self.ids.insert(uid.to_string(), id);
        id
    }

    /// Id assigned to a primary key in the current session.
    pub fn get(&self, uid: &str) -> Option<ExportId> {
        self.ids.get(uid).copied()
    }

    /// Number of ids assigned so far.
    pub fn assigned(&self) -> u64 {
        self.next
    }
}

fn export_entity(stamped: StampedEntity, export_id: ExportId) -> ExportEntity {
    let StampedEntity { entity, ego_uid } = stamped;
    ExportEntity {
        export_id,
        uid: entity.uid,
        entity_type: entity.entity_type,
        attributes: entity.attributes,
        ego_uid,
        session_id: None,
        endpoints: None,
    }
}

fn resequence_session(session: StampedSession, lookup: &mut IdLookup) -> ExportNetwork {
    lookup.begin_session();

    let nodes: Vec<ExportEntity> = session
        .nodes
        .into_iter()
        .map(|node| {
            let id = lookup.assign(&node.entity.uid);
            export_entity(node, id)
        })
        .collect();

    let mut edges = Vec::with_capacity(session.edges.len());
    for edge in session.edges {
        let id = lookup.assign(&edge.entity.uid);
        let from_uid = edge.entity.from.clone().unwrap_or_default();
        let to_uid = edge.entity.to.clone().unwrap_or_default();
        match (lookup.get(&from_uid), lookup.get(&to_uid)) {
            (Some(from), Some(to)) => {
                let mut entity = export_entity(edge, id);
                entity.endpoints = Some(Endpoints {
                    from,
                    to,
                    from_uid,
                    to_uid,
                });
                edges.push(entity);
            }
            _ => {
                // Validation rejects such sessions; only reachable when
                // resequencing unvalidated input.
                warn!(edge = %edge.entity.uid, "Dropping edge with unresolved endpoint");
            }
        }
    }

    let protocol_uid = session
        .record
        .variables
        .protocol_uid
        .clone()
        .unwrap_or_default();

    ExportNetwork {
        protocol_uid,
        nodes: Arc::new(nodes),
        edges: Arc::new(edges),
        provenance: Provenance::Session(session.record),
    }
}

/// Resequence a batch of stamped sessions into export networks.
pub fn resequence_ids(sessions: Vec<StampedSession>, lookup: &mut IdLookup) -> Vec<ExportNetwork> {
    sessions
        .into_iter()
        .map(|session| resequence_session(session, lookup))
        .collect()
}
