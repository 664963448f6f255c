//! Transformation pipeline: sessions in, export networks out.
//!
//! ```text
//! Sessions → validate → stamp_ego → resequence_ids → group_by_protocol → [union]
//!                                                                           ↓
//!                                                          partition_network (per format)
//! ```
//!
//! Every stage takes its input by reference or by value and returns new
//! values; source sessions are never mutated. Invalid sessions are skipped
//! as a unit and reported, never failing their siblings.

pub mod network;
pub mod validate;
pub mod ego;
pub mod resequence;
pub mod union;
pub mod partition;

pub use network::{Endpoints, ExportEntity, ExportId, ExportNetwork, Provenance, SessionRecord};
pub use validate::{validate_session, ValidationError};
pub use ego::{stamp_ego, StampedEntity, StampedSession};
pub use resequence::{resequence_ids, IdLookup};
pub use union::{group_by_protocol, union_of_networks, unify_protocols, ProtocolNetworks};
pub use partition::{partition_network, PartitionedNetwork};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::cancel::{CancelToken, Cancelled};
use crate::types::Session;

/// A session excluded from the export by validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedSession {
    /// Session id, when present.
    pub session_id: Option<String>,
    /// Case id, when present.
    pub case_id: Option<String>,
    /// Validation failure.
    pub reason: String,
}

/// Output of [`prepare_sessions`].
#[derive(Debug, Clone, Default)]
pub struct PreparedSessions {
    /// Resequenced networks grouped by protocol id.
    pub networks: ProtocolNetworks,
    /// Sessions that failed validation.
    pub skipped: Vec<SkippedSession>,
}

impl PreparedSessions {
    /// Total number of networks across all protocols.
    pub fn network_count(&self) -> usize {
        self.networks.values().map(Vec::len).sum()
    }
}

/// Validate, ego-stamp, resequence and group a batch of sessions.
///
/// Checks the cancel token between sessions.
pub fn prepare_sessions(sessions: &[Session], cancel: &CancelToken) -> Result<PreparedSessions, Cancelled> {
    let mut stamped = Vec::with_capacity(sessions.len());
    let mut skipped = Vec::new();

    for session in sessions {
        cancel.check()?;
        let vars = &session.session_variables;
        match validate_session(session) {
            Ok(()) => stamped.push(stamp_ego(session)),
            Err(err) => {
                warn!(
                    session = vars.session_id.as_deref().unwrap_or("<unknown>"),
                    error = %err,
                    "Skipping invalid session"
                );
                skipped.push(SkippedSession {
                    session_id: vars.session_id.clone(),
                    case_id: vars.case_id.clone(),
                    reason: err.to_string(),
                });
            }
        }
    }

    let mut lookup = IdLookup::new();
    let networks = resequence_ids(stamped, &mut lookup);
    cancel.check()?;
    debug!(networks = networks.len(), ids = lookup.assigned(), "Resequenced sessions");

    Ok(PreparedSessions {
        networks: group_by_protocol(networks),
        skipped,
    })
}

/// Full transformation: [`prepare_sessions`] followed by optional union.
pub fn transform(
    sessions: &[Session],
    unify: bool,
    cancel: &CancelToken,
) -> Result<PreparedSessions, Cancelled> {
    let mut prepared = prepare_sessions(sessions, cancel)?;
    if unify {
        cancel.check()?;
        prepared.networks = unify_protocols(prepared.networks);
    }
    Ok(prepared)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::validate::tests::valid_variables;
    use crate::types::Entity;

    fn session(id: &str, protocol: &str) -> Session {
        Session {
            nodes: vec![Entity::node(format!("{id}-n1"), "person")],
            edges: Vec::new(),
            ego: Some(Entity::ego(format!("{id}-ego"))),
            session_variables: valid_variables(id, protocol),
        }
    }

    #[test]
    fn test_invalid_session_is_skipped() {
        let mut bad = session("s2", "p1");
        bad.session_variables.codebook_hash = None;

        let prepared = prepare_sessions(&[session("s1", "p1"), bad], &CancelToken::new()).unwrap();
        assert_eq!(prepared.network_count(), 1);
        assert_eq!(prepared.skipped.len(), 1);
        assert_eq!(prepared.skipped[0].session_id.as_deref(), Some("s2"));
        assert!(prepared.skipped[0].reason.contains("codebookHash"));
    }

    #[test]
    fn test_transform_with_union() {
        let sessions = [session("s1", "p1"), session("s2", "p1"), session("s3", "p2")];
        let prepared = transform(&sessions, true, &CancelToken::new()).unwrap();

        assert_eq!(prepared.network_count(), 2);
        assert_eq!(prepared.networks["p1"][0].nodes.len(), 2);
    }

    #[test]
    fn test_cancelled_before_start() {
        let cancel = CancelToken::new();
        cancel.cancel();
        assert_eq!(
            prepare_sessions(&[session("s1", "p1")], &cancel).unwrap_err(),
            Cancelled
        );
    }
}
