//! Session validation, run before any transformation.

use std::collections::HashSet;
use thiserror::Error;

use crate::types::{Session, SessionVariables};

/// Why a session was excluded from an export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required session variable is absent or empty.
    #[error("missing required session variable: {0}")]
    MissingSessionVariable(&'static str),

    /// Two entities share a primary key.
    #[error("duplicate primary key: {0}")]
    DuplicatePrimaryKey(String),

    /// An edge references a node that is not in the session.
    #[error("edge {edge} references unknown node {node}")]
    DanglingEdge {
        /// Edge primary key.
        edge: String,
        /// Unresolved node primary key.
        node: String,
    },

    /// An edge lacks `from` or `to`.
    #[error("edge {0} is missing an endpoint")]
    MissingEndpoint(String),
}

fn require(name: &'static str, value: &Option<String>) -> Result<(), ValidationError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(()),
        _ => Err(ValidationError::MissingSessionVariable(name)),
    }
}

fn validate_variables(vars: &SessionVariables) -> Result<(), ValidationError> {
    require("caseId", &vars.case_id)?;
    require("sessionId", &vars.session_id)?;
    require("protocolUID", &vars.protocol_uid)?;
    require("sessionExported", &vars.session_exported)?;
    require("codebookHash", &vars.codebook_hash)?;
    Ok(())
}

/// Check that a session can be exported.
///
/// Required session variables must be present, primary keys must be unique
/// across nodes, edges and ego, and every edge endpoint must name a node of
/// the same session.
pub fn validate_session(session: &Session) -> Result<(), ValidationError> {
    validate_variables(&session.session_variables)?;

    let mut seen = HashSet::new();
    let entities = session
        .nodes
        .iter()
        .chain(session.edges.iter())
        .chain(session.ego.iter());
    for entity in entities {
        if !seen.insert(entity.uid.as_str()) {
            return Err(ValidationError::DuplicatePrimaryKey(entity.uid.clone()));
        }
    }

    let node_ids: HashSet<&str> = session.nodes.iter().map(|n| n.uid.as_str()).collect();
    for edge in &session.edges {
        let (Some(from), Some(to)) = (edge.from.as_deref(), edge.to.as_deref()) else {
            return Err(ValidationError::MissingEndpoint(edge.uid.clone()));
        };
        for endpoint in [from, to] {
            if !node_ids.contains(endpoint) {
                return Err(ValidationError::DanglingEdge {
                    edge: edge.uid.clone(),
                    node: endpoint.to_string(),
                });
            }
        }
    }

    Ok(())
}
