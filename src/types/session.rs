//! Interview sessions and the protocols they were collected with.

use serde::{Deserialize, Deserializer, Serialize};

use super::codebook::Codebook;
use super::entity::{Entity, EGO_TYPE};

/// Session metadata recorded by the collection tool.
///
/// Every field is optional at the type level; required fields are enforced
/// by session validation so that one malformed session never fails a batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionVariables {
    /// Researcher-assigned case identifier.
    #[serde(default)]
    pub case_id: Option<String>,
    /// Session UUID.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Protocol this session was collected with.
    #[serde(default, rename = "protocolUID", alias = "protocolId")]
    pub protocol_uid: Option<String>,
    /// Human-readable protocol name.
    #[serde(default)]
    pub protocol_name: Option<String>,
    /// Protocol identifier on the remote server.
    #[serde(default, rename = "remoteProtocolID", alias = "remoteProtocolId")]
    pub remote_protocol_id: Option<String>,
    /// Interview start timestamp.
    #[serde(default)]
    pub session_start: Option<String>,
    /// Interview finish timestamp.
    #[serde(default)]
    pub session_finish: Option<String>,
    /// Export timestamp.
    #[serde(default, rename = "sessionExported", alias = "sessionExportTime")]
    pub session_exported: Option<String>,
    /// Hash of the codebook the session was collected against.
    #[serde(default)]
    pub codebook_hash: Option<String>,
}

/// One respondent's collected network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Alters.
    #[serde(default)]
    pub nodes: Vec<Entity>,
    /// Relationships between alters.
    #[serde(default)]
    pub edges: Vec<Entity>,
    /// The respondent, if the protocol collects ego data.
    #[serde(default, deserialize_with = "deserialize_ego")]
    pub ego: Option<Entity>,
    /// Session metadata.
    #[serde(default)]
    pub session_variables: SessionVariables,
}

fn deserialize_ego<'de, D>(deserializer: D) -> Result<Option<Entity>, D::Error>
where
    D: Deserializer<'de>,
{
    let ego = Option::<Entity>::deserialize(deserializer)?;
    Ok(ego.map(|mut ego| {
        if ego.entity_type.is_empty() {
            ego.entity_type = EGO_TYPE.to_string();
        }
        ego
    }))
}

/// A protocol: its display name and the codebook describing its variables.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    /// Display name, used for file prefixes under network union.
    #[serde(default)]
    pub name: String,
    /// Variable schema.
    #[serde(default)]
    pub codebook: Codebook,
}

impl Protocol {
    /// Create a protocol.
    pub fn new(name: impl Into<String>, codebook: Codebook) -> Self {
        Self {
            name: name.into(),
            codebook,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_session_variables_accept_aliases() {
        let vars: SessionVariables = serde_json::from_value(json!({
            "caseId": "case 1",
            "sessionId": "s1",
            "protocolId": "p1",
            "sessionExportTime": "2024-01-01T00:00:00Z",
            "codebookHash": "abc"
        }))
        .unwrap();

        assert_eq!(vars.protocol_uid.as_deref(), Some("p1"));
        assert_eq!(vars.session_exported.as_deref(), Some("2024-01-01T00:00:00Z"));
    }

    #[test]
    fn test_ego_without_type_gets_ego_type() {
        let session: Session = serde_json::from_value(json!({
            "ego": { "_uid": "ego-1", "attributes": { "age": 40 } }
        }))
        .unwrap();

        let ego = session.ego.unwrap();
        assert_eq!(ego.entity_type, EGO_TYPE);
        assert!(session.nodes.is_empty());
    }
}
