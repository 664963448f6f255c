//! Protocol grouping and cross-session network union.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

use super::network::{ExportEntity, ExportNetwork, Provenance};

/// Networks grouped by protocol id.
pub type ProtocolNetworks = BTreeMap<String, Vec<ExportNetwork>>;

/// Group networks by protocol, keeping input order within each group.
pub fn group_by_protocol(networks: Vec<ExportNetwork>) -> ProtocolNetworks {
    let mut grouped = ProtocolNetworks::new();
    for network in networks {
        grouped
            .entry(network.protocol_uid.clone())
            .or_default()
            .push(network);
    }
    grouped
}

fn tag_session<'a>(entities: &'a [ExportEntity], session_id: &str) -> impl Iterator<Item = ExportEntity> + 'a {
    let session_id = session_id.to_string();
    entities.iter().map(move |entity| ExportEntity {
        session_id: Some(session_id.clone()),
        ..entity.clone()
    })
}

/// Merge the networks of one protocol into a single network.
///
/// Entity lists are concatenated in input order and each entity is tagged
/// with its originating session id. Ego and session variables become a map
/// keyed by session id.
pub fn union_of_networks(protocol_uid: &str, networks: &[ExportNetwork]) -> ExportNetwork {
    let mut nodes = Vec::new();
    let mut edges = Vec::new();
    let mut records = BTreeMap::new();

    for network in networks {
        for record in network.records() {
            let session_id = record.session_id().to_string();
            nodes.extend(tag_session(&network.nodes, &session_id));
            edges.extend(tag_session(&network.edges, &session_id));
            if records.insert(session_id.clone(), record.clone()).is_some() {
                warn!(protocol = %protocol_uid, session = %session_id, "Duplicate session id in union");
            }
        }
    }

    ExportNetwork {
        protocol_uid: protocol_uid.to_string(),
        nodes: Arc::new(nodes),
        edges: Arc::new(edges),
        provenance: Provenance::Union(records),
    }
}

/// Replace each protocol group with its single unioned network.
pub fn unify_protocols(grouped: ProtocolNetworks) -> ProtocolNetworks {
    grouped
        .into_iter()
        .map(|(protocol_uid, networks)| {
            let union = union_of_networks(&protocol_uid, &networks);
            (protocol_uid, vec![union])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::network::{ExportId, SessionRecord};
    use crate::types::{Attributes, Entity, SessionVariables};

    fn node(id: u64) -> ExportEntity {
        ExportEntity {
            export_id: ExportId(id),
            uid: format!("n{id}"),
            entity_type: "person".to_string(),
            attributes: Attributes::new(),
            ego_uid: None,
            session_id: None,
            endpoints: None,
        }
    }

    fn network(protocol: &str, session_id: &str, ids: &[u64]) -> ExportNetwork {
        ExportNetwork {
            protocol_uid: protocol.to_string(),
            nodes: Arc::new(ids.iter().copied().map(node).collect()),
            edges: Arc::new(Vec::new()),
            provenance: Provenance::Session(SessionRecord {
                ego: Some(Entity::ego(format!("ego-{session_id}"))),
                variables: SessionVariables {
                    session_id: Some(session_id.to_string()),
                    ..Default::default()
                },
            }),
        }
    }

    #[test]
    fn test_group_by_protocol_is_sorted_and_stable() {
        let grouped = group_by_protocol(vec![
            network("p2", "s1", &[1]),
            network("p1", "s2", &[2]),
            network("p2", "s3", &[3]),
        ]);

        assert_eq!(grouped.keys().collect::<Vec<_>>(), vec!["p1", "p2"]);
        assert_eq!(grouped["p2"][0].nodes[0].export_id, ExportId(1));
        assert_eq!(grouped["p2"][1].nodes[0].export_id, ExportId(3));
    }

    #[test]
    fn test_union_tags_sessions_and_merges_records() {
        let union = union_of_networks("p1", &[network("p1", "s1", &[1, 2]), network("p1", "s2", &[3])]);

        assert!(union.is_union());
        assert_eq!(union.nodes.len(), 3);
        assert_eq!(union.nodes[2].session_id.as_deref(), Some("s2"));

        let Provenance::Union(records) = &union.provenance else {
            panic!("expected union provenance");
        };
        assert_eq!(records.len(), 2);
        assert_eq!(records["s1"].ego.as_ref().unwrap().uid, "ego-s1");
    }

    #[test]
    fn test_tagged_entities_outlive_session_id() {
        let nodes = vec![node(1), node(2)];
        let tagged = {
            let session_id = String::from("s9");
            tag_session(&nodes, &session_id)
        };
        let tagged: Vec<_> = tagged.collect();

        assert_eq!(tagged.len(), 2);
        assert!(tagged.iter().all(|n| n.session_id.as_deref() == Some("s9")));
        assert!(nodes.iter().all(|n| n.session_id.is_none()));
    }
}
