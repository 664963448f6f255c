//! Edge table: one row per edge, two when edges are undirected.

use crate::encode::{ChunkStream, EncodeError, EncodeSettings, Encoder};
use crate::pipeline::{ExportEntity, PartitionedNetwork};
use crate::resolver::resolve_entity_name;
use crate::types::{Codebook, EntityKind, ExportFormat};

use super::attribute_list::row_source;
use super::{csv_row, header_row, opt_cell, table_stream, AttributeColumns};

const FIXED_COLUMNS: [&str; 8] = [
    "edgeID",
    "networkCanvasEgoUUID",
    "networkCanvasUUID",
    "networkCanvasEdgeType",
    "from",
    "to",
    "networkCanvasSourceUUID",
    "networkCanvasTargetUUID",
];
const SESSION_COLUMN: &str = "networkCanvasSessionID";

/// Encodes edges with their attributes.
///
/// Undirected output writes every edge a second time with its endpoints
/// swapped so that each row reads as "from is adjacent to to".
#[derive(Debug, Clone, Copy, Default)]
pub struct EdgeListEncoder;

impl Encoder for EdgeListEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::EdgeList
    }

    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a> {
        let columns = match AttributeColumns::collect(
            codebook,
            EntityKind::Edge,
            partition.edges().map(row_source),
            settings,
        ) {
            Ok(columns) => columns,
            Err(err) => return ChunkStream::failed(err),
        };

        let union = partition.network.is_union();
        let mut fixed = FIXED_COLUMNS.to_vec();
        if union {
            fixed.push(SESSION_COLUMN);
        }
        let header = header_row(&fixed, &columns);

        let row = move |edge: &ExportEntity, reversed: bool| -> Result<String, EncodeError> {
            let Some(endpoints) = &edge.endpoints else {
                return Ok(String::new());
            };
            let (from, to, from_uid, to_uid) = if reversed {
                (endpoints.to, endpoints.from, &endpoints.to_uid, &endpoints.from_uid)
            } else {
                (endpoints.from, endpoints.to, &endpoints.from_uid, &endpoints.to_uid)
            };
            let mut cells = vec![
                edge.export_id.to_string(),
                opt_cell(&edge.ego_uid),
                edge.uid.clone(),
                resolve_entity_name(codebook, EntityKind::Edge, &edge.entity_type).to_string(),
                from.to_string(),
                to.to_string(),
                from_uid.clone(),
                to_uid.clone(),
            ];
            if union {
                cells.push(opt_cell(&edge.session_id));
            }
            cells.extend(columns.cells(codebook, EntityKind::Edge, row_source(edge), settings)?);
            Ok(csv_row(&cells))
        };

        let passes: &'static [bool] = if settings.directed { &[false] } else { &[false, true] };
        let rows = partition
            .edges()
            .flat_map(move |edge| passes.iter().map(move |&reversed| (edge, reversed)))
            .map(move |(edge, reversed)| row(edge, reversed))
            .filter(|chunk| !matches!(chunk, Ok(s) if s.is_empty()));
        table_stream(header, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Endpoints, ExportId, ExportNetwork, Provenance, SessionRecord};
    use crate::types::Attributes;
    use serde_json::json;
    use std::sync::Arc;

    fn partition() -> PartitionedNetwork {
        let mut attributes = Attributes::new();
        attributes.insert("weight".to_string(), json!(2));
        let edge = ExportEntity {
            export_id: ExportId(3),
            uid: "e1".to_string(),
            entity_type: "friend".to_string(),
            attributes,
            ego_uid: Some("ego-1".to_string()),
            session_id: None,
            endpoints: Some(Endpoints {
                from: ExportId(1),
                to: ExportId(2),
                from_uid: "n1".to_string(),
                to_uid: "n2".to_string(),
            }),
        };
        PartitionedNetwork::whole(Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(Vec::new()),
            edges: Arc::new(vec![edge]),
            provenance: Provenance::Session(SessionRecord::default()),
        }))
    }

    #[test]
    fn test_undirected_doubles_rows() {
        let partition = partition();
        let csv = EdgeListEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(
            lines[0],
            "edgeID,networkCanvasEgoUUID,networkCanvasUUID,networkCanvasEdgeType,from,to,networkCanvasSourceUUID,networkCanvasTargetUUID,weight"
        );
        assert_eq!(lines[1], "3,ego-1,e1,friend,1,2,n1,n2,2");
        assert_eq!(lines[2], "3,ego-1,e1,friend,2,1,n2,n1,2");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_directed_single_row() {
        let partition = partition();
        let settings = EncodeSettings::default().with_directed(true);
        let csv = EdgeListEncoder
            .encode(&partition, &Codebook::default(), &settings)
            .into_string()
            .unwrap();
        assert_eq!(csv.matches("\r\n").count(), 2);
    }
}
