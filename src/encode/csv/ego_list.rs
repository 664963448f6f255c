//! Ego and session variable table: one row per originating session.

use crate::encode::{ChunkStream, EncodeError, EncodeSettings, Encoder};
use crate::pipeline::{PartitionedNetwork, SessionRecord};
use crate::types::{Codebook, EntityKind, ExportFormat};

use super::{csv_row, header_row, opt_cell, table_stream, AttributeColumns, RowSource};

const FIXED_COLUMNS: [&str; 7] = [
    "networkCanvasEgoUUID",
    "networkCanvasCaseID",
    "networkCanvasSessionID",
    "networkCanvasProtocolName",
    "sessionStart",
    "sessionFinish",
    "sessionExported",
];

fn ego_source(record: &SessionRecord) -> Option<RowSource<'_>> {
    record.ego.as_ref().map(|ego| RowSource {
        entity_type: &ego.entity_type,
        uid: &ego.uid,
        attributes: &ego.attributes,
    })
}

/// Encodes ego attributes and session variables.
#[derive(Debug, Clone, Copy, Default)]
pub struct EgoListEncoder;

impl Encoder for EgoListEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::EgoList
    }

    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a> {
        let records = partition.network.records();
        let columns = match AttributeColumns::collect(
            codebook,
            EntityKind::Ego,
            records.iter().filter_map(|r| ego_source(r)),
            settings,
        ) {
            Ok(columns) => columns,
            Err(err) => return ChunkStream::failed(err),
        };
        let header = header_row(&FIXED_COLUMNS, &columns);

        let rows = records.into_iter().map(move |record| -> Result<String, EncodeError> {
            let vars = &record.variables;
            let mut cells = vec![
                record.ego.as_ref().map(|e| e.uid.clone()).unwrap_or_default(),
                opt_cell(&vars.case_id),
                opt_cell(&vars.session_id),
                opt_cell(&vars.protocol_name),
                opt_cell(&vars.session_start),
                opt_cell(&vars.session_finish),
                opt_cell(&vars.session_exported),
            ];
            match ego_source(record) {
                Some(source) => {
                    cells.extend(columns.cells(codebook, EntityKind::Ego, source, settings)?)
                }
                None => cells.extend(std::iter::repeat(String::new()).take(columns.names().len())),
            }
            Ok(csv_row(&cells))
        });
        table_stream(header, rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{ExportNetwork, Provenance};
    use crate::types::{Entity, SessionVariables};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn record(session_id: &str, ego: Option<Entity>) -> SessionRecord {
        SessionRecord {
            ego,
            variables: SessionVariables {
                case_id: Some(format!("case, {session_id}")),
                session_id: Some(session_id.to_string()),
                protocol_name: Some("Study".to_string()),
                session_exported: Some("2024-01-01".to_string()),
                ..Default::default()
            },
        }
    }

    fn network(provenance: Provenance) -> PartitionedNetwork {
        PartitionedNetwork::whole(Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(Vec::new()),
            edges: Arc::new(Vec::new()),
            provenance,
        }))
    }

    #[test]
    fn test_single_session_row() {
        let partition = network(Provenance::Session(record(
            "s1",
            Some(Entity::ego("ego-1").with_attribute("age", 40)),
        )));
        let csv = EgoListEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();
        let lines: Vec<&str> = csv.split("\r\n").collect();

        assert_eq!(
            lines[0],
            "networkCanvasEgoUUID,networkCanvasCaseID,networkCanvasSessionID,networkCanvasProtocolName,sessionStart,sessionFinish,sessionExported,age"
        );
        assert_eq!(lines[1], "ego-1,\"case, s1\",s1,Study,,,2024-01-01,40");
    }

    #[test]
    fn test_union_has_one_row_per_session() {
        let mut records = BTreeMap::new();
        records.insert("s1".to_string(), record("s1", Some(Entity::ego("ego-1"))));
        records.insert("s2".to_string(), record("s2", None));
        let partition = network(Provenance::Union(records));

        let csv = EgoListEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();
        assert_eq!(csv.matches("\r\n").count(), 3);
        assert!(csv.contains("\r\n,\"case, s2\",s2,"));
    }
}
