//! Node attribute table: one row per node of the partition.

use crate::encode::{ChunkStream, EncodeError, EncodeSettings, Encoder};
use crate::pipeline::{ExportEntity, PartitionedNetwork};
use crate::resolver::resolve_entity_name;
use crate::types::{Codebook, EntityKind, ExportFormat};

use super::{csv_row, header_row, opt_cell, table_stream, AttributeColumns, RowSource};

const FIXED_COLUMNS: [&str; 4] = [
    "nodeID",
    "networkCanvasEgoUUID",
    "networkCanvasUUID",
    "networkCanvasNodeType",
];
const SESSION_COLUMN: &str = "networkCanvasSessionID";

pub(super) fn row_source(entity: &ExportEntity) -> RowSource<'_> {
    RowSource {
        entity_type: &entity.entity_type,
        uid: &entity.uid,
        attributes: &entity.attributes,
    }
}

/// Encodes node attributes.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttributeListEncoder;

impl Encoder for AttributeListEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::AttributeList
    }

    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a> {
        let columns = match AttributeColumns::collect(
            codebook,
            EntityKind::Node,
            partition.nodes().map(row_source),
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

        let rows = partition.nodes().map(move |node| -> Result<String, EncodeError> {
            let mut cells = vec![
                node.export_id.to_string(),
                opt_cell(&node.ego_uid),
                node.uid.clone(),
                resolve_entity_name(codebook, EntityKind::Node, &node.entity_type).to_string(),
            ];
            if union {
                cells.push(opt_cell(&node.session_id));
            }
            cells.extend(columns.cells(codebook, EntityKind::Node, row_source(node), settings)?);
            Ok(csv_row(&cells))
        });
        table_stream(header, rows)
    }
}
