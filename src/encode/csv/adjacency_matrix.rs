//! Adjacency matrix over every node of the network.

use std::collections::{HashMap, HashSet};

use crate::encode::{ChunkStream, EncodeError, EncodeSettings, Encoder};
use crate::pipeline::PartitionedNetwork;
use crate::types::{Codebook, ExportFormat};

use super::{csv_row, table_stream};

/// Encodes a square 0/1 matrix of the partition's edges.
///
/// Rows and columns are the export ids of every node in the network, so
/// each edge-type partition yields a matrix of the same shape.
#[derive(Debug, Clone, Copy, Default)]
pub struct AdjacencyMatrixEncoder;

impl Encoder for AdjacencyMatrixEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::AdjacencyMatrix
    }

    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        _codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a> {
        let nodes = partition.all_nodes();
        let position: HashMap<u64, usize> = nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (node.export_id.get(), i))
            .collect();

        let mut adjacent: HashSet<(usize, usize)> = HashSet::new();
        for endpoints in partition.edges().filter_map(|e| e.endpoints.as_ref()) {
            if let (Some(&from), Some(&to)) = (
                position.get(&endpoints.from.get()),
                position.get(&endpoints.to.get()),
            ) {
                adjacent.insert((from, to));
                if !settings.directed {
                    adjacent.insert((to, from));
                }
            }
        }

        let header: Vec<String> = std::iter::once(String::new())
            .chain(nodes.iter().map(|n| n.export_id.to_string()))
            .collect();
        let size = nodes.len();
        let rows = nodes.iter().enumerate().map(move |(row, node)| {
            let cells: Vec<String> = std::iter::once(node.export_id.to_string())
                .chain((0..size).map(|col| {
                    if adjacent.contains(&(row, col)) { "1" } else { "0" }.to_string()
                }))
                .collect();
            Ok::<_, EncodeError>(csv_row(&cells))
        });
        table_stream(csv_row(&header), rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Endpoints, ExportEntity, ExportId, ExportNetwork, Provenance, SessionRecord};
    use crate::types::Attributes;
    use std::sync::Arc;

    fn entity(id: u64, endpoints: Option<(u64, u64)>) -> ExportEntity {
        ExportEntity {
            export_id: ExportId(id),
            uid: format!("u{id}"),
            entity_type: "t".to_string(),
            attributes: Attributes::new(),
            ego_uid: None,
            session_id: None,
            endpoints: endpoints.map(|(from, to)| Endpoints {
                from: ExportId(from),
                to: ExportId(to),
                from_uid: format!("u{from}"),
                to_uid: format!("u{to}"),
            }),
        }
    }

    fn partition() -> PartitionedNetwork {
        PartitionedNetwork::whole(Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(vec![entity(1, None), entity(2, None), entity(3, None)]),
            edges: Arc::new(vec![entity(4, Some((1, 2)))]),
            provenance: Provenance::Session(SessionRecord::default()),
        }))
    }

    #[test]
    fn test_undirected_matrix_is_symmetric() {
        let partition = partition();
        let csv = AdjacencyMatrixEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();

        assert_eq!(csv, ",1,2,3\r\n1,0,1,0\r\n2,1,0,0\r\n3,0,0,0\r\n");
    }

    #[test]
    fn test_directed_matrix() {
        let partition = partition();
        let settings = EncodeSettings::default().with_directed(true);
        let csv = AdjacencyMatrixEncoder
            .encode(&partition, &Codebook::default(), &settings)
            .into_string()
            .unwrap();

        assert_eq!(csv, ",1,2,3\r\n1,0,1,0\r\n2,0,0,0\r\n3,0,0,0\r\n");
    }
}
