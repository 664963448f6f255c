//! Per-format partitioning of a network by entity type.

use std::sync::Arc;

use crate::resolver::resolve_entity_name;
use crate::types::{Codebook, EntityKind, ExportFormat, PartitionBy};

use super::network::{ExportEntity, ExportNetwork};

/// A view of a network restricted to one node or edge type.
///
/// Holds the network by `Arc`; entities are filtered on iteration and never
/// copied.
#[derive(Debug, Clone)]
pub struct PartitionedNetwork {
    /// The underlying network.
    pub network: Arc<ExportNetwork>,
    /// Node type filter.
    pub node_type: Option<String>,
    /// Edge type filter.
    pub edge_type: Option<String>,
    /// Human-readable partition name used in file names.
    pub label: Option<String>,
}

impl PartitionedNetwork {
    /// A partition covering the whole network.
    pub fn whole(network: Arc<ExportNetwork>) -> Self {
        Self {
            network,
            node_type: None,
            edge_type: None,
            label: None,
        }
    }

    /// Nodes in this partition.
    pub fn nodes(&self) -> impl Iterator<Item = &ExportEntity> + '_ {
        let filter = self.node_type.as_deref();
        self.network
            .nodes
            .iter()
            .filter(move |node| filter.map_or(true, |t| node.entity_type == t))
    }

    /// Edges in this partition.
    pub fn edges(&self) -> impl Iterator<Item = &ExportEntity> + '_ {
        let filter = self.edge_type.as_deref();
        self.network
            .edges
            .iter()
            .filter(move |edge| filter.map_or(true, |t| edge.entity_type == t))
    }

    /// Every node of the underlying network, regardless of type filter.
    pub fn all_nodes(&self) -> &[ExportEntity] {
        &self.network.nodes
    }
}

fn types_in_order<'a>(entities: impl Iterator<Item = &'a ExportEntity>) -> Vec<&'a str> {
    let mut types: Vec<&str> = Vec::new();
    for entity in entities {
        if !types.contains(&entity.entity_type.as_str()) {
            types.push(&entity.entity_type);
        }
    }
    types
}

/// Split a network into the partitions a format writes one file each for.
///
/// Always returns at least one partition: when the partitioned collection
/// is empty the whole network is returned unlabelled.
pub fn partition_network(
    codebook: &Codebook,
    network: &Arc<ExportNetwork>,
    format: ExportFormat,
) -> Vec<PartitionedNetwork> {
    let (kind, types) = match format.partition_by() {
        PartitionBy::Whole => return vec![PartitionedNetwork::whole(Arc::clone(network))],
        PartitionBy::NodeType => (EntityKind::Node, types_in_order(network.nodes.iter())),
        PartitionBy::EdgeType => (EntityKind::Edge, types_in_order(network.edges.iter())),
    };

    if types.is_empty() {
        return vec![PartitionedNetwork::whole(Arc::clone(network))];
    }

    types
        .into_iter()
        .map(|entity_type| {
            let mut partition = PartitionedNetwork::whole(Arc::clone(network));
            partition.label = Some(resolve_entity_name(codebook, kind, entity_type).to_string());
            match kind {
                EntityKind::Node => partition.node_type = Some(entity_type.to_string()),
                _ => partition.edge_type = Some(entity_type.to_string()),
            }
            partition
        })
        .collect()
}
