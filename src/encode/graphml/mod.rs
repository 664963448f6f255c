//! GraphML encoder.
//!
//! Output order:
//!
//! ```text
//! header → node keys → edge keys → graph keys
//!        → for each graph: open (+ ego data) → node batches → edge batches → close
//!        → footer
//! ```
//!
//! Under network union one `<graph>` is written per originating session.

pub mod keys;

pub use keys::{Domain, KeyDef, KeyRegistry};

use std::collections::{HashMap, VecDeque};
use std::fmt::Write;

use crate::pipeline::{ExportEntity, PartitionedNetwork, SessionRecord};
use crate::resolver::resolve_entity_name;
use crate::types::{Codebook, Entity, EntityKind, ExportFormat};

use super::fields::{expand_attributes, Field, KeyType};
use super::xml::{escape_attr, escape_text};
use super::{ChunkStream, EncodeError, EncodeSettings, Encoder};

/// GraphML namespace.
pub const GRAPHML_NS: &str = "http://graphml.graphdrawing.org/xmlns";
/// Network Canvas provenance namespace.
pub const NC_NS: &str = "http://schema.networkcanvas.com/xmlns";

const GRAPHML_SCHEMA: &str =
    "http://graphml.graphdrawing.org/xmlns http://graphml.graphdrawing.org/xmlns/1.0/graphml.xsd";
const NC_SCHEMA: &str =
    "http://schema.networkcanvas.com/xmlns http://schema.networkcanvas.com/xmlns/1.0/graphml+netcanvas.xsd";

/// Encodes a partition as one GraphML document.
#[derive(Debug, Clone, Copy, Default)]
pub struct GraphMlEncoder;

impl Encoder for GraphMlEncoder {
    fn format(&self) -> ExportFormat {
        ExportFormat::GraphMl
    }

    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a> {
        ChunkStream::new(GraphMlChunks::new(partition, codebook, settings))
    }
}

fn fixed(id: &str, value: &str) -> Field {
    Field {
        id: id.to_string(),
        name: id.to_string(),
        key_type: Some(KeyType::String),
        value: Some(value.to_string()),
    }
}

fn entity_fields(
    codebook: &Codebook,
    kind: EntityKind,
    entity: &ExportEntity,
    settings: &EncodeSettings,
) -> Result<Vec<Field>, EncodeError> {
    let mut fields = vec![
        fixed("networkCanvasUUID", &entity.uid),
        fixed(
            "networkCanvasType",
            resolve_entity_name(codebook, kind, &entity.entity_type),
        ),
    ];
    if let Some(ego_uid) = &entity.ego_uid {
        fields.push(fixed("networkCanvasEgoUUID", ego_uid));
    }
    if let Some(endpoints) = &entity.endpoints {
        fields.push(fixed("networkCanvasFromUUID", &endpoints.from_uid));
        fields.push(fixed("networkCanvasToUUID", &endpoints.to_uid));
    }
    if let Some(session_id) = &entity.session_id {
        fields.push(fixed("networkCanvasSessionID", session_id));
    }
    fields.extend(expand_attributes(
        codebook,
        kind,
        &entity.entity_type,
        &entity.uid,
        &entity.attributes,
        settings,
    )?);
    Ok(fields)
}

fn ego_fields(
    codebook: &Codebook,
    ego: &Entity,
    settings: &EncodeSettings,
) -> Result<Vec<Field>, EncodeError> {
    let mut fields = vec![fixed("networkCanvasUUID", &ego.uid)];
    fields.extend(expand_attributes(
        codebook,
        EntityKind::Ego,
        &ego.entity_type,
        &ego.uid,
        &ego.attributes,
        settings,
    )?);
    Ok(fields)
}

fn write_data(out: &mut String, indent: &str, registry: &KeyRegistry, fields: &[Field]) {
    for field in fields {
        if let Some(value) = &field.value {
            let _ = writeln!(
                out,
                "{indent}<data key=\"{}\">{}</data>",
                escape_attr(registry.id_for(field)),
                escape_text(value)
            );
        }
    }
}

fn write_nc_attr(out: &mut String, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        let _ = write!(out, "\n  nc:{name}=\"{}\"", escape_attr(value));
    }
}

/// Entities of one `<graph>` element.
struct GraphGroup<'a> {
    record: Option<&'a SessionRecord>,
    nodes: Vec<&'a ExportEntity>,
    edges: Vec<&'a ExportEntity>,
}

fn graph_groups(partition: &PartitionedNetwork) -> Vec<GraphGroup<'_>> {
    let network = &partition.network;
    if !network.is_union() {
        return vec![GraphGroup {
            record: network.session(),
            nodes: partition.nodes().collect(),
            edges: partition.edges().collect(),
        }];
    }

    let records = network.records();
    let mut groups: Vec<GraphGroup<'_>> = records
        .iter()
        .map(|record| GraphGroup {
            record: Some(*record),
            nodes: Vec::new(),
            edges: Vec::new(),
        })
        .collect();
    let index: HashMap<&str, usize> = records
        .iter()
        .enumerate()
        .map(|(i, record)| (record.session_id(), i))
        .collect();

    let group_of = |entity: &ExportEntity| index.get(entity.session_id.as_deref().unwrap_or_default()).copied();
    for node in partition.nodes() {
        if let Some(i) = group_of(node) {
            groups[i].nodes.push(node);
        }
    }
    for edge in partition.edges() {
        if let Some(i) = group_of(edge) {
            groups[i].edges.push(edge);
        }
    }
    groups
}

#[derive(Debug, Clone, Copy)]
enum Step {
    Header,
    Keys(Domain),
    Open(usize),
    Nodes(usize, usize),
    Edges(usize, usize),
    Close,
    Footer,
}

struct GraphMlChunks<'a> {
    partition: &'a PartitionedNetwork,
    codebook: &'a Codebook,
    settings: &'a EncodeSettings,
    groups: Vec<GraphGroup<'a>>,
    registry: KeyRegistry,
    steps: VecDeque<Step>,
}

impl<'a> GraphMlChunks<'a> {
    fn new(
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> Self {
        let groups = graph_groups(partition);
        let batch = settings.batch_size.max(1);

        let mut steps = VecDeque::from([
            Step::Header,
            Step::Keys(Domain::Node),
            Step::Keys(Domain::Edge),
            Step::Keys(Domain::Graph),
        ]);
        for (g, group) in groups.iter().enumerate() {
            steps.push_back(Step::Open(g));
            steps.extend((0..group.nodes.len()).step_by(batch).map(|start| Step::Nodes(g, start)));
            steps.extend((0..group.edges.len()).step_by(batch).map(|start| Step::Edges(g, start)));
            steps.push_back(Step::Close);
        }
        steps.push_back(Step::Footer);

        Self {
            partition,
            codebook,
            settings,
            groups,
            registry: KeyRegistry::new(),
            steps,
        }
    }

    /// Observe every field before any key is written.
    fn build_registry(&self) -> Result<KeyRegistry, EncodeError> {
        let mut registry = KeyRegistry::new();
        for node in self.groups.iter().flat_map(|g| g.nodes.iter()) {
            for field in entity_fields(self.codebook, EntityKind::Node, node, self.settings)? {
                registry.observe(Domain::Node, &field);
            }
        }
        for edge in self.groups.iter().flat_map(|g| g.edges.iter()) {
            for field in entity_fields(self.codebook, EntityKind::Edge, edge, self.settings)? {
                registry.observe(Domain::Edge, &field);
            }
        }
        for group in &self.groups {
            if let Some(ego) = group.record.and_then(|r| r.ego.as_ref()) {
                for field in ego_fields(self.codebook, ego, self.settings)? {
                    registry.observe(Domain::Graph, &field);
                }
            }
        }
        Ok(registry)
    }

    fn header(&self) -> String {
        let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
        let _ = write!(
            out,
            "<graphml xmlns=\"{GRAPHML_NS}\"\n  xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\""
        );
        if !self.settings.include_nc_meta {
            let _ = write!(out, "\n  xsi:schemaLocation=\"{GRAPHML_SCHEMA}\">\n");
            return out;
        }

        let _ = write!(
            out,
            "\n  xsi:schemaLocation=\"{GRAPHML_SCHEMA} {NC_SCHEMA}\"\n  xmlns:nc=\"{NC_NS}\""
        );
        let network = &self.partition.network;
        match network.session() {
            Some(record) => {
                let vars = &record.variables;
                write_nc_attr(&mut out, "caseId", &vars.case_id);
                write_nc_attr(&mut out, "sessionUUID", &vars.session_id);
                write_nc_attr(&mut out, "protocolName", &vars.protocol_name);
                write_nc_attr(&mut out, "remoteProtocolID", &vars.remote_protocol_id);
                write_nc_attr(&mut out, "sessionStartTime", &vars.session_start);
                write_nc_attr(&mut out, "sessionFinishTime", &vars.session_finish);
                write_nc_attr(&mut out, "sessionExportTime", &vars.session_exported);
            }
            None => {
                if let Some(first) = network.records().first() {
                    write_nc_attr(&mut out, "protocolName", &first.variables.protocol_name);
                    write_nc_attr(&mut out, "remoteProtocolID", &first.variables.remote_protocol_id);
                }
            }
        }
        out.push_str(">\n");
        out
    }

    fn open_graph(&self, g: usize) -> Result<String, EncodeError> {
        let edge_default = if self.settings.directed { "directed" } else { "undirected" };
        let mut out = format!("  <graph edgedefault=\"{edge_default}\"");
        let group = &self.groups[g];

        if self.partition.network.is_union() && self.settings.include_nc_meta {
            if let Some(record) = group.record {
                let vars = &record.variables;
                write_nc_attr(&mut out, "caseId", &vars.case_id);
                write_nc_attr(&mut out, "sessionUUID", &vars.session_id);
                write_nc_attr(&mut out, "sessionStartTime", &vars.session_start);
                write_nc_attr(&mut out, "sessionFinishTime", &vars.session_finish);
                write_nc_attr(&mut out, "sessionExportTime", &vars.session_exported);
            }
        }
        out.push_str(">\n");

        if let Some(ego) = group.record.and_then(|r| r.ego.as_ref()) {
            write_data(&mut out, "    ", &self.registry, &ego_fields(self.codebook, ego, self.settings)?);
        }
        Ok(out)
    }

    fn nodes(&self, g: usize, start: usize) -> Result<String, EncodeError> {
        let nodes = &self.groups[g].nodes;
        let end = (start + self.settings.batch_size.max(1)).min(nodes.len());
        let mut out = String::new();
        for node in &nodes[start..end] {
            let _ = writeln!(out, "    <node id=\"{}\">", node.export_id);
            write_data(
                &mut out,
                "      ",
                &self.registry,
                &entity_fields(self.codebook, EntityKind::Node, node, self.settings)?,
            );
            out.push_str("    </node>\n");
        }
        Ok(out)
    }

    fn edges(&self, g: usize, start: usize) -> Result<String, EncodeError> {
        let edges = &self.groups[g].edges;
        let end = (start + self.settings.batch_size.max(1)).min(edges.len());
        let mut out = String::new();
        for edge in &edges[start..end] {
            let Some(endpoints) = &edge.endpoints else {
                continue;
            };
            let _ = writeln!(
                out,
                "    <edge id=\"{}\" source=\"{}\" target=\"{}\">",
                edge.export_id, endpoints.from, endpoints.to
            );
            write_data(
                &mut out,
                "      ",
                &self.registry,
                &entity_fields(self.codebook, EntityKind::Edge, edge, self.settings)?,
            );
            out.push_str("    </edge>\n");
        }
        Ok(out)
    }

    fn render(&mut self, step: Step) -> Result<String, EncodeError> {
        match step {
            Step::Header => {
                self.registry = self.build_registry()?;
                Ok(self.header())
            }
            Step::Keys(domain) => Ok(self.registry.render(domain)),
            Step::Open(g) => self.open_graph(g),
            Step::Nodes(g, start) => self.nodes(g, start),
            Step::Edges(g, start) => self.edges(g, start),
            Step::Close => Ok("  </graph>\n".to_string()),
            Step::Footer => Ok("</graphml>\n".to_string()),
        }
    }
}

impl Iterator for GraphMlChunks<'_> {
    type Item = Result<String, EncodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(step) = self.steps.pop_front() {
            match self.render(step) {
                Ok(chunk) if chunk.is_empty() => continue,
                Ok(chunk) => return Some(Ok(chunk)),
                Err(err) => {
                    self.steps.clear();
                    return Some(Err(err));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Endpoints, ExportId, ExportNetwork, Provenance};
    use crate::types::{Attributes, SessionVariables};
    use serde_json::json;
    use std::sync::Arc;

    fn entity(id: u64, uid: &str, entity_type: &str) -> ExportEntity {
        ExportEntity {
            export_id: ExportId(id),
            uid: uid.to_string(),
            entity_type: entity_type.to_string(),
            attributes: Attributes::new(),
            ego_uid: Some("ego-1".to_string()),
            session_id: None,
            endpoints: None,
        }
    }

    fn partition() -> PartitionedNetwork {
        let mut n1 = entity(1, "n1", "person");
        n1.attributes.insert("age".to_string(), json!(30));
        let n2 = entity(2, "n2", "person");
        let mut e = entity(3, "e1", "friend");
        e.attributes.insert("age".to_string(), json!(1.5));
        e.endpoints = Some(Endpoints {
            from: ExportId(1),
            to: ExportId(2),
            from_uid: "n1".to_string(),
            to_uid: "n2".to_string(),
        });

        PartitionedNetwork::whole(Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(vec![n1, n2]),
            edges: Arc::new(vec![e]),
            provenance: Provenance::Session(SessionRecord {
                ego: Some(Entity::ego("ego-1").with_attribute("mood", "good")),
                variables: SessionVariables {
                    case_id: Some("case <1>".to_string()),
                    session_id: Some("s1".to_string()),
                    ..Default::default()
                },
            }),
        }))
    }

    #[test]
    fn test_document_structure() {
        let partition = partition();
        let settings = EncodeSettings::default();
        let xml = GraphMlEncoder
            .encode(&partition, &Codebook::default(), &settings)
            .into_string()
            .unwrap();

        assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
        assert!(xml.contains("nc:caseId=\"case &lt;1&gt;\""));
        assert!(xml.contains("<graph edgedefault=\"undirected\">"));
        assert!(xml.contains("<node id=\"1\">"));
        assert!(xml.contains("<edge id=\"3\" source=\"1\" target=\"2\">"));
        assert!(xml.contains("<data key=\"networkCanvasFromUUID\">n1</data>"));
        assert!(xml.trim_end().ends_with("</graphml>"));

        let first_data = xml.find("<data").unwrap();
        let last_key = xml.rfind("<key").unwrap();
        assert!(last_key < first_data);
    }

    #[test]
    fn test_unknown_variables_are_hashed_and_merged() {
        let partition = partition();
        let xml = GraphMlEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();
        let age_id = crate::encode::fields::sha1_hex("age");

        assert_eq!(xml.matches(&format!("<key id=\"{age_id}\"")).count(), 1);
        assert!(xml.contains(&format!("<key id=\"{age_id}\" for=\"all\" attr.name=\"age\" attr.type=\"string\"/>")));
    }

    #[test]
    fn test_ego_data_is_graph_level() {
        let partition = partition();
        let xml = GraphMlEncoder
            .encode(&partition, &Codebook::default(), &EncodeSettings::default())
            .into_string()
            .unwrap();
        let mood_id = crate::encode::fields::sha1_hex("mood");

        assert!(xml.contains("for=\"graph\" attr.name=\"mood\""));
        let graph_open = xml.find("<graph ").unwrap();
        let mood_data = xml.find(&format!("<data key=\"{mood_id}\">good</data>")).unwrap();
        let first_node = xml.find("<node ").unwrap();
        assert!(graph_open < mood_data && mood_data < first_node);
    }

    #[test]
    fn test_without_nc_meta() {
        let partition = partition();
        let settings = EncodeSettings {
            include_nc_meta: false,
            ..Default::default()
        }
        .with_directed(true);
        let xml = GraphMlEncoder
            .encode(&partition, &Codebook::default(), &settings)
            .into_string()
            .unwrap();

        assert!(!xml.contains("xmlns:nc"));
        assert!(xml.contains("edgedefault=\"directed\""));
    }

    #[test]
    fn test_batches_produce_separate_chunks() {
        let partition = partition();
        let settings = EncodeSettings {
            batch_size: 1,
            ..Default::default()
        };
        let chunks: Vec<String> = GraphMlEncoder
            .encode(&partition, &Codebook::default(), &settings)
            .collect::<Result<_, _>>()
            .unwrap();
        let node_chunks = chunks.iter().filter(|c| c.contains("<node ")).count();
        assert_eq!(node_chunks, 2);
    }

    #[test]
    fn test_colliding_field_ids_get_distinct_keys() {
        use crate::types::{EntityDefinition, VariableDefinition, VariableKind};

        let mut person = EntityDefinition::default();
        person
            .variables
            .insert("pos".to_string(), VariableDefinition::new("position", VariableKind::Layout));
        person
            .variables
            .insert("pos_X".to_string(), VariableDefinition::new("pos_X", VariableKind::Text));
        let mut codebook = Codebook::default();
        codebook.node.insert("person".to_string(), person);

        let mut node = entity(1, "n1", "person");
        node.attributes.insert("pos".to_string(), json!({ "x": 0.5, "y": 0.5 }));
        node.attributes.insert("pos_X".to_string(), json!("left"));
        let partition = PartitionedNetwork::whole(Arc::new(ExportNetwork {
            protocol_uid: "p1".to_string(),
            nodes: Arc::new(vec![node]),
            edges: Arc::new(Vec::new()),
            provenance: Provenance::Session(SessionRecord::default()),
        }));
        let xml = GraphMlEncoder
            .encode(&partition, &codebook, &EncodeSettings::default())
            .into_string()
            .unwrap();

        assert_eq!(xml.matches("<key id=\"pos_X\"").count(), 1);
        assert!(xml.contains("attr.name=\"position_X\" attr.type=\"double\""));
        assert!(xml.contains("attr.name=\"pos_X\" attr.type=\"string\""));
        assert_eq!(xml.matches("<data key=\"pos_X\">").count(), 1);
        let alias = crate::encode::fields::sha1_hex("pos_X\u{0}pos_X");
        assert!(xml.contains(&format!("<data key=\"{alias}\">left</data>")));
    }
}
