//! Export options and the formats they select.

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Which CSV tables to produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CsvOptions {
    /// One adjacency matrix per edge type.
    pub adjacency_matrix: bool,
    /// One node attribute list per node type.
    pub attribute_list: bool,
    /// One edge list per edge type.
    pub edge_list: bool,
    /// Ego and session variables.
    pub ego_attribute_list: bool,
}

impl CsvOptions {
    /// All CSV tables disabled.
    pub fn disabled() -> Self {
        Self {
            adjacency_matrix: false,
            attribute_list: false,
            edge_list: false,
            ego_attribute_list: false,
        }
    }
}

impl Default for CsvOptions {
    fn default() -> Self {
        Self {
            adjacency_matrix: false,
            attribute_list: true,
            edge_list: true,
            ego_attribute_list: true,
        }
    }
}

/// Options shared by every format.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalOptions {
    /// Merge all sessions of a protocol into one network.
    pub unify_networks: bool,
    /// Declare edges as directed.
    pub use_directed_edges: bool,
    /// Convert normalized layout coordinates to screen pixels.
    pub use_screen_layout_coordinates: bool,
    /// Screen width in pixels.
    pub screen_layout_width: f64,
    /// Screen height in pixels.
    pub screen_layout_height: f64,
}

impl Default for GlobalOptions {
    fn default() -> Self {
        Self {
            unify_networks: false,
            use_directed_edges: false,
            use_screen_layout_coordinates: true,
            screen_layout_width: 1920.0,
            screen_layout_height: 1080.0,
        }
    }
}

/// Caller-supplied export options.
///
/// Deserializes from the camelCase options object. `exportCSV` may be a
/// boolean shorthand: `true` selects the default tables, `false` none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExportOptions {
    /// Produce GraphML.
    #[serde(rename = "exportGraphML")]
    pub export_graphml: bool,
    /// CSV tables to produce.
    #[serde(rename = "exportCSV", deserialize_with = "csv_options_or_flag")]
    pub export_csv: CsvOptions,
    /// Add the `nc:` provenance namespace to GraphML output.
    #[serde(rename = "includeNCMeta")]
    pub include_nc_meta: bool,
    /// Options shared by every format.
    pub global_options: GlobalOptions,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            export_graphml: true,
            export_csv: CsvOptions::default(),
            include_nc_meta: true,
            global_options: GlobalOptions::default(),
        }
    }
}

fn csv_options_or_flag<'de, D>(deserializer: D) -> Result<CsvOptions, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum CsvSetting {
        Flag(bool),
        Tables(CsvOptions),
    }

    Ok(match CsvSetting::deserialize(deserializer)? {
        CsvSetting::Flag(true) => CsvOptions::default(),
        CsvSetting::Flag(false) => CsvOptions::disabled(),
        CsvSetting::Tables(tables) => tables,
    })
}

impl ExportOptions {
    /// Formats selected by these options, in export order.
    pub fn formats(&self) -> Vec<ExportFormat> {
        let csv = &self.export_csv;
        [
            (self.export_graphml, ExportFormat::GraphMl),
            (csv.ego_attribute_list, ExportFormat::EgoList),
            (csv.adjacency_matrix, ExportFormat::AdjacencyMatrix),
            (csv.attribute_list, ExportFormat::AttributeList),
            (csv.edge_list, ExportFormat::EdgeList),
        ]
        .into_iter()
        .filter_map(|(enabled, format)| enabled.then_some(format))
        .collect()
    }
}

/// Output file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExportFormat {
    /// GraphML document.
    #[serde(rename = "graphml")]
    GraphMl,
    /// Ego and session variables CSV.
    #[serde(rename = "ego")]
    EgoList,
    /// Node attribute CSV.
    AttributeList,
    /// Edge list CSV.
    EdgeList,
    /// Adjacency matrix CSV.
    AdjacencyMatrix,
}

/// Which collection a format partitions by entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartitionBy {
    /// Single partition holding the whole network.
    Whole,
    /// One partition per node type.
    NodeType,
    /// One partition per edge type.
    EdgeType,
}

impl ExportFormat {
    /// Name used in file names.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::GraphMl => "graphml",
            Self::EgoList => "ego",
            Self::AttributeList => "attributeList",
            Self::EdgeList => "edgeList",
            Self::AdjacencyMatrix => "adjacencyMatrix",
        }
    }

    /// File extension including the leading dot.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::GraphMl => ".graphml",
            Self::EgoList | Self::AttributeList | Self::EdgeList | Self::AdjacencyMatrix => ".csv",
        }
    }

    /// How this format splits a network into files.
    pub fn partition_by(&self) -> PartitionBy {
        match self {
            Self::GraphMl | Self::EgoList => PartitionBy::Whole,
            Self::AttributeList => PartitionBy::NodeType,
            Self::EdgeList | Self::AdjacencyMatrix => PartitionBy::EdgeType,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_formats() {
        let formats = ExportOptions::default().formats();
        assert_eq!(
            formats,
            vec![
                ExportFormat::GraphMl,
                ExportFormat::EgoList,
                ExportFormat::AttributeList,
                ExportFormat::EdgeList,
            ]
        );
    }

    #[test]
    fn test_csv_flag_shorthand() {
        let options: ExportOptions =
            serde_json::from_value(json!({ "exportGraphML": false, "exportCSV": false })).unwrap();
        assert!(options.formats().is_empty());

        let options: ExportOptions = serde_json::from_value(json!({ "exportCSV": true })).unwrap();
        assert_eq!(options.export_csv, CsvOptions::default());
    }

    #[test]
    fn test_partial_options_keep_defaults() {
        let options: ExportOptions = serde_json::from_value(json!({
            "exportCSV": { "adjacencyMatrix": true },
            "globalOptions": { "unifyNetworks": true }
        }))
        .unwrap();

        assert!(options.export_csv.adjacency_matrix);
        assert!(options.export_csv.attribute_list);
        assert!(options.global_options.unify_networks);
        assert_eq!(options.global_options.screen_layout_width, 1920.0);
        assert!(options.include_nc_meta);
    }
}
