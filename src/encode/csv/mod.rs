//! CSV encoders.
//!
//! Every table starts with a header row: fixed leading columns followed by
//! the expanded attribute columns in first-seen order. Rows end with CRLF
//! and cells are quoted only when they contain a comma, quote, CR or LF.

mod ego_list;
mod attribute_list;
mod edge_list;
mod adjacency_matrix;

pub use ego_list::EgoListEncoder;
pub use attribute_list::AttributeListEncoder;
pub use edge_list::EdgeListEncoder;
pub use adjacency_matrix::AdjacencyMatrixEncoder;

use std::collections::HashMap;

use crate::types::{Attributes, Codebook, EntityKind};

use super::fields::expand_attributes;
use super::{ChunkStream, EncodeError, EncodeSettings};

/// Row terminator.
pub const CSV_EOL: &str = "\r\n";

/// Quote a cell if needed.
pub fn csv_cell(value: &str) -> String {
    if value.contains([',', '"', '\r', '\n']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Join cells into one CRLF-terminated row.
pub fn csv_row<S: AsRef<str>>(cells: &[S]) -> String {
    let mut row = cells
        .iter()
        .map(|cell| csv_cell(cell.as_ref()))
        .collect::<Vec<_>>()
        .join(",");
    row.push_str(CSV_EOL);
    row
}

/// Attribute columns of a table, collected in a prepass over all rows.
#[derive(Debug, Clone, Default)]
pub(crate) struct AttributeColumns {
    names: Vec<String>,
    index: HashMap<String, usize>,
}

/// The entity data a row's attribute cells are expanded from.
pub(crate) struct RowSource<'a> {
    pub entity_type: &'a str,
    pub uid: &'a str,
    pub attributes: &'a Attributes,
}

impl AttributeColumns {
    /// Collect the expanded column names of every entity, in first-seen order.
    pub fn collect<'a>(
        codebook: &Codebook,
        kind: EntityKind,
        rows: impl IntoIterator<Item = RowSource<'a>>,
        settings: &EncodeSettings,
    ) -> Result<Self, EncodeError> {
        let mut columns = Self::default();
        for row in rows {
            let fields = expand_attributes(
                codebook,
                kind,
                row.entity_type,
                row.uid,
                row.attributes,
                settings,
            )?;
            for field in fields {
                if !columns.index.contains_key(&field.name) {
                    columns.index.insert(field.name.clone(), columns.names.len());
                    columns.names.push(field.name);
                }
            }
        }
        Ok(columns)
    }

    /// Column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// One cell per column for an entity; empty where the entity has no value.
    pub fn cells(
        &self,
        codebook: &Codebook,
        kind: EntityKind,
        row: RowSource<'_>,
        settings: &EncodeSettings,
    ) -> Result<Vec<String>, EncodeError> {
        let mut cells = vec![String::new(); self.names.len()];
        let fields = expand_attributes(
            codebook,
            kind,
            row.entity_type,
            row.uid,
            row.attributes,
            settings,
        )?;
        for field in fields {
            if let (Some(&i), Some(value)) = (self.index.get(&field.name), field.value) {
                cells[i] = value;
            }
        }
        Ok(cells)
    }
}

/// Build a header row from fixed columns plus attribute columns.
pub(crate) fn header_row(fixed: &[&str], columns: &AttributeColumns) -> String {
    let cells: Vec<&str> = fixed
        .iter()
        .copied()
        .chain(columns.names().iter().map(String::as_str))
        .collect();
    csv_row(&cells)
}

/// A stream of one header row then lazily produced body rows.
pub(crate) fn table_stream<'a, R>(header: String, rows: R) -> ChunkStream<'a>
where
    R: Iterator<Item = Result<String, EncodeError>> + Send + 'a,
{
    ChunkStream::new(std::iter::once(Ok(header)).chain(rows))
}

/// Text of an optional string cell.
pub(crate) fn opt_cell(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}
