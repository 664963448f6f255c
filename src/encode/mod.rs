//! Encoders: partitioned networks to GraphML and CSV text.
//!
//! Each encoder consumes one [`PartitionedNetwork`] plus its protocol's
//! codebook and produces a lazy [`ChunkStream`]. Encoders share attribute
//! expansion through [`fields`].

pub mod stream;
pub mod fields;
pub mod xml;
pub mod graphml;
pub mod csv;

pub use stream::{ChunkStream, StopHandle};
pub use fields::{expand_attribute, Field, KeyType};
pub use graphml::GraphMlEncoder;
pub use csv::{AdjacencyMatrixEncoder, AttributeListEncoder, EdgeListEncoder, EgoListEncoder};

use thiserror::Error;

use crate::pipeline::PartitionedNetwork;
use crate::types::{Codebook, ExportFormat, ExportOptions};

/// Default number of entities per GraphML chunk.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Errors from encoding a partition.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// An attribute value does not match its declared type.
    #[error("malformed value for {variable} on {entity}: {reason}")]
    MalformedAttribute {
        /// Entity primary key.
        entity: String,
        /// Variable id.
        variable: String,
        /// What was wrong.
        reason: String,
    },

    /// The stream was stopped before completion.
    #[error("encoding stopped")]
    Stopped,

    /// Writing encoded output failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Screen dimensions for layout coordinate conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenSize {
    /// Width in pixels.
    pub width: f64,
    /// Height in pixels.
    pub height: f64,
}

/// Encoder settings derived from [`ExportOptions`].
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeSettings {
    /// Emit directed edges.
    pub directed: bool,
    /// Emit the `nc:` namespace and provenance attributes.
    pub include_nc_meta: bool,
    /// Convert layout values to screen space; `None` keeps them normalized.
    pub screen_layout: Option<ScreenSize>,
    /// Entities per GraphML chunk.
    pub batch_size: usize,
}

impl Default for EncodeSettings {
    fn default() -> Self {
        Self::from_options(&ExportOptions::default(), DEFAULT_BATCH_SIZE)
    }
}

impl EncodeSettings {
    /// Derive settings from export options.
    pub fn from_options(options: &ExportOptions, batch_size: usize) -> Self {
        let global = &options.global_options;
        Self {
            directed: global.use_directed_edges,
            include_nc_meta: options.include_nc_meta,
            screen_layout: global.use_screen_layout_coordinates.then_some(ScreenSize {
                width: global.screen_layout_width,
                height: global.screen_layout_height,
            }),
            batch_size: batch_size.max(1),
        }
    }

    /// Builder-style directed setter.
    pub fn with_directed(mut self, directed: bool) -> Self {
        self.directed = directed;
        self
    }
}

/// A format encoder.
pub trait Encoder: Send + Sync {
    /// Format this encoder produces.
    fn format(&self) -> ExportFormat;

    /// Lazily encode one partition.
    fn encode<'a>(
        &self,
        partition: &'a PartitionedNetwork,
        codebook: &'a Codebook,
        settings: &'a EncodeSettings,
    ) -> ChunkStream<'a>;
}

/// Encoder for a format.
pub fn encoder_for(format: ExportFormat) -> &'static dyn Encoder {
    match format {
        ExportFormat::GraphMl => &GraphMlEncoder,
        ExportFormat::EgoList => &EgoListEncoder,
        ExportFormat::AttributeList => &AttributeListEncoder,
        ExportFormat::EdgeList => &EdgeListEncoder,
        ExportFormat::AdjacencyMatrix => &AdjacencyMatrixEncoder,
    }
}

/// Encode one partition in the given format.
pub fn encode<'a>(
    format: ExportFormat,
    partition: &'a PartitionedNetwork,
    codebook: &'a Codebook,
    settings: &'a EncodeSettings,
) -> ChunkStream<'a> {
    encoder_for(format).encode(partition, codebook, settings)
}
