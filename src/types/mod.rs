//! Input types: entities, sessions, codebooks and export options.

pub mod entity;
pub mod session;
pub mod codebook;
pub mod options;

pub use entity::{Attributes, Entity, EntityKind, EGO_TYPE};
pub use session::{Protocol, Session, SessionVariables};
pub use codebook::{
    CategoryOption, Codebook, EntityDefinition, VariableDefinition, VariableKind, VariableType,
};
pub use options::{CsvOptions, ExportFormat, ExportOptions, GlobalOptions, PartitionBy};
