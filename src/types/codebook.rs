//! Codebook types: the per-protocol schema of entity types and variables.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use super::entity::EntityKind;

/// Per-protocol schema, `entityKind -> typeKey -> definition`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Codebook {
    /// Node type definitions.
    #[serde(default)]
    pub node: BTreeMap<String, EntityDefinition>,
    /// Edge type definitions.
    #[serde(default)]
    pub edge: BTreeMap<String, EntityDefinition>,
    /// Ego type definitions.
    #[serde(default)]
    pub ego: BTreeMap<String, EntityDefinition>,
}

impl Codebook {
    /// Definitions for one entity kind.
    pub fn definitions(&self, kind: EntityKind) -> &BTreeMap<String, EntityDefinition> {
        match kind {
            EntityKind::Node => &self.node,
            EntityKind::Edge => &self.edge,
            EntityKind::Ego => &self.ego,
        }
    }

    /// Look up an entity type definition.
    pub fn entity(&self, kind: EntityKind, entity_type: &str) -> Option<&EntityDefinition> {
        self.definitions(kind).get(entity_type)
    }

    /// Look up a variable definition.
    pub fn variable(
        &self,
        kind: EntityKind,
        entity_type: &str,
        variable_id: &str,
    ) -> Option<&VariableDefinition> {
        self.entity(kind, entity_type)?.variables.get(variable_id)
    }
}

/// Definition of a single entity type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    /// Human-readable type name.
    #[serde(default)]
    pub name: Option<String>,
    /// Variables keyed by variable id.
    #[serde(default)]
    pub variables: BTreeMap<String, VariableDefinition>,
}

/// Declared type of a variable, as written in the codebook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableKind {
    /// True/false.
    Boolean,
    /// Free text.
    Text,
    /// Numeric value.
    Number,
    /// Date or time string.
    Datetime,
    /// Single choice from ordered options.
    Ordinal,
    /// Multiple choice from options.
    Categorical,
    /// Normalized `{x, y}` position.
    Layout,
    /// Any type this exporter does not know; encoded as text.
    #[serde(other)]
    Other,
}

/// One selectable option of an ordinal or categorical variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryOption {
    /// Stored value.
    pub value: Value,
    /// Display label.
    #[serde(default)]
    pub label: Option<String>,
}

impl CategoryOption {
    /// Create an option with a value and no label.
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            label: None,
        }
    }

    /// The option value as it appears in expanded field names.
    pub fn value_key(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Whether a stored attribute value selects this option.
    ///
    /// Categorical values are arrays of selected option values; a scalar is
    /// treated as a single selection.
    pub fn is_selected_by(&self, value: &Value) -> bool {
        match value {
            Value::Array(selected) => selected.contains(&self.value),
            Value::Null => false,
            scalar => scalar == &self.value,
        }
    }
}

/// Definition of a single variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableDefinition {
    /// Human-readable variable name.
    pub name: String,
    /// Declared type.
    #[serde(rename = "type")]
    pub kind: VariableKind,
    /// Options for ordinal and categorical variables.
    #[serde(default)]
    pub options: Vec<CategoryOption>,
}

impl VariableDefinition {
    /// Create a variable definition without options.
    pub fn new(name: impl Into<String>, kind: VariableKind) -> Self {
        Self {
            name: name.into(),
            kind,
            options: Vec::new(),
        }
    }

    /// Builder-style options setter.
    pub fn with_options(mut self, options: Vec<CategoryOption>) -> Self {
        self.options = options;
        self
    }

    /// Resolve the closed encoding type of this variable.
    pub fn variable_type(&self) -> VariableType<'_> {
        match self.kind {
            VariableKind::Boolean => VariableType::Boolean,
            VariableKind::Text | VariableKind::Other => VariableType::Text,
            VariableKind::Number => VariableType::Number,
            VariableKind::Datetime => VariableType::Datetime,
            VariableKind::Ordinal => VariableType::Ordinal,
            VariableKind::Categorical => VariableType::Categorical(&self.options),
            VariableKind::Layout => VariableType::Layout,
        }
    }
}

/// Closed set of encoding types every encoder dispatches on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VariableType<'a> {
    /// Literal boolean.
    Boolean,
    /// String.
    Text,
    /// Number; integer vs double is inferred from observed values.
    Number,
    /// Date/time string.
    Datetime,
    /// Ordinal value; typed like a number.
    Ordinal,
    /// Expanded into one boolean field per option.
    Categorical(&'a [CategoryOption]),
    /// Expanded into `_X` and `_Y` numeric fields.
    Layout,
}
