//! Codebook-driven expansion of entity attributes into output fields.
//!
//! Every encoder funnels attribute values through [`expand_attribute`],
//! which holds the single exhaustive match over [`VariableType`].

use serde_json::Value;
use sha1::{Digest, Sha1};

use crate::resolver::{resolve_name, resolve_type};
use crate::types::{Codebook, EntityKind, VariableType};

use super::xml::is_nmtoken;
use super::{EncodeError, EncodeSettings};

/// GraphML `attr.type` of a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyType {
    /// `boolean`
    Boolean,
    /// `int`
    Int,
    /// `double`
    Double,
    /// `string`
    String,
}

impl KeyType {
    /// GraphML attribute type name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Int => "int",
            Self::Double => "double",
            Self::String => "string",
        }
    }

    /// Widen two observed types to one that holds both.
    pub fn merge(self, other: KeyType) -> KeyType {
        match (self, other) {
            (a, b) if a == b => a,
            (Self::Int, Self::Double) | (Self::Double, Self::Int) => Self::Double,
            _ => Self::String,
        }
    }
}

/// One expanded output field of an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// GraphML key id; always an NMTOKEN.
    pub id: String,
    /// Human-readable name; GraphML `attr.name` and CSV column header.
    pub name: String,
    /// Type implied by this field; `None` when nothing was observed.
    pub key_type: Option<KeyType>,
    /// Rendered value; `None` for null.
    pub value: Option<String>,
}

impl Field {
    fn new(id: String, name: String, key_type: Option<KeyType>, value: Option<String>) -> Self {
        Self {
            id,
            name,
            key_type,
            value,
        }
    }
}

/// SHA-1 hex digest of an identifier.
pub fn sha1_hex(value: &str) -> String {
    hex::encode(Sha1::digest(value.as_bytes()))
}

/// NMTOKEN-safe key id for an identifier.
pub fn key_id(raw: &str) -> String {
    if is_nmtoken(raw) {
        raw.to_string()
    } else {
        sha1_hex(raw)
    }
}

/// Render a JSON value as text. Arrays and objects become compact JSON.
pub fn render_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => Some(value.to_string()),
    }
}

fn render_numeric(value: &Value) -> (Option<KeyType>, Option<String>) {
    match value {
        Value::Null => (None, None),
        Value::Number(n) if n.is_i64() || n.is_u64() => (Some(KeyType::Int), Some(n.to_string())),
        Value::Number(n) => match n.as_f64() {
            Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => {
                (Some(KeyType::Int), Some(format!("{}", f as i64)))
            }
            _ => (Some(KeyType::Double), Some(n.to_string())),
        },
        Value::String(s) if s.parse::<i64>().is_ok() => (Some(KeyType::Int), Some(s.clone())),
        Value::String(s) if s.parse::<f64>().map_or(false, f64::is_finite) => {
            (Some(KeyType::Double), Some(s.clone()))
        }
        other => (Some(KeyType::String), render_value(other)),
    }
}

fn format_coordinate(value: f64) -> String {
    format!("{value}")
}

fn layout_fields(
    id: &str,
    name: &str,
    entity_uid: &str,
    variable_id: &str,
    value: &Value,
    settings: &EncodeSettings,
) -> Result<Vec<Field>, EncodeError> {
    let coordinates = match value {
        Value::Null => None,
        Value::Object(map) => match (
            map.get("x").and_then(Value::as_f64),
            map.get("y").and_then(Value::as_f64),
        ) {
            (Some(x), Some(y)) => Some((x, y)),
            _ => {
                return Err(EncodeError::MalformedAttribute {
                    entity: entity_uid.to_string(),
                    variable: variable_id.to_string(),
                    reason: "layout value must have numeric x and y".to_string(),
                })
            }
        },
        _ => {
            return Err(EncodeError::MalformedAttribute {
                entity: entity_uid.to_string(),
                variable: variable_id.to_string(),
                reason: "layout value must be an object".to_string(),
            })
        }
    };

    let (x, y) = match (coordinates, settings.screen_layout) {
        (Some((x, y)), Some(screen)) => (
            Some(format!("{:.2}", x * screen.width)),
            Some(format!("{:.2}", (1.0 - y) * screen.height)),
        ),
        (Some((x, y)), None) => (Some(format_coordinate(x)), Some(format_coordinate(y))),
        (None, _) => (None, None),
    };

    Ok(vec![
        Field::new(key_id(&format!("{id}_X")), format!("{name}_X"), Some(KeyType::Double), x),
        Field::new(key_id(&format!("{id}_Y")), format!("{name}_Y"), Some(KeyType::Double), y),
    ])
}

/// Expand one attribute of an entity into its output fields.
///
/// Unknown variables become a single text field whose key id is the SHA-1
/// of the variable id and whose name is the raw id. Categorical variables
/// always produce one boolean per option, even for null values. Layout
/// values that are not `{x, y}` objects are an error.
pub fn expand_attribute(
    codebook: &Codebook,
    kind: EntityKind,
    entity_type: &str,
    entity_uid: &str,
    variable_id: &str,
    value: &Value,
    settings: &EncodeSettings,
) -> Result<Vec<Field>, EncodeError> {
    let Some(variable_type) = resolve_type(codebook, kind, entity_type, variable_id) else {
        return Ok(vec![Field::new(
            sha1_hex(variable_id),
            variable_id.to_string(),
            Some(KeyType::String),
            render_value(value),
        )]);
    };
    let name = resolve_name(codebook, kind, entity_type, variable_id).unwrap_or(variable_id);
    let id = key_id(variable_id);

    let fields = match variable_type {
        VariableType::Boolean => {
            let value = match value {
                Value::Bool(b) => Some(b.to_string()),
                other => render_value(other),
            };
            vec![Field::new(id, name.to_string(), Some(KeyType::Boolean), value)]
        }
        VariableType::Text | VariableType::Datetime => {
            vec![Field::new(id, name.to_string(), Some(KeyType::String), render_value(value))]
        }
        VariableType::Number | VariableType::Ordinal => {
            let (key_type, value) = render_numeric(value);
            vec![Field::new(id, name.to_string(), key_type, value)]
        }
        VariableType::Categorical(options) => options
            .iter()
            .map(|option| {
                let suffix = option.value_key();
                Field::new(
                    key_id(&format!("{variable_id}_{suffix}")),
                    format!("{name}_{suffix}"),
                    Some(KeyType::Boolean),
                    Some(option.is_selected_by(value).to_string()),
                )
            })
            .collect(),
        VariableType::Layout => {
            return layout_fields(&id, name, entity_uid, variable_id, value, settings)
        }
    };
    Ok(fields)
}

/// Expand every attribute of an entity, in attribute key order.
pub fn expand_attributes<'a>(
    codebook: &Codebook,
    kind: EntityKind,
    entity_type: &str,
    entity_uid: &str,
    attributes: impl IntoIterator<Item = (&'a String, &'a Value)>,
    settings: &EncodeSettings,
) -> Result<Vec<Field>, EncodeError> {
    let mut fields = Vec::new();
    for (variable_id, value) in attributes {
        fields.extend(expand_attribute(
            codebook,
            kind,
            entity_type,
            entity_uid,
            variable_id,
            value,
            settings,
        )?);
    }
    Ok(fields)
}
