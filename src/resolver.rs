//! Codebook type resolution.
//!
//! Maps an opaque variable id on an entity to its declared name, type and
//! options. Lookups never fail: a variable missing from the codebook (for
//! example one added after the codebook changed) resolves to `None`, and
//! callers fall back to the raw identifier encoded as text.

use crate::types::{CategoryOption, Codebook, EntityKind, VariableType};

/// Declared name of a variable.
pub fn resolve_name<'a>(
    codebook: &'a Codebook,
    kind: EntityKind,
    entity_type: &str,
    variable_id: &str,
) -> Option<&'a str> {
    codebook
        .variable(kind, entity_type, variable_id)
        .map(|variable| variable.name.as_str())
}

/// Declared encoding type of a variable.
pub fn resolve_type<'a>(
    codebook: &'a Codebook,
    kind: EntityKind,
    entity_type: &str,
    variable_id: &str,
) -> Option<VariableType<'a>> {
    codebook
        .variable(kind, entity_type, variable_id)
        .map(|variable| variable.variable_type())
}

/// Declared options of a variable; empty when absent.
pub fn resolve_options<'a>(
    codebook: &'a Codebook,
    kind: EntityKind,
    entity_type: &str,
    variable_id: &str,
) -> &'a [CategoryOption] {
    codebook
        .variable(kind, entity_type, variable_id)
        .map(|variable| variable.options.as_slice())
        .unwrap_or(&[])
}

/// Human-readable name of an entity type, falling back to the type key.
pub fn resolve_entity_name<'a>(
    codebook: &'a Codebook,
    kind: EntityKind,
    entity_type: &'a str,
) -> &'a str {
    codebook
        .entity(kind, entity_type)
        .and_then(|definition| definition.name.as_deref())
        .unwrap_or(entity_type)
}
