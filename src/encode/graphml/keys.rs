//! GraphML `<key>` declarations.

use std::collections::HashMap;
use std::fmt::Write;

use crate::encode::fields::{sha1_hex, Field, KeyType};
use crate::encode::xml::escape_attr;

/// Element a key applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Domain {
    /// `<node>`
    Node,
    /// `<edge>`
    Edge,
    /// `<graph>`
    Graph,
}

impl Domain {
    /// GraphML `for` value.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Node => "node",
            Self::Edge => "edge",
            Self::Graph => "graph",
        }
    }
}

/// A key definition accumulated over every observed field.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyDef {
    /// Key id.
    pub id: String,
    /// `attr.name`.
    pub name: String,
    key_type: Option<KeyType>,
    first: Domain,
    domains: Vec<Domain>,
}

impl KeyDef {
    /// Merged `attr.type`; keys with no observed value are strings.
    pub fn attr_type(&self) -> KeyType {
        self.key_type.unwrap_or(KeyType::String)
    }

    /// `for` value: the single domain, or `all` when shared.
    pub fn scope(&self) -> &'static str {
        if self.domains.len() > 1 {
            "all"
        } else {
            self.first.as_str()
        }
    }
}

/// Registry of keys, each declared exactly once.
///
/// A field whose id is already declared under a different name gets its
/// own key, with the SHA-1 of id and name as the key id.
#[derive(Debug, Clone, Default)]
pub struct KeyRegistry {
    keys: Vec<KeyDef>,
    index: HashMap<String, usize>,
    aliases: HashMap<(String, String), String>,
}

impl KeyRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a field observed in a domain.
    pub fn observe(&mut self, domain: Domain, field: &Field) {
        let id = self.assign_id(field);
        match self.index.get(&id) {
            Some(&i) => {
                let key = &mut self.keys[i];
                key.key_type = match (key.key_type, field.key_type) {
                    (Some(a), Some(b)) => Some(a.merge(b)),
                    (a, b) => a.or(b),
                };
                if !key.domains.contains(&domain) {
                    key.domains.push(domain);
                }
            }
            None => {
                self.index.insert(id.clone(), self.keys.len());
                self.keys.push(KeyDef {
                    id,
                    name: field.name.clone(),
                    key_type: field.key_type,
                    first: domain,
                    domains: vec![domain],
                });
            }
        }
    }

    fn assign_id(&mut self, field: &Field) -> String {
        match self.index.get(&field.id) {
            Some(&i) if self.keys[i].name != field.name => self
                .aliases
                .entry((field.id.clone(), field.name.clone()))
                .or_insert_with(|| sha1_hex(&format!("{}\u{0}{}", field.id, field.name)))
                .clone(),
            _ => field.id.clone(),
        }
    }

    /// Key id a field's `<data>` element refers to.
    pub fn id_for<'f>(&'f self, field: &'f Field) -> &'f str {
        if self.aliases.is_empty() {
            return &field.id;
        }
        self.aliases
            .get(&(field.id.clone(), field.name.clone()))
            .map(String::as_str)
            .unwrap_or(&field.id)
    }

    /// Look up a key by id.
    pub fn get(&self, id: &str) -> Option<&KeyDef> {
        self.index.get(id).map(|&i| &self.keys[i])
    }

    /// Number of declared keys.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no keys were declared.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Render the `<key>` elements first seen in a domain.
    pub fn render(&self, domain: Domain) -> String {
        let mut out = String::new();
        for key in self.keys.iter().filter(|k| k.first == domain) {
            let _ = writeln!(
                out,
                "  <key id=\"{}\" for=\"{}\" attr.name=\"{}\" attr.type=\"{}\"/>",
                escape_attr(&key.id),
                key.scope(),
                escape_attr(&key.name),
                key.attr_type().as_str(),
            );
        }
        out
    }
}
