//! Entity definitions.

use super::field::FieldDef;
use serde::{Deserialize, Serialize};

/// Metadata of one persisted entity type.
///
/// Fields keep their declaration order; relations live on the
/// [`SchemaBundle`](super::SchemaBundle) and share the field namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDef {
    /// Entity name, matching [`Entity::NAME`](crate::Entity::NAME).
    pub name: String,
    /// Name of the field that identifies a row.
    pub identity_field: String,
    /// Stored fields.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Start a definition with no fields.
    pub fn new(name: impl Into<String>, identity_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            identity_field: identity_field.into(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Append several fields in order.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Look up a stored field.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The identity field, if it is declared.
    pub fn identity(&self) -> Option<&FieldDef> {
        self.field(&self.identity_field)
    }

    /// Names of fields that reject null.
    pub fn required_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name.as_str())
    }
}
