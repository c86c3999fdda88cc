//! Field definitions for entities.

use super::types::FieldType;
use serde::{Deserialize, Serialize};

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name.
    pub name: String,
    /// Field data type.
    pub field_type: FieldType,
    /// Whether the field rejects null.
    pub required: bool,
}

impl FieldDef {
    /// Create a new required field.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        let required = !field_type.is_nullable();
        Self {
            name: name.into(),
            field_type,
            required,
        }
    }

    /// Create an optional field; scalar and enum types become nullable.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into_optional(),
            required: false,
        }
    }

    /// Check if the field may hold null.
    pub fn is_nullable(&self) -> bool {
        !self.required || self.field_type.is_nullable()
    }
}
