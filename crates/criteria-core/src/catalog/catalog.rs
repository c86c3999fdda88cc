//! Immutable catalog of entity metadata.

use super::{EntityDef, FieldDef, RelationDef, SchemaBundle};
use crate::error::Error;

/// A named attribute of an entity: either a stored field or a relation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Attribute<'a> {
    /// Stored field.
    Field(&'a FieldDef),
    /// Relation to another entity.
    Relation(&'a RelationDef),
}

/// Validated, read-only entity metadata.
///
/// Built once from a [`SchemaBundle`]; lookups never change afterwards, so
/// a catalog can be shared freely between threads.
#[derive(Debug, Clone)]
pub struct Catalog {
    schema: SchemaBundle,
}

impl Catalog {
    /// Validate a schema bundle and build a catalog from it.
    pub fn new(schema: SchemaBundle) -> Result<Self, Error> {
        schema.validate()?;
        tracing::debug!(
            version = schema.version,
            entities = schema.entities.len(),
            relations = schema.relations.len(),
            "Catalog loaded"
        );
        Ok(Self { schema })
    }

    /// Schema version.
    pub fn version(&self) -> u64 {
        self.schema.version
    }

    /// Underlying schema bundle.
    pub fn schema(&self) -> &SchemaBundle {
        &self.schema
    }

    /// Get an entity definition.
    pub fn entity(&self, name: &str) -> Result<&EntityDef, Error> {
        self.schema
            .get_entity(name)
            .ok_or_else(|| Error::UnknownEntity(name.to_string()))
    }

    /// Get a relation owned by `entity`.
    pub fn relation(&self, entity: &str, name: &str) -> Option<&RelationDef> {
        self.schema.get_relation(entity, name)
    }

    /// Resolve an attribute name on an entity.
    pub fn attribute(&self, entity: &str, name: &str) -> Option<Attribute<'_>> {
        let def = self.schema.get_entity(entity)?;
        if let Some(field) = def.field(name) {
            return Some(Attribute::Field(field));
        }
        self.relation(entity, name).map(Attribute::Relation)
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.schema.entity_names()
    }
}
