//! Schema bundle - versioned snapshot of the entity metadata.

use super::{EntityDef, RelationDef};
use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A versioned snapshot of every entity and relation the engine may query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaBundle {
    /// Schema version.
    pub version: u64,
    /// Entity definitions keyed by name.
    pub entities: HashMap<String, EntityDef>,
    /// Relation definitions, owned by their `from_entity`.
    pub relations: Vec<RelationDef>,
}

impl SchemaBundle {
    /// Create an empty schema bundle.
    pub fn new(version: u64) -> Self {
        Self {
            version,
            entities: HashMap::new(),
            relations: Vec::new(),
        }
    }

    /// Add an entity to the schema.
    pub fn with_entity(mut self, entity: EntityDef) -> Self {
        self.entities.insert(entity.name.clone(), entity);
        self
    }

    /// Add a relation to the schema.
    pub fn with_relation(mut self, relation: RelationDef) -> Self {
        self.relations.push(relation);
        self
    }

    /// Get an entity by name.
    pub fn get_entity(&self, name: &str) -> Option<&EntityDef> {
        self.entities.get(name)
    }

    /// Get a relation by owning entity and name.
    pub fn get_relation(&self, entity: &str, name: &str) -> Option<&RelationDef> {
        self.relations
            .iter()
            .find(|r| r.from_entity == entity && r.name == name)
    }

    /// Get all relations for an entity (as source).
    pub fn relations_from(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.from_entity == entity)
            .collect()
    }

    /// Get all relations to an entity (as target).
    pub fn relations_to(&self, entity: &str) -> Vec<&RelationDef> {
        self.relations
            .iter()
            .filter(|r| r.to_entity == entity)
            .collect()
    }

    /// List all entity names.
    pub fn entity_names(&self) -> Vec<&str> {
        self.entities.keys().map(|s| s.as_str()).collect()
    }

    /// Check internal consistency.
    ///
    /// Every entity must declare its identity field and have unique
    /// attribute names (fields and relations share one namespace). Every
    /// relation must connect known entities through known fields.
    pub fn validate(&self) -> Result<(), Error> {
        for (key, entity) in &self.entities {
            if key != &entity.name {
                return Err(Error::InvalidSchema(format!(
                    "entity registered as `{}` is named `{}`",
                    key, entity.name
                )));
            }
            if entity.identity().is_none() {
                return Err(Error::InvalidSchema(format!(
                    "entity `{}` lacks identity field `{}`",
                    entity.name, entity.identity_field
                )));
            }
            let mut names = HashSet::new();
            let attribute_names = entity
                .fields
                .iter()
                .map(|f| f.name.as_str())
                .chain(self.relations_from(&entity.name).into_iter().map(|r| r.name.as_str()));
            for name in attribute_names {
                if !names.insert(name) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate attribute `{}` on entity `{}`",
                        name, entity.name
                    )));
                }
            }
        }

        for relation in &self.relations {
            let from = self.get_entity(&relation.from_entity).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "relation `{}` starts at unknown entity `{}`",
                    relation.name, relation.from_entity
                ))
            })?;
            let to = self.get_entity(&relation.to_entity).ok_or_else(|| {
                Error::InvalidSchema(format!(
                    "relation `{}` targets unknown entity `{}`",
                    relation.name, relation.to_entity
                ))
            })?;
            if from.field(&relation.from_field).is_none() {
                return Err(Error::InvalidSchema(format!(
                    "relation `{}.{}` joins on unknown field `{}`",
                    from.name, relation.name, relation.from_field
                )));
            }
            if to.field(&relation.to_field).is_none() {
                return Err(Error::InvalidSchema(format!(
                    "relation `{}.{}` joins on unknown field `{}.{}`",
                    from.name, relation.name, to.name, relation.to_field
                )));
            }
        }
        Ok(())
    }

    /// Serialize the schema bundle to JSON.
    pub fn to_json(&self) -> Result<String, Error> {
        serde_json::to_string(self).map_err(|e| Error::InvalidSchema(e.to_string()))
    }

    /// Deserialize a schema bundle from JSON.
    pub fn from_json(json: &str) -> Result<Self, Error> {
        serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))
    }
}

impl Default for SchemaBundle {
    fn default() -> Self {
        Self::new(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{FieldDef, FieldType, ScalarType};

    fn sample_schema() -> SchemaBundle {
        let user = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("email", FieldType::scalar(ScalarType::String)));

        let todo = EntityDef::new("Todo", "id")
            .with_field(FieldDef::new("id", FieldType::scalar(ScalarType::Int64)))
            .with_field(FieldDef::new("name", FieldType::scalar(ScalarType::String)))
            .with_field(FieldDef::optional(
                "user_id",
                FieldType::scalar(ScalarType::Int64),
            ));

        SchemaBundle::new(1)
            .with_entity(user)
            .with_entity(todo)
            .with_relation(RelationDef::one_to_many("todos", "User", "id", "Todo", "user_id"))
    }

    #[test]
    fn test_schema_bundle_builder() {
        let schema = sample_schema();

        assert_eq!(schema.version, 1);
        assert_eq!(schema.entities.len(), 2);
        assert_eq!(schema.relations.len(), 1);
        assert!(schema.validate().is_ok());
    }

    #[test]
    fn test_relation_lookup() {
        let schema = sample_schema();

        assert!(schema.get_relation("User", "todos").is_some());
        assert!(schema.get_relation("Todo", "todos").is_none());
        assert_eq!(schema.relations_from("User").len(), 1);
        assert_eq!(schema.relations_to("Todo").len(), 1);
    }

    #[test]
    fn test_validate_unknown_join_field() {
        let schema = sample_schema().with_relation(RelationDef::many_to_one(
            "owner", "Todo", "owner_id", "User", "id",
        ));
        assert!(matches!(schema.validate(), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_duplicate_attribute() {
        let schema = sample_schema().with_relation(RelationDef::one_to_many(
            "email", "User", "id", "Todo", "user_id",
        ));
        assert!(matches!(schema.validate(), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_validate_missing_identity() {
        let schema =
            SchemaBundle::new(1).with_entity(EntityDef::new("Address", "id").with_field(
                FieldDef::new("city", FieldType::scalar(ScalarType::String)),
            ));
        assert!(matches!(schema.validate(), Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn test_json_roundtrip() {
        let schema = sample_schema();
        let json = schema.to_json().unwrap();
        let decoded = SchemaBundle::from_json(&json).unwrap();

        assert_eq!(schema, decoded);
    }
}
