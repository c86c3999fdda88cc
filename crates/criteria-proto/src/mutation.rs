//! Bulk mutation IR.

use crate::query::Predicate;
use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A bulk write over every row of an entity matching a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Mutation {
    /// Assign new values to matching rows.
    Update {
        /// Entity type to update.
        entity: String,
        /// Assignments, unique per field.
        assignments: Vec<FieldValue>,
        /// Row filter over alias `0`; `None` updates every row.
        filter: Option<Predicate>,
        /// Bound parameters.
        parameters: Vec<(String, Value)>,
    },
    /// Remove matching rows.
    Delete {
        /// Entity type to delete from.
        entity: String,
        /// Row filter over alias `0`; `None` deletes every row.
        filter: Option<Predicate>,
        /// Bound parameters.
        parameters: Vec<(String, Value)>,
    },
}

/// A field name and value pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue {
    /// Field name.
    pub field: String,
    /// Field value.
    pub value: Value,
}

impl FieldValue {
    /// Create a new field-value pair.
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

impl Mutation {
    /// Create an update mutation.
    pub fn update(
        entity: impl Into<String>,
        assignments: Vec<FieldValue>,
        filter: Option<Predicate>,
    ) -> Self {
        Mutation::Update {
            entity: entity.into(),
            assignments,
            filter,
            parameters: vec![],
        }
    }

    /// Create a delete mutation.
    pub fn delete(entity: impl Into<String>, filter: Option<Predicate>) -> Self {
        Mutation::Delete {
            entity: entity.into(),
            filter,
            parameters: vec![],
        }
    }

    /// Bind parameters used by the filter.
    pub fn with_parameters(mut self, bound: Vec<(String, Value)>) -> Self {
        match &mut self {
            Mutation::Update { parameters, .. } | Mutation::Delete { parameters, .. } => {
                *parameters = bound;
            }
        }
        self
    }

    /// Get the entity type this mutation operates on.
    pub fn entity(&self) -> &str {
        match self {
            Mutation::Update { entity, .. } => entity,
            Mutation::Delete { entity, .. } => entity,
        }
    }

    /// Get the row filter.
    pub fn filter(&self) -> Option<&Predicate> {
        match self {
            Mutation::Update { filter, .. } | Mutation::Delete { filter, .. } => filter.as_ref(),
        }
    }

    /// Get the bound parameters.
    pub fn parameters(&self) -> &[(String, Value)] {
        match self {
            Mutation::Update { parameters, .. } | Mutation::Delete { parameters, .. } => {
                parameters
            }
        }
    }
}
