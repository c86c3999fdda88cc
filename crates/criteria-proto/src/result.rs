//! Rows and records returned by a provider.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// A materialized entity row: the entity name plus its field values in
/// catalog order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    /// Entity type name.
    pub entity: String,
    /// Field values.
    pub fields: Vec<(String, Value)>,
}

impl Record {
    /// Create an empty record.
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            fields: vec![],
        }
    }

    /// Add a field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(name, value);
        self
    }

    /// Get a field value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Set a field value, replacing an existing one.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        let name = name.into();
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some((_, slot)) => *slot = value,
            None => self.fields.push((name, value)),
        }
    }
}

/// One projected cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    /// Scalar value (possibly null).
    Value(Value),
    /// Whole entity; `None` when a LEFT join found no related row.
    Entity(Option<Record>),
}

impl Cell {
    /// Check if this cell holds nothing.
    pub fn is_null(&self) -> bool {
        match self {
            Cell::Value(v) => v.is_null(),
            Cell::Entity(e) => e.is_none(),
        }
    }
}

/// One result row: a cell per projected item.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Row {
    /// Cells in projection order.
    pub cells: Vec<Cell>,
}

impl Row {
    /// Create a row from cells.
    pub fn new(cells: Vec<Cell>) -> Self {
        Self { cells }
    }

    /// Number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Check if the row has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

/// Result of a mutation operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MutationResult {
    /// Number of entities affected.
    pub affected: u64,
}

impl MutationResult {
    /// Create a result for a bulk update or delete.
    pub fn affected(count: u64) -> Self {
        Self { affected: count }
    }
}
