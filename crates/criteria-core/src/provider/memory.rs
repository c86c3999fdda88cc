//! In-memory provider backed by per-entity record tables.

use std::collections::HashMap;

use criteria_proto::{CompiledQuery, Error, Mutation, MutationResult, Record, Row};
use parking_lot::RwLock;

use super::eval::{Evaluator, Tables};
use super::Provider;
use crate::catalog::Catalog;

/// A [`Provider`] that keeps records in memory and evaluates compiled
/// queries directly.
///
/// Reads share a lock; mutations take it exclusively, so a bulk update or
/// delete is atomic with respect to concurrent queries.
///
/// Evaluation scans whole tables and joins with nested loops, and DISTINCT
/// compares each row against every row kept so far. It suits tests and
/// small fixtures, not large data sets.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    tables: RwLock<Tables>,
}

impl MemoryProvider {
    /// Create an empty provider. Tables are created on first insert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a provider with an empty table for every catalog entity.
    pub fn for_catalog(catalog: &Catalog) -> Self {
        let tables = catalog
            .entity_names()
            .into_iter()
            .map(|name| (name.to_string(), Vec::new()))
            .collect::<HashMap<_, _>>();
        Self {
            tables: RwLock::new(tables),
        }
    }

    /// Insert a record into the table of its entity.
    pub fn insert(&self, record: Record) {
        self.tables
            .write()
            .entry(record.entity.clone())
            .or_default()
            .push(record);
    }

    /// Insert several records.
    pub fn insert_all(&self, records: impl IntoIterator<Item = Record>) {
        let mut tables = self.tables.write();
        for record in records {
            tables
                .entry(record.entity.clone())
                .or_default()
                .push(record);
        }
    }

    /// Snapshot the records of an entity, in insertion order.
    pub fn records(&self, entity: &str) -> Vec<Record> {
        self.tables.read().get(entity).cloned().unwrap_or_default()
    }

    /// Number of records of an entity.
    pub fn len(&self, entity: &str) -> usize {
        self.tables.read().get(entity).map_or(0, Vec::len)
    }

    /// Check if an entity has no records.
    pub fn is_empty(&self, entity: &str) -> bool {
        self.len(entity) == 0
    }

    /// Remove every record, keeping the tables.
    pub fn clear(&self) {
        for records in self.tables.write().values_mut() {
            records.clear();
        }
    }
}

impl Provider for MemoryProvider {
    fn fetch(&self, query: &CompiledQuery) -> Result<Vec<Row>, Error> {
        let tables = self.tables.read();
        let rows = Evaluator::new(&tables, &query.parameters).run(query)?;
        tracing::trace!(entity = %query.root_entity, rows = rows.len(), "Evaluated query");
        Ok(rows)
    }

    fn count(&self, query: &CompiledQuery) -> Result<u64, Error> {
        let tables = self.tables.read();
        let rows = Evaluator::new(&tables, &query.parameters).run(query)?;
        Ok(rows.len() as u64)
    }

    fn execute(&self, mutation: &Mutation) -> Result<MutationResult, Error> {
        let mut tables = self.tables.write();
        let entity = mutation.entity();

        // Select first, then write, so filters see the pre-mutation state
        let selected = {
            let records = tables
                .get(entity)
                .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
            let eval = Evaluator::new(&tables, mutation.parameters());
            let mut selected = Vec::new();
            for (i, record) in records.iter().enumerate() {
                let keep = match mutation.filter() {
                    None => true,
                    Some(filter) => eval.matches(filter, record)?,
                };
                if keep {
                    selected.push(i);
                }
            }
            selected
        };

        let records = tables
            .get_mut(entity)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))?;
        match mutation {
            Mutation::Update { assignments, .. } => {
                for &i in &selected {
                    for assignment in assignments {
                        records[i].set(assignment.field.clone(), assignment.value.clone());
                    }
                }
            }
            Mutation::Delete { .. } => {
                let mut index = 0;
                let mut next = selected.iter().peekable();
                records.retain(|_| {
                    let drop = next.peek().is_some_and(|&&i| i == index);
                    if drop {
                        next.next();
                    }
                    index += 1;
                    !drop
                });
            }
        }

        tracing::debug!(entity, affected = selected.len(), "Applied mutation");
        Ok(MutationResult::affected(selected.len() as u64))
    }
}
