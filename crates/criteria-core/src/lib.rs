//! Criteria Core - catalog, typed query builder and executors.
//!
//! This crate turns query closures written against typed attribute
//! descriptors into the provider IR of [`criteria_proto`], runs them through
//! a [`Provider`] and maps the rows into entities, scalars or tuples.

pub mod catalog;
pub mod config;
pub mod entity;
pub mod error;
pub mod mutation;
pub mod provider;
pub mod query;

#[cfg(test)]
mod test_support;

pub use catalog::{
    Attribute, Cardinality, Catalog, EntityDef, FieldDef, FieldType, RelationDef, ScalarType,
    SchemaBundle,
};
pub use config::{EngineConfig, DEFAULT_MAX_PAGE_SIZE, DEFAULT_PAGE_SIZE};
pub use entity::Entity;
pub use error::Error;
pub use mutation::{MutationExecutor, Update};
pub use provider::{MemoryProvider, Provider};
pub use query::{
    Attr, Expr, FromRow, Join, OrderKey, PageResult, PageSpec, Path, PreparedQuery,
    QueryExecutor, Rel, Root,
};

/// Re-export protocol types.
pub use criteria_proto as proto;
