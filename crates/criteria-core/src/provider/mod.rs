//! The persistence boundary.
//!
//! The engine hands compiled queries and mutations to a [`Provider`] and
//! maps the rows it returns. Provider errors pass through unchanged as
//! [`Error::Provider`](crate::Error::Provider).

mod eval;
mod memory;

pub use eval::Evaluator;
pub use memory::MemoryProvider;

use criteria_proto::{CompiledQuery, Error, Mutation, MutationResult, Pagination, Row};

/// Executes compiled queries and bulk mutations against a store.
pub trait Provider {
    /// Return the rows a query selects, in order, after pagination.
    fn fetch(&self, query: &CompiledQuery) -> Result<Vec<Row>, Error>;

    /// Count the rows a query selects.
    fn count(&self, query: &CompiledQuery) -> Result<u64, Error>;

    /// Check if a query selects at least one row.
    fn exists(&self, query: &CompiledQuery) -> Result<bool, Error> {
        let mut probe = query.clone();
        probe.pagination = Some(Pagination::limit(1));
        Ok(!self.fetch(&probe)?.is_empty())
    }

    /// Apply a bulk update or delete; returns the affected row count.
    fn execute(&self, mutation: &Mutation) -> Result<MutationResult, Error>;
}

impl<P: Provider + ?Sized> Provider for &P {
    fn fetch(&self, query: &CompiledQuery) -> Result<Vec<Row>, Error> {
        (**self).fetch(query)
    }

    fn count(&self, query: &CompiledQuery) -> Result<u64, Error> {
        (**self).count(query)
    }

    fn exists(&self, query: &CompiledQuery) -> Result<bool, Error> {
        (**self).exists(query)
    }

    fn execute(&self, mutation: &Mutation) -> Result<MutationResult, Error> {
        (**self).execute(mutation)
    }
}
