//! Per-entity query surface.
//!
//! A [`Repository`] fixes the root entity, so bodies only state clauses.
//! The `*_by` methods map rows to the entity itself; the `*_as` variants
//! map them to any [`FromRow`] type the body's selection produces.

use std::marker::PhantomData;

use criteria_core::query::Numeric;
use criteria_core::{
    Attr, Entity, Error, FromRow, MutationExecutor, OrderKey, PageResult, PageSpec, Provider,
    QueryExecutor, Root, Update,
};

use crate::Engine;

/// Queries and bulk mutations on entity `E` through one provider.
pub struct Repository<'a, E, P: ?Sized> {
    engine: &'a Engine,
    provider: &'a P,
    _entity: PhantomData<fn() -> E>,
}

impl<'a, E: Entity, P: Provider + ?Sized> Repository<'a, E, P> {
    pub(crate) fn new(engine: &'a Engine, provider: &'a P) -> Self {
        Self {
            engine,
            provider,
            _entity: PhantomData,
        }
    }

    fn query(&self) -> QueryExecutor<'a, P> {
        self.engine.query(self.provider)
    }

    fn mutations(&self) -> MutationExecutor<'a, P> {
        self.engine.mutations(self.provider)
    }

    /// Every matching entity.
    pub fn find_all_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Vec<E>, Error> {
        self.query().all(body)
    }

    /// Every matching row, mapped to the selection type `R`.
    pub fn find_all_as<R: FromRow>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Vec<R>, Error> {
        self.query().all(body)
    }

    /// Every matching entity, ordered by `sort` first.
    pub fn find_all_sorted_by(
        &self,
        sort: &[OrderKey],
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<Vec<E>, Error> {
        self.query().all_sorted(sort, body)
    }

    /// The only matching entity.
    ///
    /// Fails with [`Error::NoResult`] or [`Error::NonUniqueResult`].
    pub fn find_one_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<E, Error> {
        self.query().one(body)
    }

    /// The only matching row, mapped to `R`.
    pub fn find_one_as<R: FromRow>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<R, Error> {
        self.query().one(body)
    }

    /// The first matching entity, if any.
    pub fn find_first_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Option<E>, Error> {
        self.query().first(body)
    }

    /// The first matching row mapped to `R`, if any.
    pub fn find_first_as<R: FromRow>(
        &self,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<Option<R>, Error> {
        self.query().first(body)
    }

    /// Check if any entity matches.
    pub fn exists_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<bool, Error> {
        self.query().exists(body)
    }

    /// Count matching entities.
    pub fn count_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<u64, Error> {
        self.query().count(body)
    }

    /// One page of matching entities.
    pub fn pages_by(
        &self,
        page: PageSpec,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, E, P>, Error> {
        self.query().pages(page, body)
    }

    /// One page of matching rows, mapped to `R`.
    pub fn pages_as<R: FromRow>(
        &self,
        page: PageSpec,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, R, P>, Error> {
        self.query().pages(page, body)
    }

    /// The first page with the configured default size.
    pub fn pages_by_default(
        &self,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, E, P>, Error> {
        self.pages_by(self.engine.config().default_page(), body)
    }

    /// One page of matching entities, ordered by a numeric attribute first.
    pub fn pages_sorted_by<N: Numeric>(
        &self,
        sort: Attr<E, N>,
        page: PageSpec,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, E, P>, Error> {
        self.query().pages_sorted(sort, page, body)
    }

    /// Bulk update; returns the number of affected rows.
    pub fn update_by(&self, body: impl FnOnce(&Update<'_, E>)) -> Result<u64, Error> {
        self.mutations().update(body)
    }

    /// Bulk delete; returns the number of affected rows.
    pub fn delete_by(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<u64, Error> {
        self.mutations().delete(body)
    }
}
