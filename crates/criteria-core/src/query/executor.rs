//! Query executor: translates a body, runs it through the provider and maps
//! the rows.
//!
//! Every operation translates first, so path, type and projection errors
//! surface before the provider sees a query.

use std::fmt;

use criteria_proto::{CompiledQuery, Pagination, Projection, Row};
use serde::Serialize;
use tracing::{instrument, Level};

use super::builder::{Root, Scope};
use super::compiler::{Translation, Translator};
use super::pagination::{fetch_page, OrderKey, PageResult, PageSpec};
use super::path::{Attr, Numeric};
use super::projection::{FromRow, RowMapper};
use crate::catalog::{Attribute, Catalog};
use crate::config::EngineConfig;
use crate::entity::Entity;
use crate::error::Error;
use crate::provider::Provider;

/// A translated query and the mapper for its rows.
pub struct PreparedQuery<R> {
    query: CompiledQuery,
    mapper: RowMapper<R>,
}

impl<R> PreparedQuery<R> {
    /// The compiled query handed to the provider.
    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }

    /// Split into the compiled query and the row mapper.
    pub fn into_parts(self) -> (CompiledQuery, RowMapper<R>) {
        (self.query, self.mapper)
    }

    /// Map raw provider rows to results.
    pub fn map_rows(&self, rows: Vec<Row>) -> Result<Vec<R>, Error> {
        self.mapper.map_all(rows)
    }
}

impl<R> Clone for PreparedQuery<R> {
    fn clone(&self) -> Self {
        Self {
            query: self.query.clone(),
            mapper: self.mapper.clone(),
        }
    }
}

impl<R> fmt::Debug for PreparedQuery<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PreparedQuery")
            .field("query", &self.query)
            .finish()
    }
}

/// Query executor that runs bodies against a provider.
pub struct QueryExecutor<'a, P: ?Sized> {
    provider: &'a P,
    catalog: &'a Catalog,
    config: &'a EngineConfig,
}

impl<'a, P: Provider + ?Sized> QueryExecutor<'a, P> {
    /// Create a new executor with provider, catalog and config references.
    pub fn new(provider: &'a P, catalog: &'a Catalog, config: &'a EngineConfig) -> Self {
        Self {
            provider,
            catalog,
            config,
        }
    }

    /// The catalog paths are resolved against.
    pub fn catalog(&self) -> &'a Catalog {
        self.catalog
    }

    /// Translate a body without executing it.
    pub fn prepare<E, R>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<PreparedQuery<R>, Error>
    where
        E: Entity,
        R: FromRow,
    {
        let translation = self.translate(body)?;
        let mapper = RowMapper::resolve(&translation.shapes)?;
        Ok(PreparedQuery {
            query: translation.query,
            mapper,
        })
    }

    /// Execute a prepared query.
    pub fn run<R>(&self, prepared: &PreparedQuery<R>) -> Result<Vec<R>, Error> {
        let rows = self.provider.fetch(&prepared.query)?;
        prepared.map_rows(rows)
    }

    /// All matching rows, mapped to `R`. No match yields an empty list.
    pub fn all<E, R>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Vec<R>, Error>
    where
        E: Entity,
        R: FromRow,
    {
        self.all_sorted(&[], body)
    }

    /// All matching rows, ordered by `sort` before any ordering in the body.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn all_sorted<E, R>(
        &self,
        sort: &[OrderKey],
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<Vec<R>, Error>
    where
        E: Entity,
        R: FromRow,
    {
        let prepared = self.prepare::<E, R>(body)?;
        let (mut query, mapper) = prepared.into_parts();
        self.apply_sort(E::NAME, &mut query, sort)?;

        if let Some(limit) = self.config.max_results {
            let bounded = u32::try_from(limit.saturating_add(1)).unwrap_or(u32::MAX);
            query.pagination = Some(Pagination::limit(bounded));
        }

        let rows = self.provider.fetch(&query)?;
        if let Some(limit) = self.config.max_results {
            if rows.len() > limit {
                tracing::warn!(entity = E::NAME, limit, "Result limit exceeded");
                return Err(Error::ResultLimitExceeded { limit });
            }
        }
        tracing::debug!(entity = E::NAME, rows = rows.len(), "Fetched rows");
        mapper.map_all(rows)
    }

    /// Exactly one matching row.
    ///
    /// Fails with [`Error::NoResult`] on zero matches and
    /// [`Error::NonUniqueResult`] on more than one. At most two rows are
    /// fetched, so the reported count is a lower bound.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn one<E, R>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<R, Error>
    where
        E: Entity,
        R: FromRow,
    {
        let (mut query, mapper) = self.prepare::<E, R>(body)?.into_parts();
        query.pagination = Some(Pagination::limit(2));

        let mut rows = self.provider.fetch(&query)?;
        match rows.len() {
            0 => Err(Error::NoResult),
            1 => match rows.pop() {
                Some(row) => mapper.map(row),
                None => Err(Error::NoResult),
            },
            count => Err(Error::NonUniqueResult { count }),
        }
    }

    /// The first matching row in provider order, or `None`.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn first<E, R>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Option<R>, Error>
    where
        E: Entity,
        R: FromRow,
    {
        let (mut query, mapper) = self.prepare::<E, R>(body)?.into_parts();
        query.pagination = Some(Pagination::limit(1));

        match self.provider.fetch(&query)?.into_iter().next() {
            Some(row) => mapper.map(row).map(Some),
            None => Ok(None),
        }
    }

    /// Check if any row matches.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn exists<E: Entity>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<bool, Error> {
        let query = self.translate(body)?.query;
        Ok(self.provider.exists(&query)?)
    }

    /// Count matching rows.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn count<E: Entity>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<u64, Error> {
        let query = self.translate(body)?.query;
        Ok(self.provider.count(&counting(&query))?)
    }

    /// One page of results plus the totals of the whole query.
    ///
    /// The page size must be positive and at most the configured maximum.
    /// Totals come from a separate count query over the same filter, except
    /// for aggregate selections, which always total one row.
    #[instrument(skip_all, fields(entity = E::NAME, page = page.index, size = page.size))]
    pub fn pages<E, R>(
        &self,
        page: PageSpec,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, R, P>, Error>
    where
        E: Entity,
        R: FromRow,
    {
        if page.size == 0 {
            return Err(Error::InvalidPage {
                reason: "page size must be positive".to_string(),
            });
        }
        if page.size > self.config.max_page_size {
            return Err(Error::InvalidPage {
                reason: format!(
                    "page size {} exceeds the maximum of {}",
                    page.size, self.config.max_page_size
                ),
            });
        }
        page.offset()?;

        let (mut query, mapper) = self.prepare::<E, R>(body)?.into_parts();
        self.apply_sort(E::NAME, &mut query, &page.sort)?;

        // An aggregating selection yields exactly one row.
        let total = if query.projection.is_aggregate() {
            1
        } else {
            self.provider.count(&counting(&query))?
        };
        let rows = fetch_page(self.provider, &query, &mapper, &page)?;
        Ok(PageResult::new(self.provider, query, mapper, page, total, rows))
    }

    /// Like [`pages`](Self::pages), sorted ascending by a numeric attribute
    /// first so page boundaries are stable.
    pub fn pages_sorted<E, R, N>(
        &self,
        sort: Attr<E, N>,
        mut page: PageSpec,
        body: impl FnOnce(&Root<'_, E>),
    ) -> Result<PageResult<'a, R, P>, Error>
    where
        E: Entity,
        R: FromRow,
        N: Numeric,
    {
        page.sort.insert(0, sort.asc());
        self.pages(page, body)
    }

    fn translate<E: Entity>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<Translation, Error> {
        let scope = Scope::new(E::NAME);
        body(&Root::new(&scope));
        let translation = Translator::new(self.catalog).translate_query(&scope.finish())?;

        tracing::debug!(
            entity = E::NAME,
            joins = translation.query.joins.len(),
            filtered = translation.query.filter.is_some(),
            width = translation.shapes.len(),
            "Translated query"
        );
        trace_ir(self.config, "query", &translation.query);
        Ok(translation)
    }

    /// Prepend sort keys on root attributes to the body's ordering.
    fn apply_sort(
        &self,
        entity: &str,
        query: &mut CompiledQuery,
        sort: &[OrderKey],
    ) -> Result<(), Error> {
        if sort.is_empty() {
            return Ok(());
        }
        for key in sort {
            let path = format!("{}.{}", entity, key.field);
            match self.catalog.attribute(entity, &key.field) {
                Some(Attribute::Field(field)) if field.field_type.is_orderable() => {}
                Some(Attribute::Field(field)) => {
                    return Err(Error::mismatch(
                        path,
                        "an orderable attribute",
                        field.field_type.describe(),
                    ))
                }
                Some(Attribute::Relation(_)) => {
                    return Err(Error::path(entity, &path, "cannot sort by a relation"))
                }
                None => return Err(Error::path(entity, &path, "unknown attribute")),
            }
        }

        let mut order_by: Vec<_> = sort.iter().map(OrderKey::to_spec).collect();
        order_by.append(&mut query.order_by);
        query.order_by = order_by;
        Ok(())
    }
}

/// The count query of a query: same filter and joins, no ordering or
/// pagination, one entity per row unless the body asked for distinct
/// values.
fn counting(query: &CompiledQuery) -> CompiledQuery {
    let mut count = query.clone();
    count.order_by.clear();
    count.pagination = None;
    if !count.distinct {
        count.projection = Projection::Root;
    }
    count
}

/// Emit a compiled IR value as JSON at TRACE level, when enabled.
pub(crate) fn trace_ir(config: &EngineConfig, kind: &str, ir: &impl Serialize) {
    if !config.trace_compiled_queries || !tracing::enabled!(Level::TRACE) {
        return;
    }
    match serde_json::to_string(ir) {
        Ok(json) => tracing::trace!(kind, ir = %json, "Compiled IR"),
        Err(e) => tracing::warn!(kind, error = %e, "Failed to render compiled IR"),
    }
}
