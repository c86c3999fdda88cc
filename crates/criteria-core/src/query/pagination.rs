//! Page requests, page results and page-by-page iteration.

use criteria_proto::{ColumnRef, CompiledQuery, OrderDirection, OrderSpec, Pagination};

use super::projection::RowMapper;
use crate::config::DEFAULT_PAGE_SIZE;
use crate::error::Error;
use crate::provider::Provider;

/// A sort key on a root-entity attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderKey {
    /// Attribute name.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderKey {
    /// Ascending key.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Descending key.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }

    pub(crate) fn to_spec(&self) -> OrderSpec {
        OrderSpec {
            column: ColumnRef::root(&self.field),
            direction: self.direction,
        }
    }
}

/// A page request: zero-based index, page size and optional sort keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSpec {
    /// Zero-based page index.
    pub index: u32,
    /// Rows per page.
    pub size: u32,
    /// Sort keys applied before the body's own ordering.
    pub sort: Vec<OrderKey>,
}

impl PageSpec {
    /// Request page `index` of `size` rows.
    pub fn new(index: u32, size: u32) -> Self {
        Self {
            index,
            size,
            sort: Vec::new(),
        }
    }

    /// Add sort keys.
    pub fn with_sort(mut self, sort: Vec<OrderKey>) -> Self {
        self.sort = sort;
        self
    }

    /// Row offset of this page.
    pub fn offset(&self) -> Result<u32, Error> {
        self.index
            .checked_mul(self.size)
            .ok_or_else(|| Error::InvalidPage {
                reason: format!(
                    "offset of page {} with size {} overflows",
                    self.index, self.size
                ),
            })
    }

    pub(crate) fn pagination(&self) -> Result<Pagination, Error> {
        Ok(Pagination::new(self.size, self.offset()?))
    }
}

impl Default for PageSpec {
    fn default() -> Self {
        Self::new(0, DEFAULT_PAGE_SIZE)
    }
}

/// Fetches one page of an already translated query.
pub(crate) fn fetch_page<P: Provider + ?Sized, R>(
    provider: &P,
    query: &CompiledQuery,
    mapper: &RowMapper<R>,
    page: &PageSpec,
) -> Result<Vec<R>, Error> {
    let mut paged = query.clone();
    paged.pagination = Some(page.pagination()?);
    let rows = provider.fetch(&paged)?;
    tracing::debug!(
        entity = %query.root_entity,
        page = page.index,
        size = page.size,
        rows = rows.len(),
        "Fetched page"
    );
    mapper.map_all(rows)
}

/// One page of results plus the totals of the whole query.
///
/// The page keeps the translated query, so later pages can be fetched with
/// [`for_each_until`](Self::for_each_until) or [`into_pages`](Self::into_pages).
pub struct PageResult<'a, R, P: ?Sized> {
    /// The page these rows belong to.
    pub page: PageSpec,
    /// Rows matching the query across all pages.
    pub total_elements: u64,
    /// Number of pages of `page.size` rows.
    pub total_pages: u64,
    /// Rows of this page.
    pub rows: Vec<R>,
    provider: &'a P,
    query: CompiledQuery,
    mapper: RowMapper<R>,
}

impl<'a, R, P: Provider + ?Sized> PageResult<'a, R, P> {
    pub(crate) fn new(
        provider: &'a P,
        query: CompiledQuery,
        mapper: RowMapper<R>,
        page: PageSpec,
        total_elements: u64,
        rows: Vec<R>,
    ) -> Self {
        let size = u64::from(page.size.max(1));
        Self {
            total_pages: total_elements.div_ceil(size),
            page,
            total_elements,
            rows,
            provider,
            query,
            mapper,
        }
    }

    /// Check if a page follows this one.
    pub fn has_next(&self) -> bool {
        u64::from(self.page.index) + 1 < self.total_pages
    }

    /// The translated query, without pagination.
    pub fn query(&self) -> &CompiledQuery {
        &self.query
    }

    /// Consume the page, keeping only its rows.
    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }

    /// Visit this page and the following ones until the visitor returns
    /// `true` or a page comes back empty or short.
    ///
    /// The visitor is never called with an empty page.
    pub fn for_each_until<F>(self, mut visitor: F) -> Result<(), Error>
    where
        F: FnMut(&[R]) -> bool,
    {
        for page in self.into_pages() {
            let rows = page?;
            if visitor(&rows) {
                break;
            }
        }
        Ok(())
    }

    /// Iterate over this page and the following ones, fetching lazily.
    pub fn into_pages(self) -> Pages<'a, R, P> {
        Pages {
            provider: self.provider,
            query: self.query,
            mapper: self.mapper,
            page: self.page,
            pending: Some(self.rows),
            done: false,
        }
    }
}

impl<'a, R: std::fmt::Debug, P: ?Sized> std::fmt::Debug for PageResult<'a, R, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageResult")
            .field("page", &self.page)
            .field("total_elements", &self.total_elements)
            .field("total_pages", &self.total_pages)
            .field("rows", &self.rows)
            .finish()
    }
}

/// Iterator over consecutive pages, see [`PageResult::into_pages`].
///
/// Stops after an empty page, after a page shorter than the page size, or
/// after the first error.
pub struct Pages<'a, R, P: ?Sized> {
    provider: &'a P,
    query: CompiledQuery,
    mapper: RowMapper<R>,
    page: PageSpec,
    pending: Option<Vec<R>>,
    done: bool,
}

impl<'a, R, P: Provider + ?Sized> Iterator for Pages<'a, R, P> {
    type Item = Result<Vec<R>, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let rows = match self.pending.take() {
            Some(rows) => rows,
            None => match fetch_page(self.provider, &self.query, &self.mapper, &self.page) {
                Ok(rows) => rows,
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            },
        };

        if rows.is_empty() {
            self.done = true;
            return None;
        }
        if rows.len() < self.page.size as usize {
            self.done = true;
        }
        match self.page.index.checked_add(1) {
            Some(next) => self.page.index = next,
            None => self.done = true,
        }
        Some(Ok(rows))
    }
}
