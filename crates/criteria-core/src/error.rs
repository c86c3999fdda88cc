//! Core error types.

use thiserror::Error;

/// Errors raised while translating, executing or mapping a query.
#[derive(Debug, Error)]
pub enum Error {
    /// An attribute path does not resolve against the catalog.
    #[error("cannot resolve `{path}` on {entity}: {reason}")]
    PathResolution {
        entity: String,
        path: String,
        reason: String,
    },

    /// An operator or value does not fit the declared attribute type.
    #[error("type mismatch at `{path}`: expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: String,
        found: String,
    },

    /// The selected expression cannot produce the requested result type.
    #[error("projection type mismatch: result type expects {expected}, query selects {found}")]
    ProjectionType { expected: String, found: String },

    /// The result type has a different number of fields than the selection.
    #[error("projection arity mismatch: result type has {expected} fields, query selects {found}")]
    ProjectionArity { expected: usize, found: usize },

    /// Entity not present in the catalog.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// The schema bundle failed validation.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),

    /// A unique-result query matched no rows.
    #[error("query did not return a result")]
    NoResult,

    /// A unique-result query matched more than one row.
    #[error("query did not return a unique result: {count}")]
    NonUniqueResult { count: usize },

    /// Page index or size is out of range.
    #[error("invalid page request: {reason}")]
    InvalidPage { reason: String },

    /// A list query matched more rows than the configured limit.
    #[error("query returned more than {limit} rows")]
    ResultLimitExceeded { limit: usize },

    /// A null cell was mapped to a non-optional result type.
    #[error("unexpected null at result position {position}")]
    UnexpectedNull { position: usize },

    /// A raw value does not fit the requested Rust type.
    #[error("cannot decode `{field}`: {reason}")]
    Decode { field: String, reason: String },

    /// Configuration could not be loaded.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Failure reported by the persistence provider.
    #[error(transparent)]
    Provider(#[from] criteria_proto::Error),
}

impl Error {
    /// Check if this error was raised during translation, before any
    /// provider round-trip.
    pub fn is_translation(&self) -> bool {
        matches!(
            self,
            Error::PathResolution { .. }
                | Error::TypeMismatch { .. }
                | Error::ProjectionType { .. }
                | Error::ProjectionArity { .. }
                | Error::UnknownEntity(_)
        )
    }

    pub(crate) fn path(entity: &str, path: &str, reason: impl Into<String>) -> Self {
        Error::PathResolution {
            entity: entity.to_string(),
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn mismatch(
        path: impl Into<String>,
        expected: impl Into<String>,
        found: impl Into<String>,
    ) -> Self {
        Error::TypeMismatch {
            path: path.into(),
            expected: expected.into(),
            found: found.into(),
        }
    }
}
