//! Provider error types.

use thiserror::Error;

/// Errors reported by a persistence provider.
///
/// The engine passes these through unchanged.
#[derive(Debug, Error)]
pub enum Error {
    /// The backing store could not be reached.
    #[error("connection error: {0}")]
    Connection(String),

    /// A write violated a store constraint.
    #[error("constraint violation: {0}")]
    Constraint(String),

    /// The operation did not finish in time.
    #[error("operation timed out after {0} ms")]
    Timeout(u64),

    /// The compiled query names an entity the store does not hold.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// A predicate or projection could not be evaluated.
    #[error("evaluation error: {0}")]
    Evaluation(String),
}
