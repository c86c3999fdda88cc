//! Types exchanged between the criteria engine and a persistence provider.
//!
//! # Modules
//!
//! - [`value`] - Runtime values for literals, parameters and result cells
//! - [`query`] - Compiled query IR
//! - [`mutation`] - Bulk update/delete IR
//! - [`result`] - Records and result rows
//! - [`error`] - Provider error types
//!
//! Every type derives serde's `Serialize`/`Deserialize`, so a compiled
//! query can be logged or shipped as JSON:
//!
//! ```
//! use criteria_proto::{ColumnRef, CompiledQuery, Predicate};
//!
//! let query = CompiledQuery::new("User")
//!     .with_filter(Predicate::like(ColumnRef::root("email"), "%il1"));
//! let json = serde_json::to_string(&query).unwrap();
//! assert!(json.contains("%il1"));
//! ```

pub mod error;
pub mod mutation;
pub mod query;
pub mod result;
pub mod value;

pub use error::Error;

// Re-export commonly used types at crate root
pub use mutation::{FieldValue, Mutation};
pub use query::{
    AggregateFunction, Collection, ColumnRef, CompareOp, CompiledQuery, JoinKind, JoinSpec,
    Operand, OrderDirection, OrderSpec, Pagination, Predicate, Projection, RelationRef,
    SelectItem,
};
pub use result::{Cell, MutationResult, Record, Row};
pub use value::Value;
