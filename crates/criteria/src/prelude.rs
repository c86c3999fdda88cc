//! Everything a query body usually needs.

pub use crate::{Engine, Repository};
pub use criteria_core::impl_from_row;
pub use criteria_core::proto::{JoinKind, OrderDirection};
pub use criteria_core::{
    Attr, EngineConfig, Entity, Error, Expr, FromRow, Join, MemoryProvider, OrderKey, PageResult,
    PageSpec, Path, Provider, Rel, Root, Update,
};
