//! Typed query construction and execution.
//!
//! A query is a closure over a [`Root`] handle. The closure records clauses,
//! joins, a selection and an ordering; the translator resolves them against
//! the catalog into a [`CompiledQuery`](criteria_proto::CompiledQuery), and
//! the [`QueryExecutor`] runs it through a provider and maps the rows.

mod builder;
mod clause;
mod compiler;
mod executor;
mod expr;
mod pagination;
mod path;
mod projection;
mod value_codec;

pub use builder::{Join, Path, Root};
pub use clause::{fold, tag, Clause, Connective, Statement};
pub use executor::{PreparedQuery, QueryExecutor};
pub use expr::{Expr, SelectTuple, Selectable};
pub use pagination::{OrderKey, PageResult, PageSpec, Pages};
pub use path::{Attr, Comparable, IntoLiteral, Numeric, Rel, Text};
pub use projection::{check, next_cell, row_cells, FromCell, FromRow, RowMapper, Shape};
pub use value_codec::{decode, get_field, FromValue};

pub(crate) use builder::Scope;
pub(crate) use compiler::Translator;
pub(crate) use executor::trace_ir;
pub(crate) use expr::ExprNode;
