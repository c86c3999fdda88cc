//! Result shapes and row mapping.
//!
//! A query's selection has a [`Shape`] per selected item. The requested
//! Rust type declares the shape it expects through [`FromRow`]; the two are
//! checked before any provider call and a [`RowMapper`] turns each raw
//! [`Row`] into the requested type.

use std::fmt;

use criteria_proto::{Cell, Record, Row, Value};

use super::value_codec::{decode, FromValue};
use crate::catalog::ScalarType;
use crate::entity::Entity;
use crate::error::Error;

/// The type of one selected item, or of a requested result type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Shape {
    /// A whole entity.
    Entity(String),
    /// Any whole entity (requested as a raw [`Record`]).
    AnyEntity,
    /// A scalar value.
    Scalar(ScalarType),
    /// An enum-typed value, carried as its variant name.
    Enum(String),
    /// An element collection.
    Array(ScalarType),
    /// A value of unknown type.
    AnyScalar,
    /// A possibly-absent value.
    Nullable(Box<Shape>),
    /// A multi-item selection.
    Tuple(Vec<Shape>),
}

impl Shape {
    /// Wrap in [`Shape::Nullable`].
    pub fn nullable(self) -> Self {
        match self {
            Shape::Nullable(_) => self,
            other => Shape::Nullable(Box::new(other)),
        }
    }

    /// Check if a requested shape can hold a selected one.
    pub fn accepts(&self, selected: &Shape) -> bool {
        match (self, selected) {
            (Shape::Nullable(want), Shape::Nullable(got)) => want.accepts(got),
            (Shape::Nullable(want), got) => want.accepts(got),
            (_, Shape::Nullable(_)) => false,
            (Shape::AnyEntity, Shape::Entity(_)) => true,
            (Shape::Entity(a), Shape::Entity(b)) => a == b,
            (Shape::AnyScalar, Shape::Scalar(_) | Shape::Enum(_) | Shape::Array(_)) => true,
            (Shape::Scalar(_) | Shape::Enum(_) | Shape::Array(_) | Shape::AnyScalar, Shape::AnyScalar) => {
                true
            }
            (Shape::Scalar(to), Shape::Scalar(from)) => assignable(*from, *to),
            (Shape::Scalar(ScalarType::String), Shape::Enum(_)) => true,
            (Shape::Enum(a), Shape::Enum(b)) => a == b,
            (Shape::Array(to), Shape::Array(from)) => assignable(*from, *to),
            _ => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Entity(name) => write!(f, "entity {}", name),
            Shape::AnyEntity => f.write_str("any entity"),
            Shape::Scalar(s) => f.write_str(s.name()),
            Shape::Enum(name) => write!(f, "enum {}", name),
            Shape::Array(s) => write!(f, "{}[]", s.name()),
            Shape::AnyScalar => f.write_str("any value"),
            Shape::Nullable(inner) => write!(f, "{}?", inner),
            Shape::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}

fn assignable(from: ScalarType, to: ScalarType) -> bool {
    from == to
        || matches!(
            (from, to),
            (ScalarType::Int32, ScalarType::Int64)
                | (ScalarType::Float32, ScalarType::Float64)
                | (ScalarType::Timestamp, ScalarType::Int64)
        )
}

/// A Rust type that can be built from a single result cell.
pub trait FromCell: Sized {
    /// Shape this type expects.
    fn shape() -> Shape;

    /// Build from the cell at `position`.
    fn from_cell(cell: Cell, position: usize) -> Result<Self, Error>;
}

impl<E: Entity> FromCell for E {
    fn shape() -> Shape {
        Shape::Entity(E::NAME.to_string())
    }

    fn from_cell(cell: Cell, position: usize) -> Result<Self, Error> {
        match cell {
            Cell::Entity(Some(record)) => E::from_record(&record),
            Cell::Entity(None) => Err(Error::UnexpectedNull { position }),
            Cell::Value(value) => Err(not_an_entity(&value, position)),
        }
    }
}

impl FromCell for Record {
    fn shape() -> Shape {
        Shape::AnyEntity
    }

    fn from_cell(cell: Cell, position: usize) -> Result<Self, Error> {
        match cell {
            Cell::Entity(Some(record)) => Ok(record),
            Cell::Entity(None) => Err(Error::UnexpectedNull { position }),
            Cell::Value(value) => Err(not_an_entity(&value, position)),
        }
    }
}

impl<T: FromCell> FromCell for Option<T> {
    fn shape() -> Shape {
        T::shape().nullable()
    }

    fn from_cell(cell: Cell, position: usize) -> Result<Self, Error> {
        if cell.is_null() {
            Ok(None)
        } else {
            T::from_cell(cell, position).map(Some)
        }
    }
}

impl FromCell for Value {
    fn shape() -> Shape {
        Shape::AnyScalar.nullable()
    }

    fn from_cell(cell: Cell, position: usize) -> Result<Self, Error> {
        match cell {
            Cell::Value(value) => Ok(value),
            Cell::Entity(_) => Err(Error::Decode {
                field: column_name(position),
                reason: "expected a value, found an entity".to_string(),
            }),
        }
    }
}

fn not_an_entity(value: &Value, position: usize) -> Error {
    Error::Decode {
        field: column_name(position),
        reason: format!("expected an entity, found {}", value.type_name()),
    }
}

fn column_name(position: usize) -> String {
    format!("column {}", position)
}

fn scalar_from_cell<T: FromValue>(cell: Cell, position: usize) -> Result<T, Error> {
    match cell {
        Cell::Value(Value::Null) | Cell::Entity(None) => Err(Error::UnexpectedNull { position }),
        Cell::Value(value) => decode(&value, &column_name(position)),
        Cell::Entity(Some(record)) => Err(Error::Decode {
            field: column_name(position),
            reason: format!("expected {}, found entity {}", T::expected(), record.entity),
        }),
    }
}

macro_rules! impl_scalar_cell {
    ($($ty:ty => $shape:expr),+ $(,)?) => {
        $(
            impl FromCell for $ty {
                fn shape() -> Shape {
                    $shape
                }

                fn from_cell(cell: Cell, position: usize) -> Result<Self, Error> {
                    scalar_from_cell(cell, position)
                }
            }
        )+
    };
}

impl_scalar_cell! {
    bool => Shape::Scalar(ScalarType::Bool),
    i32 => Shape::Scalar(ScalarType::Int32),
    i64 => Shape::Scalar(ScalarType::Int64),
    f32 => Shape::Scalar(ScalarType::Float32),
    f64 => Shape::Scalar(ScalarType::Float64),
    String => Shape::Scalar(ScalarType::String),
    Vec<u8> => Shape::Scalar(ScalarType::Bytes),
    [u8; 16] => Shape::Scalar(ScalarType::Uuid),
    Vec<String> => Shape::Array(ScalarType::String),
    Vec<i64> => Shape::Array(ScalarType::Int64),
    Vec<i32> => Shape::Array(ScalarType::Int32),
    Vec<bool> => Shape::Array(ScalarType::Bool),
    Vec<f64> => Shape::Array(ScalarType::Float64),
}

/// A Rust type that can be built from a whole result row.
///
/// Implemented for every [`FromCell`] type (single-item selections), for
/// tuples of up to four items and, through [`impl_from_row!`], for plain
/// structs.
///
/// [`impl_from_row!`]: crate::impl_from_row
pub trait FromRow: Sized {
    /// Shape this type expects.
    fn shape() -> Shape;

    /// Build from a row whose shape has already been checked.
    fn from_row(row: Row) -> Result<Self, Error>;
}

impl<T: FromCell> FromRow for T {
    fn shape() -> Shape {
        T::shape()
    }

    fn from_row(row: Row) -> Result<Self, Error> {
        let found = row.len();
        match row.cells.into_iter().next() {
            Some(cell) if found == 1 => T::from_cell(cell, 0),
            _ => Err(Error::ProjectionArity { expected: 1, found }),
        }
    }
}

/// Split a row into exactly `expected` cells.
#[doc(hidden)]
pub fn row_cells(row: Row, expected: usize) -> Result<std::vec::IntoIter<Cell>, Error> {
    if row.len() != expected {
        return Err(Error::ProjectionArity {
            expected,
            found: row.len(),
        });
    }
    Ok(row.cells.into_iter())
}

/// Take the next cell of a row split by [`row_cells`].
#[doc(hidden)]
pub fn next_cell<T: FromCell>(
    cells: &mut std::vec::IntoIter<Cell>,
    position: usize,
) -> Result<T, Error> {
    match cells.next() {
        Some(cell) => T::from_cell(cell, position),
        None => Err(Error::UnexpectedNull { position }),
    }
}

macro_rules! impl_tuple_row {
    ($len:expr; $($name:ident : $pos:expr),+) => {
        impl<$($name: FromCell),+> FromRow for ($($name,)+) {
            fn shape() -> Shape {
                Shape::Tuple(vec![$($name::shape()),+])
            }

            fn from_row(row: Row) -> Result<Self, Error> {
                let mut cells = row_cells(row, $len)?;
                Ok(($(next_cell::<$name>(&mut cells, $pos)?,)+))
            }
        }
    };
}

impl_tuple_row!(2; A: 0, B: 1);
impl_tuple_row!(3; A: 0, B: 1, C: 2);
impl_tuple_row!(4; A: 0, B: 1, C: 2, D: 3);

/// Implement [`FromRow`] for a struct whose fields receive the selected
/// items in order.
///
/// ```
/// use criteria_core::impl_from_row;
///
/// #[derive(Debug, PartialEq)]
/// struct Contact {
///     email: String,
///     login: Option<String>,
/// }
///
/// impl_from_row!(Contact { email: String, login: Option<String> });
/// ```
#[macro_export]
macro_rules! impl_from_row {
    ($ty:ident { $($field:ident : $fty:ty),+ $(,)? }) => {
        impl $crate::query::FromRow for $ty {
            fn shape() -> $crate::query::Shape {
                $crate::query::Shape::Tuple(vec![
                    $(<$fty as $crate::query::FromCell>::shape()),+
                ])
            }

            fn from_row(
                row: $crate::proto::Row,
            ) -> ::std::result::Result<Self, $crate::Error> {
                let expected = [$(stringify!($field)),+].len();
                let mut cells = $crate::query::row_cells(row, expected)?;
                let mut position = 0usize;
                $(
                    let $field: $fty = $crate::query::next_cell(&mut cells, position)?;
                    position += 1;
                )+
                let _ = position;
                Ok(Self { $($field),+ })
            }
        }
    };
}

/// Check that a requested shape can hold the selected shapes.
pub fn check(requested: &Shape, selected: &[Shape]) -> Result<(), Error> {
    match requested {
        Shape::Tuple(items) => {
            if items.len() != selected.len() {
                return Err(Error::ProjectionArity {
                    expected: items.len(),
                    found: selected.len(),
                });
            }
            for (want, got) in items.iter().zip(selected) {
                if !want.accepts(got) {
                    return Err(mismatch(want, got));
                }
            }
            Ok(())
        }
        single => match selected {
            [got] if single.accepts(got) => Ok(()),
            [got] => Err(mismatch(single, got)),
            _ => Err(Error::ProjectionArity {
                expected: 1,
                found: selected.len(),
            }),
        },
    }
}

fn mismatch(requested: &Shape, selected: &Shape) -> Error {
    Error::ProjectionType {
        expected: requested.to_string(),
        found: selected.to_string(),
    }
}

/// Maps raw rows to a result type.
pub struct RowMapper<R> {
    map: fn(Row) -> Result<R, Error>,
}

impl<R> Clone for RowMapper<R> {
    fn clone(&self) -> Self {
        Self { map: self.map }
    }
}

impl<R> fmt::Debug for RowMapper<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RowMapper")
            .field("type", &std::any::type_name::<R>())
            .finish()
    }
}

impl<R: FromRow> RowMapper<R> {
    /// Check the selected shapes against `R` and build a mapper.
    pub fn resolve(selected: &[Shape]) -> Result<Self, Error> {
        check(&R::shape(), selected)?;
        Ok(Self { map: R::from_row })
    }
}

impl<R> RowMapper<R> {
    /// Map one row.
    pub fn map(&self, row: Row) -> Result<R, Error> {
        (self.map)(row)
    }

    /// Map every row.
    pub fn map_all(&self, rows: Vec<Row>) -> Result<Vec<R>, Error> {
        rows.into_iter().map(|row| self.map(row)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::get_field;
    use pretty_assertions::assert_eq;

    #[derive(Debug, PartialEq)]
    struct Address {
        city: String,
    }

    impl Entity for Address {
        const NAME: &'static str = "Address";

        fn from_record(record: &Record) -> Result<Self, Error> {
            Ok(Self {
                city: get_field(record, "city")?,
            })
        }
    }

    #[derive(Debug, PartialEq)]
    struct Contact {
        email: String,
        login: Option<String>,
    }

    crate::impl_from_row!(Contact {
        email: String,
        login: Option<String>
    });

    fn text(s: &str) -> Cell {
        Cell::Value(Value::from(s))
    }

    #[test]
    fn test_shape_compatibility() {
        assert!(Shape::Scalar(ScalarType::Int64).accepts(&Shape::Scalar(ScalarType::Int32)));
        assert!(!Shape::Scalar(ScalarType::Int32).accepts(&Shape::Scalar(ScalarType::Int64)));
        assert!(Shape::Scalar(ScalarType::String).accepts(&Shape::Enum("Role".into())));
        assert!(Shape::AnyEntity.accepts(&Shape::Entity("User".into())));
        assert!(!Shape::Entity("User".into()).accepts(&Shape::Entity("Todo".into())));
        assert!(Shape::Scalar(ScalarType::String)
            .nullable()
            .accepts(&Shape::Scalar(ScalarType::String)));
    }

    #[test]
    fn test_nullable_needs_option() {
        let login = Shape::Scalar(ScalarType::String).nullable();
        assert!(!<String as FromCell>::shape().accepts(&login));
        assert!(<Option<String> as FromCell>::shape().accepts(&login));
        assert!(<Value as FromCell>::shape().accepts(&login));

        let address = Shape::Entity("Address".into()).nullable();
        assert!(!<Address as FromCell>::shape().accepts(&address));
        assert!(<Option<Address> as FromCell>::shape().accepts(&address));

        let mut selected = vec![Shape::Scalar(ScalarType::String), login];
        assert!(check(&Contact::shape(), &selected).is_ok());
        selected.swap(0, 1);
        assert!(matches!(
            check(&Contact::shape(), &selected),
            Err(Error::ProjectionType { .. })
        ));
    }

    #[test]
    fn test_check_reports_arity_and_type() {
        let selected = vec![
            Shape::Scalar(ScalarType::String),
            Shape::Scalar(ScalarType::Int32),
        ];
        assert!(check(&<(String, i64)>::shape(), &selected).is_ok());
        assert!(matches!(
            check(&<(String, i64, bool)>::shape(), &selected),
            Err(Error::ProjectionArity {
                expected: 3,
                found: 2
            })
        ));
        assert!(matches!(
            check(&<(String, bool)>::shape(), &selected),
            Err(Error::ProjectionType { .. })
        ));
        assert!(matches!(
            check(&<String as FromRow>::shape(), &selected),
            Err(Error::ProjectionArity {
                expected: 1,
                found: 2
            })
        ));
    }

    #[test]
    fn test_map_entity_and_nullable_cells() {
        let mapper = RowMapper::<Option<Address>>::resolve(&[Shape::Entity("Address".into())])
            .unwrap();
        let record = Record::new("Address").with_field("city", "Berlin");

        let rows = vec![
            Row::new(vec![Cell::Entity(Some(record))]),
            Row::new(vec![Cell::Entity(None)]),
        ];
        let mapped = mapper.map_all(rows).unwrap();
        assert_eq!(
            mapped,
            vec![
                Some(Address {
                    city: "Berlin".into()
                }),
                None
            ]
        );
    }

    #[test]
    fn test_null_into_required_type() {
        let mapper = RowMapper::<String>::resolve(&[Shape::Scalar(ScalarType::String)]).unwrap();
        let err = mapper
            .map(Row::new(vec![Cell::Value(Value::Null)]))
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedNull { position: 0 }));
    }

    #[test]
    fn test_struct_projection() {
        let selected = vec![
            Shape::Scalar(ScalarType::String),
            Shape::Scalar(ScalarType::String).nullable(),
        ];
        let mapper = RowMapper::<Contact>::resolve(&selected).unwrap();
        let contact = mapper
            .map(Row::new(vec![text("a@b"), Cell::Value(Value::Null)]))
            .unwrap();
        assert_eq!(
            contact,
            Contact {
                email: "a@b".into(),
                login: None
            }
        );
    }
}
