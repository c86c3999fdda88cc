//! Typed attribute and relation descriptors.

use std::fmt;
use std::marker::PhantomData;

use criteria_proto::Value;

use super::pagination::OrderKey;

/// A stored attribute of entity `E` whose Rust value type is `T`.
///
/// Descriptors are plain constants, usually declared as associated consts:
/// `const EMAIL: Attr<User, String> = Attr::new("email");`. The name is
/// checked against the catalog when a query is translated.
pub struct Attr<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Attr<E, T> {
    /// Create a descriptor for the named attribute.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Attribute name.
    pub const fn name(&self) -> &'static str {
        self.name
    }

    /// Ascending sort key on this attribute.
    pub fn asc(&self) -> OrderKey {
        OrderKey::asc(self.name)
    }

    /// Descending sort key on this attribute.
    pub fn desc(&self) -> OrderKey {
        OrderKey::desc(self.name)
    }
}

impl<E, T> Clone for Attr<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Attr<E, T> {}

impl<E, T> fmt::Debug for Attr<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Attr").field(&self.name).finish()
    }
}

/// A relation of entity `E`.
///
/// `T` is the target entity for to-one relations and `Vec<Target>` for
/// to-many relations.
pub struct Rel<E, T> {
    name: &'static str,
    _marker: PhantomData<fn() -> (E, T)>,
}

impl<E, T> Rel<E, T> {
    /// Create a descriptor for the named relation.
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    /// Relation name.
    pub const fn name(&self) -> &'static str {
        self.name
    }
}

impl<E, T> Clone for Rel<E, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E, T> Copy for Rel<E, T> {}

impl<E, T> fmt::Debug for Rel<E, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Rel").field(&self.name).finish()
    }
}

/// Value types with arithmetic aggregates and numeric sort keys.
pub trait Numeric: Into<Value> {
    /// Result type of a sum; integers widen to `i64`, floats to `f64`.
    type Sum;
}

impl Numeric for i32 {
    type Sum = i64;
}

impl Numeric for i64 {
    type Sum = i64;
}

impl Numeric for f32 {
    type Sum = f64;
}

impl Numeric for f64 {
    type Sum = f64;
}

/// Value types LIKE applies to.
pub trait Text {}

impl Text for String {}
impl Text for Option<String> {}
impl Text for Value {}

/// Rust values accepted as a literal for an attribute of type `T`.
///
/// Besides `T` itself: a nullable attribute takes its non-null type, text
/// attributes take `&str`, `i64`/`f64` attributes take `i32`/`f32`, and
/// untyped paths take any scalar.
pub trait IntoLiteral<T> {
    /// Convert into a runtime value.
    fn into_literal(self) -> Value;
}

impl<T: Into<Value>> IntoLiteral<T> for T {
    fn into_literal(self) -> Value {
        self.into()
    }
}

impl<T: Into<Value>> IntoLiteral<Option<T>> for T {
    fn into_literal(self) -> Value {
        self.into()
    }
}

impl IntoLiteral<String> for &str {
    fn into_literal(self) -> Value {
        Value::from(self)
    }
}

impl IntoLiteral<Option<String>> for &str {
    fn into_literal(self) -> Value {
        Value::from(self)
    }
}

macro_rules! impl_widening_literal {
    ($($from:ty => $to:ty),* $(,)?) => {
        $(
            impl IntoLiteral<$to> for $from {
                fn into_literal(self) -> Value {
                    Value::from(<$to>::from(self))
                }
            }

            impl IntoLiteral<Option<$to>> for $from {
                fn into_literal(self) -> Value {
                    Value::from(<$to>::from(self))
                }
            }
        )*
    };
}

impl_widening_literal!(i32 => i64, f32 => f64);

macro_rules! impl_dynamic_literal {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoLiteral<Value> for $ty {
                fn into_literal(self) -> Value {
                    Value::from(self)
                }
            }
        )*
    };
}

impl_dynamic_literal!(
    bool,
    i32,
    i64,
    f32,
    f64,
    String,
    &str,
    Vec<u8>,
    [u8; 16],
    Vec<bool>,
    Vec<i32>,
    Vec<i64>,
    Vec<f64>,
    Vec<String>,
);

/// Value types that may appear on either side of a comparison with `U`.
///
/// A nullable attribute compares with its non-null counterpart.
pub trait Comparable<U> {}

impl<T> Comparable<T> for T {}
impl<T> Comparable<T> for Option<T> {}
impl<T> Comparable<Option<T>> for T {}

#[cfg(test)]
mod tests {
    use super::*;

    struct User;

    const EMAIL: Attr<User, String> = Attr::new("email");
    const TODOS: Rel<User, Vec<()>> = Rel::new("todos");

    #[test]
    fn test_descriptors_are_const() {
        assert_eq!(EMAIL.name(), "email");
        assert_eq!(TODOS.name(), "todos");

        let copy = EMAIL;
        assert_eq!(copy.name(), EMAIL.name());
        assert_eq!(format!("{:?}", EMAIL), "Attr(\"email\")");
    }

    #[test]
    fn test_literal_conversions() {
        fn lit<T, V: IntoLiteral<T>>(value: V) -> Value {
            value.into_literal()
        }

        assert_eq!(lit::<String, _>("a"), Value::from("a"));
        assert_eq!(lit::<Option<String>, _>("a"), Value::from("a"));
        assert_eq!(lit::<Option<String>, _>(None::<String>), Value::Null);
        assert_eq!(lit::<i64, _>(2i32), Value::Int64(2));
        assert_eq!(lit::<Option<i64>, _>(7i64), Value::Int64(7));
        assert_eq!(lit::<f64, _>(1.5f32), Value::Float64(1.5));
        assert_eq!(lit::<Value, _>(5i32), Value::Int32(5));
    }

    #[test]
    fn test_sort_keys() {
        let key = EMAIL.desc();
        assert_eq!(key, OrderKey::desc("email"));
    }
}
