//! The link between a Rust type and a catalog entity.

use criteria_proto::Record;

use crate::error::Error;

/// A Rust type persisted as a catalog entity.
///
/// `NAME` must match an [`EntityDef`](crate::catalog::EntityDef) name.
/// Attribute descriptors are usually declared next to the implementation:
///
/// ```
/// use criteria_core::proto::Record;
/// use criteria_core::query::{get_field, Attr};
/// use criteria_core::{Entity, Error};
///
/// struct Address {
///     city: String,
/// }
///
/// impl Address {
///     const CITY: Attr<Address, String> = Attr::new("city");
/// }
///
/// impl Entity for Address {
///     const NAME: &'static str = "Address";
///
///     fn from_record(record: &Record) -> Result<Self, Error> {
///         Ok(Self {
///             city: get_field(record, "city")?,
///         })
///     }
/// }
///
/// assert_eq!(Address::CITY.name(), "city");
/// ```
pub trait Entity: Sized {
    /// Catalog entity name.
    const NAME: &'static str;

    /// Build a value from a materialized row of this entity.
    fn from_record(record: &Record) -> Result<Self, Error>;
}
