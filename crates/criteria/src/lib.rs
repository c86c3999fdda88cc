//! Criteria - typed queries over a catalog of entities.
//!
//! Queries are closures that state clauses one after another. Clauses are
//! joined with AND unless an `or()` statement precedes them, in which case
//! the next clause is OR-ed with everything before it.
//!
//! # Quick Start
//!
//! ```
//! use criteria::prelude::*;
//! use criteria::catalog::{EntityDef, FieldDef, FieldType, ScalarType, SchemaBundle};
//! use criteria::proto::Record;
//! use criteria::query::get_field;
//!
//! struct User {
//!     email: String,
//! }
//!
//! impl User {
//!     const EMAIL: Attr<User, String> = Attr::new("email");
//! }
//!
//! impl Entity for User {
//!     const NAME: &'static str = "User";
//!
//!     fn from_record(record: &Record) -> Result<Self, Error> {
//!         Ok(Self {
//!             email: get_field(record, "email")?,
//!         })
//!     }
//! }
//!
//! # fn main() -> Result<(), Error> {
//! let schema = SchemaBundle::new(1).with_entity(
//!     EntityDef::new("User", "email")
//!         .with_field(FieldDef::new("email", FieldType::Scalar(ScalarType::String))),
//! );
//! let engine = Engine::new(schema)?;
//!
//! let provider = MemoryProvider::for_catalog(engine.catalog());
//! provider.insert(Record::new("User").with_field("email", "email1"));
//! provider.insert(Record::new("User").with_field("email", "email2"));
//!
//! let users = engine.repository::<User, _>(&provider);
//! let found = users.find_all_by(|q| q.get(User::EMAIL).like("%il1"))?;
//! assert_eq!(found.len(), 1);
//! assert_eq!(found[0].email, "email1");
//! # Ok(())
//! # }
//! ```

mod repository;

pub mod prelude;

pub use repository::Repository;

pub use criteria_core::{
    catalog, impl_from_row, query, Attr, Catalog, EngineConfig, Entity, Error, Expr, FromRow,
    Join, MemoryProvider, MutationExecutor, OrderKey, PageResult, PageSpec, Path, PreparedQuery,
    Provider, QueryExecutor, Rel, Root, SchemaBundle, Update,
};

/// Re-export protocol types.
pub use criteria_core::proto;

/// A validated catalog plus the configuration every executor shares.
#[derive(Debug, Clone)]
pub struct Engine {
    catalog: Catalog,
    config: EngineConfig,
}

impl Engine {
    /// Validate a schema and build an engine with default configuration.
    pub fn new(schema: SchemaBundle) -> Result<Self, Error> {
        Ok(Self::from_catalog(Catalog::new(schema)?))
    }

    /// Build an engine over an already validated catalog.
    pub fn from_catalog(catalog: Catalog) -> Self {
        tracing::debug!(
            version = catalog.version(),
            entities = catalog.entity_names().len(),
            "Engine ready"
        );
        Self {
            catalog,
            config: EngineConfig::default(),
        }
    }

    /// Replace the configuration after validating it.
    pub fn with_config(mut self, config: EngineConfig) -> Result<Self, Error> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// The catalog queries are resolved against.
    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// The engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// A query executor bound to `provider`.
    pub fn query<'a, P: Provider + ?Sized>(&'a self, provider: &'a P) -> QueryExecutor<'a, P> {
        QueryExecutor::new(provider, &self.catalog, &self.config)
    }

    /// A bulk mutation executor bound to `provider`.
    pub fn mutations<'a, P: Provider + ?Sized>(
        &'a self,
        provider: &'a P,
    ) -> MutationExecutor<'a, P> {
        MutationExecutor::new(provider, &self.catalog, &self.config)
    }

    /// The query surface of entity `E` bound to `provider`.
    pub fn repository<'a, E: Entity, P: Provider + ?Sized>(
        &'a self,
        provider: &'a P,
    ) -> Repository<'a, E, P> {
        Repository::new(self, provider)
    }
}
