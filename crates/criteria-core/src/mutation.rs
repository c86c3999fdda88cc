//! Bulk UPDATE and DELETE.
//!
//! Mutation bodies use the same clause rules as query bodies; assignments
//! are collected apart from the filter. A bulk mutation runs as a single
//! provider call and does not load or visit rows one by one.

use std::ops::Deref;

use criteria_proto::{Mutation, Value};
use tracing::instrument;

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::entity::Entity;
use crate::error::Error;
use crate::provider::Provider;
use crate::query::{trace_ir, Attr, Expr, ExprNode, IntoLiteral, Root, Scope, Translator};

/// The body handle of an update: a [`Root`] that can also assign.
///
/// Assigning the same attribute twice keeps the last value.
pub struct Update<'q, E> {
    root: Root<'q, E>,
}

impl<'q, E> Deref for Update<'q, E> {
    type Target = Root<'q, E>;

    fn deref(&self) -> &Self::Target {
        &self.root
    }
}

impl<'q, E: Entity> Update<'q, E> {
    /// `SET attr = value`.
    pub fn set<T>(&self, attr: Attr<E, T>, value: impl IntoLiteral<T>) {
        self.assign(attr.name(), ExprNode::Literal(value.into_literal()));
    }

    /// `SET attr = NULL`.
    pub fn set_null<T>(&self, attr: Attr<E, Option<T>>) {
        self.assign(attr.name(), ExprNode::Literal(Value::Null));
    }

    /// `SET attr = expr`, for a parameter or a literal expression.
    pub fn set_expr<T>(&self, attr: Attr<E, T>, value: impl Into<Expr<T>>) {
        self.assign(attr.name(), value.into().node);
    }

    /// `SET name = value` for an attribute named at runtime.
    pub fn set_field(&self, name: &str, value: impl Into<Value>) {
        self.assign(name, ExprNode::Literal(value.into()));
    }

    fn assign(&self, field: &str, value: ExprNode) {
        self.root.scope().assign(field, value);
    }
}

/// Executes bulk mutations against a provider.
pub struct MutationExecutor<'a, P: ?Sized> {
    provider: &'a P,
    catalog: &'a Catalog,
    config: &'a EngineConfig,
}

impl<'a, P: Provider + ?Sized> MutationExecutor<'a, P> {
    /// Create a new executor with provider, catalog and config references.
    pub fn new(provider: &'a P, catalog: &'a Catalog, config: &'a EngineConfig) -> Self {
        Self {
            provider,
            catalog,
            config,
        }
    }

    /// Update every row the body's clauses match; returns the affected count.
    ///
    /// A body without assignments updates nothing and issues no provider
    /// call.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn update<E: Entity>(&self, body: impl FnOnce(&Update<'_, E>)) -> Result<u64, Error> {
        let scope = Scope::new(E::NAME);
        body(&Update {
            root: Root::new(&scope),
        });
        let parts = Translator::new(self.catalog).translate_mutation(&scope.finish())?;

        if parts.assignments.is_empty() {
            tracing::warn!(entity = E::NAME, "Update without assignments skipped");
            return Ok(0);
        }

        let mutation = Mutation::update(E::NAME, parts.assignments, parts.filter)
            .with_parameters(parts.parameters);
        self.execute(E::NAME, &mutation)
    }

    /// Delete every row the body's clauses match; returns the affected count.
    #[instrument(skip_all, fields(entity = E::NAME))]
    pub fn delete<E: Entity>(&self, body: impl FnOnce(&Root<'_, E>)) -> Result<u64, Error> {
        let scope = Scope::new(E::NAME);
        body(&Root::new(&scope));
        let parts = Translator::new(self.catalog).translate_mutation(&scope.finish())?;

        let mutation = Mutation::delete(E::NAME, parts.filter).with_parameters(parts.parameters);
        self.execute(E::NAME, &mutation)
    }

    fn execute(&self, entity: &str, mutation: &Mutation) -> Result<u64, Error> {
        trace_ir(self.config, "mutation", mutation);
        let result = self.provider.execute(mutation)?;
        tracing::debug!(entity, affected = result.affected, "Executed bulk mutation");
        Ok(result.affected)
    }
}
