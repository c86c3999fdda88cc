//! The typed query builder.
//!
//! A query body receives a [`Root`] handle and records clauses, joins,
//! selections and orderings into a scope. Clauses are appended in call
//! order and combined by the rule in [`clause`](super::clause). Nothing is
//! resolved here; the translator checks every path against the catalog.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};

use criteria_proto::{AggregateFunction, CompareOp, JoinKind, OrderDirection, Value};

use super::clause::{ClauseNode, Statement};
use super::expr::{AttrRef, Expr, ExprNode, SelectTuple, Selectable, Source, SubqueryNode};
use super::path::{Attr, Comparable, IntoLiteral, Numeric, Rel, Text};
use crate::entity::Entity;

static NEXT_SCOPE_ID: AtomicU64 = AtomicU64::new(1);

/// A join declared in a body.
#[derive(Debug, Clone)]
pub struct JoinDecl {
    pub parent: Source,
    pub relation: String,
    pub entity: &'static str,
    pub to_many: bool,
    pub kind: JoinKind,
}

/// What a body selected.
#[derive(Debug, Clone)]
pub enum Selection {
    Single(ExprNode),
    Tuple(Vec<ExprNode>),
}

/// Everything a body recorded.
#[derive(Debug, Clone, Default)]
pub struct ScopeState {
    pub statements: Vec<Statement<ClauseNode>>,
    pub joins: Vec<JoinDecl>,
    pub selection: Option<Selection>,
    pub order_by: Vec<(ExprNode, OrderDirection)>,
    pub distinct: bool,
    pub assignments: Vec<(String, ExprNode)>,
}

/// A finished scope, ready for translation.
#[derive(Debug, Clone)]
pub struct ScopeData {
    pub id: u64,
    pub entity: &'static str,
    pub state: ScopeState,
}

/// Recording state of one query or subquery body.
#[derive(Debug)]
pub(crate) struct Scope {
    id: u64,
    entity: &'static str,
    state: RefCell<ScopeState>,
}

impl Scope {
    pub(crate) fn new(entity: &'static str) -> Self {
        Self {
            id: NEXT_SCOPE_ID.fetch_add(1, Ordering::Relaxed),
            entity,
            state: RefCell::new(ScopeState::default()),
        }
    }

    pub(crate) fn finish(self) -> ScopeData {
        ScopeData {
            id: self.id,
            entity: self.entity,
            state: self.state.into_inner(),
        }
    }

    fn push(&self, clause: ClauseNode) {
        self.state
            .borrow_mut()
            .statements
            .push(Statement::Clause(clause));
    }

    fn push_or(&self) {
        self.state.borrow_mut().statements.push(Statement::Or);
    }

    fn declare_join(&self, decl: JoinDecl) -> usize {
        let mut state = self.state.borrow_mut();
        state.joins.push(decl);
        state.joins.len() - 1
    }

    fn root_ref(&self) -> AttrRef {
        AttrRef::new(self.id, self.entity, Source::Root)
    }

    pub(crate) fn assign(&self, field: &str, value: ExprNode) {
        let mut state = self.state.borrow_mut();
        match state.assignments.iter_mut().find(|(name, _)| name == field) {
            Some(slot) => slot.1 = value,
            None => state.assignments.push((field.to_string(), value)),
        }
    }
}

/// The root entity of a query body.
pub struct Root<'q, E> {
    scope: &'q Scope,
    _marker: PhantomData<fn() -> E>,
}

impl<'q, E: Entity> Root<'q, E> {
    pub(crate) fn new(scope: &'q Scope) -> Self {
        Self {
            scope,
            _marker: PhantomData,
        }
    }

    /// Path to an attribute of the root entity.
    pub fn get<T>(&self, attr: Attr<E, T>) -> Path<'q, T> {
        Path::new(self.scope, self.scope.root_ref().child(attr.name()))
    }

    /// Path to a relation of the root entity.
    pub fn rel<T>(&self, rel: Rel<E, T>) -> Path<'q, T> {
        Path::new(self.scope, self.scope.root_ref().child(rel.name()))
    }

    /// Path to an attribute named at runtime.
    pub fn field(&self, name: &str) -> Path<'q, Value> {
        Path::new(self.scope, self.scope.root_ref().child(name))
    }

    /// Join a to-one relation.
    pub fn join<T: Entity>(&self, rel: Rel<E, T>, kind: JoinKind) -> Join<'q, T> {
        Join::declare(self.scope, Source::Root, rel.name(), false, kind)
    }

    /// Join a to-many relation; the handle ranges over related rows.
    pub fn join_many<T: Entity>(&self, rel: Rel<E, Vec<T>>, kind: JoinKind) -> Join<'q, T> {
        Join::declare(self.scope, Source::Root, rel.name(), true, kind)
    }

    /// Connect the next clause with OR instead of AND.
    pub fn or(&self) {
        self.scope.push_or();
    }

    /// Select a single item instead of the root entity.
    pub fn select(&self, item: impl Selectable) {
        self.scope.state.borrow_mut().selection = Some(Selection::Single(item.into_node()));
    }

    /// Select a tuple of items.
    pub fn select_tuple(&self, items: impl SelectTuple) {
        self.scope.state.borrow_mut().selection = Some(Selection::Tuple(items.into_nodes()));
    }

    /// Append an ordering.
    pub fn order_by(&self, item: impl Selectable, direction: OrderDirection) {
        self.scope
            .state
            .borrow_mut()
            .order_by
            .push((item.into_node(), direction));
    }

    /// Remove duplicate result rows.
    pub fn distinct(&self) {
        self.scope.state.borrow_mut().distinct = true;
    }

    /// Number of matching rows.
    pub fn count(&self) -> Expr<i64> {
        Expr::from_node(ExprNode::Aggregate {
            function: AggregateFunction::Count,
            path: None,
        })
    }

    /// A subquery over entity `S`.
    ///
    /// The body's return value is the subquery's selection; calling
    /// `select` inside the body fails translation. Paths of this query used
    /// inside the body correlate the subquery with it.
    pub fn subquery<S: Entity, T>(&self, body: impl FnOnce(&Root<'_, S>) -> Expr<T>) -> Expr<T> {
        let scope = Scope::new(S::NAME);
        let selection = body(&Root::new(&scope)).node;
        Expr::from_node(ExprNode::Subquery(Box::new(SubqueryNode {
            scope: scope.finish(),
            selection,
        })))
    }

    /// A named parameter bound to `value`.
    pub fn param<T: Into<Value>>(&self, name: &str, value: T) -> Expr<T> {
        Expr::from_node(ExprNode::Parameter {
            name: name.to_string(),
            value: value.into(),
        })
    }
}

impl<'q, E> Root<'q, E> {
    pub(crate) fn attr_ref(&self) -> AttrRef {
        self.scope.root_ref()
    }

    pub(crate) fn scope(&self) -> &'q Scope {
        self.scope
    }
}

/// An explicitly joined entity.
pub struct Join<'q, T> {
    scope: &'q Scope,
    index: usize,
    entity: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<'q, T: Entity> Join<'q, T> {
    fn declare(
        scope: &'q Scope,
        parent: Source,
        relation: &str,
        to_many: bool,
        kind: JoinKind,
    ) -> Self {
        let index = scope.declare_join(JoinDecl {
            parent,
            relation: relation.to_string(),
            entity: T::NAME,
            to_many,
            kind,
        });
        Self {
            scope,
            index,
            entity: T::NAME,
            _marker: PhantomData,
        }
    }

    /// Path to an attribute of the joined entity.
    pub fn get<U>(&self, attr: Attr<T, U>) -> Path<'q, U> {
        Path::new(self.scope, self.attr_ref().child(attr.name()))
    }

    /// Path to a relation of the joined entity.
    pub fn rel<U>(&self, rel: Rel<T, U>) -> Path<'q, U> {
        Path::new(self.scope, self.attr_ref().child(rel.name()))
    }

    /// Path to an attribute named at runtime.
    pub fn field(&self, name: &str) -> Path<'q, Value> {
        Path::new(self.scope, self.attr_ref().child(name))
    }

    /// Join a to-one relation of the joined entity.
    pub fn join<U: Entity>(&self, rel: Rel<T, U>, kind: JoinKind) -> Join<'q, U> {
        Join::declare(self.scope, Source::Join(self.index), rel.name(), false, kind)
    }

    /// Join a to-many relation of the joined entity.
    pub fn join_many<U: Entity>(&self, rel: Rel<T, Vec<U>>, kind: JoinKind) -> Join<'q, U> {
        Join::declare(self.scope, Source::Join(self.index), rel.name(), true, kind)
    }
}

impl<'q, T> Join<'q, T> {
    pub(crate) fn attr_ref(&self) -> AttrRef {
        AttrRef::new(self.scope.id, self.entity, Source::Join(self.index))
    }
}

/// A typed attribute path.
///
/// Predicate methods append a clause to the body that owns the path.
pub struct Path<'q, T> {
    scope: &'q Scope,
    attr: AttrRef,
    _marker: PhantomData<fn() -> T>,
}

impl<'q, T> Clone for Path<'q, T> {
    fn clone(&self) -> Self {
        Path::new(self.scope, self.attr.clone())
    }
}

impl<'q, T> Path<'q, T> {
    fn new(scope: &'q Scope, attr: AttrRef) -> Self {
        Self {
            scope,
            attr,
            _marker: PhantomData,
        }
    }

    fn node(&self) -> ExprNode {
        ExprNode::Path(self.attr.clone())
    }

    fn compare(&self, op: CompareOp, right: ExprNode) {
        self.scope.push(ClauseNode::Compare {
            left: self.node(),
            op,
            right,
        });
    }

    fn aggregate<U>(&self, function: AggregateFunction) -> Expr<U> {
        Expr::from_node(ExprNode::Aggregate {
            function,
            path: Some(self.attr.clone()),
        })
    }

    /// The path as an expression.
    pub fn expr(&self) -> Expr<T> {
        Expr::from_node(self.node())
    }

    /// `path IS NULL`. On a to-one relation, tests for an absent target.
    pub fn is_null(&self) {
        self.scope.push(ClauseNode::IsNull {
            operand: self.node(),
            negated: false,
        });
    }

    /// `path IS NOT NULL`.
    pub fn is_not_null(&self) {
        self.scope.push(ClauseNode::IsNull {
            operand: self.node(),
            negated: true,
        });
    }

    /// Number of non-null values.
    pub fn count(&self) -> Expr<i64> {
        self.aggregate(AggregateFunction::Count)
    }
}

impl<'q, T: Into<Value>> Path<'q, T> {
    /// `path = value`.
    pub fn eq(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Eq, literal::<T>(value));
    }

    /// `path <> value`.
    pub fn ne(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Ne, literal::<T>(value));
    }

    /// `path < value`.
    pub fn lt(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Lt, literal::<T>(value));
    }

    /// `path <= value`.
    pub fn le(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Le, literal::<T>(value));
    }

    /// `path > value`.
    pub fn gt(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Gt, literal::<T>(value));
    }

    /// `path >= value`.
    pub fn ge(&self, value: impl IntoLiteral<T>) {
        self.compare(CompareOp::Ge, literal::<T>(value));
    }

    /// `path = expr`.
    pub fn eq_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Eq, other.into().node);
    }

    /// `path <> expr`.
    pub fn ne_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Ne, other.into().node);
    }

    /// `path < expr`.
    pub fn lt_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Lt, other.into().node);
    }

    /// `path <= expr`.
    pub fn le_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Le, other.into().node);
    }

    /// `path > expr`.
    pub fn gt_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Gt, other.into().node);
    }

    /// `path >= expr`.
    pub fn ge_expr<U>(&self, other: impl Into<Expr<U>>)
    where
        T: Comparable<U>,
    {
        self.compare(CompareOp::Ge, other.into().node);
    }

    /// `path IN (values)`.
    pub fn is_in<V: IntoLiteral<T>>(&self, values: impl IntoIterator<Item = V>) {
        self.scope.push(ClauseNode::InList {
            operand: self.node(),
            values: values.into_iter().map(IntoLiteral::<T>::into_literal).collect(),
            negated: false,
        });
    }

    /// `path NOT IN (values)`.
    pub fn not_in<V: IntoLiteral<T>>(&self, values: impl IntoIterator<Item = V>) {
        self.scope.push(ClauseNode::InList {
            operand: self.node(),
            values: values.into_iter().map(IntoLiteral::<T>::into_literal).collect(),
            negated: true,
        });
    }

    /// `path IN (subquery)`.
    pub fn in_subquery<U>(&self, subquery: Expr<U>)
    where
        T: Comparable<U>,
    {
        self.scope.push(ClauseNode::InSubquery {
            operand: self.node(),
            subquery: subquery.node,
            negated: false,
        });
    }

    /// `path NOT IN (subquery)`.
    pub fn not_in_subquery<U>(&self, subquery: Expr<U>)
    where
        T: Comparable<U>,
    {
        self.scope.push(ClauseNode::InSubquery {
            operand: self.node(),
            subquery: subquery.node,
            negated: true,
        });
    }

    /// Smallest value.
    pub fn min(&self) -> Expr<T> {
        self.aggregate(AggregateFunction::Min)
    }

    /// Largest value.
    pub fn max(&self) -> Expr<T> {
        self.aggregate(AggregateFunction::Max)
    }
}

impl<'q, T: Numeric> Path<'q, T> {
    /// Sum of values.
    pub fn sum(&self) -> Expr<T::Sum> {
        self.aggregate(AggregateFunction::Sum)
    }

    /// Arithmetic mean of values.
    pub fn avg(&self) -> Expr<f64> {
        self.aggregate(AggregateFunction::Avg)
    }
}

impl<'q, T: Text> Path<'q, T> {
    /// `path LIKE pattern`, with `%` and `_` wildcards.
    pub fn like(&self, pattern: &str) {
        self.scope.push(ClauseNode::Like {
            operand: self.node(),
            pattern: pattern.to_string(),
            negated: false,
        });
    }

    /// `path NOT LIKE pattern`.
    pub fn not_like(&self, pattern: &str) {
        self.scope.push(ClauseNode::Like {
            operand: self.node(),
            pattern: pattern.to_string(),
            negated: true,
        });
    }
}

impl<'q, X> Path<'q, Vec<X>> {
    /// The collection has no elements.
    pub fn is_empty(&self) {
        self.scope.push(ClauseNode::IsEmpty {
            collection: self.attr.clone(),
            negated: false,
        });
    }

    /// The collection has at least one element.
    pub fn is_not_empty(&self) {
        self.scope.push(ClauseNode::IsEmpty {
            collection: self.attr.clone(),
            negated: true,
        });
    }

    /// `value MEMBER OF path`. For relations, `value` is an identity.
    pub fn is_member(&self, value: impl Into<Value>) {
        self.scope.push(ClauseNode::IsMember {
            value: ExprNode::Literal(value.into()),
            collection: self.attr.clone(),
            negated: false,
        });
    }

    /// `value NOT MEMBER OF path`.
    pub fn is_not_member(&self, value: impl Into<Value>) {
        self.scope.push(ClauseNode::IsMember {
            value: ExprNode::Literal(value.into()),
            collection: self.attr.clone(),
            negated: true,
        });
    }
}

impl<'q, T: Entity> Path<'q, T> {
    /// Navigate to an attribute of the related entity.
    pub fn get<U>(&self, attr: Attr<T, U>) -> Path<'q, U> {
        Path::new(self.scope, self.attr.child(attr.name()))
    }

    /// Navigate to a relation of the related entity.
    pub fn rel<U>(&self, rel: Rel<T, U>) -> Path<'q, U> {
        Path::new(self.scope, self.attr.child(rel.name()))
    }

    /// Navigate to an attribute named at runtime.
    pub fn field(&self, name: &str) -> Path<'q, Value> {
        Path::new(self.scope, self.attr.child(name))
    }
}

impl<'q> Path<'q, Value> {
    /// Continue an untyped path; every hop is checked at translation.
    pub fn field(&self, name: &str) -> Path<'q, Value> {
        Path::new(self.scope, self.attr.child(name))
    }
}

fn literal<T>(value: impl IntoLiteral<T>) -> ExprNode {
    ExprNode::Literal(value.into_literal())
}
