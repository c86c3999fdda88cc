//! Compiled query IR handed to a provider.
//!
//! The engine translates a predicate-builder body into a [`CompiledQuery`]:
//! a root entity, an ordered list of joins addressed by numeric alias, a
//! predicate tree, a projection and optional ordering/paging. Alias `0` is
//! always the root entity; join aliases start at `1` and a join's parent
//! alias is always smaller than its own.

use crate::value::Value;
use serde::{Deserialize, Serialize};

/// Aggregate function types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AggregateFunction {
    /// Count of non-null values (or rows when no column is given).
    Count,
    /// Sum of numeric values.
    Sum,
    /// Average of numeric values.
    Avg,
    /// Minimum value.
    Min,
    /// Maximum value.
    Max,
}

/// How a joined entity combines with its parent rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JoinKind {
    /// Drop parent rows without a related row.
    #[default]
    Inner,
    /// Keep parent rows without a related row, with the joined alias null.
    Left,
}

/// A join of a related entity onto an already-bound alias.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    /// Alias assigned to the joined entity.
    pub alias: u32,
    /// Alias of the entity the relation starts from.
    pub parent: u32,
    /// Relation name on the parent entity.
    pub relation: String,
    /// Joined entity name.
    pub entity: String,
    /// Field on the parent row compared for the join.
    pub parent_field: String,
    /// Field on the joined row compared for the join.
    pub entity_field: String,
    /// Join kind.
    pub kind: JoinKind,
}

/// Reference to an attribute of a bound alias.
///
/// `level` counts enclosing queries: `0` is the query the reference appears
/// in, `1` its immediately enclosing query (correlated subqueries), etc.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    /// Enclosing-query depth.
    pub level: u32,
    /// Alias within that query.
    pub alias: u32,
    /// Attribute name.
    pub field: String,
}

impl ColumnRef {
    /// Attribute of the root entity of the current query.
    pub fn root(field: impl Into<String>) -> Self {
        Self::new(0, field)
    }

    /// Attribute of an alias in the current query.
    pub fn new(alias: u32, field: impl Into<String>) -> Self {
        Self {
            level: 0,
            alias,
            field: field.into(),
        }
    }

    /// Attribute of an alias in an enclosing query.
    pub fn outer(level: u32, alias: u32, field: impl Into<String>) -> Self {
        Self {
            level,
            alias,
            field: field.into(),
        }
    }
}

/// Reference to a to-many relation of a bound alias, used by emptiness and
/// membership tests without joining the relation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationRef {
    /// Enclosing-query depth.
    pub level: u32,
    /// Alias the relation starts from.
    pub alias: u32,
    /// Relation name.
    pub relation: String,
    /// Related entity name.
    pub entity: String,
    /// Field on the owning row.
    pub parent_field: String,
    /// Field on the related rows.
    pub entity_field: String,
    /// Identity field of the related entity (compared by membership tests).
    pub identity_field: String,
}

/// A collection-valued operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Collection {
    /// A to-many relation.
    Relation(RelationRef),
    /// An element-collection attribute holding an array value.
    Attribute(ColumnRef),
}

/// A value-producing operand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    /// Attribute value.
    Column(ColumnRef),
    /// Inline literal.
    Literal(Value),
    /// Named parameter, bound in [`CompiledQuery::parameters`] of the
    /// outermost query.
    Parameter(String),
    /// Scalar subquery: first cell of the first row, or null.
    Subquery(Box<CompiledQuery>),
    /// Aggregate over the rows of the query it appears in.
    Aggregate {
        /// Aggregate function.
        function: AggregateFunction,
        /// Aggregated column (`None` counts rows).
        column: Option<ColumnRef>,
    },
}

impl Operand {
    /// Column operand.
    pub fn column(column: ColumnRef) -> Self {
        Operand::Column(column)
    }

    /// Literal operand.
    pub fn literal(value: impl Into<Value>) -> Self {
        Operand::Literal(value.into())
    }

    /// Check if this operand is an aggregate.
    pub fn is_aggregate(&self) -> bool {
        matches!(self, Operand::Aggregate { .. })
    }
}

/// Binary comparison operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompareOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

impl CompareOp {
    /// Check if this operator needs an ordered type.
    pub fn is_ordering(&self) -> bool {
        matches!(self, CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge)
    }
}

/// Predicate tree evaluated per row by the provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Predicate {
    /// Binary comparison.
    Compare {
        left: Operand,
        op: CompareOp,
        right: Operand,
    },
    /// SQL LIKE pattern match (`%`, `_`, backslash escapes).
    Like {
        operand: Operand,
        pattern: String,
        negated: bool,
    },
    /// Membership in a literal list.
    InList {
        operand: Operand,
        values: Vec<Value>,
        negated: bool,
    },
    /// Membership in the first column of a subquery.
    InSubquery {
        operand: Operand,
        subquery: Box<CompiledQuery>,
        negated: bool,
    },
    /// Null test.
    IsNull { operand: Operand, negated: bool },
    /// Emptiness test of a collection.
    IsEmpty { collection: Collection, negated: bool },
    /// Value is an element of a collection.
    IsMember {
        value: Operand,
        collection: Collection,
        negated: bool,
    },
    /// Conjunction.
    And(Box<Predicate>, Box<Predicate>),
    /// Disjunction.
    Or(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Create a comparison predicate.
    pub fn compare(left: Operand, op: CompareOp, right: Operand) -> Self {
        Predicate::Compare { left, op, right }
    }

    /// Create an equality predicate between a column and a literal.
    pub fn eq(column: ColumnRef, value: impl Into<Value>) -> Self {
        Self::compare(Operand::Column(column), CompareOp::Eq, Operand::literal(value))
    }

    /// Create a LIKE predicate on a column.
    pub fn like(column: ColumnRef, pattern: impl Into<String>) -> Self {
        Predicate::Like {
            operand: Operand::Column(column),
            pattern: pattern.into(),
            negated: false,
        }
    }

    /// Combine with `other` using AND (`self` on the left).
    pub fn and(self, other: Predicate) -> Self {
        Predicate::And(Box::new(self), Box::new(other))
    }

    /// Combine with `other` using OR (`self` on the left).
    pub fn or(self, other: Predicate) -> Self {
        Predicate::Or(Box::new(self), Box::new(other))
    }
}

/// One selected item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SelectItem {
    /// Whole entity bound to an alias (null when a LEFT join found nothing).
    Entity { alias: u32 },
    /// Scalar expression.
    Expr(Operand),
}

/// Shape of the rows a query returns.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Projection {
    /// The root entity, one cell per row.
    #[default]
    Root,
    /// Explicit items, one cell per item.
    Items(Vec<SelectItem>),
}

impl Projection {
    /// Check if any selected item aggregates.
    ///
    /// An aggregating projection produces exactly one row.
    pub fn is_aggregate(&self) -> bool {
        match self {
            Projection::Root => false,
            Projection::Items(items) => items
                .iter()
                .any(|item| matches!(item, SelectItem::Expr(op) if op.is_aggregate())),
        }
    }

    /// Number of cells per row.
    pub fn width(&self) -> usize {
        match self {
            Projection::Root => 1,
            Projection::Items(items) => items.len(),
        }
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderDirection {
    /// Ascending order.
    #[default]
    Asc,
    /// Descending order.
    Desc,
}

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Column to order by.
    pub column: ColumnRef,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(column: ColumnRef) -> Self {
        Self {
            column,
            direction: OrderDirection::Desc,
        }
    }
}

/// Offset/limit window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pagination {
    /// Maximum number of rows to return.
    pub limit: u32,
    /// Number of rows to skip.
    pub offset: u32,
}

impl Pagination {
    /// Create pagination with limit and offset.
    pub fn new(limit: u32, offset: u32) -> Self {
        Self { limit, offset }
    }

    /// Create pagination with just a limit.
    pub fn limit(limit: u32) -> Self {
        Self { limit, offset: 0 }
    }
}

/// A fully translated query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledQuery {
    /// Root entity name (alias `0`).
    pub root_entity: String,
    /// Joins in dependency order.
    pub joins: Vec<JoinSpec>,
    /// Row filter; `None` matches every row.
    pub filter: Option<Predicate>,
    /// Selected shape.
    pub projection: Projection,
    /// Remove duplicate projected rows.
    pub distinct: bool,
    /// Ordering specification.
    pub order_by: Vec<OrderSpec>,
    /// Window over the ordered rows.
    pub pagination: Option<Pagination>,
    /// Bound parameters (outermost query only).
    pub parameters: Vec<(String, Value)>,
}

impl CompiledQuery {
    /// Create a query selecting every row of an entity.
    pub fn new(root_entity: impl Into<String>) -> Self {
        Self {
            root_entity: root_entity.into(),
            joins: vec![],
            filter: None,
            projection: Projection::Root,
            distinct: false,
            order_by: vec![],
            pagination: None,
            parameters: vec![],
        }
    }

    /// Add a join.
    pub fn with_join(mut self, join: JoinSpec) -> Self {
        self.joins.push(join);
        self
    }

    /// Set the filter.
    pub fn with_filter(mut self, filter: Predicate) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Set the projection.
    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    /// Add ordering.
    pub fn with_order(mut self, order: OrderSpec) -> Self {
        self.order_by.push(order);
        self
    }

    /// Set pagination.
    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    /// Bind a parameter.
    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.push((name.into(), value.into()));
        self
    }

    /// Look up a bound parameter.
    pub fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Get the join bound to an alias.
    pub fn join(&self, alias: u32) -> Option<&JoinSpec> {
        self.joins.iter().find(|j| j.alias == alias)
    }

    /// Entity bound to an alias.
    pub fn entity_of(&self, alias: u32) -> Option<&str> {
        if alias == 0 {
            Some(&self.root_entity)
        } else {
            self.join(alias).map(|j| j.entity.as_str())
        }
    }
}
