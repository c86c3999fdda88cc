//! Translation of recorded builder scopes into the provider IR.
//!
//! Every attribute path is resolved against the catalog here. Explicit
//! joins receive aliases `1..n` in declaration order; navigating a to-one
//! relation without an explicit join adds an implicit INNER join, shared by
//! every path that takes the same hop. Paths owned by an enclosing scope
//! become correlated column references (`level > 0`).

use criteria_proto::{
    AggregateFunction, Collection, ColumnRef, CompareOp, CompiledQuery, FieldValue, JoinKind,
    JoinSpec, Operand, OrderDirection, OrderSpec, Predicate, Projection, RelationRef, SelectItem,
    Value,
};

use super::builder::{JoinDecl, ScopeData, ScopeState, Selection};
use super::clause::{self, ClauseNode, Statement};
use super::expr::{AttrRef, ExprNode, Source};
use super::projection::Shape;
use crate::catalog::{
    Attribute, Cardinality, Catalog, EntityDef, FieldDef, FieldType, RelationDef, ScalarType,
};
use crate::error::Error;

/// A translated query plus the shape of each selected item.
#[derive(Debug, Clone)]
pub(crate) struct Translation {
    pub query: CompiledQuery,
    pub shapes: Vec<Shape>,
}

/// The parts of a translated bulk mutation.
#[derive(Debug, Clone)]
pub(crate) struct MutationParts {
    pub filter: Option<Predicate>,
    pub assignments: Vec<FieldValue>,
    pub parameters: Vec<(String, Value)>,
}

/// Static type of a translated operand.
#[derive(Debug, Clone)]
enum Ty {
    Field(FieldType),
    Value(Value),
    Unknown,
}

impl Ty {
    fn shape(&self) -> Shape {
        match self {
            Ty::Field(ft) => field_shape(ft),
            Ty::Value(v) => value_shape(v),
            Ty::Unknown => Shape::AnyScalar,
        }
    }
}

fn field_shape(ft: &FieldType) -> Shape {
    match ft {
        FieldType::Scalar(s) => Shape::Scalar(*s),
        FieldType::OptionalScalar(s) => Shape::Scalar(*s).nullable(),
        FieldType::ArrayScalar(s) => Shape::Array(*s),
        FieldType::Enum { name, .. } => Shape::Enum(name.clone()),
        FieldType::OptionalEnum { name, .. } => Shape::Enum(name.clone()).nullable(),
    }
}

fn value_shape(value: &Value) -> Shape {
    match value {
        Value::Null => Shape::AnyScalar,
        Value::Bool(_) => Shape::Scalar(ScalarType::Bool),
        Value::Int32(_) => Shape::Scalar(ScalarType::Int32),
        Value::Int64(_) => Shape::Scalar(ScalarType::Int64),
        Value::Float32(_) => Shape::Scalar(ScalarType::Float32),
        Value::Float64(_) => Shape::Scalar(ScalarType::Float64),
        Value::String(_) => Shape::Scalar(ScalarType::String),
        Value::Bytes(_) => Shape::Scalar(ScalarType::Bytes),
        Value::Timestamp(_) => Shape::Scalar(ScalarType::Timestamp),
        Value::Uuid(_) => Shape::Scalar(ScalarType::Uuid),
        Value::BoolArray(_) => Shape::Array(ScalarType::Bool),
        Value::Int32Array(_) => Shape::Array(ScalarType::Int32),
        Value::Int64Array(_) => Shape::Array(ScalarType::Int64),
        Value::Float64Array(_) => Shape::Array(ScalarType::Float64),
        Value::StringArray(_) => Shape::Array(ScalarType::String),
        Value::UuidArray(_) => Shape::Array(ScalarType::Uuid),
    }
}

/// Alias bindings of one scope under translation.
#[derive(Debug)]
struct Frame {
    scope: u64,
    entity: String,
    joins: Vec<JoinSpec>,
    explicit: Vec<u32>,
}

impl Frame {
    fn new(scope: u64, entity: &str) -> Self {
        Self {
            scope,
            entity: entity.to_string(),
            joins: Vec::new(),
            explicit: Vec::new(),
        }
    }

    fn entity_of(&self, alias: u32) -> Option<&str> {
        if alias == 0 {
            return Some(&self.entity);
        }
        self.joins
            .iter()
            .find(|j| j.alias == alias)
            .map(|j| j.entity.as_str())
    }

    fn next_alias(&self) -> u32 {
        self.joins.len() as u32 + 1
    }

    /// Check if rows may lack `alias`: a LEFT join lies between it and
    /// the root.
    fn is_optional(&self, alias: u32) -> bool {
        let mut current = alias;
        while let Some(join) = self.joins.iter().find(|j| j.alias == current) {
            if join.kind == JoinKind::Left {
                return true;
            }
            current = join.parent;
        }
        false
    }

    fn find_join(&self, parent: u32, relation: &str) -> Option<u32> {
        self.joins
            .iter()
            .find(|j| j.parent == parent && j.relation == relation)
            .map(|j| j.alias)
    }

    fn push_join(&mut self, parent: u32, relation: &RelationDef, kind: JoinKind) -> u32 {
        let alias = self.next_alias();
        self.joins.push(JoinSpec {
            alias,
            parent,
            relation: relation.name.clone(),
            entity: relation.to_entity.clone(),
            parent_field: relation.from_field.clone(),
            entity_field: relation.to_field.clone(),
            kind,
        });
        alias
    }
}

/// What an attribute path resolved to.
enum Resolved<'c> {
    Field {
        column: ColumnRef,
        field: &'c FieldDef,
    },
    Relation {
        level: u32,
        alias: u32,
        relation: &'c RelationDef,
    },
    Entity {
        level: u32,
        alias: u32,
        entity: String,
    },
}

/// Translates builder scopes against a catalog.
pub(crate) struct Translator<'c> {
    catalog: &'c Catalog,
    frames: Vec<Frame>,
    parameters: Vec<(String, Value)>,
}

impl<'c> Translator<'c> {
    pub(crate) fn new(catalog: &'c Catalog) -> Self {
        Self {
            catalog,
            frames: Vec::new(),
            parameters: Vec::new(),
        }
    }

    /// Translate a top-level query body.
    pub(crate) fn translate_query(mut self, data: &ScopeData) -> Result<Translation, Error> {
        let (mut query, shapes, _) = self.scope(data, None)?;
        query.parameters = self.parameters;
        Ok(Translation { query, shapes })
    }

    /// Translate a bulk update or delete body.
    ///
    /// The filter must stay on the root entity: explicit joins and relation
    /// hops are rejected. Nested subqueries may join freely.
    pub(crate) fn translate_mutation(mut self, data: &ScopeData) -> Result<MutationParts, Error> {
        let catalog = self.catalog;
        let entity = catalog.entity(data.entity)?;
        if let Some(join) = data.state.joins.first() {
            return Err(Error::path(
                data.entity,
                &join.relation,
                "bulk mutations cannot join relations",
            ));
        }

        self.frames.push(Frame::new(data.id, data.entity));
        let filter = self.filter(data.entity, &data.state);
        let frame = self.frames.pop();
        let filter = filter?;
        if let Some(join) = frame.as_ref().and_then(|f| f.joins.first()) {
            return Err(Error::path(
                data.entity,
                &join.relation,
                "bulk mutations cannot navigate relations",
            ));
        }

        let mut assignments = Vec::with_capacity(data.state.assignments.len());
        for (field, node) in &data.state.assignments {
            assignments.push(self.assignment(entity, field, node)?);
        }

        Ok(MutationParts {
            filter,
            assignments,
            parameters: self.parameters,
        })
    }

    /// Translate one scope. `selection` is set for subqueries, whose body
    /// returns the selected expression.
    fn scope(
        &mut self,
        data: &ScopeData,
        selection: Option<&ExprNode>,
    ) -> Result<(CompiledQuery, Vec<Shape>, Vec<Ty>), Error> {
        self.catalog.entity(data.entity)?;
        self.frames.push(Frame::new(data.id, data.entity));
        let body = self.body(data, selection);
        let frame = self.frames.pop();
        let (mut query, shapes, types) = body?;
        if let Some(frame) = frame {
            query.joins = frame.joins;
        }
        Ok((query, shapes, types))
    }

    fn body(
        &mut self,
        data: &ScopeData,
        selection: Option<&ExprNode>,
    ) -> Result<(CompiledQuery, Vec<Shape>, Vec<Ty>), Error> {
        let state = &data.state;
        for decl in &state.joins {
            self.declare_join(data.entity, decl)?;
        }

        let mut query = CompiledQuery::new(data.entity);
        query.filter = self.filter(data.entity, state)?;

        let items: Vec<&ExprNode> = match (selection, &state.selection) {
            (Some(_), Some(_)) => {
                return Err(Error::path(
                    data.entity,
                    data.entity,
                    "a subquery selects the expression its body returns; `select` is not allowed",
                ))
            }
            (Some(node), None) => vec![node],
            (None, None) => Vec::new(),
            (None, Some(Selection::Single(node))) => vec![node],
            (None, Some(Selection::Tuple(nodes))) => nodes.iter().collect(),
        };

        let (shapes, types) = if items.is_empty() {
            (vec![Shape::Entity(data.entity.to_string())], vec![Ty::Unknown])
        } else {
            let mut select = Vec::with_capacity(items.len());
            let mut shapes = Vec::with_capacity(items.len());
            let mut types = Vec::with_capacity(items.len());
            for node in &items {
                let (item, shape, ty) = self.select_item(node)?;
                if selection.is_some() && matches!(item, SelectItem::Entity { .. }) {
                    return Err(Error::path(
                        data.entity,
                        &node.label(),
                        "a subquery must select a single value",
                    ));
                }
                select.push(item);
                shapes.push(shape);
                types.push(ty);
            }
            let projection = Projection::Items(select);
            let aggregates = match &projection {
                Projection::Items(items) => items
                    .iter()
                    .filter(|i| matches!(i, SelectItem::Expr(op) if op.is_aggregate()))
                    .count(),
                Projection::Root => 0,
            };
            if aggregates > 0 && aggregates < projection.width() {
                return Err(Error::path(
                    data.entity,
                    &items[0].label(),
                    "aggregates cannot be mixed with per-row selections",
                ));
            }
            query.projection = projection;
            (shapes, types)
        };

        for (node, direction) in &state.order_by {
            let order = self.order(data.entity, node, *direction)?;
            query.order_by.push(order);
        }
        query.distinct = state.distinct;

        Ok((query, shapes, types))
    }

    fn declare_join(&mut self, root: &str, decl: &JoinDecl) -> Result<(), Error> {
        let catalog = self.catalog;
        let frame = self.current_frame(root)?;
        let parent = match decl.parent {
            Source::Root => 0,
            Source::Join(index) => frame
                .explicit
                .get(index)
                .copied()
                .ok_or_else(|| Error::path(root, &decl.relation, "join parent is not declared"))?,
        };
        let parent_entity = frame
            .entity_of(parent)
            .ok_or_else(|| Error::path(root, &decl.relation, "join parent is not bound"))?
            .to_string();
        let relation = catalog
            .relation(&parent_entity, &decl.relation)
            .ok_or_else(|| Error::path(&parent_entity, &decl.relation, "unknown relation"))?;

        if relation.to_entity != decl.entity {
            return Err(Error::mismatch(
                format!("{}.{}", parent_entity, decl.relation),
                relation.to_entity.clone(),
                decl.entity,
            ));
        }
        if relation.is_to_many() != decl.to_many {
            let reason = if decl.to_many {
                "relation is to-one; use join"
            } else {
                "relation is to-many; use join_many"
            };
            return Err(Error::path(&parent_entity, &decl.relation, reason));
        }

        let alias = frame.push_join(parent, relation, decl.kind);
        frame.explicit.push(alias);
        Ok(())
    }

    fn current_frame(&mut self, root: &str) -> Result<&mut Frame, Error> {
        self.frames
            .last_mut()
            .ok_or_else(|| Error::path(root, root, "no query scope is open"))
    }

    fn filter(&mut self, entity: &str, state: &ScopeState) -> Result<Option<Predicate>, Error> {
        let clauses = clause::tag(state.statements.iter().map(Statement::as_ref));
        let mut translated = Vec::with_capacity(clauses.len());
        for clause in clauses {
            translated.push(clause.try_map(|node| self.predicate(entity, node))?);
        }
        Ok(clause::fold(translated, Predicate::and, Predicate::or))
    }

    fn predicate(&mut self, entity: &str, node: &ClauseNode) -> Result<Predicate, Error> {
        match node {
            ClauseNode::Compare { left, op, right } => {
                let (l, lt) = self.operand(entity, left)?;
                let (r, rt) = self.operand(entity, right)?;
                check_compare(&left.label(), &lt, *op, &rt)?;
                Ok(Predicate::Compare {
                    left: l,
                    op: *op,
                    right: r,
                })
            }
            ClauseNode::Like {
                operand,
                pattern,
                negated,
            } => {
                let (o, ty) = self.operand(entity, operand)?;
                match &ty {
                    Ty::Field(ft) if !ft.is_text() => {
                        return Err(Error::mismatch(operand.label(), "text", ft.describe()));
                    }
                    Ty::Value(v) if !v.is_null() && v.as_str().is_none() => {
                        return Err(Error::mismatch(operand.label(), "text", v.type_name()));
                    }
                    _ => {}
                }
                Ok(Predicate::Like {
                    operand: o,
                    pattern: pattern.clone(),
                    negated: *negated,
                })
            }
            ClauseNode::InList {
                operand,
                values,
                negated,
            } => {
                let (o, ty) = self.operand(entity, operand)?;
                if let Ty::Field(ft) = &ty {
                    if let Some(bad) = values.iter().find(|v| !v.is_null() && !ft.accepts(v)) {
                        return Err(Error::mismatch(
                            operand.label(),
                            ft.describe(),
                            bad.type_name(),
                        ));
                    }
                }
                Ok(Predicate::InList {
                    operand: o,
                    values: values.clone(),
                    negated: *negated,
                })
            }
            ClauseNode::InSubquery {
                operand,
                subquery,
                negated,
            } => {
                let (o, ty) = self.operand(entity, operand)?;
                let ExprNode::Subquery(sub) = subquery else {
                    return Err(Error::path(
                        entity,
                        &operand.label(),
                        "IN requires a subquery",
                    ));
                };
                let (compiled, _, types) = self.scope(&sub.scope, Some(&sub.selection))?;
                let selected = types.into_iter().next().unwrap_or(Ty::Unknown);
                check_compare(&operand.label(), &ty, CompareOp::Eq, &selected)?;
                Ok(Predicate::InSubquery {
                    operand: o,
                    subquery: Box::new(compiled),
                    negated: *negated,
                })
            }
            ClauseNode::IsNull { operand, negated } => {
                if let ExprNode::Path(attr) = operand {
                    if let Resolved::Relation {
                        level,
                        alias,
                        relation,
                    } = self.resolve(attr)?
                    {
                        return self.relation_is_null(attr, level, alias, relation, *negated);
                    }
                }
                let (o, _) = self.operand(entity, operand)?;
                Ok(Predicate::IsNull {
                    operand: o,
                    negated: *negated,
                })
            }
            ClauseNode::IsEmpty {
                collection,
                negated,
            } => {
                let (collection, _) = self.collection(collection)?;
                Ok(Predicate::IsEmpty {
                    collection,
                    negated: *negated,
                })
            }
            ClauseNode::IsMember {
                value,
                collection,
                negated,
            } => {
                let (v, ty) = self.operand(entity, value)?;
                let (coll, element) = self.collection(collection)?;
                if let Ty::Value(val) = &ty {
                    if !val.is_null() && !element.accepts(val) {
                        return Err(Error::mismatch(
                            collection.to_string(),
                            element.describe(),
                            val.type_name(),
                        ));
                    }
                }
                Ok(Predicate::IsMember {
                    value: v,
                    collection: coll,
                    negated: *negated,
                })
            }
        }
    }

    /// `relation IS NULL`: a null foreign key when the key lives on the
    /// owning side, no related row otherwise.
    fn relation_is_null(
        &self,
        attr: &AttrRef,
        level: u32,
        alias: u32,
        relation: &RelationDef,
        negated: bool,
    ) -> Result<Predicate, Error> {
        let owner = self.catalog.entity(&relation.from_entity)?;
        match relation.cardinality {
            Cardinality::OneToMany => Err(Error::mismatch(
                attr.to_string(),
                "to-one relation",
                "to-many relation",
            )),
            _ if relation.from_field != owner.identity_field => Ok(Predicate::IsNull {
                operand: Operand::Column(ColumnRef::outer(level, alias, &relation.from_field)),
                negated,
            }),
            _ => Ok(Predicate::IsEmpty {
                collection: Collection::Relation(self.relation_ref(level, alias, relation)?),
                negated,
            }),
        }
    }

    fn relation_ref(
        &self,
        level: u32,
        alias: u32,
        relation: &RelationDef,
    ) -> Result<RelationRef, Error> {
        let target = self.catalog.entity(&relation.to_entity)?;
        Ok(RelationRef {
            level,
            alias,
            relation: relation.name.clone(),
            entity: relation.to_entity.clone(),
            parent_field: relation.from_field.clone(),
            entity_field: relation.to_field.clone(),
            identity_field: target.identity_field.clone(),
        })
    }

    /// Resolve a collection-valued path; returns the collection and the
    /// type of its elements.
    fn collection(&mut self, attr: &AttrRef) -> Result<(Collection, FieldType), Error> {
        match self.resolve(attr)? {
            Resolved::Field { column, field } => match &field.field_type {
                FieldType::ArrayScalar(s) => {
                    Ok((Collection::Attribute(column), FieldType::Scalar(*s)))
                }
                other => Err(Error::mismatch(
                    attr.to_string(),
                    "collection",
                    other.describe(),
                )),
            },
            Resolved::Relation {
                level,
                alias,
                relation,
            } if relation.is_to_many() => {
                let target = self.catalog.entity(&relation.to_entity)?;
                let identity = identity_type(target)?;
                let reference = self.relation_ref(level, alias, relation)?;
                Ok((Collection::Relation(reference), identity))
            }
            Resolved::Relation { .. } => Err(Error::mismatch(
                attr.to_string(),
                "collection",
                "to-one relation",
            )),
            Resolved::Entity { entity, .. } => Err(Error::mismatch(
                attr.to_string(),
                "collection",
                format!("entity {}", entity),
            )),
        }
    }

    fn operand(&mut self, entity: &str, node: &ExprNode) -> Result<(Operand, Ty), Error> {
        match node {
            ExprNode::Path(attr) => match self.resolve(attr)? {
                Resolved::Field { column, field } => {
                    Ok((Operand::Column(column), Ty::Field(field.field_type.clone())))
                }
                Resolved::Relation { relation, .. } => Err(Error::path(
                    &relation.from_entity,
                    &attr.to_string(),
                    format!("relation `{}` is not a value", relation.name),
                )),
                Resolved::Entity { entity, .. } => Err(Error::path(
                    &entity,
                    &attr.to_string(),
                    "an entity is not a value",
                )),
            },
            ExprNode::Literal(value) => Ok((Operand::Literal(value.clone()), Ty::Value(value.clone()))),
            ExprNode::Parameter { name, value } => {
                self.bind(name, value)?;
                Ok((Operand::Parameter(name.clone()), Ty::Value(value.clone())))
            }
            ExprNode::Subquery(sub) => {
                let (compiled, _, types) = self.scope(&sub.scope, Some(&sub.selection))?;
                let ty = types.into_iter().next().unwrap_or(Ty::Unknown);
                Ok((Operand::Subquery(Box::new(compiled)), ty))
            }
            ExprNode::Aggregate { .. } => Err(Error::path(
                entity,
                &node.label(),
                "aggregates are only allowed in selections",
            )),
        }
    }

    fn aggregate(
        &mut self,
        entity: &str,
        function: AggregateFunction,
        path: Option<&AttrRef>,
    ) -> Result<(Operand, Ty), Error> {
        let label = ExprNode::Aggregate {
            function,
            path: path.cloned(),
        }
        .label();

        let (column, field_type) = match path {
            None => (None, None),
            Some(attr) => match self.resolve(attr)? {
                Resolved::Field { column, field } => (Some(column), Some(field.field_type.clone())),
                _ => {
                    return Err(Error::path(
                        entity,
                        &label,
                        "aggregates apply to stored attributes",
                    ))
                }
            },
        };

        let ty = match (function, &field_type) {
            (AggregateFunction::Count, _) => FieldType::Scalar(ScalarType::Int64),
            (_, None) => {
                return Err(Error::path(entity, &label, "aggregate requires an attribute"));
            }
            (AggregateFunction::Sum | AggregateFunction::Avg, Some(ft)) => {
                let numeric = !ft.is_array() && ft.scalar_type().is_some_and(|s| s.is_numeric());
                if !numeric {
                    return Err(Error::mismatch(label, "numeric", ft.describe()));
                }
                match (function, ft.scalar_type()) {
                    (AggregateFunction::Avg, _) => FieldType::OptionalScalar(ScalarType::Float64),
                    (_, Some(ScalarType::Int32 | ScalarType::Int64)) => {
                        FieldType::OptionalScalar(ScalarType::Int64)
                    }
                    _ => FieldType::OptionalScalar(ScalarType::Float64),
                }
            }
            (AggregateFunction::Min | AggregateFunction::Max, Some(ft)) => {
                if !ft.is_orderable() {
                    return Err(Error::mismatch(label, "orderable type", ft.describe()));
                }
                ft.clone().into_optional()
            }
        };

        Ok((Operand::Aggregate { function, column }, Ty::Field(ty)))
    }

    fn select_item(&mut self, node: &ExprNode) -> Result<(SelectItem, Shape, Ty), Error> {
        match node {
            ExprNode::Path(attr) => match self.resolve(attr)? {
                Resolved::Field { column, field } => {
                    let ty = Ty::Field(field.field_type.clone());
                    let mut shape = ty.shape();
                    if self.is_optional(column.level, column.alias) {
                        shape = shape.nullable();
                    }
                    Ok((SelectItem::Expr(Operand::Column(column)), shape, ty))
                }
                Resolved::Relation {
                    level,
                    alias,
                    relation,
                } => {
                    if relation.is_to_many() {
                        return Err(Error::path(
                            &relation.from_entity,
                            &attr.to_string(),
                            "a to-many relation is selected through join_many",
                        ));
                    }
                    if level > 0 {
                        return Err(Error::path(
                            &relation.from_entity,
                            &attr.to_string(),
                            "cannot select an entity of an enclosing query",
                        ));
                    }
                    let frame = self.frames.len() - 1;
                    let alias = self.hop(frame, alias, relation, attr)?;
                    let mut shape = Shape::Entity(relation.to_entity.clone());
                    if self.is_optional(0, alias) {
                        shape = shape.nullable();
                    }
                    Ok((SelectItem::Entity { alias }, shape, Ty::Unknown))
                }
                Resolved::Entity {
                    level,
                    alias,
                    entity,
                } => {
                    if level > 0 {
                        return Err(Error::path(
                            &entity,
                            &attr.to_string(),
                            "cannot select an entity of an enclosing query",
                        ));
                    }
                    let mut shape = Shape::Entity(entity);
                    if self.is_optional(0, alias) {
                        shape = shape.nullable();
                    }
                    Ok((SelectItem::Entity { alias }, shape, Ty::Unknown))
                }
            },
            ExprNode::Aggregate { function, path } => {
                let entity = self.scope_entity();
                let (operand, ty) = self.aggregate(&entity, *function, path.as_ref())?;
                Ok((SelectItem::Expr(operand), ty.shape(), ty))
            }
            other => {
                let entity = self.scope_entity();
                let (operand, ty) = self.operand(&entity, other)?;
                Ok((SelectItem::Expr(operand), ty.shape(), ty))
            }
        }
    }

    /// Check if an alias of the frame `level` scopes out may be absent.
    fn is_optional(&self, level: u32, alias: u32) -> bool {
        self.frames
            .len()
            .checked_sub(1 + level as usize)
            .and_then(|index| self.frames.get(index))
            .is_some_and(|frame| frame.is_optional(alias))
    }

    fn scope_entity(&self) -> String {
        self.frames
            .last()
            .map(|f| f.entity.clone())
            .unwrap_or_default()
    }

    fn order(
        &mut self,
        entity: &str,
        node: &ExprNode,
        direction: OrderDirection,
    ) -> Result<OrderSpec, Error> {
        let (operand, ty) = match node {
            ExprNode::Path(_) => self.operand(entity, node)?,
            other => {
                return Err(Error::path(
                    entity,
                    &other.label(),
                    "ordering requires an attribute path",
                ))
            }
        };
        if let Ty::Field(ft) = &ty {
            if !ft.is_orderable() {
                return Err(Error::mismatch(node.label(), "orderable type", ft.describe()));
            }
        }
        match operand {
            Operand::Column(column) if column.level == 0 => Ok(OrderSpec { column, direction }),
            _ => Err(Error::path(
                entity,
                &node.label(),
                "cannot order by an attribute of an enclosing query",
            )),
        }
    }

    fn assignment(
        &mut self,
        entity: &EntityDef,
        name: &str,
        node: &ExprNode,
    ) -> Result<FieldValue, Error> {
        let path = format!("{}.{}", entity.name, name);
        let field = match self.catalog.attribute(&entity.name, name) {
            Some(Attribute::Field(field)) => field,
            Some(Attribute::Relation(_)) => {
                return Err(Error::path(&entity.name, &path, "relations cannot be assigned"));
            }
            None => {
                return Err(Error::path(
                    &entity.name,
                    &path,
                    format!("unknown attribute `{}`", name),
                ));
            }
        };
        if field.field_type.is_array() {
            return Err(Error::path(
                &entity.name,
                &path,
                "element collections cannot be assigned in bulk",
            ));
        }

        let value = match node {
            ExprNode::Literal(value) => value.clone(),
            ExprNode::Parameter { name, value } => {
                self.bind(name, value)?;
                value.clone()
            }
            other => {
                return Err(Error::mismatch(path, "literal or parameter", other.label()));
            }
        };
        if !field.field_type.accepts(&value) {
            return Err(Error::mismatch(
                path,
                field.field_type.describe(),
                value.type_name(),
            ));
        }
        Ok(FieldValue::new(field.name.clone(), value))
    }

    fn bind(&mut self, name: &str, value: &Value) -> Result<(), Error> {
        match self.parameters.iter().find(|(n, _)| n == name) {
            Some((_, existing)) if existing == value => Ok(()),
            Some((_, existing)) => Err(Error::mismatch(
                format!(":{}", name),
                format!("{:?}", existing),
                format!("{:?}", value),
            )),
            None => {
                self.parameters.push((name.to_string(), value.clone()));
                Ok(())
            }
        }
    }

    /// Resolve an attribute path to a column, a relation or a bound entity.
    fn resolve(&mut self, attr: &AttrRef) -> Result<Resolved<'c>, Error> {
        let catalog = self.catalog;
        let path = attr.to_string();
        let index = self
            .frames
            .iter()
            .rposition(|f| f.scope == attr.scope)
            .ok_or_else(|| {
                Error::path(attr.entity, &path, "path belongs to a query that is not in scope")
            })?;
        let level = (self.frames.len() - 1 - index) as u32;

        let frame = &self.frames[index];
        let mut alias = match attr.source {
            Source::Root => 0,
            Source::Join(i) => frame
                .explicit
                .get(i)
                .copied()
                .ok_or_else(|| Error::path(attr.entity, &path, "join is not declared"))?,
        };
        let mut entity = frame
            .entity_of(alias)
            .ok_or_else(|| Error::path(attr.entity, &path, "alias is not bound"))?
            .to_string();

        let Some((last, middle)) = attr.hops.split_last() else {
            return Ok(Resolved::Entity {
                level,
                alias,
                entity,
            });
        };

        for hop in middle {
            match catalog.attribute(&entity, hop) {
                Some(Attribute::Relation(relation)) => {
                    alias = self.hop(index, alias, relation, attr)?;
                    entity = relation.to_entity.clone();
                }
                Some(Attribute::Field(_)) => {
                    return Err(Error::path(
                        &entity,
                        &path,
                        format!("`{}` is not a relation", hop),
                    ));
                }
                None => {
                    return Err(Error::path(
                        &entity,
                        &path,
                        format!("unknown attribute `{}`", hop),
                    ));
                }
            }
        }

        match catalog.attribute(&entity, last) {
            Some(Attribute::Field(field)) => Ok(Resolved::Field {
                column: ColumnRef::outer(level, alias, &field.name),
                field,
            }),
            Some(Attribute::Relation(relation)) => Ok(Resolved::Relation {
                level,
                alias,
                relation,
            }),
            None => Err(Error::path(
                &entity,
                &path,
                format!("unknown attribute `{}`", last),
            )),
        }
    }

    /// Alias reached by following `relation` from `parent` in frame
    /// `index`, adding an implicit INNER join on first use.
    fn hop(
        &mut self,
        index: usize,
        parent: u32,
        relation: &RelationDef,
        attr: &AttrRef,
    ) -> Result<u32, Error> {
        let frame = &mut self.frames[index];
        if let Some(alias) = frame.find_join(parent, &relation.name) {
            return Ok(alias);
        }
        if relation.is_to_many() {
            return Err(Error::path(
                &relation.from_entity,
                &attr.to_string(),
                format!(
                    "`{}` is a to-many relation and must be joined explicitly",
                    relation.name
                ),
            ));
        }
        let alias = frame.push_join(parent, relation, JoinKind::Inner);
        tracing::trace!(
            relation = %relation.name,
            alias,
            "Added implicit join"
        );
        Ok(alias)
    }
}

fn identity_type(entity: &EntityDef) -> Result<FieldType, Error> {
    entity
        .identity()
        .map(|f| f.field_type.clone())
        .ok_or_else(|| Error::InvalidSchema(format!("entity {} has no identity field", entity.name)))
}

fn check_compare(label: &str, left: &Ty, op: CompareOp, right: &Ty) -> Result<(), Error> {
    if op.is_ordering() {
        for ty in [left, right] {
            if let Ty::Field(ft) = ty {
                if !ft.is_orderable() {
                    return Err(Error::mismatch(label, "orderable type", ft.describe()));
                }
            }
        }
    }
    match (left, right) {
        (Ty::Field(a), Ty::Field(b)) if !a.comparable_with(b) => {
            Err(Error::mismatch(label, a.describe(), b.describe()))
        }
        (Ty::Field(ft), Ty::Value(v)) | (Ty::Value(v), Ty::Field(ft))
            if !v.is_null() && !ft.accepts(v) =>
        {
            Err(Error::mismatch(label, ft.describe(), v.type_name()))
        }
        _ => Ok(()),
    }
}
