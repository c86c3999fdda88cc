//! Evaluation of compiled queries over in-memory records.
//!
//! Rows are bound as tuples with one slot per alias: the root record in
//! slot `0` and each join's record (or `None` after a LEFT join miss) in
//! the slot of its alias. Predicates use SQL three-valued logic: a
//! comparison involving NULL is unknown, and a filter keeps a row only when
//! it evaluates to true.

use std::cmp::Ordering;
use std::collections::HashMap;

use criteria_proto::{
    AggregateFunction, Cell, Collection, ColumnRef, CompareOp, CompiledQuery, Error, JoinKind,
    JoinSpec, Operand, OrderDirection, OrderSpec, Predicate, Projection, Record, Row, SelectItem,
    Value,
};

/// Records per entity name.
pub type Tables = HashMap<String, Vec<Record>>;

/// A bound row: one optional record per alias.
type Tuple<'t> = Vec<Option<&'t Record>>;

/// Evaluates compiled queries against a set of tables.
pub struct Evaluator<'t> {
    tables: &'t Tables,
    parameters: &'t [(String, Value)],
}

impl<'t> Evaluator<'t> {
    /// Create an evaluator over `tables` with bound parameters.
    pub fn new(tables: &'t Tables, parameters: &'t [(String, Value)]) -> Self {
        Self { tables, parameters }
    }

    fn table(&self, entity: &str) -> Result<&'t [Record], Error> {
        self.tables
            .get(entity)
            .map(Vec::as_slice)
            .ok_or_else(|| Error::UnknownEntity(entity.to_string()))
    }

    /// Run a query: bind, filter, order, project, deduplicate and paginate.
    pub fn run(&self, query: &CompiledQuery) -> Result<Vec<Row>, Error> {
        self.run_nested(query, &[])
    }

    /// Check whether a record of `entity` matches a filter.
    pub fn matches(&self, filter: &Predicate, record: &'t Record) -> Result<bool, Error> {
        let tuple: Tuple<'t> = vec![Some(record)];
        Ok(self.test(filter, &tuple, &[])? == Some(true))
    }

    fn run_nested(&self, query: &CompiledQuery, outer: &[&Tuple<'t>]) -> Result<Vec<Row>, Error> {
        let mut tuples = self.bind(query, outer)?;

        let mut rows = if query.projection.is_aggregate() {
            vec![self.aggregate_row(&query.projection, &tuples, outer)?]
        } else {
            self.sort(&mut tuples, &query.order_by, outer)?;
            let mut rows = Vec::with_capacity(tuples.len());
            for tuple in &tuples {
                let row = self.project(&query.projection, tuple, outer)?;
                if query.distinct && rows.contains(&row) {
                    continue;
                }
                rows.push(row);
            }
            rows
        };

        if let Some(pagination) = &query.pagination {
            let offset = pagination.offset as usize;
            if offset >= rows.len() {
                rows.clear();
            } else {
                rows.drain(0..offset);
            }
            rows.truncate(pagination.limit as usize);
        }
        Ok(rows)
    }

    /// Bind root rows, apply joins in order, then keep rows passing the
    /// filter.
    fn bind(&self, query: &CompiledQuery, outer: &[&Tuple<'t>]) -> Result<Vec<Tuple<'t>>, Error> {
        let mut tuples: Vec<Tuple<'t>> = self
            .table(&query.root_entity)?
            .iter()
            .map(|record| vec![Some(record)])
            .collect();

        for join in &query.joins {
            tuples = self.join(tuples, join)?;
        }

        match &query.filter {
            None => Ok(tuples),
            Some(filter) => {
                let mut kept = Vec::with_capacity(tuples.len());
                for tuple in tuples {
                    if self.test(filter, &tuple, outer)? == Some(true) {
                        kept.push(tuple);
                    }
                }
                Ok(kept)
            }
        }
    }

    fn join(&self, tuples: Vec<Tuple<'t>>, join: &JoinSpec) -> Result<Vec<Tuple<'t>>, Error> {
        let targets = self.table(&join.entity)?;
        let mut joined = Vec::with_capacity(tuples.len());

        for tuple in tuples {
            if tuple.len() != join.alias as usize {
                return Err(Error::Evaluation(format!(
                    "join alias {} is out of order",
                    join.alias
                )));
            }
            let key = tuple
                .get(join.parent as usize)
                .copied()
                .flatten()
                .and_then(|parent| parent.get(&join.parent_field))
                .filter(|key| !key.is_null());

            let matches: Vec<&'t Record> = match key {
                None => Vec::new(),
                Some(key) => targets
                    .iter()
                    .filter(|r| {
                        r.get(&join.entity_field)
                            .is_some_and(|v| Self::values_equal(v, key))
                    })
                    .collect(),
            };

            if matches.is_empty() {
                if join.kind == JoinKind::Left {
                    let mut extended = tuple;
                    extended.push(None);
                    joined.push(extended);
                }
                continue;
            }
            for record in matches {
                let mut extended = tuple.clone();
                extended.push(Some(record));
                joined.push(extended);
            }
        }
        Ok(joined)
    }

    /// Three-valued predicate evaluation; `None` is unknown.
    fn test(
        &self,
        predicate: &Predicate,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Option<bool>, Error> {
        match predicate {
            Predicate::Compare { left, op, right } => {
                let l = self.value(left, tuple, outer)?;
                let r = self.value(right, tuple, outer)?;
                if l.is_null() || r.is_null() {
                    return Ok(None);
                }
                Ok(match op {
                    CompareOp::Eq => Some(Self::values_equal(&l, &r)),
                    CompareOp::Ne => Some(!Self::values_equal(&l, &r)),
                    CompareOp::Lt => Self::compare_values(&l, &r).map(Ordering::is_lt),
                    CompareOp::Le => Self::compare_values(&l, &r).map(Ordering::is_le),
                    CompareOp::Gt => Self::compare_values(&l, &r).map(Ordering::is_gt),
                    CompareOp::Ge => Self::compare_values(&l, &r).map(Ordering::is_ge),
                })
            }
            Predicate::Like {
                operand,
                pattern,
                negated,
            } => match self.value(operand, tuple, outer)? {
                Value::Null => Ok(None),
                Value::String(s) => Ok(Some(Self::like_match(&s, pattern) != *negated)),
                other => Err(Error::Evaluation(format!(
                    "LIKE applied to {}",
                    other.type_name()
                ))),
            },
            Predicate::InList {
                operand,
                values,
                negated,
            } => {
                let value = self.value(operand, tuple, outer)?;
                Ok(Self::membership(&value, values, *negated))
            }
            Predicate::InSubquery {
                operand,
                subquery,
                negated,
            } => {
                let value = self.value(operand, tuple, outer)?;
                if value.is_null() {
                    return Ok(None);
                }
                let candidates = self.subquery_values(subquery, tuple, outer)?;
                Ok(Self::membership(&value, &candidates, *negated))
            }
            Predicate::IsNull { operand, negated } => {
                let value = self.value(operand, tuple, outer)?;
                Ok(Some(value.is_null() != *negated))
            }
            Predicate::IsEmpty {
                collection,
                negated,
            } => {
                let elements = self.collection(collection, tuple, outer)?;
                Ok(Some(elements.is_empty() != *negated))
            }
            Predicate::IsMember {
                value,
                collection,
                negated,
            } => {
                let value = self.value(value, tuple, outer)?;
                if value.is_null() {
                    return Ok(None);
                }
                let elements = self.collection(collection, tuple, outer)?;
                let found = elements.iter().any(|e| Self::values_equal(e, &value));
                Ok(Some(found != *negated))
            }
            Predicate::And(left, right) => match self.test(left, tuple, outer)? {
                Some(false) => Ok(Some(false)),
                l => Ok(match (l, self.test(right, tuple, outer)?) {
                    (_, Some(false)) => Some(false),
                    (Some(true), Some(true)) => Some(true),
                    _ => None,
                }),
            },
            Predicate::Or(left, right) => match self.test(left, tuple, outer)? {
                Some(true) => Ok(Some(true)),
                l => Ok(match (l, self.test(right, tuple, outer)?) {
                    (_, Some(true)) => Some(true),
                    (Some(false), Some(false)) => Some(false),
                    _ => None,
                }),
            },
        }
    }

    /// SQL `IN`: unknown when the value is null, or when nothing matched
    /// and a candidate is null.
    fn membership(value: &Value, candidates: &[Value], negated: bool) -> Option<bool> {
        if value.is_null() {
            return None;
        }
        if candidates.iter().any(|c| Self::values_equal(c, value)) {
            return Some(!negated);
        }
        if candidates.iter().any(Value::is_null) {
            return None;
        }
        Some(negated)
    }

    fn value(
        &self,
        operand: &Operand,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Value, Error> {
        match operand {
            Operand::Column(column) => Ok(self
                .record(column.level, column.alias, tuple, outer)?
                .and_then(|record| record.get(&column.field))
                .cloned()
                .unwrap_or(Value::Null)),
            Operand::Literal(value) => Ok(value.clone()),
            Operand::Parameter(name) => self
                .parameters
                .iter()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| Error::Evaluation(format!("unbound parameter :{}", name))),
            Operand::Subquery(subquery) => Ok(self
                .subquery_values(subquery, tuple, outer)?
                .into_iter()
                .next()
                .unwrap_or(Value::Null)),
            Operand::Aggregate { .. } => Err(Error::Evaluation(
                "aggregate used outside a selection".to_string(),
            )),
        }
    }

    fn record(
        &self,
        level: u32,
        alias: u32,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Option<&'t Record>, Error> {
        let bound = if level == 0 {
            tuple
        } else {
            outer
                .len()
                .checked_sub(level as usize)
                .and_then(|i| outer.get(i).copied())
                .ok_or_else(|| {
                    Error::Evaluation(format!("no enclosing query at level {}", level))
                })?
        };
        bound
            .get(alias as usize)
            .copied()
            .ok_or_else(|| Error::Evaluation(format!("alias {} is not bound", alias)))
    }

    fn subquery_values(
        &self,
        subquery: &CompiledQuery,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Vec<Value>, Error> {
        let mut env: Vec<&Tuple<'t>> = outer.to_vec();
        env.push(tuple);
        let rows = self.run_nested(subquery, &env)?;
        Ok(rows
            .into_iter()
            .map(|row| match row.cells.into_iter().next() {
                Some(Cell::Value(value)) => value,
                _ => Value::Null,
            })
            .collect())
    }

    fn collection(
        &self,
        collection: &Collection,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Vec<Value>, Error> {
        match collection {
            Collection::Attribute(column) => {
                match self.value(&Operand::Column(column.clone()), tuple, outer)? {
                    Value::Null => Ok(Vec::new()),
                    value => value.array_elements().ok_or_else(|| {
                        Error::Evaluation(format!(
                            "{} is not a collection ({})",
                            column.field,
                            value.type_name()
                        ))
                    }),
                }
            }
            Collection::Relation(relation) => {
                let owner = self.record(relation.level, relation.alias, tuple, outer)?;
                let key = owner
                    .and_then(|r| r.get(&relation.parent_field))
                    .filter(|k| !k.is_null());
                let Some(key) = key else {
                    return Ok(Vec::new());
                };
                Ok(self
                    .table(&relation.entity)?
                    .iter()
                    .filter(|r| {
                        r.get(&relation.entity_field)
                            .is_some_and(|v| Self::values_equal(v, key))
                    })
                    .map(|r| {
                        r.get(&relation.identity_field)
                            .cloned()
                            .unwrap_or(Value::Null)
                    })
                    .collect())
            }
        }
    }

    fn project(
        &self,
        projection: &Projection,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Row, Error> {
        match projection {
            Projection::Root => Ok(Row::new(vec![Cell::Entity(
                tuple.first().copied().flatten().cloned(),
            )])),
            Projection::Items(items) => {
                let mut cells = Vec::with_capacity(items.len());
                for item in items {
                    cells.push(match item {
                        SelectItem::Entity { alias } => Cell::Entity(
                            self.record(0, *alias, tuple, outer)?.cloned(),
                        ),
                        SelectItem::Expr(operand) => Cell::Value(self.value(operand, tuple, outer)?),
                    });
                }
                Ok(Row::new(cells))
            }
        }
    }

    fn aggregate_row(
        &self,
        projection: &Projection,
        tuples: &[Tuple<'t>],
        outer: &[&Tuple<'t>],
    ) -> Result<Row, Error> {
        let Projection::Items(items) = projection else {
            return Err(Error::Evaluation("aggregate over the root entity".to_string()));
        };
        let mut cells = Vec::with_capacity(items.len());
        for item in items {
            let SelectItem::Expr(Operand::Aggregate { function, column }) = item else {
                return Err(Error::Evaluation(
                    "aggregates mixed with per-row selections".to_string(),
                ));
            };
            let values = match column {
                None => None,
                Some(column) => {
                    let mut values = Vec::with_capacity(tuples.len());
                    for tuple in tuples {
                        let value = self.value(&Operand::Column(column.clone()), tuple, outer)?;
                        if !value.is_null() {
                            values.push(value);
                        }
                    }
                    Some(values)
                }
            };
            cells.push(Cell::Value(Self::aggregate(*function, tuples.len(), values)?));
        }
        Ok(Row::new(cells))
    }

    fn aggregate(
        function: AggregateFunction,
        rows: usize,
        values: Option<Vec<Value>>,
    ) -> Result<Value, Error> {
        let values = match (function, values) {
            (AggregateFunction::Count, None) => return Ok(Value::Int64(rows as i64)),
            (AggregateFunction::Count, Some(values)) => {
                return Ok(Value::Int64(values.len() as i64))
            }
            (_, None) => {
                return Err(Error::Evaluation(format!(
                    "{:?} requires an attribute",
                    function
                )))
            }
            (_, Some(values)) => values,
        };
        if values.is_empty() {
            return Ok(Value::Null);
        }

        match function {
            AggregateFunction::Sum => {
                if values.iter().all(|v| matches!(v, Value::Int32(_) | Value::Int64(_))) {
                    let mut total: i64 = 0;
                    for v in &values {
                        let n = v.as_i64().unwrap_or_default();
                        total = total
                            .checked_add(n)
                            .ok_or_else(|| Error::Evaluation("sum overflows int64".to_string()))?;
                    }
                    Ok(Value::Int64(total))
                } else {
                    Ok(Value::Float64(values.iter().filter_map(Value::as_f64).sum()))
                }
            }
            AggregateFunction::Avg => {
                let sum: f64 = values.iter().filter_map(Value::as_f64).sum();
                Ok(Value::Float64(sum / values.len() as f64))
            }
            AggregateFunction::Min | AggregateFunction::Max => {
                let mut best = values[0].clone();
                for v in &values[1..] {
                    let ord = Self::compare_values(v, &best).unwrap_or(Ordering::Equal);
                    let better = match function {
                        AggregateFunction::Min => ord.is_lt(),
                        _ => ord.is_gt(),
                    };
                    if better {
                        best = v.clone();
                    }
                }
                Ok(best)
            }
            AggregateFunction::Count => Ok(Value::Int64(values.len() as i64)),
        }
    }

    /// Sort tuples by the order specification; nulls sort first.
    fn sort(
        &self,
        tuples: &mut Vec<Tuple<'t>>,
        order_by: &[OrderSpec],
        outer: &[&Tuple<'t>],
    ) -> Result<(), Error> {
        if order_by.is_empty() {
            return Ok(());
        }

        let mut keyed = Vec::with_capacity(tuples.len());
        for tuple in tuples.drain(..) {
            let mut keys = Vec::with_capacity(order_by.len());
            for spec in order_by {
                keys.push(self.column_value(&spec.column, &tuple, outer)?);
            }
            keyed.push((keys, tuple));
        }

        keyed.sort_by(|(a, _), (b, _)| {
            for (spec, (av, bv)) in order_by.iter().zip(a.iter().zip(b.iter())) {
                let cmp = Self::compare_values_opt(av, bv);
                let cmp = match spec.direction {
                    OrderDirection::Asc => cmp,
                    OrderDirection::Desc => cmp.reverse(),
                };
                if cmp != Ordering::Equal {
                    return cmp;
                }
            }
            Ordering::Equal
        });

        tuples.extend(keyed.into_iter().map(|(_, tuple)| tuple));
        Ok(())
    }

    fn column_value(
        &self,
        column: &ColumnRef,
        tuple: &Tuple<'t>,
        outer: &[&Tuple<'t>],
    ) -> Result<Value, Error> {
        self.value(&Operand::Column(column.clone()), tuple, outer)
    }

    /// Compare two values for sorting, nulls first.
    fn compare_values_opt(a: &Value, b: &Value) -> Ordering {
        match (a, b) {
            (Value::Null, Value::Null) => Ordering::Equal,
            (Value::Null, _) => Ordering::Less,
            (_, Value::Null) => Ordering::Greater,
            (a, b) => Self::compare_values(a, b).unwrap_or(Ordering::Equal),
        }
    }

    /// Check if two values are equal, widening numeric types.
    pub fn values_equal(a: &Value, b: &Value) -> bool {
        match (a, b) {
            (Value::Null, Value::Null) => true,
            (Value::Int32(a), Value::Int64(b)) => (*a as i64) == *b,
            (Value::Int64(a), Value::Int32(b)) => *a == (*b as i64),
            (Value::Float32(a), Value::Float64(b)) => (*a as f64) == *b,
            (Value::Float64(a), Value::Float32(b)) => *a == (*b as f64),
            (Value::Timestamp(a), Value::Int64(b)) | (Value::Int64(a), Value::Timestamp(b)) => {
                a == b
            }
            (a, b) if a.is_array() || b.is_array() => a == b,
            (a, b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) if is_number(a) && is_number(b) => x == y,
                _ => a == b,
            },
        }
    }

    /// Compare two values, returning their ordering if comparable.
    pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
        match (a, b) {
            (Value::Int32(a), Value::Int32(b)) => Some(a.cmp(b)),
            (Value::Int64(a), Value::Int64(b)) => Some(a.cmp(b)),
            (Value::Int32(a), Value::Int64(b)) => Some((*a as i64).cmp(b)),
            (Value::Int64(a), Value::Int32(b)) => Some(a.cmp(&(*b as i64))),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b))
            | (Value::Timestamp(a), Value::Int64(b))
            | (Value::Int64(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            (Value::Bytes(a), Value::Bytes(b)) => Some(a.cmp(b)),
            (Value::Uuid(a), Value::Uuid(b)) => Some(a.cmp(b)),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (a, b) if is_number(a) && is_number(b) => match (a.as_f64(), b.as_f64()) {
                (Some(x), Some(y)) => x.partial_cmp(&y),
                _ => None,
            },
            _ => None,
        }
    }

    /// Match a string against a SQL LIKE pattern.
    ///
    /// Supports:
    /// - `%` matches zero or more characters
    /// - `_` matches exactly one character
    /// - `\%` and `\_` match a literal `%` or `_`
    pub fn like_match(value: &str, pattern: &str) -> bool {
        let mut chars = value.chars().peekable();
        let mut pattern_chars = pattern.chars().peekable();

        Self::like_match_recursive(&mut chars, &mut pattern_chars)
    }

    fn like_match_recursive(
        chars: &mut std::iter::Peekable<std::str::Chars>,
        pattern: &mut std::iter::Peekable<std::str::Chars>,
    ) -> bool {
        loop {
            match (pattern.peek().copied(), chars.peek().copied()) {
                (None, None) => return true,
                (None, Some(_)) => return false,
                (Some('%'), _) => {
                    pattern.next();
                    if pattern.peek().is_none() {
                        return true;
                    }

                    // Try the rest of the pattern at every remaining position
                    loop {
                        let mut pattern_clone = pattern.clone();
                        let mut chars_clone = chars.clone();

                        if Self::like_match_recursive(&mut chars_clone, &mut pattern_clone) {
                            return true;
                        }
                        if chars.next().is_none() {
                            return false;
                        }
                    }
                }
                (Some('_'), Some(_)) => {
                    pattern.next();
                    chars.next();
                }
                (Some('_'), None) => return false,
                (Some('\\'), _) => {
                    pattern.next();
                    match (pattern.peek().copied(), chars.peek().copied()) {
                        (Some(p), Some(c)) if p == c => {
                            pattern.next();
                            chars.next();
                        }
                        _ => return false,
                    }
                }
                (Some(p), Some(c)) if p == c => {
                    pattern.next();
                    chars.next();
                }
                (Some(_), _) => return false,
            }
        }
    }
}

fn is_number(value: &Value) -> bool {
    matches!(
        value,
        Value::Int32(_) | Value::Int64(_) | Value::Float32(_) | Value::Float64(_)
    )
}
