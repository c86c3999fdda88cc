//! Clause lists and the implicit-AND / explicit-OR combination rule.
//!
//! A builder body records a flat list of statements: predicate clauses and
//! `or` markers. Each clause is tagged with the connective that links it to
//! everything before it (`or` when an `or` marker precedes it, `and`
//! otherwise) and the tagged list is folded left:
//! `a, b, or, c` becomes `(a AND b) OR c`.

use criteria_proto::{CompareOp, Value};

use super::expr::{AttrRef, ExprNode};

/// One entry of a builder body.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement<P> {
    /// A predicate clause.
    Clause(P),
    /// Marks the next clause as OR-connected.
    Or,
}

impl<P> Statement<P> {
    /// Borrow the clause.
    pub fn as_ref(&self) -> Statement<&P> {
        match self {
            Statement::Clause(p) => Statement::Clause(p),
            Statement::Or => Statement::Or,
        }
    }
}

/// How a clause links to the clauses before it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Connective {
    And,
    Or,
}

/// A predicate tagged with its connective.
#[derive(Debug, Clone, PartialEq)]
pub struct Clause<P> {
    pub connective: Connective,
    pub predicate: P,
}

impl<P> Clause<P> {
    /// Transform the predicate, keeping the connective.
    pub fn try_map<Q, E>(self, f: impl FnOnce(P) -> Result<Q, E>) -> Result<Clause<Q>, E> {
        Ok(Clause {
            connective: self.connective,
            predicate: f(self.predicate)?,
        })
    }
}

/// Tag each clause with its connective.
///
/// Repeated `or` markers collapse into one; markers with no following
/// clause are dropped.
pub fn tag<P>(statements: impl IntoIterator<Item = Statement<P>>) -> Vec<Clause<P>> {
    let mut clauses = Vec::new();
    let mut pending_or = false;
    for statement in statements {
        match statement {
            Statement::Or => pending_or = true,
            Statement::Clause(predicate) => {
                let connective = if pending_or {
                    Connective::Or
                } else {
                    Connective::And
                };
                pending_or = false;
                clauses.push(Clause {
                    connective,
                    predicate,
                });
            }
        }
    }
    clauses
}

/// Fold tagged clauses left to right into one predicate.
///
/// The first clause's connective is ignored. Returns `None` for an empty
/// list.
pub fn fold<P>(
    clauses: impl IntoIterator<Item = Clause<P>>,
    mut and: impl FnMut(P, P) -> P,
    mut or: impl FnMut(P, P) -> P,
) -> Option<P> {
    let mut acc: Option<P> = None;
    for clause in clauses {
        acc = Some(match acc {
            None => clause.predicate,
            Some(prev) => match clause.connective {
                Connective::And => and(prev, clause.predicate),
                Connective::Or => or(prev, clause.predicate),
            },
        });
    }
    acc
}

/// A predicate clause before translation.
#[derive(Debug, Clone)]
pub enum ClauseNode {
    Compare {
        left: ExprNode,
        op: CompareOp,
        right: ExprNode,
    },
    Like {
        operand: ExprNode,
        pattern: String,
        negated: bool,
    },
    InList {
        operand: ExprNode,
        values: Vec<Value>,
        negated: bool,
    },
    InSubquery {
        operand: ExprNode,
        subquery: ExprNode,
        negated: bool,
    },
    IsNull {
        operand: ExprNode,
        negated: bool,
    },
    IsEmpty {
        collection: AttrRef,
        negated: bool,
    },
    IsMember {
        value: ExprNode,
        collection: AttrRef,
        negated: bool,
    },
}
