//! Untyped expression nodes recorded by the builder and their typed handles.

use std::fmt;
use std::marker::PhantomData;

use criteria_proto::{AggregateFunction, Value};

use super::builder::{Join, Path, Root, ScopeData};

/// Where an attribute path starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// The scope's root entity.
    Root,
    /// An explicit join, by declaration index within its scope.
    Join(usize),
}

/// An attribute path bound to a builder scope.
#[derive(Debug, Clone, PartialEq)]
pub struct AttrRef {
    pub scope: u64,
    pub entity: &'static str,
    pub source: Source,
    pub hops: Vec<String>,
}

impl AttrRef {
    pub fn new(scope: u64, entity: &'static str, source: Source) -> Self {
        Self {
            scope,
            entity,
            source,
            hops: Vec::new(),
        }
    }

    pub fn child(&self, hop: &str) -> Self {
        let mut hops = self.hops.clone();
        hops.push(hop.to_string());
        Self {
            scope: self.scope,
            entity: self.entity,
            source: self.source,
            hops,
        }
    }
}

impl fmt::Display for AttrRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity)?;
        for hop in &self.hops {
            write!(f, ".{}", hop)?;
        }
        Ok(())
    }
}

/// A correlated or independent subquery.
#[derive(Debug, Clone)]
pub struct SubqueryNode {
    pub scope: ScopeData,
    pub selection: ExprNode,
}

/// A value-producing expression before translation.
#[derive(Debug, Clone)]
pub enum ExprNode {
    Path(AttrRef),
    Literal(Value),
    Parameter { name: String, value: Value },
    Subquery(Box<SubqueryNode>),
    Aggregate {
        function: AggregateFunction,
        path: Option<AttrRef>,
    },
}

impl ExprNode {
    /// Short description used in error messages.
    pub fn label(&self) -> String {
        match self {
            ExprNode::Path(attr) => attr.to_string(),
            ExprNode::Literal(value) => format!("literal {}", value.type_name()),
            ExprNode::Parameter { name, .. } => format!(":{}", name),
            ExprNode::Subquery(sub) => format!("subquery on {}", sub.scope.entity),
            ExprNode::Aggregate { function, path } => match path {
                Some(path) => format!("{:?}({})", function, path),
                None => format!("{:?}(*)", function),
            },
        }
    }
}

/// A typed expression: an attribute path, a literal, a parameter, a
/// subquery or an aggregate, producing values of type `T`.
pub struct Expr<T> {
    pub(crate) node: ExprNode,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Expr<T> {
    pub(crate) fn from_node(node: ExprNode) -> Self {
        Self {
            node,
            _marker: PhantomData,
        }
    }

    /// An inline literal.
    pub fn literal(value: T) -> Self
    where
        T: Into<Value>,
    {
        Self::from_node(ExprNode::Literal(value.into()))
    }
}

impl<T> Clone for Expr<T> {
    fn clone(&self) -> Self {
        Self::from_node(self.node.clone())
    }
}

impl<T> fmt::Debug for Expr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Expr").field(&self.node).finish()
    }
}

impl<'q, T> From<Path<'q, T>> for Expr<T> {
    fn from(path: Path<'q, T>) -> Self {
        path.expr()
    }
}

impl<'q, T> From<&Path<'q, T>> for Expr<T> {
    fn from(path: &Path<'q, T>) -> Self {
        path.expr()
    }
}

/// Anything that can appear in a selection or an ordering.
pub trait Selectable {
    #[doc(hidden)]
    fn into_node(self) -> ExprNode;
}

impl<T> Selectable for Expr<T> {
    fn into_node(self) -> ExprNode {
        self.node
    }
}

impl<'q, T> Selectable for Path<'q, T> {
    fn into_node(self) -> ExprNode {
        self.expr().node
    }
}

impl<'q, T> Selectable for &Path<'q, T> {
    fn into_node(self) -> ExprNode {
        self.expr().node
    }
}

impl<'q, E> Selectable for &Root<'q, E> {
    fn into_node(self) -> ExprNode {
        ExprNode::Path(self.attr_ref())
    }
}

impl<'q, E> Selectable for &Join<'q, E> {
    fn into_node(self) -> ExprNode {
        ExprNode::Path(self.attr_ref())
    }
}

/// A tuple of selectable items.
pub trait SelectTuple {
    #[doc(hidden)]
    fn into_nodes(self) -> Vec<ExprNode>;
}

macro_rules! impl_select_tuple {
    ($($name:ident),+) => {
        impl<$($name: Selectable),+> SelectTuple for ($($name,)+) {
            #[allow(non_snake_case)]
            fn into_nodes(self) -> Vec<ExprNode> {
                let ($($name,)+) = self;
                vec![$($name.into_node()),+]
            }
        }
    };
}

impl_select_tuple!(A, B);
impl_select_tuple!(A, B, C);
impl_select_tuple!(A, B, C, D);
