// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Detached expression trees.
//!
//! An [`Expr`] is what a rule-language front end hands over: a plain tree that
//! knows nothing about the graph. In JSON it is `null`, a string, or an array
//! whose first element is the operator name:
//!
//! ```json
//! ["or", ["not", ["false"]], "x"]
//! ```
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::call_factory::CallFactory;
use crate::ident::NodeId;
use crate::literal::Literal;
use crate::loader::LoadError;
use crate::merge_graph::MergeGraph;
use crate::node::Node;

/// Rejected JSON shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("a call must be a non-empty array starting with the operator name")]
pub struct ExprShapeError;

/// Expression tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawExpr", into = "RawExpr")]
pub enum Expr {
    /// `null`.
    Null,
    /// String literal.
    String(String),
    /// Operator applied to arguments.
    Call {
        /// Operator name.
        name: String,
        /// Arguments in order.
        args: Vec<Expr>,
    },
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawExpr {
    Null(()),
    String(String),
    Call(Vec<RawExpr>),
}

impl TryFrom<RawExpr> for Expr {
    type Error = ExprShapeError;

    fn try_from(raw: RawExpr) -> Result<Self, Self::Error> {
        match raw {
            RawExpr::Null(()) => Ok(Self::Null),
            RawExpr::String(text) => Ok(Self::String(text)),
            RawExpr::Call(items) => {
                let mut items = items.into_iter();
                let Some(RawExpr::String(name)) = items.next() else {
                    return Err(ExprShapeError);
                };
                let args = items.map(Self::try_from).collect::<Result<_, _>>()?;
                Ok(Self::Call { name, args })
            }
        }
    }
}

impl From<Expr> for RawExpr {
    fn from(expr: Expr) -> Self {
        match expr {
            Expr::Null => Self::Null(()),
            Expr::String(text) => Self::String(text),
            Expr::Call { name, args } => {
                let mut items = Vec::with_capacity(args.len() + 1);
                items.push(Self::String(name));
                items.extend(args.into_iter().map(Self::from));
                Self::Call(items)
            }
        }
    }
}

impl Expr {
    /// String literal expression.
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// Call expression.
    pub fn call(name: impl Into<String>, args: Vec<Self>) -> Self {
        Self::Call {
            name: name.into(),
            args,
        }
    }

    /// Nesting depth; literals are depth 1.
    pub fn depth(&self) -> usize {
        match self {
            Self::Null | Self::String(_) => 1,
            Self::Call { args, .. } => 1 + args.iter().map(Self::depth).max().unwrap_or(0),
        }
    }

    /// Registers this tree bottom-up in `graph` and returns its node.
    ///
    /// Subtrees already in the graph are shared rather than duplicated.
    pub fn build(
        &self,
        graph: &mut MergeGraph,
        factory: &CallFactory,
        max_depth: usize,
    ) -> Result<NodeId, LoadError> {
        let depth = self.depth();
        if depth > max_depth {
            return Err(LoadError::TooDeep { depth, max_depth });
        }
        self.build_inner(graph, factory)
    }

    fn build_inner(&self, graph: &mut MergeGraph, factory: &CallFactory) -> Result<NodeId, LoadError> {
        let node = match self {
            Self::Null => Node::literal(Literal::Null),
            Self::String(text) => Node::literal(Literal::string(text.as_str())),
            Self::Call { name, args } => {
                let children = args
                    .iter()
                    .map(|arg| arg.build_inner(graph, factory))
                    .collect::<Result<Vec<_>, _>>()?;
                factory.create(name, children)?
            }
        };
        Ok(graph.register(node)?)
    }
}

impl core::fmt::Display for Expr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::String(text) => f.write_str(&Literal::string(text.as_str()).render()),
            Self::Call { name, args } => {
                write!(f, "({name}")?;
                for arg in args {
                    write!(f, " {arg}")?;
                }
                f.write_str(")")
            }
        }
    }
}
