// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Graph vertices.
//!
//! A [`Node`] is built detached (children are handles into a
//! [`crate::MergeGraph`]) and becomes live once registered. Topology, the
//! derived flags and the cached rendering are only written by the graph; the
//! evaluation cache is only written by the evaluator.
use std::collections::BTreeSet;
use std::sync::OnceLock;

use thiserror::Error;

use crate::call::{Arity, Call};
use crate::ident::{NodeId, StructuralKey};
use crate::literal::Literal;
use crate::value::Value;

/// Invariant violations detected while building a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConstructionError {
    /// The operator does not accept this many children.
    #[error("`{name}` takes {expected} children, got {actual}")]
    WrongArity {
        /// Operator name.
        name: String,
        /// Accepted child counts.
        expected: Arity,
        /// Supplied child count.
        actual: usize,
    },
}

/// What a node is.
#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Constant.
    Literal(Literal),
    /// Operator applied to the children.
    Call(Call),
}

/// A vertex of the predicate DAG.
#[derive(Debug)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) children: Vec<NodeId>,
    pub(crate) parents: BTreeSet<NodeId>,
    pub(crate) is_static: bool,
    /// Canonical child order established (abelian calls only).
    pub(crate) ordered: bool,
    pub(crate) rendering: String,
    pub(crate) key: Option<StructuralKey>,
    pub(crate) static_value: OnceLock<Value>,
}

impl Node {
    fn detached(kind: NodeKind, children: Vec<NodeId>) -> Self {
        Self {
            kind,
            children,
            parents: BTreeSet::new(),
            is_static: false,
            ordered: false,
            rendering: String::new(),
            key: None,
            static_value: OnceLock::new(),
        }
    }

    /// Detached literal node.
    pub fn literal(literal: Literal) -> Self {
        Self::detached(NodeKind::Literal(literal), Vec::new())
    }

    /// Detached call node; fails if `children` violates the operator's arity.
    pub fn call(call: Call, children: Vec<NodeId>) -> Result<Self, ConstructionError> {
        let arity = call.arity();
        if !arity.accepts(children.len()) {
            return Err(ConstructionError::WrongArity {
                name: call.name().to_owned(),
                expected: arity,
                actual: children.len(),
            });
        }
        Ok(Self::detached(NodeKind::Call(call), children))
    }

    /// Node kind.
    pub fn kind(&self) -> &NodeKind {
        &self.kind
    }

    /// Operator name for calls, `None` for literals.
    pub fn name(&self) -> Option<&str> {
        match &self.kind {
            NodeKind::Call(call) => Some(call.name()),
            NodeKind::Literal(_) => None,
        }
    }

    /// The literal, when this is a literal node.
    pub fn as_literal(&self) -> Option<&Literal> {
        match &self.kind {
            NodeKind::Literal(lit) => Some(lit),
            NodeKind::Call(_) => None,
        }
    }

    /// The call, when this is a call node.
    pub fn as_call(&self) -> Option<&Call> {
        match &self.kind {
            NodeKind::Call(call) => Some(call),
            NodeKind::Literal(_) => None,
        }
    }

    /// `true` for literal nodes.
    pub fn is_literal(&self) -> bool {
        matches!(self.kind, NodeKind::Literal(_))
    }

    /// Ordered children.
    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Nodes that have this node as a child.
    pub fn parents(&self) -> &BTreeSet<NodeId> {
        &self.parents
    }

    /// Value is identical under every context.
    pub fn is_static(&self) -> bool {
        self.is_static
    }

    /// Canonical child order has been established (abelian calls).
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Canonical rendering; empty until the node is registered.
    pub fn to_s(&self) -> &str {
        &self.rendering
    }

    /// Structural key; `None` until the node is registered.
    pub fn key(&self) -> Option<StructuralKey> {
        self.key
    }
}

impl core::fmt::Display for Node {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.rendering)
    }
}
