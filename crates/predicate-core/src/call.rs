// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Calls: operator-bearing nodes.
//!
//! The standard operators are a closed enum so the evaluation hot path is a
//! plain `match`. Operators registered at runtime implement [`CustomCall`] and
//! ride in [`Call::Custom`].
use std::sync::Arc;

use crate::context::{Context, EvalError};
use crate::ident::NodeId;
use crate::merge_graph::MergeGraph;
use crate::transaction::Transaction;
use crate::transform::{OptimizeError, TransformSite};
use crate::value::Value;

/// Child-count constraint checked when a call node is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    /// Exactly this many children.
    Exactly(usize),
    /// At least this many children.
    AtLeast(usize),
}

impl Arity {
    /// Whether `n` children satisfy the constraint.
    pub const fn accepts(self, n: usize) -> bool {
        match self {
            Self::Exactly(k) => n == k,
            Self::AtLeast(k) => n >= k,
        }
    }
}

impl core::fmt::Display for Arity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Exactly(k) => write!(f, "exactly {k}"),
            Self::AtLeast(k) => write!(f, "at least {k}"),
        }
    }
}

/// Extension point for operators outside the standard library.
///
/// Implementations must be pure: `calculate` may read the transaction through
/// [`Arguments`] but must return the same value for the same inputs.
pub trait CustomCall: Send + Sync {
    /// Operator name used in renderings and by the [`crate::CallFactory`].
    fn name(&self) -> &str;

    /// Accepted child counts.
    fn arity(&self) -> Arity {
        Arity::AtLeast(0)
    }

    /// Whether the value depends on transaction data beyond the children.
    ///
    /// A call that reads the transaction is never static, even with static
    /// children.
    fn reads_transaction(&self) -> bool {
        false
    }

    /// Computes the value of the node.
    fn calculate(&self, args: &mut Arguments<'_, '_, '_>) -> Result<Value, EvalError>;

    /// Optional rewrite; returns `true` if the graph changed.
    fn transform(&self, _site: &mut TransformSite<'_>) -> Result<bool, OptimizeError> {
        Ok(false)
    }
}

/// Operator of a call node.
#[derive(Clone)]
pub enum Call {
    /// `(true)`: canonical truthy value; normalizes to `''`.
    True,
    /// `(false)`: canonical falsy value; normalizes to `null`.
    False,
    /// `(or a b …)`: truthy iff any child is truthy. Commutative.
    Or,
    /// `(and a b …)`: truthy iff every child is truthy. Commutative.
    And,
    /// `(not a)`: truthy iff the child is falsy.
    Not,
    /// `(field 'name')`: the named transaction field, or null.
    Field,
    /// Runtime-registered operator.
    Custom(Arc<dyn CustomCall>),
}

impl Call {
    /// Operator name.
    pub fn name(&self) -> &str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Or => "or",
            Self::And => "and",
            Self::Not => "not",
            Self::Field => "field",
            Self::Custom(custom) => custom.name(),
        }
    }

    /// Accepted child counts.
    pub fn arity(&self) -> Arity {
        match self {
            Self::True | Self::False => Arity::Exactly(0),
            Self::Or | Self::And => Arity::AtLeast(2),
            Self::Not | Self::Field => Arity::Exactly(1),
            Self::Custom(custom) => custom.arity(),
        }
    }

    /// Commutative operators whose children are kept in canonical order.
    pub fn is_abelian(&self) -> bool {
        matches!(self, Self::Or | Self::And)
    }

    /// Whether evaluation reads the transaction directly.
    pub fn reads_transaction(&self) -> bool {
        match self {
            Self::Field => true,
            Self::Custom(custom) => custom.reads_transaction(),
            Self::True | Self::False | Self::Or | Self::And | Self::Not => false,
        }
    }
}

impl core::fmt::Debug for Call {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Custom(custom) => f.debug_tuple("Custom").field(&custom.name()).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// Lazy view of a call's children during `calculate`.
///
/// Children are only evaluated when asked for, so operators can
/// short-circuit.
pub struct Arguments<'g, 'c, 't> {
    graph: &'g MergeGraph,
    node: NodeId,
    children: &'g [NodeId],
    context: &'c mut Context<'t>,
}

impl<'g, 'c, 't> Arguments<'g, 'c, 't> {
    pub(crate) fn new(
        graph: &'g MergeGraph,
        node: NodeId,
        children: &'g [NodeId],
        context: &'c mut Context<'t>,
    ) -> Self {
        Self {
            graph,
            node,
            children,
            context,
        }
    }

    /// Node being calculated.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// `true` when the call has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Child handle at `index`.
    pub fn child(&self, index: usize) -> Option<NodeId> {
        self.children.get(index).copied()
    }

    /// Evaluates (memoized) the child at `index`.
    pub fn eval(&mut self, index: usize) -> Result<Value, EvalError> {
        let child = self.child(index).ok_or(EvalError::MissingArgument {
            node: self.node,
            index,
        })?;
        self.graph.eval(child, self.context)
    }

    /// Transaction data of the evaluating context, if any.
    pub fn transaction(&self) -> Option<&'t Transaction> {
        self.context.transaction()
    }
}
