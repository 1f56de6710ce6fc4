// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-transaction evaluation scope and the memoizing evaluator.
//!
//! Static nodes cache their value inside the graph (shared by every context);
//! dynamic nodes cache in the [`Context`], which is owned by a single
//! transaction and never shared.
use rustc_hash::FxHashMap;
use thiserror::Error;

use crate::call::Arguments;
use crate::ident::NodeId;
use crate::merge_graph::{GraphError, MergeGraph};
use crate::node::{Node, NodeKind};
use crate::standard;
use crate::transaction::Transaction;
use crate::tx::TxId;
use crate::value::Value;

/// Errors raised while evaluating a node for one transaction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    /// The node handle is stale or unknown.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A dynamic node was evaluated without transaction data.
    #[error("{node} needs transaction data but the context is detached")]
    NoTransaction {
        /// Node that asked for the transaction.
        node: NodeId,
    },
    /// `eval_static` was called on a dynamic node.
    #[error("{0} is not static")]
    NotStatic(NodeId),
    /// A child evaluated to something the operator cannot use.
    #[error("invalid argument to {node}: {reason}")]
    InvalidArgument {
        /// Node being calculated.
        node: NodeId,
        /// What was wrong.
        reason: String,
    },
    /// The operator asked for a child that does not exist.
    #[error("{node} has no argument {index}")]
    MissingArgument {
        /// Node being calculated.
        node: NodeId,
        /// Requested child position.
        index: usize,
    },
    /// Failure reported by a runtime-registered operator.
    #[error("operator `{name}` failed: {message}")]
    Custom {
        /// Operator name.
        name: String,
        /// Operator-provided message.
        message: String,
    },
}

/// Errors from reading a cached value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// The node has not been evaluated in this context.
    #[error("{0} has not been evaluated")]
    NotAvailable(NodeId),
    /// The node handle is stale or unknown.
    #[error(transparent)]
    Graph(#[from] GraphError),
}

/// Evaluation scope for one transaction.
#[derive(Debug, Default)]
pub struct Context<'t> {
    transaction: Option<&'t Transaction>,
    memo: FxHashMap<NodeId, Value>,
}

impl<'t> Context<'t> {
    /// Context reading from `transaction`.
    pub fn new(transaction: &'t Transaction) -> Self {
        Self {
            transaction: Some(transaction),
            memo: FxHashMap::default(),
        }
    }

    /// Context without transaction data; only static nodes can be evaluated.
    pub fn detached() -> Self {
        Self::default()
    }

    /// Transaction data, if attached.
    pub fn transaction(&self) -> Option<&'t Transaction> {
        self.transaction
    }

    /// Id of the attached transaction.
    pub fn tx_id(&self) -> Option<TxId> {
        self.transaction.map(Transaction::id)
    }

    /// Cached dynamic value of `node`.
    pub fn cached(&self, node: NodeId) -> Option<&Value> {
        self.memo.get(&node)
    }

    /// Forgets the cached dynamic value of `node`.
    pub fn reset(&mut self, node: NodeId) {
        self.memo.remove(&node);
    }

    /// Forgets every cached dynamic value.
    pub fn clear(&mut self) {
        self.memo.clear();
    }

    /// Number of memoized dynamic values.
    pub fn len(&self) -> usize {
        self.memo.len()
    }

    /// `true` when nothing is memoized.
    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

impl MergeGraph {
    /// Value of `node` in `context`, computing it at most once.
    ///
    /// Static nodes are cached in the graph and ignore the context memo.
    /// When two threads race on a static node the first stored value wins and
    /// both callers observe it.
    pub fn eval(&self, node: NodeId, context: &mut Context<'_>) -> Result<Value, EvalError> {
        let vertex = self.node(node)?;
        if vertex.is_static() {
            if let Some(value) = vertex.static_value.get() {
                return Ok(value.clone());
            }
            let value = self.calculate(node, vertex, context)?;
            return Ok(vertex.static_value.get_or_init(|| value).clone());
        }
        if let Some(value) = context.memo.get(&node) {
            return Ok(value.clone());
        }
        let value = self.calculate(node, vertex, context)?;
        context.memo.insert(node, value.clone());
        Ok(value)
    }

    /// Evaluates a static node without any transaction.
    pub fn eval_static(&self, node: NodeId) -> Result<Value, EvalError> {
        if !self.node(node)?.is_static() {
            return Err(EvalError::NotStatic(node));
        }
        self.eval(node, &mut Context::detached())
    }

    /// Previously computed value of `node`.
    ///
    /// `Err(NotAvailable)` means "not evaluated yet", which is distinct from
    /// `Ok(Value::Null)`.
    pub fn value(&self, node: NodeId, context: &Context<'_>) -> Result<Value, ValueError> {
        let vertex = self.node(node)?;
        let cached = if vertex.is_static() {
            vertex.static_value.get()
        } else {
            context.memo.get(&node)
        };
        cached.cloned().ok_or(ValueError::NotAvailable(node))
    }

    /// Whether `node` has a value available in `context`.
    pub fn has_value(&self, node: NodeId, context: &Context<'_>) -> bool {
        self.value(node, context).is_ok()
    }

    fn calculate(
        &self,
        id: NodeId,
        vertex: &Node,
        context: &mut Context<'_>,
    ) -> Result<Value, EvalError> {
        match vertex.kind() {
            NodeKind::Literal(lit) => Ok(lit.value()),
            NodeKind::Call(call) => {
                let mut args = Arguments::new(self, id, vertex.children(), context);
                standard::calculate(call, &mut args)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::call::Call;
    use crate::literal::Literal;

    #[test]
    fn value_before_eval_is_not_available() {
        let mut g = MergeGraph::new();
        let t = g.register(Node::call(Call::True, vec![]).unwrap()).unwrap();
        let ctx = Context::detached();
        assert_eq!(g.value(t, &ctx), Err(ValueError::NotAvailable(t)));
        assert!(!g.has_value(t, &ctx));
    }

    #[test]
    fn null_is_distinct_from_unavailable() {
        let mut g = MergeGraph::new();
        let null = g.register(Node::literal(Literal::Null)).unwrap();
        let mut ctx = Context::detached();
        assert_eq!(g.eval(null, &mut ctx), Ok(Value::Null));
        assert_eq!(g.value(null, &ctx), Ok(Value::Null));
        assert!(g.has_value(null, &ctx));
    }

    #[test]
    fn static_values_live_in_the_graph() {
        let mut g = MergeGraph::new();
        let f = g.register(Node::call(Call::False, vec![]).unwrap()).unwrap();
        let not = g.register(Node::call(Call::Not, vec![f]).unwrap()).unwrap();
        let mut first = Context::detached();
        assert!(g.eval(not, &mut first).unwrap().is_truthy());
        assert!(first.is_empty(), "static values bypass the context memo");
        let second = Context::detached();
        assert!(g.has_value(not, &second));
        g.reset(not).unwrap();
        assert!(!g.has_value(not, &second));
    }

    #[test]
    fn eval_static_rejects_dynamic_nodes() {
        let mut g = MergeGraph::new();
        let name = g.register(Node::literal(Literal::string("x"))).unwrap();
        let field = g.register(Node::call(Call::Field, vec![name]).unwrap()).unwrap();
        assert_eq!(g.eval_static(field), Err(EvalError::NotStatic(field)));
        assert_eq!(
            g.eval(field, &mut Context::detached()),
            Err(EvalError::NoTransaction { node: field })
        );
    }
}
