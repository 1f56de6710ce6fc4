// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Load-time optimizer: repeated transform passes to a fixed point.
//!
//! The first pass visits every node reachable from the rule roots; later
//! passes only revisit dirty nodes (nodes that changed, nodes whose child list
//! changed, replacements and their parents). Visits are children-first and a
//! node is transformed at most once per pass. Mutations apply immediately.
use rustc_hash::FxHashSet;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::call_factory::{CallFactory, FactoryError};
use crate::config::OptimizerConfig;
use crate::ident::NodeId;
use crate::literal::Literal;
use crate::merge_graph::{GraphError, MergeGraph};
use crate::node::Node;
use crate::reporter::{NodeReporter, Reporter};
use crate::standard;
use crate::telemetry;

/// Optimizer failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OptimizeError {
    /// Transforms kept changing the graph past the configured pass ceiling.
    #[error("optimizer did not reach a fixed point within {passes} passes")]
    NonTerminating {
        /// Passes completed before giving up.
        passes: usize,
    },
    /// A transform issued an invalid graph mutation.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A transform asked for an operator the factory cannot build.
    #[error(transparent)]
    Factory(#[from] FactoryError),
}

/// Summary of a completed optimization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OptimizeReport {
    /// Passes run, including the final quiet one.
    pub passes: usize,
    /// Transforms that reported a change.
    pub changes: usize,
    /// Live nodes after optimization.
    pub live_nodes: usize,
}

/// What a transform sees: the visited node plus mutation access to the graph.
pub struct TransformSite<'a> {
    graph: &'a mut MergeGraph,
    factory: &'a CallFactory,
    reporter: &'a mut Reporter,
    node: NodeId,
}

impl<'a> TransformSite<'a> {
    pub(crate) fn new(
        graph: &'a mut MergeGraph,
        factory: &'a CallFactory,
        reporter: &'a mut Reporter,
        node: NodeId,
    ) -> Self {
        Self {
            graph,
            factory,
            reporter,
            node,
        }
    }

    /// Node being transformed.
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// Read access to the graph.
    pub fn graph(&self) -> &MergeGraph {
        self.graph
    }

    /// Operator registry, for transforms that build new calls.
    pub fn factory(&self) -> &CallFactory {
        self.factory
    }

    /// `false` once the visited node has been replaced or merged away.
    pub fn is_alive(&self) -> bool {
        self.graph.contains(self.node)
    }

    /// Current children of the visited node.
    pub fn children(&self) -> Result<Vec<NodeId>, GraphError> {
        Ok(self.graph.node(self.node)?.children().to_vec())
    }

    /// The literal at child position `index`, if that child is a literal.
    pub fn child_literal(&self, index: usize) -> Option<&Literal> {
        let child = *self.graph.get(self.node)?.children().get(index)?;
        self.graph.get(child)?.as_literal()
    }

    /// Diagnostics scoped to the visited node.
    pub fn reporter(&mut self) -> NodeReporter<'_> {
        let rendering = self
            .graph
            .to_s(self.node)
            .map(str::to_owned)
            .unwrap_or_default();
        self.reporter.node(self.node, rendering)
    }

    /// Replaces the visited node with `replacement` everywhere.
    pub fn replace_with(&mut self, replacement: NodeId) -> Result<(), GraphError> {
        self.graph.replace(self.node, replacement)
    }

    /// Replaces the visited node with a literal.
    pub fn replace_with_literal(&mut self, literal: Literal) -> Result<NodeId, GraphError> {
        let id = self.graph.register(Node::literal(literal))?;
        self.replace_with(id)?;
        Ok(id)
    }

    /// Replaces the visited node with a new call built through the factory.
    pub fn replace_with_call(
        &mut self,
        name: &str,
        children: Vec<NodeId>,
    ) -> Result<NodeId, OptimizeError> {
        let node = self.factory.create(name, children)?;
        let id = self.graph.register(node)?;
        self.replace_with(id)?;
        Ok(id)
    }

    /// Swaps one child of the visited node.
    pub fn replace_child(&mut self, old: NodeId, new: NodeId) -> Result<(), GraphError> {
        self.graph.replace_child(self.node, old, new)
    }

    /// Puts the children of an abelian call in canonical order.
    pub fn order_children(&mut self) -> Result<bool, GraphError> {
        self.graph.order_children(self.node)
    }
}

/// Runs transform passes over `graph` until nothing changes.
///
/// Static caches are cleared before and after. A disabled optimizer returns
/// an empty report without touching the graph.
#[instrument(skip_all, fields(max_passes = config.max_passes))]
pub fn optimize(
    graph: &mut MergeGraph,
    factory: &CallFactory,
    reporter: &mut Reporter,
    config: &OptimizerConfig,
) -> Result<OptimizeReport, OptimizeError> {
    if !config.enabled {
        return Ok(OptimizeReport {
            live_nodes: graph.len(),
            ..OptimizeReport::default()
        });
    }
    graph.reset_all();
    graph.take_touched();

    let mut dirty: FxHashSet<NodeId> = graph.post_order().into_iter().collect();
    let mut passes = 0;
    let mut changes = 0;
    loop {
        let order: Vec<NodeId> = graph
            .post_order()
            .into_iter()
            .filter(|id| dirty.contains(id))
            .collect();
        let Some(&first) = order.first() else {
            break;
        };
        if passes >= config.max_passes {
            let rendering = graph.to_s(first).map(str::to_owned).unwrap_or_default();
            reporter
                .node(first, rendering)
                .error(format!("optimizer did not converge after {passes} passes"));
            graph.reset_all();
            return Err(OptimizeError::NonTerminating { passes });
        }
        passes += 1;

        let mut next = FxHashSet::default();
        for id in order {
            // Literals have nothing to rewrite.
            let Some(call) = graph.get(id).and_then(Node::as_call).cloned() else {
                continue;
            };
            let changed = {
                let mut site = TransformSite::new(graph, factory, reporter, id);
                standard::transform(&call, &mut site)?
            };
            let touched = graph.take_touched();
            if !changed {
                continue;
            }
            changes += 1;
            debug!(node = %id, pass = passes, op = call.name(), "transform applied");
            for t in touched.into_iter().chain(core::iter::once(id)) {
                if let Some(node) = graph.get(t) {
                    next.extend(node.parents().iter().copied());
                    next.insert(t);
                }
            }
        }
        dirty = next;
    }
    graph.reset_all();

    let report = OptimizeReport {
        passes,
        changes,
        live_nodes: graph.len(),
    };
    telemetry::optimized(&report);
    Ok(report)
}
