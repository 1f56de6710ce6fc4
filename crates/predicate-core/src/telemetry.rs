// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

// Structured events for rule loading, optimization and evaluation.
// Everything goes through `tracing` under the `predicate` target; installing a
// subscriber is the embedding application's job.

use tracing::{debug, info, warn};

use crate::ident::NodeId;
use crate::transform::OptimizeReport;
use crate::tx::TxId;

/// A rule root was added to the graph.
pub fn rule_loaded(rule: &str, root: NodeId, rendering: &str) {
    debug!(target: "predicate", rule, root = %root, rendering, "rule loaded");
}

/// A rule was rejected during loading; the rest of the set is unaffected.
pub fn rule_failed(rule: &str, error: &dyn core::fmt::Display) {
    warn!(target: "predicate", rule, error = %error, "rule rejected");
}

/// Totals for a finished load.
pub fn load_summary(loaded: usize, failed: usize, live_nodes: usize) {
    info!(target: "predicate", loaded, failed, live_nodes, "rule set loaded");
}

/// Totals for a finished optimization.
pub fn optimized(report: &OptimizeReport) {
    info!(
        target: "predicate",
        passes = report.passes,
        changes = report.changes,
        live_nodes = report.live_nodes,
        "optimizer reached fixed point"
    );
}

/// One rule evaluated for one transaction.
pub fn evaluated(rule: &str, tx: Option<TxId>, truthy: bool) {
    debug!(
        target: "predicate",
        rule,
        tx = tx.map_or(0, TxId::value),
        truthy,
        "rule evaluated"
    );
}
