// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Named rule sets: build, optimize, evaluate.
//!
//! A failing rule never takes the rest of the set down with it: its error is
//! recorded in the [`LoadReport`], any half-built nodes are collected, and the
//! next rule is loaded.
use std::collections::BTreeMap;

use thiserror::Error;
use tracing::instrument;

use crate::call_factory::{CallFactory, FactoryError};
use crate::config::PredicateConfig;
use crate::context::{Context, EvalError};
use crate::expr::Expr;
use crate::ident::NodeId;
use crate::merge_graph::{GraphError, MergeGraph};
use crate::reporter::Reporter;
use crate::telemetry;
use crate::transform::{self, OptimizeError, OptimizeReport};
use crate::value::Value;

/// Why a rule (or a whole rule file) could not be loaded.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Unknown operator or bad arity.
    #[error(transparent)]
    Factory(#[from] FactoryError),
    /// Graph refused the construction.
    #[error(transparent)]
    Graph(#[from] GraphError),
    /// A rule with this name is already loaded.
    #[error("rule `{0}` is already loaded")]
    DuplicateRule(String),
    /// Expression nests deeper than the loader allows.
    #[error("expression depth {depth} exceeds the limit of {max_depth}")]
    TooDeep {
        /// Depth of the rejected expression.
        depth: usize,
        /// Configured limit.
        max_depth: usize,
    },
    /// Rule file is not valid JSON of the expected shape.
    #[error("malformed rule file: {0}")]
    Json(#[from] serde_json::Error),
}

/// One rejected rule.
#[derive(Debug)]
pub struct RuleFailure {
    /// Rule name.
    pub rule: String,
    /// What went wrong.
    pub error: LoadError,
}

/// Outcome of [`RuleSet::load`].
#[derive(Debug, Default)]
pub struct LoadReport {
    /// Rules that made it into the graph.
    pub loaded: Vec<String>,
    /// Rules that were rejected.
    pub failures: Vec<RuleFailure>,
    /// Rules not attempted because loading stopped at a failure.
    pub skipped: usize,
}

impl LoadReport {
    /// `true` when every rule loaded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }
}

/// A graph of named rules plus the registry and settings that built it.
#[derive(Debug)]
pub struct RuleSet {
    graph: MergeGraph,
    factory: CallFactory,
    reporter: Reporter,
    config: PredicateConfig,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::new(PredicateConfig::default())
    }
}

impl RuleSet {
    /// Empty rule set using the standard operators.
    pub fn new(config: PredicateConfig) -> Self {
        Self::with_factory(CallFactory::with_standard(), config)
    }

    /// Empty rule set using a caller-supplied operator registry.
    pub fn with_factory(factory: CallFactory, config: PredicateConfig) -> Self {
        Self {
            graph: MergeGraph::new(),
            factory,
            reporter: Reporter::new(),
            config,
        }
    }

    /// Underlying graph.
    pub fn graph(&self) -> &MergeGraph {
        &self.graph
    }

    /// Operator registry.
    pub fn factory(&self) -> &CallFactory {
        &self.factory
    }

    /// Operator registry, for registering custom operators before loading.
    pub fn factory_mut(&mut self) -> &mut CallFactory {
        &mut self.factory
    }

    /// Diagnostics from transforms.
    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Active settings.
    pub fn config(&self) -> &PredicateConfig {
        &self.config
    }

    /// Loads `rules` in order.
    #[instrument(skip_all)]
    pub fn load<I, S>(&mut self, rules: I) -> LoadReport
    where
        I: IntoIterator<Item = (S, Expr)>,
        S: Into<String>,
    {
        let mut report = LoadReport::default();
        let mut rules = rules.into_iter();
        for (name, expr) in rules.by_ref() {
            let name = name.into();
            match self.load_one(&name, &expr) {
                Ok(root) => {
                    telemetry::rule_loaded(&name, root, self.graph.to_s(root).unwrap_or_default());
                    report.loaded.push(name);
                }
                Err(error) => {
                    telemetry::rule_failed(&name, &error);
                    report.failures.push(RuleFailure { rule: name, error });
                    if !self.config.loader.skip_failed_rules {
                        break;
                    }
                }
            }
        }
        report.skipped = rules.count();
        self.graph.collect_garbage();
        telemetry::load_summary(report.loaded.len(), report.failures.len(), self.graph.len());
        report
    }

    /// Loads a JSON object mapping rule names to expressions.
    pub fn load_json(&mut self, bytes: &[u8]) -> Result<LoadReport, LoadError> {
        let rules: BTreeMap<String, Expr> = serde_json::from_slice(bytes)?;
        Ok(self.load(rules))
    }

    fn load_one(&mut self, name: &str, expr: &Expr) -> Result<NodeId, LoadError> {
        if self.graph.root(name).is_some() {
            return Err(LoadError::DuplicateRule(name.to_owned()));
        }
        let root = expr.build(&mut self.graph, &self.factory, self.config.loader.max_depth)?;
        self.graph.add_root(name, root)?;
        Ok(root)
    }

    /// Drops a rule and whatever only it used.
    pub fn unload(&mut self, name: &str) -> Result<(), GraphError> {
        self.graph.remove_root(name).map(|_| ())
    }

    /// Runs the optimizer with the configured settings.
    pub fn optimize(&mut self) -> Result<OptimizeReport, OptimizeError> {
        transform::optimize(
            &mut self.graph,
            &self.factory,
            &mut self.reporter,
            &self.config.optimizer,
        )
    }

    /// Rule names with their current renderings.
    pub fn render(&self) -> Vec<(String, String)> {
        self.graph
            .roots()
            .map(|(name, id)| {
                let rendering = self.graph.to_s(id).unwrap_or_default().to_owned();
                (name.to_owned(), rendering)
            })
            .collect()
    }

    /// Evaluates one rule.
    pub fn evaluate(&self, rule: &str, context: &mut Context<'_>) -> Result<Value, EvalError> {
        let root = self
            .graph
            .root(rule)
            .ok_or_else(|| GraphError::UnknownRoot(rule.to_owned()))?;
        let value = self.graph.eval(root, context)?;
        telemetry::evaluated(rule, context.tx_id(), value.is_truthy());
        Ok(value)
    }

    /// Evaluates every rule; one rule's error does not stop the others.
    pub fn evaluate_all(&self, context: &mut Context<'_>) -> Vec<(String, Result<Value, EvalError>)> {
        let names: Vec<String> = self.graph.roots().map(|(name, _)| name.to_owned()).collect();
        names
            .into_iter()
            .map(|name| {
                let result = self.evaluate(&name, context);
                (name, result)
            })
            .collect()
    }
}
