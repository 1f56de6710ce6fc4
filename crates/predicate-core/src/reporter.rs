// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Diagnostics raised by transforms.
//!
//! Transforms never fail the optimizer for bad user input; they report through
//! a [`NodeReporter`] and leave the node alone. The owning [`Reporter`] keeps
//! every diagnostic for the caller and mirrors it to `tracing`.
use tracing::{error, warn};

use crate::ident::NodeId;

/// How bad a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// The rule still works but is suspicious.
    Warning,
    /// The rule cannot work as written.
    Error,
}

impl core::fmt::Display for Severity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            Self::Warning => "warning",
            Self::Error => "error",
        })
    }
}

/// One reported problem, tied to the node it was raised against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    /// Node the transform was visiting.
    pub node: NodeId,
    /// Rendering of that node when the problem was reported.
    pub rendering: String,
    /// Severity.
    pub severity: Severity,
    /// Human-readable message.
    pub message: String,
}

impl core::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "{}: {} at {} {}",
            self.severity, self.message, self.node, self.rendering
        )
    }
}

/// Collected diagnostics.
#[derive(Debug, Default)]
pub struct Reporter {
    diagnostics: Vec<Diagnostic>,
}

impl Reporter {
    /// Empty reporter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Scoped reporter for one node.
    pub fn node(&mut self, node: NodeId, rendering: impl Into<String>) -> NodeReporter<'_> {
        NodeReporter {
            reporter: self,
            node,
            rendering: rendering.into(),
        }
    }

    /// Everything reported so far, in order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Error-severity diagnostics.
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.by_severity(Severity::Error)
    }

    /// Warning-severity diagnostics.
    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.by_severity(Severity::Warning)
    }

    /// `true` once any error has been reported.
    pub fn has_errors(&self) -> bool {
        self.errors().next().is_some()
    }

    /// Number of diagnostics.
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    /// `true` when nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    /// Drops all diagnostics.
    pub fn clear(&mut self) {
        self.diagnostics.clear();
    }

    fn by_severity(&self, severity: Severity) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics
            .iter()
            .filter(move |d| d.severity == severity)
    }

    fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.severity {
            Severity::Warning => warn!(
                target: "predicate",
                node = %diagnostic.node,
                rendering = %diagnostic.rendering,
                "{}",
                diagnostic.message
            ),
            Severity::Error => error!(
                target: "predicate",
                node = %diagnostic.node,
                rendering = %diagnostic.rendering,
                "{}",
                diagnostic.message
            ),
        }
        self.diagnostics.push(diagnostic);
    }
}

/// Reporter handed to a transform, bound to the visited node.
#[derive(Debug)]
pub struct NodeReporter<'r> {
    reporter: &'r mut Reporter,
    node: NodeId,
    rendering: String,
}

impl NodeReporter<'_> {
    /// Reports a warning against the bound node.
    pub fn warn(&mut self, message: impl Into<String>) {
        self.report(Severity::Warning, message.into());
    }

    /// Reports an error against the bound node.
    pub fn error(&mut self, message: impl Into<String>) {
        self.report(Severity::Error, message.into());
    }

    fn report(&mut self, severity: Severity, message: String) {
        self.reporter.push(Diagnostic {
            node: self.node,
            rendering: self.rendering.clone(),
            severity,
            message,
        });
    }
}
