// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! predicate-core: shared rule-predicate DAG with load-time rewriting and
//! per-transaction memoized evaluation.
//!
//! Rules are expression trees over a small operator library. All rules of a
//! rule set live in one [`MergeGraph`], where structurally identical
//! subexpressions are stored once. At load time [`optimize`] rewrites the graph
//! to a fixed point (folding constants, ordering commutative operands). At
//! request time each transaction gets its own [`Context`]; evaluation is lazy
//! and every node is computed at most once per transaction, or once in total
//! for static nodes.
#![forbid(unsafe_code)]
#![deny(missing_docs, rust_2018_idioms, unused_must_use)]
#![deny(
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    clippy::cargo,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::todo,
    clippy::unimplemented,
    clippy::dbg_macro,
    clippy::print_stdout,
    clippy::print_stderr
)]
#![allow(
    clippy::must_use_candidate,
    clippy::return_self_not_must_use,
    clippy::missing_const_for_fn,
    clippy::redundant_pub_crate,
    clippy::module_name_repetitions,
    clippy::use_self
)]

mod call;
mod call_factory;
mod config;
mod context;
mod expr;
mod ident;
mod literal;
mod loader;
mod merge_graph;
mod node;
mod reporter;
/// Standard operator library.
pub mod standard;
mod telemetry;
mod transaction;
mod transform;
mod tx;
mod value;

pub use call::{Arguments, Arity, Call, CustomCall};
pub use call_factory::{CallFactory, Constructor, FactoryError};
pub use config::{
    ConfigError, ConfigService, ConfigStore, LoaderConfig, MemoryConfigStore, OptimizerConfig,
    PredicateConfig, CONFIG_KEY,
};
pub use context::{Context, EvalError, ValueError};
pub use expr::{Expr, ExprShapeError};
pub use ident::{make_structural_key, Hash, NodeId, StructuralKey};
pub use literal::Literal;
pub use loader::{LoadError, LoadReport, RuleFailure, RuleSet};
pub use merge_graph::{GraphError, MergeGraph};
pub use node::{ConstructionError, Node, NodeKind};
pub use reporter::{Diagnostic, NodeReporter, Reporter, Severity};
pub use transaction::{
    FixtureValue, NameValueList, NameValuePair, RequestFixture, RequestLine, ResponseFixture,
    ResponseLine, Transaction, TransactionError, TransactionFixture,
};
pub use transform::{optimize, OptimizeError, OptimizeReport, TransformSite};
pub use tx::TxId;
pub use value::{Field, FieldValue, Value};
