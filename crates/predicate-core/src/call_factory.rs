// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Name → operator registry used to build call nodes.
use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;

use crate::call::{Call, CustomCall};
use crate::ident::NodeId;
use crate::node::{ConstructionError, Node};
use crate::standard;

/// Builds a fresh [`Call`] for one node.
pub type Constructor = Arc<dyn Fn() -> Call + Send + Sync>;

/// Errors returned by [`CallFactory`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FactoryError {
    /// No operator registered under this name.
    #[error("unknown operator `{0}`")]
    UnknownOperator(String),
    /// An operator with this name is already registered.
    #[error("operator `{0}` is already registered")]
    DuplicateOperator(String),
    /// The operator rejected the supplied children.
    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

/// Registry of call constructors keyed by operator name.
#[derive(Clone, Default)]
pub struct CallFactory {
    constructors: BTreeMap<String, Constructor>,
}

impl CallFactory {
    /// Empty factory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Factory preloaded with the standard operators.
    #[must_use]
    pub fn with_standard() -> Self {
        let mut factory = Self::new();
        standard::load(&mut factory);
        factory
    }

    /// Registers `constructor` under `name`.
    ///
    /// # Errors
    /// Returns [`FactoryError::DuplicateOperator`] if `name` is taken.
    pub fn register<F>(&mut self, name: impl Into<String>, constructor: F) -> Result<(), FactoryError>
    where
        F: Fn() -> Call + Send + Sync + 'static,
    {
        let name = name.into();
        if self.constructors.contains_key(&name) {
            return Err(FactoryError::DuplicateOperator(name));
        }
        self.constructors.insert(name, Arc::new(constructor));
        Ok(())
    }

    /// Registers a runtime operator under its own name.
    pub fn register_custom(&mut self, op: Arc<dyn CustomCall>) -> Result<(), FactoryError> {
        let name = op.name().to_owned();
        self.register(name, move || Call::Custom(Arc::clone(&op)))
    }

    /// Builds a detached call node for `name` with `children`.
    ///
    /// # Errors
    /// [`FactoryError::UnknownOperator`] for unregistered names and
    /// [`FactoryError::Construction`] when the arity does not fit.
    pub fn create(&self, name: &str, children: Vec<NodeId>) -> Result<Node, FactoryError> {
        let constructor = self
            .constructors
            .get(name)
            .ok_or_else(|| FactoryError::UnknownOperator(name.to_owned()))?;
        Ok(Node::call(constructor(), children)?)
    }

    /// Whether `name` is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl core::fmt::Debug for CallFactory {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}
