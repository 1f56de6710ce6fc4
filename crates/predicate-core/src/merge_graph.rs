// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Whole-ruleset graph container.
//!
//! [`MergeGraph`] owns every node in an arena addressed by [`NodeId`]. It is
//! the only component that creates or retires nodes or edits child lists, and
//! it keeps three things consistent across every edit:
//!
//! - parent sets mirror child lists;
//! - the structural index maps each live rendering to exactly one node;
//! - a node with no parents that is not a rule root is retired, cascading to
//!   children that become orphaned in turn.
//!
//! Every structural edit re-renders the edited node and its ancestors
//! (children first). A node whose new rendering collides with an existing one
//! is merged into it: parents and roots are redirected and the duplicate is
//! retired.
use std::collections::{BTreeMap, BTreeSet};
use std::sync::OnceLock;

use rustc_hash::{FxHashMap, FxHashSet};
use thiserror::Error;
use tracing::debug;

use crate::ident::{make_structural_key, NodeId, StructuralKey};
use crate::node::{Node, NodeKind};

/// Errors returned by graph mutations and lookups.
///
/// A failing mutation leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    /// The handle does not name a live node.
    #[error("node {0} not found")]
    UnknownNode(NodeId),
    /// `replace_child` was asked to replace something that is not a child.
    #[error("{child} is not a child of {parent}")]
    NotAChild {
        /// Node whose child list was to be edited.
        parent: NodeId,
        /// Supposed child.
        child: NodeId,
    },
    /// The edit would make a node its own descendant.
    #[error("attaching {child} under {parent} would create a cycle")]
    WouldCycle {
        /// Node whose child list was to be edited.
        parent: NodeId,
        /// Node that would be attached.
        child: NodeId,
    },
    /// Literals have no child list.
    #[error("{0} is a literal and cannot take children")]
    NotACall(NodeId),
    /// A rule root with this name already exists.
    #[error("rule `{0}` is already registered")]
    DuplicateRoot(String),
    /// No rule root with this name.
    #[error("rule `{0}` is not registered")]
    UnknownRoot(String),
    /// The arena could not grow.
    #[error("allocation failed while growing the node arena")]
    AllocationFailed,
    /// More nodes than a `NodeId` can address.
    #[error("node arena exhausted")]
    ArenaExhausted,
}

/// Owner of all nodes reachable from the registered rules.
#[derive(Debug, Default)]
pub struct MergeGraph {
    nodes: Vec<Option<Node>>,
    index: FxHashMap<StructuralKey, NodeId>,
    roots: BTreeMap<String, NodeId>,
    root_refs: FxHashMap<NodeId, usize>,
    live: usize,
    /// Nodes created or whose child list changed since the last drain.
    touched: Vec<NodeId>,
}

impl MergeGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.live
    }

    /// `true` when no node is live.
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Whether `id` names a live node.
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Live node lookup.
    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.index()).and_then(Option::as_ref)
    }

    /// Live node lookup that reports unknown handles.
    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.get(id).ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.nodes
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(GraphError::UnknownNode(id))
    }

    /// Iterates live nodes in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Node)> {
        self.nodes.iter().enumerate().filter_map(|(i, slot)| {
            let raw = u32::try_from(i).ok()?;
            slot.as_ref().map(|n| (NodeId::from_raw(raw), n))
        })
    }

    /// Canonical rendering of a live node.
    pub fn to_s(&self, id: NodeId) -> Result<&str, GraphError> {
        self.node(id).map(Node::to_s)
    }

    /// Node view for `{}` formatting (prints the canonical rendering).
    pub fn display(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.node(id)
    }

    /// Finds the live node with exactly this rendering.
    pub fn find(&self, rendering: &str) -> Option<NodeId> {
        self.index.get(&make_structural_key(rendering)).copied()
    }

    /// Adds a detached node, or returns the live node with the same rendering.
    ///
    /// Children must already be live. When an equivalent node exists the
    /// candidate is dropped and the existing handle returned.
    pub fn register(&mut self, mut node: Node) -> Result<NodeId, GraphError> {
        let rendering = self.render(&node.kind, &node.children)?;
        let key = make_structural_key(&rendering);
        if let Some(&existing) = self.index.get(&key) {
            return Ok(existing);
        }
        let raw = u32::try_from(self.nodes.len()).map_err(|_| GraphError::ArenaExhausted)?;
        self.nodes
            .try_reserve(1)
            .map_err(|_| GraphError::AllocationFailed)?;

        let id = NodeId::from_raw(raw);
        node.is_static = self.derive_static(&node.kind, &node.children)?;
        node.rendering = rendering;
        node.key = Some(key);
        node.parents = BTreeSet::new();
        node.static_value = OnceLock::new();
        for &child in &node.children {
            self.node_mut(child)?.parents.insert(id);
        }
        self.nodes.push(Some(node));
        self.index.insert(key, id);
        self.live += 1;
        self.touched.push(id);
        Ok(id)
    }

    /// Replaces every occurrence of `old` in `parent`'s child list with `new`.
    ///
    /// Parent sets of both children are updated, abelian parents lose their
    /// canonical order, and `parent` plus its ancestors are re-keyed. `old` is
    /// retired if this was its last parent and it is not a rule root.
    pub fn replace_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
    ) -> Result<(), GraphError> {
        self.node(new)?;
        if !self.node(parent)?.children.contains(&old) {
            return Err(GraphError::NotAChild { parent, child: old });
        }
        if old == new {
            return Ok(());
        }
        if self.is_ancestor_or_self(new, parent) {
            return Err(GraphError::WouldCycle { parent, child: new });
        }
        self.swap_child(parent, old, new, true)?;
        self.refresh(parent)?;
        self.collect(old);
        Ok(())
    }

    /// Appends `child` to `parent`'s child list.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), GraphError> {
        self.node(child)?;
        if self.node(parent)?.is_literal() {
            return Err(GraphError::NotACall(parent));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(GraphError::WouldCycle { parent, child });
        }
        let node = self.node_mut(parent)?;
        node.children.push(child);
        if is_abelian(node) {
            node.ordered = false;
        }
        self.node_mut(child)?.parents.insert(parent);
        self.touched.push(parent);
        self.refresh(parent)
    }

    /// Substitutes `new` for `old` everywhere: in every parent and every rule
    /// root. `old` is retired afterwards.
    pub fn replace(&mut self, old: NodeId, new: NodeId) -> Result<(), GraphError> {
        self.node(new)?;
        let parents: Vec<NodeId> = self.node(old)?.parents.iter().copied().collect();
        if old == new {
            return Ok(());
        }
        if self.is_ancestor_or_self(new, old) {
            return Err(GraphError::WouldCycle {
                parent: old,
                child: new,
            });
        }
        for parent in parents {
            // An earlier re-key may have merged or retired this parent.
            if !self
                .get(parent)
                .is_some_and(|n| n.children.contains(&old))
            {
                continue;
            }
            self.swap_child(parent, old, new, true)?;
            self.refresh(parent)?;
        }
        self.redirect_roots(old, new);
        self.collect(old);
        Ok(())
    }

    /// Registers `node` as the root of rule `name`.
    pub fn add_root(&mut self, name: impl Into<String>, node: NodeId) -> Result<(), GraphError> {
        self.node(node)?;
        let name = name.into();
        if self.roots.contains_key(&name) {
            return Err(GraphError::DuplicateRoot(name));
        }
        self.roots.insert(name, node);
        *self.root_refs.entry(node).or_default() += 1;
        Ok(())
    }

    /// Unregisters rule `name`, retiring its subgraph where nothing else uses it.
    pub fn remove_root(&mut self, name: &str) -> Result<NodeId, GraphError> {
        let node = self
            .roots
            .remove(name)
            .ok_or_else(|| GraphError::UnknownRoot(name.to_owned()))?;
        if let Some(count) = self.root_refs.get_mut(&node) {
            *count -= 1;
            if *count == 0 {
                self.root_refs.remove(&node);
            }
        }
        self.collect(node);
        Ok(node)
    }

    /// Root node of rule `name`.
    pub fn root(&self, name: &str) -> Option<NodeId> {
        self.roots.get(name).copied()
    }

    /// Rule roots in name order.
    pub fn roots(&self) -> impl Iterator<Item = (&str, NodeId)> {
        self.roots.iter().map(|(name, id)| (name.as_str(), *id))
    }

    /// Whether `id` is the root of at least one rule.
    pub fn is_root(&self, id: NodeId) -> bool {
        self.root_refs.contains_key(&id)
    }

    /// Retires every node not reachable from a rule root; returns the count.
    pub fn collect_garbage(&mut self) -> usize {
        let reachable: FxHashSet<NodeId> = self.post_order().into_iter().collect();
        let dead: Vec<NodeId> = self
            .iter()
            .map(|(id, _)| id)
            .filter(|id| !reachable.contains(id))
            .collect();
        for &id in &dead {
            self.retire(id);
        }
        dead.len()
    }

    /// Clears the cached static value of `id`.
    pub fn reset(&mut self, id: NodeId) -> Result<(), GraphError> {
        self.node_mut(id)?.static_value = OnceLock::new();
        Ok(())
    }

    /// Clears every cached static value.
    pub fn reset_all(&mut self) {
        for node in self.nodes.iter_mut().flatten() {
            node.static_value = OnceLock::new();
        }
    }

    /// Live nodes reachable from the roots, children before parents.
    pub fn post_order(&self) -> Vec<NodeId> {
        let starts: Vec<NodeId> = self.roots.values().copied().collect();
        self.post_order_from(starts, |_| true)
    }

    /// Sorts an abelian call's children by rendering and marks it ordered.
    ///
    /// Returns `true` if the child order changed.
    pub(crate) fn order_children(&mut self, id: NodeId) -> Result<bool, GraphError> {
        let mut children = self.node(id)?.children.clone();
        children.sort_by(|a, b| self.rendering_of(*a).cmp(self.rendering_of(*b)));
        let node = self.node_mut(id)?;
        let changed = node.children != children;
        node.children = children;
        node.ordered = true;
        if changed {
            self.touched.push(id);
            self.refresh(id)?;
        }
        Ok(changed)
    }

    pub(crate) fn take_touched(&mut self) -> Vec<NodeId> {
        std::mem::take(&mut self.touched)
    }

    fn rendering_of(&self, id: NodeId) -> &str {
        self.get(id).map_or("", Node::to_s)
    }

    fn render(&self, kind: &NodeKind, children: &[NodeId]) -> Result<String, GraphError> {
        match kind {
            NodeKind::Literal(lit) => Ok(lit.render()),
            NodeKind::Call(call) => {
                let mut out = String::from("(");
                out.push_str(call.name());
                for &child in children {
                    out.push(' ');
                    out.push_str(self.node(child)?.to_s());
                }
                out.push(')');
                Ok(out)
            }
        }
    }

    fn derive_static(&self, kind: &NodeKind, children: &[NodeId]) -> Result<bool, GraphError> {
        match kind {
            NodeKind::Literal(_) => Ok(true),
            NodeKind::Call(call) => {
                if call.reads_transaction() {
                    return Ok(false);
                }
                for &child in children {
                    if !self.node(child)?.is_static {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
        }
    }

    fn swap_child(
        &mut self,
        parent: NodeId,
        old: NodeId,
        new: NodeId,
        unorder: bool,
    ) -> Result<(), GraphError> {
        let node = self.node_mut(parent)?;
        for slot in &mut node.children {
            if *slot == old {
                *slot = new;
            }
        }
        if unorder && is_abelian(node) {
            node.ordered = false;
        }
        self.node_mut(old)?.parents.remove(&parent);
        self.node_mut(new)?.parents.insert(parent);
        self.touched.push(parent);
        Ok(())
    }

    fn redirect_roots(&mut self, from: NodeId, to: NodeId) {
        let mut moved = 0;
        for id in self.roots.values_mut() {
            if *id == from {
                *id = to;
                moved += 1;
            }
        }
        if moved > 0 {
            self.root_refs.remove(&from);
            *self.root_refs.entry(to).or_default() += moved;
        }
    }

    /// Re-renders `start` and all its ancestors, children first.
    fn refresh(&mut self, start: NodeId) -> Result<(), GraphError> {
        let mut affected = FxHashSet::default();
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            if !affected.insert(id) {
                continue;
            }
            if let Some(node) = self.get(id) {
                stack.extend(node.parents.iter().copied());
            }
        }
        let mut starts: Vec<NodeId> = affected.iter().copied().collect();
        starts.sort_unstable();
        let order = self.post_order_from(starts, |id| affected.contains(&id));
        for id in order {
            self.rekey(id)?;
        }
        Ok(())
    }

    fn rekey(&mut self, id: NodeId) -> Result<(), GraphError> {
        let Some(node) = self.get(id) else {
            return Ok(());
        };
        let rendering = self.render(&node.kind, &node.children)?;
        let is_static = self.derive_static(&node.kind, &node.children)?;
        let rendering_changed = rendering != node.rendering;
        if !rendering_changed && is_static == node.is_static {
            return Ok(());
        }
        if let Some(old_key) = node.key {
            if self.index.get(&old_key) == Some(&id) {
                self.index.remove(&old_key);
            }
        }
        let key = make_structural_key(&rendering);
        if rendering_changed {
            self.unorder_parents(id)?;
        }
        {
            let node = self.node_mut(id)?;
            node.rendering = rendering;
            node.key = Some(key);
            node.is_static = is_static;
            node.static_value = OnceLock::new();
        }
        match self.index.get(&key).copied() {
            Some(existing) if existing != id => {
                debug!(from = %id, into = %existing, key = %key.short(), "merging identical nodes");
                self.merge_into(id, existing)?;
            }
            _ => {
                self.index.insert(key, id);
            }
        }
        Ok(())
    }

    /// Abelian parents sorted against `id`'s old rendering must sort again.
    fn unorder_parents(&mut self, id: NodeId) -> Result<(), GraphError> {
        let parents: Vec<NodeId> = self.node(id)?.parents.iter().copied().collect();
        for parent in parents {
            let node = self.node_mut(parent)?;
            if node.ordered && is_abelian(node) {
                node.ordered = false;
                self.touched.push(parent);
            }
        }
        Ok(())
    }

    fn merge_into(&mut self, from: NodeId, into: NodeId) -> Result<(), GraphError> {
        let parents: Vec<NodeId> = self.node(from)?.parents.iter().copied().collect();
        for parent in parents {
            self.swap_child(parent, from, into, false)?;
        }
        self.redirect_roots(from, into);
        self.touched.push(into);
        self.collect(from);
        Ok(())
    }

    fn is_ancestor_or_self(&self, candidate: NodeId, of: NodeId) -> bool {
        let mut seen = FxHashSet::default();
        let mut stack = vec![of];
        while let Some(id) = stack.pop() {
            if id == candidate {
                return true;
            }
            if !seen.insert(id) {
                continue;
            }
            if let Some(node) = self.get(id) {
                stack.extend(node.parents.iter().copied());
            }
        }
        false
    }

    /// Retires orphans starting at `start`, cascading into their children.
    fn collect(&mut self, start: NodeId) {
        let mut stack = vec![start];
        while let Some(id) = stack.pop() {
            let orphan = self.get(id).is_some_and(|n| n.parents.is_empty());
            if orphan && !self.is_root(id) {
                stack.extend(self.retire(id));
            }
        }
    }

    /// Removes `id` from the arena; returns its former children.
    fn retire(&mut self, id: NodeId) -> Vec<NodeId> {
        let Some(node) = self.nodes.get_mut(id.index()).and_then(Option::take) else {
            return Vec::new();
        };
        self.live -= 1;
        if let Some(key) = node.key {
            if self.index.get(&key) == Some(&id) {
                self.index.remove(&key);
            }
        }
        debug!(node = %id, rendering = %node.rendering, "retired node");
        for &child in &node.children {
            if let Some(c) = self.nodes.get_mut(child.index()).and_then(Option::as_mut) {
                c.parents.remove(&id);
            }
        }
        node.children
    }

    fn post_order_from<F>(&self, starts: Vec<NodeId>, include: F) -> Vec<NodeId>
    where
        F: Fn(NodeId) -> bool,
    {
        let mut order = Vec::new();
        let mut seen = FxHashSet::default();
        for start in starts {
            if !self.contains(start) || !include(start) || !seen.insert(start) {
                continue;
            }
            let mut stack = vec![(start, 0_usize)];
            while let Some(top) = stack.last_mut() {
                let (id, next) = *top;
                match self.get(id).and_then(|n| n.children.get(next).copied()) {
                    Some(child) => {
                        top.1 += 1;
                        if self.contains(child) && include(child) && seen.insert(child) {
                            stack.push((child, 0));
                        }
                    }
                    None => {
                        order.push(id);
                        stack.pop();
                    }
                }
            }
        }
        order
    }
}

fn is_abelian(node: &Node) -> bool {
    node.as_call().is_some_and(crate::call::Call::is_abelian)
}
