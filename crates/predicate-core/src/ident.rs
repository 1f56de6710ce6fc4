// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identifier and hashing utilities.
use blake3::Hasher;

/// Canonical 256-bit hash used for structural keys.
pub type Hash = [u8; 32];

/// Handle to a node owned by a [`crate::MergeGraph`].
///
/// `NodeId` is an index into the graph's arena. It is stable for the lifetime
/// of the vertex and is never handed out again after the vertex is retired, so
/// a stale id can only ever resolve to "not found".
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u32);

impl NodeId {
    pub(crate) const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the underlying arena index.
    #[must_use]
    pub const fn value(self) -> u32 {
        self.0
    }

    pub(crate) const fn index(self) -> usize {
        self.0 as usize
    }
}

impl core::fmt::Display for NodeId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Content key of a node: the digest of its canonical rendering.
///
/// Two nodes share a key exactly when their renderings are byte-identical,
/// which is the equality [`crate::MergeGraph`] merges on.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct StructuralKey(pub Hash);

impl StructuralKey {
    /// Returns the canonical byte representation of this key.
    #[must_use]
    pub fn as_bytes(&self) -> &Hash {
        &self.0
    }

    /// Hex encoding of the first eight bytes, for logs.
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

/// Produces a stable, domain‑separated structural key (prefix `b"node:"`) using BLAKE3.
pub fn make_structural_key(rendering: &str) -> StructuralKey {
    let mut hasher = Hasher::new();
    hasher.update(b"node:");
    hasher.update(rendering.as_bytes());
    StructuralKey(hasher.finalize().into())
}
