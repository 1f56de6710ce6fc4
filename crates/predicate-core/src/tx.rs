// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

//! Transaction identifier types.

/// Thin wrapper around the identifier the surrounding engine assigns to an
/// inspected transaction.
///
/// The core never allocates these; it only carries them on
/// [`crate::Transaction`] so diagnostics and log events can name the
/// transaction a [`crate::Context`] belongs to.
///
/// The `#[repr(transparent)]` attribute keeps `TxId` layout-compatible with
/// `u64` for engines that pass ids across an FFI boundary.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
pub struct TxId(u64);

impl TxId {
    /// Constructs a `TxId` from a raw `u64` value.
    #[must_use]
    pub const fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the underlying raw value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl core::fmt::Display for TxId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.0)
    }
}
