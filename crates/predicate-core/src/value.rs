// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Values produced by evaluating nodes.
//!
//! A [`Value`] is either absent ([`Value::Null`]) or a [`Field`]. Fields share
//! their payload with the transaction that produced them: byte strings are
//! [`Bytes`] and lists are reference counted, so cloning a value never copies
//! request data.
//!
//! Truthiness: `Null` and an empty list are falsy, everything else is truthy.
//! The empty byte string is truthy and is the canonical "true" produced by
//! boolean operators.
use std::sync::Arc;

use bytes::Bytes;

/// Payload carried by a [`Field`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Raw bytes (header values, URIs, literals).
    ByteString(Bytes),
    /// Signed integer.
    Number(i64),
    /// Ordered collection of sub-fields (e.g. a header list).
    List(Arc<[Field]>),
}

/// A named datum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    name: Bytes,
    value: FieldValue,
}

impl Field {
    /// Creates a field from a name and payload.
    pub fn new(name: impl Into<Bytes>, value: FieldValue) -> Self {
        Self {
            name: name.into(),
            value,
        }
    }

    /// Creates a byte-string field.
    pub fn byte_string(name: impl Into<Bytes>, value: impl Into<Bytes>) -> Self {
        Self::new(name, FieldValue::ByteString(value.into()))
    }

    /// Creates a numeric field.
    pub fn number(name: impl Into<Bytes>, value: i64) -> Self {
        Self::new(name, FieldValue::Number(value))
    }

    /// Creates a list field.
    pub fn list(name: impl Into<Bytes>, items: impl Into<Arc<[Field]>>) -> Self {
        Self::new(name, FieldValue::List(items.into()))
    }

    /// Field name.
    pub fn name(&self) -> &Bytes {
        &self.name
    }

    /// Field payload.
    pub fn value(&self) -> &FieldValue {
        &self.value
    }

    /// Returns the payload when this is a byte-string field.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match &self.value {
            FieldValue::ByteString(b) => Some(b),
            _ => None,
        }
    }

    /// Returns the items when this is a list field.
    pub fn as_list(&self) -> Option<&[Field]> {
        match &self.value {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// Result of evaluating a node.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Value {
    /// Absent value; falsy.
    #[default]
    Null,
    /// A present field.
    Field(Field),
}

impl Value {
    /// Canonical truthy value: an unnamed empty byte string.
    pub fn truthy() -> Self {
        Self::Field(Field::byte_string(Bytes::new(), Bytes::new()))
    }

    /// Canonical falsy value.
    pub const fn falsy() -> Self {
        Self::Null
    }

    /// Maps a boolean onto the canonical true/false values.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Self::truthy()
        } else {
            Self::falsy()
        }
    }

    /// Truthiness as used by the boolean operators.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Field(field) => match field.value() {
                FieldValue::List(items) => !items.is_empty(),
                FieldValue::ByteString(_) | FieldValue::Number(_) => true,
            },
        }
    }

    /// `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The field, when present.
    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Self::Null => None,
            Self::Field(field) => Some(field),
        }
    }

    /// The byte-string payload, when present.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        self.as_field().and_then(Field::as_bytes)
    }
}

impl From<Field> for Value {
    fn from(field: Field) -> Self {
        Self::Field(field)
    }
}

impl From<Option<Field>> for Value {
    fn from(field: Option<Field>) -> Self {
        field.map_or(Self::Null, Self::Field)
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn truthiness_convention() {
        assert!(!Value::Null.is_truthy());
        assert!(Value::truthy().is_truthy());
        assert!(Value::from(Field::byte_string("a", "")).is_truthy());
        assert!(Value::from(Field::number("n", 0)).is_truthy());
        assert!(!Value::from(Field::list("l", Vec::new())).is_truthy());
        assert!(Value::from(Field::list("l", vec![Field::number("x", 1)])).is_truthy());
    }

    #[test]
    fn canonical_true_is_empty_byte_string() {
        let t = Value::truthy();
        assert_eq!(t.as_bytes().map(Bytes::len), Some(0));
        assert!(Value::from_bool(false).is_null());
    }

    #[test]
    fn clones_share_payload() {
        let payload = Bytes::from_static(b"GET");
        let v = Value::from(Field::byte_string("request_method", payload.clone()));
        let w = v.clone();
        let (Some(a), Some(b)) = (v.as_bytes(), w.as_bytes()) else {
            panic!("expected byte strings");
        };
        assert_eq!(a.as_ptr(), b.as_ptr());
        assert_eq!(a.as_ptr(), payload.as_ptr());
    }
}
