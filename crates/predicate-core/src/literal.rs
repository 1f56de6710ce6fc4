// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Literal nodes: transaction-independent constants.
use bytes::Bytes;

use crate::value::{Field, Value};

/// A zero-child node whose value is fixed at construction.
///
/// Literals are always static. `Literal::String("")` and `Literal::Null` are
/// the canonical true and false the boolean operators fold to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Literal {
    /// Absent value; renders as `null`.
    Null,
    /// String constant; renders single-quoted with `\` and `'` escaped.
    String(String),
}

impl Literal {
    /// String literal from any string-like input.
    pub fn string(text: impl Into<String>) -> Self {
        Self::String(text.into())
    }

    /// Canonical truthy literal (`''`).
    pub fn truthy() -> Self {
        Self::String(String::new())
    }

    /// Canonical falsy literal (`null`).
    pub const fn falsy() -> Self {
        Self::Null
    }

    /// Maps a boolean onto the canonical literals.
    pub fn from_bool(b: bool) -> Self {
        if b {
            Self::truthy()
        } else {
            Self::falsy()
        }
    }

    /// Statically known truthiness of this literal.
    pub fn is_truthy(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// The value every evaluation of this literal yields.
    pub fn value(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::String(text) => Value::Field(Field::byte_string(
                Bytes::new(),
                Bytes::copy_from_slice(text.as_bytes()),
            )),
        }
    }

    /// Canonical rendering.
    pub fn render(&self) -> String {
        match self {
            Self::Null => "null".to_owned(),
            Self::String(text) => {
                let mut out = String::with_capacity(text.len() + 2);
                out.push('\'');
                for c in text.chars() {
                    if c == '\'' || c == '\\' {
                        out.push('\\');
                    }
                    out.push(c);
                }
                out.push('\'');
                out
            }
        }
    }

    /// Parses a rendered literal back into a [`Literal`].
    ///
    /// Accepts `null` and single-quoted strings using the escaping produced by
    /// [`Literal::render`]. Returns `None` for anything else, including a
    /// dangling backslash or an unescaped quote inside the string.
    pub fn parse(rendered: &str) -> Option<Self> {
        if rendered == "null" {
            return Some(Self::Null);
        }
        let inner = rendered.strip_prefix('\'')?.strip_suffix('\'')?;
        let mut out = String::with_capacity(inner.len());
        let mut chars = inner.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next()? {
                    escaped @ ('\\' | '\'') => out.push(escaped),
                    _ => return None,
                },
                '\'' => return None,
                other => out.push(other),
            }
        }
        Some(Self::String(out))
    }
}

impl core::fmt::Display for Literal {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
#[allow(clippy::expect_used, clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn escaping_matches_rule_language() {
        assert_eq!(Literal::string("node").render(), "'node'");
        assert_eq!(Literal::string("'").render(), r"'\''");
        assert_eq!(Literal::string("foo'bar").render(), r"'foo\'bar'");
        assert_eq!(Literal::string(r"foo\bar").render(), r"'foo\\bar'");
        assert_eq!(Literal::string(r"foo\").render(), r"'foo\\'");
        assert_eq!(Literal::Null.render(), "null");
    }

    #[test]
    fn rendering_round_trips() {
        for raw in ["", "'", "foo'bar", r"foo\bar", r"foo\", r"\'\'"] {
            let lit = Literal::string(raw);
            assert_eq!(Literal::parse(&lit.render()), Some(lit), "raw = {raw:?}");
        }
        assert_eq!(Literal::parse("null"), Some(Literal::Null));
    }

    #[test]
    fn parse_rejects_malformed_text() {
        assert_eq!(Literal::parse("'abc"), None);
        assert_eq!(Literal::parse(r"'a\'"), None);
        assert_eq!(Literal::parse("'a'b'"), None);
        assert_eq!(Literal::parse(r"'\n'"), None);
        assert_eq!(Literal::parse("nil"), None);
    }

    #[test]
    fn literal_values() {
        assert!(Literal::Null.value().is_null());
        assert_eq!(Literal::string("x").value().as_bytes().map(|b| b.as_ref()), Some(&b"x"[..]));
        assert!(Literal::truthy().value().is_truthy());
        assert!(Literal::truthy().is_truthy());
        assert!(!Literal::falsy().is_truthy());
    }
}
