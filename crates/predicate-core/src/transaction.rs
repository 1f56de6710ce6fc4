// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Parsed transaction data exposed to `field` lookups.
//!
//! The surrounding engine parses HTTP; this module only holds the results:
//! request/response lines, header lists and named fields. Payloads are
//! [`Bytes`], so values handed to the evaluator share storage with the
//! transaction.
use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;
use thiserror::Error;

use crate::tx::TxId;
use crate::value::Field;

/// Errors building transaction records.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransactionError {
    /// A request/response line component that must be non-empty was empty.
    #[error("{0} must not be empty")]
    EmptyComponent(&'static str),
    /// The list could not grow.
    #[error("allocation failed while growing a name/value list")]
    AllocationFailed,
}

/// One header-like name/value pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameValuePair {
    /// Name as received.
    pub name: Bytes,
    /// Value as received.
    pub value: Bytes,
}

/// Append-only list of name/value pairs kept in arrival order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameValueList {
    pairs: Vec<NameValuePair>,
}

impl NameValueList {
    /// Empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a pair at the tail.
    pub fn add(
        &mut self,
        name: impl Into<Bytes>,
        value: impl Into<Bytes>,
    ) -> Result<(), TransactionError> {
        self.pairs
            .try_reserve(1)
            .map_err(|_| TransactionError::AllocationFailed)?;
        self.pairs.push(NameValuePair {
            name: name.into(),
            value: value.into(),
        });
        Ok(())
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// `true` when no pair has been added.
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &NameValuePair> {
        self.pairs.iter()
    }

    /// Calls `f` on each pair in order, stopping at (and returning) the first
    /// error.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&[u8], &[u8]) -> Result<(), E>,
    {
        for pair in &self.pairs {
            f(&pair.name, &pair.value)?;
        }
        Ok(())
    }

    /// First value whose name matches ASCII case-insensitively.
    pub fn get(&self, name: &[u8]) -> Option<&Bytes> {
        self.pairs
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .map(|p| &p.value)
    }

    /// The list as a list field called `name`; items keep their own names.
    pub fn to_field(&self, name: &str) -> Field {
        let items: Vec<Field> = self
            .pairs
            .iter()
            .map(|p| Field::byte_string(p.name.clone(), p.value.clone()))
            .collect();
        Field::list(Bytes::copy_from_slice(name.as_bytes()), items)
    }
}

fn non_empty(component: &'static str, value: Bytes) -> Result<Bytes, TransactionError> {
    if value.is_empty() {
        return Err(TransactionError::EmptyComponent(component));
    }
    Ok(value)
}

/// `METHOD PATH VERSION`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    method: Bytes,
    path: Bytes,
    version: Bytes,
}

impl RequestLine {
    /// Builds a request line; every component must be non-empty.
    pub fn new(
        method: impl Into<Bytes>,
        path: impl Into<Bytes>,
        version: impl Into<Bytes>,
    ) -> Result<Self, TransactionError> {
        Ok(Self {
            method: non_empty("request method", method.into())?,
            path: non_empty("request path", path.into())?,
            version: non_empty("request version", version.into())?,
        })
    }

    /// Request method.
    pub fn method(&self) -> &Bytes {
        &self.method
    }

    /// Request target.
    pub fn path(&self) -> &Bytes {
        &self.path
    }

    /// Protocol version.
    pub fn version(&self) -> &Bytes {
        &self.version
    }
}

/// `[PROTOCOL] CODE MESSAGE`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseLine {
    protocol: Bytes,
    code: Bytes,
    message: Bytes,
}

impl ResponseLine {
    /// Builds a response line; code and message must be non-empty, the
    /// protocol may be empty when the engine did not record it.
    pub fn new(
        protocol: impl Into<Bytes>,
        code: impl Into<Bytes>,
        message: impl Into<Bytes>,
    ) -> Result<Self, TransactionError> {
        Ok(Self {
            protocol: protocol.into(),
            code: non_empty("response code", code.into())?,
            message: non_empty("response message", message.into())?,
        })
    }

    /// Protocol version; may be empty.
    pub fn protocol(&self) -> &Bytes {
        &self.protocol
    }

    /// Status code text.
    pub fn code(&self) -> &Bytes {
        &self.code
    }

    /// Reason phrase.
    pub fn message(&self) -> &Bytes {
        &self.message
    }
}

/// Everything the evaluator may read about one transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    id: TxId,
    request_line: RequestLine,
    response_line: Option<ResponseLine>,
    request_headers: NameValueList,
    response_headers: NameValueList,
    fields: BTreeMap<String, Field>,
}

impl Transaction {
    /// Transaction with a request line and nothing else yet.
    pub fn new(id: TxId, request_line: RequestLine) -> Self {
        Self {
            id,
            request_line,
            response_line: None,
            request_headers: NameValueList::new(),
            response_headers: NameValueList::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Engine-assigned id.
    pub fn id(&self) -> TxId {
        self.id
    }

    /// Request line.
    pub fn request_line(&self) -> &RequestLine {
        &self.request_line
    }

    /// Response line, once the response has been seen.
    pub fn response_line(&self) -> Option<&ResponseLine> {
        self.response_line.as_ref()
    }

    /// Records the response line.
    pub fn set_response_line(&mut self, line: ResponseLine) {
        self.response_line = Some(line);
    }

    /// Request headers.
    pub fn request_headers(&self) -> &NameValueList {
        &self.request_headers
    }

    /// Request headers, for appending.
    pub fn request_headers_mut(&mut self) -> &mut NameValueList {
        &mut self.request_headers
    }

    /// Response headers.
    pub fn response_headers(&self) -> &NameValueList {
        &self.response_headers
    }

    /// Response headers, for appending.
    pub fn response_headers_mut(&mut self) -> &mut NameValueList {
        &mut self.response_headers
    }

    /// Adds or replaces a user field keyed by `name`.
    pub fn set_field(&mut self, name: impl Into<String>, field: Field) {
        self.fields.insert(name.into(), field);
    }

    /// Looks up a field by name.
    ///
    /// Built-in names cover the request/response lines and header lists;
    /// anything else is a user field. Unknown names yield `None`.
    pub fn field(&self, name: &str) -> Option<Field> {
        let named = |value: &Bytes| {
            Some(Field::byte_string(
                Bytes::copy_from_slice(name.as_bytes()),
                value.clone(),
            ))
        };
        match name {
            "request_method" => named(self.request_line.method()),
            "request_uri" => named(self.request_line.path()),
            "request_protocol" => named(self.request_line.version()),
            "request_headers" => Some(self.request_headers.to_field(name)),
            "response_protocol" => self
                .response_line
                .as_ref()
                .filter(|l| !l.protocol().is_empty())
                .and_then(|l| named(l.protocol())),
            "response_status" => self.response_line.as_ref().and_then(|l| named(l.code())),
            "response_message" => self
                .response_line
                .as_ref()
                .and_then(|l| named(l.message())),
            "response_headers" => Some(self.response_headers.to_field(name)),
            _ => self.fields.get(name).cloned(),
        }
    }
}

/// JSON shape of a transaction, used by tooling and tests.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionFixture {
    /// Transaction id.
    #[serde(default)]
    pub id: u64,
    /// Request side.
    pub request: RequestFixture,
    /// Response side, if any.
    #[serde(default)]
    pub response: Option<ResponseFixture>,
    /// User fields.
    #[serde(default)]
    pub fields: BTreeMap<String, FixtureValue>,
}

/// Request half of a [`TransactionFixture`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RequestFixture {
    /// Method.
    pub method: String,
    /// Target.
    pub uri: String,
    /// Protocol version.
    pub protocol: String,
    /// Headers as `[name, value]` pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// Response half of a [`TransactionFixture`].
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResponseFixture {
    /// Protocol version.
    #[serde(default)]
    pub protocol: String,
    /// Status code.
    pub status: String,
    /// Reason phrase.
    pub message: String,
    /// Headers as `[name, value]` pairs.
    #[serde(default)]
    pub headers: Vec<(String, String)>,
}

/// User field value in a fixture.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum FixtureValue {
    /// Integer.
    Number(i64),
    /// Text, stored as bytes.
    Text(String),
    /// Items share the field's name.
    List(Vec<FixtureValue>),
}

impl FixtureValue {
    fn into_field(self, name: &str) -> Field {
        let name_bytes = Bytes::copy_from_slice(name.as_bytes());
        match self {
            Self::Number(n) => Field::number(name_bytes, n),
            Self::Text(text) => Field::byte_string(name_bytes, text),
            Self::List(items) => {
                let items: Vec<Field> = items.into_iter().map(|v| v.into_field(name)).collect();
                Field::list(name_bytes, items)
            }
        }
    }
}

impl TransactionFixture {
    /// Builds the [`Transaction`] this fixture describes.
    pub fn into_transaction(self) -> Result<Transaction, TransactionError> {
        let request = self.request;
        let line = RequestLine::new(request.method, request.uri, request.protocol)?;
        let mut tx = Transaction::new(TxId::from_raw(self.id), line);
        for (name, value) in request.headers {
            tx.request_headers_mut().add(name, value)?;
        }
        if let Some(response) = self.response {
            tx.set_response_line(ResponseLine::new(
                response.protocol,
                response.status,
                response.message,
            )?);
            for (name, value) in response.headers {
                tx.response_headers_mut().add(name, value)?;
            }
        }
        for (name, value) in self.fields {
            let field = value.into_field(&name);
            tx.set_field(name, field);
        }
        Ok(tx)
    }
}
