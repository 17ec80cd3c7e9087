use serde::Serialize;

use crate::{RebaseError, Result};

pub(crate) const JSON_CONTENT_TYPE: &str = "application/json";
pub(crate) const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// Query-string parameters for a request.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(Vec<(String, String)>);

impl Query {
    /// Creates an empty parameter list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a parameter.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.push((name.into(), value.into()));
        self
    }

    /// Appends a parameter only when `value` is present.
    pub fn with_opt(self, name: impl Into<String>, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.with(name, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn pairs(&self) -> &[(String, String)] {
        &self.0
    }
}

impl From<()> for Query {
    fn from(_: ()) -> Self {
        Self::default()
    }
}

impl From<Vec<(String, String)>> for Query {
    fn from(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Query
where
    K: Into<String>,
    V: Into<String>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        )
    }
}

/// Request body for `submit`, together with its content type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Payload {
    /// Value of the `Content-Type` header.
    pub content_type: &'static str,
    /// Raw body bytes.
    pub bytes: Vec<u8>,
}

impl Payload {
    /// Serializes `value` as a JSON body.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self> {
        let bytes = serde_json::to_vec(value)
            .map_err(|err| RebaseError::Decode(format!("could not encode JSON body: {err}")))?;
        Ok(Self {
            content_type: JSON_CONTENT_TYPE,
            bytes,
        })
    }

    /// Wraps already serialized bytes, e.g. an opaque model artifact.
    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            content_type: BINARY_CONTENT_TYPE,
            bytes: bytes.into(),
        }
    }

    /// An empty JSON-typed body.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl Default for Payload {
    fn default() -> Self {
        Self {
            content_type: JSON_CONTENT_TYPE,
            bytes: Vec::new(),
        }
    }
}
