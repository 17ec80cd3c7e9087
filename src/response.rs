use serde::de::DeserializeOwned;

use crate::{RebaseError, Result};

/// Raw HTTP response returned by the request layer.
///
/// Non-success statuses are ordinary values here; resource wrappers decide
/// what they mean via [`ApiResponse::error_for_status`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Lossy UTF-8 view of the body.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_slice(&self.body).map_err(|err| {
            RebaseError::Decode(format!(
                "invalid response JSON: {err}; body: {}",
                self.text()
            ))
        })
    }

    /// Maps non-success statuses to domain errors, passing 2xx through.
    pub fn error_for_status(self) -> Result<Self> {
        match self.status {
            200..=299 => Ok(self),
            401 => Err(RebaseError::Authentication),
            400 => Err(RebaseError::InvalidInput { body: self.text() }),
            404 => Err(RebaseError::NotFound { body: self.text() }),
            status => Err(RebaseError::Api {
                status,
                body: self.text(),
            }),
        }
    }
}
