/// Error type returned by this crate.
#[derive(Debug, thiserror::Error)]
pub enum RebaseError {
    /// Network or request execution error from `reqwest`.
    #[error("transport error: {0}")]
    Transport(reqwest::Error),
    /// The API key was rejected (HTTP 401). Never retried.
    #[error("authentication failed: API key was not accepted")]
    Authentication,
    /// The requested resource does not exist (HTTP 404).
    #[error("not found: {body}")]
    NotFound { body: String },
    /// The platform rejected the request input (HTTP 400).
    #[error("invalid input: {body}")]
    InvalidInput { body: String },
    /// Any other non-success HTTP status code with raw response body.
    #[error("api error {status}: {body}")]
    Api { status: u16, body: String },
    /// Response decoding or payload encoding error.
    #[error("decode error: {0}")]
    Decode(String),
    /// A background upload task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
    /// Missing or malformed client configuration.
    #[error("configuration error: {0}")]
    Config(String),
}
