use crate::RetryPolicy;

/// Configures HTTP timeout and retry behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct ClientOptions {
    /// Per-request timeout in milliseconds. `None` leaves the transport default.
    pub timeout_ms: Option<u64>,
    /// Retry policy for `GET` requests.
    pub fetch_retry: RetryPolicy,
    /// Retry policy for `POST` requests.
    pub submit_retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            fetch_retry: RetryPolicy::default(),
            submit_retry: RetryPolicy::default(),
        }
    }
}
