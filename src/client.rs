use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::{header, Method, StatusCode};
use tokio::time::sleep;

use crate::{
    cache::DEFAULT_CACHE_DIR, ApiResponse, ClientOptions, Layers, Models, Payload, Query,
    RebaseError, Result, ResultCache, RetryPolicy, Sites, Weather,
};

/// Production API root.
pub const DEFAULT_BASE_URL: &str = "https://api.rebase.energy/";

/// Second header carrying the API key, for the platform's API gateway.
const API_KEY_HEADER: &str = "GL-API-KEY";

/// Joins a base URL and a relative path with exactly one `/` in between.
pub fn join_url(base_url: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

#[derive(Clone)]
/// HTTP client for the Rebase platform API.
///
/// Cloning is cheap and clones share the underlying connection pool.
pub struct RebaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    options: ClientOptions,
    cache: Option<ResultCache>,
}

impl fmt::Debug for RebaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RebaseClient")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("options", &self.options)
            .field("cache", &self.cache)
            .finish()
    }
}

impl RebaseClient {
    /// Creates a client for `base_url` authenticating with `api_key`.
    ///
    /// The key is sent as-is in both the `Authorization` and `GL-API-KEY`
    /// headers. No weather cache is attached; see [`RebaseClient::with_cache_dir`].
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            options: ClientOptions::default(),
            cache: None,
        }
    }

    /// Creates a client for the production API.
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self::new(DEFAULT_BASE_URL, api_key)
    }

    /// Creates a client from environment variables.
    ///
    /// Reads:
    /// - `REBASE_API_KEY` — required
    /// - `REBASE_BASE_URL` — optional, defaults to [`DEFAULT_BASE_URL`]
    /// - `REBASE_CACHE_DIR` — optional, defaults to `./cache`
    ///
    /// # Example
    ///
    /// ```no_run
    /// use rebase_sdk::RebaseClient;
    ///
    /// let client = RebaseClient::from_env().expect("missing REBASE_API_KEY");
    /// ```
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("REBASE_API_KEY").map_err(|_| {
            RebaseError::Config("missing REBASE_API_KEY environment variable".to_owned())
        })?;
        if api_key.trim().is_empty() {
            return Err(RebaseError::Config(
                "REBASE_API_KEY is set but empty".to_owned(),
            ));
        }
        let base_url = non_empty_var("REBASE_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let cache_dir = non_empty_var("REBASE_CACHE_DIR").unwrap_or_else(|| DEFAULT_CACHE_DIR.into());

        Ok(Self::new(base_url, api_key.trim()).with_cache_dir(cache_dir))
    }

    /// Applies client options such as timeout and retry behavior.
    pub fn with_options(mut self, opts: ClientOptions) -> Self {
        self.options = opts;
        self
    }

    /// Opens (creating if needed) the historical weather cache under `dir`.
    pub fn with_cache_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.with_cache(ResultCache::open(dir))
    }

    /// Attaches an already opened weather cache.
    pub fn with_cache(mut self, cache: ResultCache) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn cache(&self) -> Option<&ResultCache> {
        self.cache.as_ref()
    }

    /// Site resources.
    pub fn sites(&self) -> Sites<'_> {
        Sites::new(self)
    }

    /// Layer (deployment package) resources.
    pub fn layers(&self) -> Layers<'_> {
        Layers::new(self)
    }

    /// Custom model resources.
    pub fn models(&self) -> Models<'_> {
        Models::new(self)
    }

    /// Weather data.
    pub fn weather(&self) -> Weather<'_> {
        Weather::new(self)
    }

    /// Sends a `GET`, retrying rate-limited responses per
    /// [`ClientOptions::fetch_retry`].
    ///
    /// Non-success statuses other than 401 are returned, not raised.
    pub async fn fetch(&self, path: &str, query: impl Into<Query>) -> Result<ApiResponse> {
        self.send_with_retry(
            Method::GET,
            path,
            &query.into(),
            None,
            &self.options.fetch_retry,
        )
        .await
    }

    /// Sends a `POST` with `payload`, retrying rate-limited responses per
    /// [`ClientOptions::submit_retry`].
    pub async fn submit(
        &self,
        path: &str,
        query: impl Into<Query>,
        payload: Payload,
    ) -> Result<ApiResponse> {
        self.send_with_retry(
            Method::POST,
            path,
            &query.into(),
            Some(&payload),
            &self.options.submit_retry,
        )
        .await
    }

    /// Sends a `DELETE`. Never retried.
    pub async fn remove(&self, path: &str, query: impl Into<Query>) -> Result<ApiResponse> {
        self.send_with_retry(
            Method::DELETE,
            path,
            &query.into(),
            None,
            &RetryPolicy::none(),
        )
        .await
    }

    async fn send_with_retry(
        &self,
        method: Method,
        path: &str,
        query: &Query,
        payload: Option<&Payload>,
        policy: &RetryPolicy,
    ) -> Result<ApiResponse> {
        let url = join_url(&self.base_url, path);
        let mut attempt = 0u32;
        loop {
            let response = self.send_once(method.clone(), &url, query, payload).await?;

            if response.status == StatusCode::UNAUTHORIZED.as_u16() {
                return Err(RebaseError::Authentication);
            }

            if policy.should_retry(response.status, attempt) {
                self.wait_before_retry(policy, attempt, response.status)
                    .await;
                attempt += 1;
                continue;
            }

            return Ok(response);
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        query: &Query,
        payload: Option<&Payload>,
    ) -> Result<ApiResponse> {
        let mut request = self
            .http
            .request(method, url)
            .header(header::AUTHORIZATION, self.api_key.as_str())
            .header(API_KEY_HEADER, self.api_key.as_str());

        if !query.is_empty() {
            request = request.query(query.pairs());
        }
        if let Some(timeout_ms) = self.options.timeout_ms {
            request = request.timeout(Duration::from_millis(timeout_ms));
        }
        if let Some(payload) = payload {
            request = request
                .header(header::CONTENT_TYPE, payload.content_type)
                .body(payload.bytes.clone());
        }

        let response = request.send().await.map_err(RebaseError::Transport)?;
        let status = response.status().as_u16();
        let body = response.bytes().await.map_err(RebaseError::Transport)?;
        Ok(ApiResponse::new(status, body.to_vec()))
    }

    async fn wait_before_retry(&self, policy: &RetryPolicy, attempt: u32, _status: u16) {
        let delay = policy.backoff.delay_for_attempt(attempt);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "status {} on attempt {}/{}, retrying after {} ms",
            _status,
            attempt + 1,
            policy.max_attempts,
            delay.as_millis()
        );

        sleep(delay).await;
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}
