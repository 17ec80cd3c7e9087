//! `rebase-sdk` is an async HTTP client for the Rebase forecasting platform.
//!
//! The request layer is [`RebaseClient`] with three primitives:
//! - [`RebaseClient::fetch`] (`GET`, retried when rate limited)
//! - [`RebaseClient::submit`] (`POST`, retried when rate limited)
//! - [`RebaseClient::remove`] (`DELETE`, never retried)
//!
//! Resource wrappers sit on top: [`Sites`], [`Layers`], [`Models`] and
//! [`Weather`]. Historical weather results are memoized on disk by
//! [`ResultCache`].

mod cache;
mod client;
mod decode;
mod error;
mod layer;
mod model;
mod options;
mod params;
mod response;
mod retry;
mod site;
mod types;
mod weather;
mod wire;

pub use cache::{ResultCache, DEFAULT_CACHE_DIR};
pub use client::{join_url, RebaseClient, DEFAULT_BASE_URL};
pub use error::RebaseError;
pub use layer::Layers;
pub use model::Models;
pub use options::ClientOptions;
pub use params::{Payload, Query};
pub use response::ApiResponse;
pub use retry::{Backoff, Jitter, RetryPolicy, DEFAULT_RETRY_STATUSES};
pub use site::Sites;
pub use types::{
    ArtifactKind, ForecastKind, ForecastPoint, ForecastUpload, ObservationPoint, SiteForecast,
    TrainingEvent, TrainingStatus, WeatherRow,
};
pub use weather::Weather;

pub type Result<T> = std::result::Result<T, RebaseError>;
