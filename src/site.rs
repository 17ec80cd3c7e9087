use serde::Serialize;
use serde_json::Value;

use crate::{
    decode::{build_measurement_upload, decode_forecast, decode_observations, decode_training_status},
    wire, ForecastKind, ObservationPoint, Payload, Query, RebaseClient, Result, SiteForecast,
    TrainingEvent, TrainingStatus,
};

const BASE_PATH: &str = "platform/v1";

/// Site endpoints, borrowed from a [`RebaseClient`].
#[derive(Clone, Copy, Debug)]
pub struct Sites<'a> {
    client: &'a RebaseClient,
}

impl<'a> Sites<'a> {
    pub(crate) fn new(client: &'a RebaseClient) -> Self {
        Self { client }
    }

    /// Creates a site and returns the platform's reply (the new site id).
    pub async fn create<C: Serialize + ?Sized>(&self, config: &C) -> Result<Value> {
        let response = self
            .client
            .submit(&format!("{BASE_PATH}/site/create"), (), Payload::json(config)?)
            .await?
            .error_for_status()?;
        response.json()
    }

    /// Returns the configuration of a site.
    pub async fn get(&self, site_id: &str) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/site/{site_id}"), ())
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn delete(&self, site_id: &str) -> Result<()> {
        self.client
            .remove(&format!("{BASE_PATH}/site/{site_id}"), ())
            .await?
            .error_for_status()?;

        #[cfg(feature = "tracing")]
        tracing::info!("site {} was deleted", site_id);

        Ok(())
    }

    /// Lists all sites of the account.
    pub async fn list(&self) -> Result<Vec<Value>> {
        self.client
            .fetch(&format!("{BASE_PATH}/sites"), ())
            .await?
            .error_for_status()?
            .json()
    }

    /// Returns observed production between `start_date` and the optional `end_date`.
    pub async fn observation(
        &self,
        site_id: &str,
        start_date: &str,
        end_date: Option<&str>,
    ) -> Result<Vec<ObservationPoint>> {
        let query = Query::new()
            .with("start_date", start_date)
            .with_opt("end_date", end_date);
        let response = self
            .client
            .fetch(&format!("{BASE_PATH}/site/observation/{site_id}"), query)
            .await?
            .error_for_status()?;
        decode_observations(response.json::<wire::ObservationResponse>()?)
    }

    /// Returns the latest forecast of a site.
    pub async fn forecast(&self, site_id: &str, kind: ForecastKind) -> Result<SiteForecast> {
        let response = self
            .client
            .fetch(
                &format!("{BASE_PATH}/site/forecast/latest/{site_id}"),
                [("type", kind.as_str())],
            )
            .await?
            .error_for_status()?;
        decode_forecast(response.json::<wire::ForecastResponse>()?)
    }

    /// Queues training for a site.
    pub async fn train(&self, site_id: &str) -> Result<()> {
        self.client
            .submit(&format!("{BASE_PATH}/site/train/{site_id}"), (), Payload::empty())
            .await?
            .error_for_status()?;

        #[cfg(feature = "tracing")]
        tracing::info!("queued training for site {}", site_id);

        Ok(())
    }

    /// Returns the training state of a site.
    ///
    /// A non-success reply yields an empty status rather than an error.
    pub async fn status(&self, site_id: &str) -> Result<TrainingStatus> {
        let response = self
            .client
            .fetch(&format!("{BASE_PATH}/site/train/state/{site_id}"), ())
            .await?;
        if response.status != 200 {
            return Ok(TrainingStatus::default());
        }
        Ok(decode_training_status(response.json::<Vec<TrainingEvent>>()?))
    }

    /// Uploads observed production used for training. Non-finite values are skipped.
    pub async fn upload(&self, site_id: &str, points: &[ObservationPoint]) -> Result<()> {
        let body = build_measurement_upload(points);
        self.client
            .submit(
                &format!("{BASE_PATH}/site/measurement/upload_2/{site_id}"),
                (),
                Payload::json(&body)?,
            )
            .await?
            .error_for_status()?;

        #[cfg(feature = "tracing")]
        {
            if let (Some(first), Some(last)) = (body.valid_time.first(), body.valid_time.last()) {
                tracing::info!("uploaded observations from {} to {}", first, last);
            }
        }

        Ok(())
    }

    /// Lists the models (predicters) attached to a site.
    pub async fn predicters(&self, site_id: &str) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/site/models/{site_id}"), ())
            .await?
            .error_for_status()?
            .json()
    }
}
