use serde_json::Value;
use tokio::task::JoinSet;

use crate::{
    decode::build_forecast_upload, ArtifactKind, ForecastUpload, Payload, RebaseClient,
    RebaseError, Result,
};

const BASE_PATH: &str = "platform/v1/model";

/// Custom model endpoints.
///
/// Model code and trained state travel as opaque serialized bytes; this
/// crate never interprets them.
#[derive(Clone, Copy, Debug)]
pub struct Models<'a> {
    client: &'a RebaseClient,
}

impl<'a> Models<'a> {
    pub(crate) fn new(client: &'a RebaseClient) -> Self {
        Self { client }
    }

    /// Registers serialized model `code` under `model_name` for a site.
    pub async fn create_custom(
        &self,
        site_id: &str,
        model_name: &str,
        code: impl Into<Vec<u8>>,
    ) -> Result<Value> {
        self.client
            .submit(
                &format!("{BASE_PATH}/custom/create/{site_id}"),
                [("model_name", model_name)],
                Payload::binary(code),
            )
            .await?
            .error_for_status()?
            .json()
    }

    /// Returns the configuration of a model, including its `site_id`.
    pub async fn config(&self, model_id: &str) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/{model_id}"), ())
            .await?
            .error_for_status()?
            .json()
    }

    /// Downloads a serialized model artifact.
    pub async fn download(&self, model_id: &str, kind: ArtifactKind) -> Result<Vec<u8>> {
        let response = self
            .client
            .fetch(
                &format!("{BASE_PATH}/custom/download/{}/{model_id}", kind.as_str()),
                (),
            )
            .await?
            .error_for_status()?;
        Ok(response.body)
    }

    /// Uploads the serialized trained state of a model.
    pub async fn upload_trained(&self, model_id: &str, trained: impl Into<Vec<u8>>) -> Result<()> {
        self.client
            .submit(
                &format!("{BASE_PATH}/custom/upload/trained/{model_id}"),
                (),
                Payload::binary(trained),
            )
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Uploads the forecast for one reference time.
    pub async fn upload_forecast(&self, model_id: &str, upload: &ForecastUpload) -> Result<()> {
        let body = build_forecast_upload(upload)?;
        self.client
            .submit(
                &format!("{BASE_PATH}/custom/forecast/upload/{model_id}"),
                (),
                Payload::json(&body)?,
            )
            .await?
            .error_for_status()?;
        Ok(())
    }

    /// Uploads many forecasts with at most `concurrency` requests in flight.
    ///
    /// Results are returned in the order of `uploads`. A failed upload does
    /// not stop the others.
    pub async fn upload_forecasts(
        &self,
        model_id: &str,
        uploads: Vec<ForecastUpload>,
        concurrency: usize,
    ) -> Vec<Result<()>> {
        let limit = concurrency.max(1);
        let total = uploads.len();
        let mut results: Vec<Option<Result<()>>> = (0..total).map(|_| None).collect();
        let mut pending = uploads.into_iter().enumerate();
        let mut tasks = JoinSet::new();

        loop {
            while tasks.len() < limit {
                let Some((index, upload)) = pending.next() else {
                    break;
                };
                let client = self.client.clone();
                let model_id = model_id.to_owned();
                tasks.spawn(async move {
                    let result = client.models().upload_forecast(&model_id, &upload).await;
                    (index, result)
                });
            }

            match tasks.join_next().await {
                Some(Ok((index, result))) => results[index] = Some(result),
                Some(Err(_err)) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!("forecast upload task failed: {}", _err);
                }
                None => break,
            }
        }

        results
            .into_iter()
            .map(|slot| {
                slot.unwrap_or_else(|| {
                    Err(RebaseError::Task(
                        "forecast upload task did not complete".to_owned(),
                    ))
                })
            })
            .collect()
    }
}
