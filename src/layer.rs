use serde_json::Value;

use crate::{wire::LayerCreate, Payload, RebaseClient, Result};

const BASE_PATH: &str = "platform/v1";

/// Layer endpoints. A layer is a deployment package of dependencies.
#[derive(Clone, Copy, Debug)]
pub struct Layers<'a> {
    client: &'a RebaseClient,
}

impl<'a> Layers<'a> {
    pub(crate) fn new(client: &'a RebaseClient) -> Self {
        Self { client }
    }

    /// Creates a layer from a list of package specifiers.
    ///
    /// Rejected package lists surface as [`crate::RebaseError::InvalidInput`].
    pub async fn create(&self, packages: &[String]) -> Result<Value> {
        self.client
            .submit(
                &format!("{BASE_PATH}/layer/create"),
                (),
                Payload::json(&LayerCreate { packages })?,
            )
            .await?
            .error_for_status()?
            .json()
    }

    /// Deletes a layer and returns the platform's message.
    pub async fn delete(&self, layer_id: &str) -> Result<String> {
        let response = self
            .client
            .remove(&format!("{BASE_PATH}/layer/{layer_id}"), ())
            .await?
            .error_for_status()?;
        Ok(response.text())
    }

    pub async fn get(&self, layer_id: &str) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/layer/{layer_id}"), ())
            .await?
            .error_for_status()?
            .json()
    }

    pub async fn list(&self) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/layer/list"), ())
            .await?
            .error_for_status()?
            .json()
    }

    /// Returns the build status of a layer.
    pub async fn status(&self, layer_id: &str) -> Result<Value> {
        self.client
            .fetch(&format!("{BASE_PATH}/layer/status/{layer_id}"), ())
            .await?
            .error_for_status()?
            .json()
    }
}
