use super::types::*;
use crate::{
    Error, Result,
    config::{GenerationConfig, ReplicateConfig},
};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[async_trait]
pub trait PredictionClient: Send + Sync {
    async fn create_prediction(&self, prompt: &str) -> Result<PredictionHandle>;

    async fn get_prediction(&self, id: &str) -> Result<PredictionStatus>;
}

pub struct ReplicateClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    model_version: String,
    request_timeout: Duration,
    params: GenerationConfig,
}

impl ReplicateClient {
    pub fn new(config: ReplicateConfig, params: GenerationConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config, params)
    }

    pub fn with_client(
        client: reqwest::Client,
        config: ReplicateConfig,
        params: GenerationConfig,
    ) -> Self {
        Self {
            client,
            request_timeout: config.request_timeout(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token,
            model_version: config.model_version,
            params,
        }
    }

    fn predictions_url(&self) -> String {
        format!("{}/predictions", self.base_url)
    }

    /// Reads the body of a response, turning non-2xx statuses into `Error::Api`.
    async fn read_body(response: reqwest::Response) -> Result<String> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(api_error(status, body));
        }

        Ok(body)
    }
}

fn api_error(status: StatusCode, body: String) -> Error {
    Error::Api {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl PredictionClient for ReplicateClient {
    async fn create_prediction(&self, prompt: &str) -> Result<PredictionHandle> {
        let request = PredictionRequest::new(&self.model_version, prompt, &self.params);

        debug!(
            "Creating prediction for prompt ({} chars) with version {}",
            prompt.len(),
            self.model_version
        );

        let response = self
            .client
            .post(self.predictions_url())
            .bearer_auth(&self.api_token)
            .timeout(self.request_timeout)
            .json(&request)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let response_json: Value = serde_json::from_str(&body)?;

        let id = response_json
            .get("id")
            .and_then(|id| id.as_str())
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::invalid_response("prediction response missing id field"))?;

        debug!("Prediction created: {}", id);
        Ok(PredictionHandle { id: id.to_string() })
    }

    async fn get_prediction(&self, id: &str) -> Result<PredictionStatus> {
        let response = self
            .client
            .get(format!("{}/{}", self.predictions_url(), id))
            .bearer_auth(&self.api_token)
            .timeout(self.request_timeout)
            .send()
            .await?;

        let body = Self::read_body(response).await?;
        let status: PredictionStatus = serde_json::from_str(&body)?;

        debug!("Prediction {} status: {}", id, status.status.as_str());
        Ok(status)
    }
}
