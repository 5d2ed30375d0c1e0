use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AppError, Result};

use super::poller::StatusFetcher;
use super::{JobStatus, StatusSnapshot};

/// Client for a Replicate-style prediction API.
///
/// Only the status endpoint is wrapped here; submissions happen inside the
/// plan engine as tool calls and reach us as opaque submission results.
pub struct ReplicateClient {
    client: Client,
    base_url: String,
    api_token: String,
}

impl ReplicateClient {
    pub fn new(base_url: &str, api_token: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
        }
    }

    async fn get_prediction(&self, id: &str) -> Result<PredictionResponse> {
        let url = format!("{}/predictions/{}", self.base_url, id);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::PredictionApi(format!(
                "API returned {status}: {body}"
            )));
        }

        let body = response.json::<PredictionResponse>().await?;
        Ok(body)
    }
}

#[async_trait]
impl StatusFetcher for ReplicateClient {
    async fn fetch(&self, job_id: &str) -> Result<StatusSnapshot> {
        let prediction = self.get_prediction(job_id).await?;
        Ok(StatusSnapshot {
            status: JobStatus::parse(&prediction.status),
            output: prediction.output.as_ref().and_then(normalize_output),
        })
    }
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    status: String,
    #[serde(default)]
    output: Option<Value>,
}

/// The API returns `output` as either a single URL or a list of URLs
/// depending on the model. Normalize both to an ordered list.
fn normalize_output(output: &Value) -> Option<Vec<String>> {
    match output {
        Value::String(url) => Some(vec![url.clone()]),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(|item| item.as_str().map(String::from))
                .collect(),
        ),
        _ => None,
    }
}
