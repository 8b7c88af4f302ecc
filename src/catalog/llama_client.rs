use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use thiserror::Error;

use super::normalize::normalize;
use super::source::PoolSource;
use super::types::PoolsResponse;
use crate::errors::EngineError;
use crate::models::{Pool, PoolFilter};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);

#[derive(Debug, Error)]
pub enum LlamaClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

impl From<LlamaClientError> for EngineError {
    fn from(e: LlamaClientError) -> Self {
        EngineError::DataUnavailable(e.to_string())
    }
}

/// Client for a DefiLlama-style yields API.
#[derive(Debug, Clone)]
pub struct LlamaYieldsClient {
    http: Client,
    base_url: String,
}

impl LlamaYieldsClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Fetch and normalize the full pool list.
    pub async fn get_pools(&self) -> Result<Vec<Pool>, LlamaClientError> {
        let url = format!("{}/pools", self.base_url);
        let resp = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?;

        let body: PoolsResponse = resp.json().await?;
        if let Some(status) = body.status.as_deref() {
            if !status.eq_ignore_ascii_case("success") {
                return Err(LlamaClientError::Unexpected(format!("status '{status}'")));
            }
        }

        let raw_count = body.data.len();
        let pools: Vec<Pool> = body.data.into_iter().filter_map(normalize).collect();
        tracing::debug!(
            raw = raw_count,
            normalized = pools.len(),
            "Fetched pool catalog"
        );
        Ok(pools)
    }
}

#[async_trait]
impl PoolSource for LlamaYieldsClient {
    async fn fetch_pools(&self, filter: &PoolFilter) -> Result<Vec<Pool>, EngineError> {
        let pools = self.get_pools().await?;
        Ok(pools.into_iter().filter(|p| filter.matches(p)).collect())
    }
}
