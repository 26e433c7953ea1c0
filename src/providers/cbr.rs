use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};

use crate::core::config::CbrProviderConfig;
use crate::core::rates::{FetchError, RateResult, RatesProvider};

const TABLE_KEY: &str = "Valute";
const VALUE_KEY: &str = "Value";

/// Validates a decoded daily rates body and picks the requested codes out of
/// its `Valute` table. Fails on the first code that is missing or not numeric.
pub fn extract_rates(body: &Value, codes: &[String]) -> Result<RateResult, FetchError> {
    let table = body
        .get(TABLE_KEY)
        .and_then(Value::as_object)
        .ok_or(FetchError::SchemaViolation)?;

    let mut rates = RateResult::with_capacity(codes.len());
    for code in codes {
        let entry = table
            .get(code)
            .ok_or_else(|| FetchError::UnknownCurrency(code.clone()))?;
        let rate = entry
            .get(VALUE_KEY)
            .and_then(Value::as_f64)
            .ok_or_else(|| FetchError::InvalidRateType(code.clone()))?;
        rates.insert(code.clone(), rate);
    }
    Ok(rates)
}

// CbrProvider implementation for RatesProvider
pub struct CbrProvider {
    client: reqwest::Client,
    endpoint: String,
}

impl CbrProvider {
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("xrates/1.0")
            .timeout(timeout)
            .build()?;
        Ok(CbrProvider {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn from_config(config: &CbrProviderConfig) -> Result<Self> {
        Self::new(&config.endpoint, config.timeout())
    }

    /// Any transport problem, including a non-success status, is reported as
    /// `Unreachable`; the cause only goes to the debug log.
    async fn get_body(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|e| {
            debug!(error = %e, "Request error for {}", url);
            FetchError::Unreachable
        })?;

        if !response.status().is_success() {
            debug!(status = %response.status(), "HTTP error for {}", url);
            return Err(FetchError::Unreachable);
        }

        response.text().await.map_err(|e| {
            debug!(error = %e, "Failed to read response body from {}", url);
            FetchError::Unreachable
        })
    }
}

#[async_trait]
impl RatesProvider for CbrProvider {
    fn default_endpoint(&self) -> &str {
        &self.endpoint
    }

    #[instrument(
        name = "CbrRatesFetch",
        skip(self, codes, endpoint),
        fields(endpoint = %endpoint, count = codes.len())
    )]
    async fn fetch(&self, codes: &[String], endpoint: &str) -> Result<RateResult, FetchError> {
        debug!("Requesting daily rates from {}", endpoint);
        let text = self.get_body(endpoint).await?;

        let body: Value = serde_json::from_str(&text).map_err(|e| {
            debug!(error = %e, "Failed to parse JSON response");
            FetchError::MalformedResponse
        })?;

        extract_rates(&body, codes)
    }
}
