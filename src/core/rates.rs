//! Exchange rate abstractions and the failure taxonomy of a rate fetch

use async_trait::async_trait;
use futures::future::BoxFuture;
use indexmap::IndexMap;
use thiserror::Error;

use crate::core::instrument::{CallArgs, ErrorKind};

/// Daily rates feed of the Central Bank of Russia.
pub const DEFAULT_ENDPOINT: &str = "https://www.cbr-xml-daily.ru/daily_json.js";

/// Requested currency code mapped to its rate, in request order.
pub type RateResult = IndexMap<String, f64>;

/// Failure kinds of a rate fetch. The first failure aborts the whole fetch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// Transport failure or non-success HTTP status.
    #[error("API unavailable")]
    Unreachable,

    /// Response body is not valid JSON.
    #[error("invalid JSON")]
    MalformedResponse,

    /// Rate table is absent from the decoded body.
    #[error("missing Valute key")]
    SchemaViolation,

    /// Requested code is absent from the rate table.
    #[error("currency \"{0}\" is missing")]
    UnknownCurrency(String),

    /// Rate value of the code is not a number.
    #[error("rate for currency \"{0}\" has an invalid type")]
    InvalidRateType(String),
}

impl ErrorKind for FetchError {
    fn kind(&self) -> &str {
        match self {
            FetchError::Unreachable => "Unreachable",
            FetchError::MalformedResponse => "MalformedResponse",
            FetchError::SchemaViolation => "SchemaViolation",
            FetchError::UnknownCurrency(_) => "UnknownCurrency",
            FetchError::InvalidRateType(_) => "InvalidRateType",
        }
    }
}

/// Arguments of a single fetch: codes in the order they should appear in the
/// result, and an optional endpoint overriding the provider's default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchRequest {
    pub codes: Vec<String>,
    pub endpoint: Option<String>,
}

impl FetchRequest {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: codes.into_iter().map(Into::into).collect(),
            endpoint: None,
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }
}

impl CallArgs for FetchRequest {
    fn positional(&self) -> String {
        format!("({:?},)", self.codes)
    }

    fn keyword(&self) -> String {
        match &self.endpoint {
            Some(url) => format!("{{\"url\": {url:?}}}"),
            None => "{}".to_string(),
        }
    }
}

#[async_trait]
pub trait RatesProvider: Send + Sync {
    /// Endpoint used when a request does not name one.
    fn default_endpoint(&self) -> &str;

    async fn fetch(&self, codes: &[String], endpoint: &str) -> Result<RateResult, FetchError>;

    async fn fetch_request(&self, request: &FetchRequest) -> Result<RateResult, FetchError> {
        let endpoint = request
            .endpoint
            .as_deref()
            .unwrap_or_else(|| self.default_endpoint());
        self.fetch(&request.codes, endpoint).await
    }
}

/// Type-erased fetch operation, the shape instrumentation wraps.
pub type FetchFn =
    Box<dyn Fn(FetchRequest) -> BoxFuture<'static, Result<RateResult, FetchError>> + Send + Sync>;
