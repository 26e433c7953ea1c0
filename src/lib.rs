pub mod cli;
pub mod core;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::instrument::{self, Instrumented, LogSink, OperationMeta};
use crate::core::rates::{FetchFn, FetchRequest, RatesProvider};
use anyhow::Result;
use futures::FutureExt;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Fetch rates for `codes`, or the configured list when empty
    Rates {
        codes: Vec<String>,
        endpoint: Option<String>,
    },
}

/// Wraps the provider's fetch so that every call is reported to `sink`.
pub fn instrumented_fetch(
    provider: Arc<dyn RatesProvider>,
    sink: Arc<dyn LogSink>,
) -> Instrumented<FetchFn> {
    let meta = OperationMeta::new("fetch_rates")
        .with_description("Fetches daily exchange rates for the requested currency codes");
    let operation: FetchFn = Box::new(move |request: FetchRequest| {
        let provider = Arc::clone(&provider);
        async move { provider.fetch_request(&request).await }.boxed()
    });
    instrument::wrap(meta, sink, operation)
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("xrates starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    match command {
        AppCommand::Rates { codes, endpoint } => cli::rates::run(&config, codes, endpoint).await,
    }
}
