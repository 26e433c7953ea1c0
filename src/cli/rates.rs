use super::ui;
use crate::core::config::AppConfig;
use crate::core::instrument::sink_from_config;
use crate::core::rates::{FetchRequest, RateResult};
use crate::providers::cbr::CbrProvider;
use anyhow::{Context, Result};
use comfy_table::Cell;
use std::sync::Arc;

pub fn display_rates(rates: &RateResult) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Currency"), ui::header_cell("Rate")]);

    for (code, rate) in rates {
        table.add_row(vec![Cell::new(code), ui::rate_cell(*rate)]);
    }

    table.to_string()
}

/// Runs one instrumented fetch and prints the resulting table.
pub async fn run(config: &AppConfig, codes: Vec<String>, endpoint: Option<String>) -> Result<()> {
    let codes = if codes.is_empty() {
        config.currencies.clone()
    } else {
        codes
    };

    let provider = CbrProvider::from_config(&config.providers.cbr)?;
    let sink = sink_from_config(&config.logging).with_context(|| match &config.logging.log_file {
        Some(path) => format!("Failed to open call log: {}", path.display()),
        None => "Failed to set up call log".to_string(),
    })?;
    let fetch = crate::instrumented_fetch(Arc::new(provider), sink);

    let mut request = FetchRequest::new(codes);
    if let Some(endpoint) = endpoint {
        request = request.with_endpoint(endpoint);
    }

    let rates = fetch.call(request).await?;
    println!("{}", display_rates(&rates));
    Ok(())
}
