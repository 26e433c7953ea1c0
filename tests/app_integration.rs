use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};
use xrates::core::instrument::StreamSink;
use xrates::core::rates::{FetchError, FetchRequest};
use xrates::providers::CbrProvider;

// Adds automatic logging to test
mod test_utils {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub const DAILY_PATH: &str = "/daily_json.js";

    pub async fn create_mock_server(status: u16, body: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path(DAILY_PATH))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(1)
            .mount(&mock_server)
            .await;

        mock_server
    }

    pub fn endpoint(mock_server: &MockServer) -> String {
        format!("{}{}", mock_server.uri(), DAILY_PATH)
    }
}

const DAILY_RESPONSE: &str = r#"{
    "Date": "2025-01-10T11:30:00+03:00",
    "Valute": {
        "USD": {"ID": "R01235", "CharCode": "USD", "Nominal": 1, "Value": 90.5},
        "EUR": {"ID": "R01239", "CharCode": "EUR", "Nominal": 1, "Value": 98.2}
    }
}"#;

fn write_config(dir: &Path, endpoint: &str, log_file: &Path) -> std::path::PathBuf {
    let config_path = dir.join("config.yaml");
    let config_content = format!(
        r#"
        currencies: ["USD", "EUR"]
        providers:
          cbr:
            endpoint: "{}"
            timeout_secs: 5
        logging:
          sink: stream
          log_file: "{}"
    "#,
        endpoint,
        log_file.display()
    );
    fs::write(&config_path, &config_content).expect("Failed to write config file");
    config_path
}

#[test_log::test(tokio::test)]
async fn test_full_app_flow_with_mock() {
    let mock_server = test_utils::create_mock_server(200, DAILY_RESPONSE).await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("currency_log.txt");
    let config_path = write_config(
        temp_dir.path(),
        &test_utils::endpoint(&mock_server),
        &log_file,
    );

    let result = xrates::run_command(
        xrates::AppCommand::Rates {
            codes: vec![],
            endpoint: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;
    assert!(
        result.is_ok(),
        "Main function failed with: {:?}",
        result.err()
    );

    let log = fs::read_to_string(&log_file).expect("Call log was not written");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            r#"INFO: fetch_rates called with args=(["USD", "EUR"],), kwargs={}"#,
            r#"INFO: fetch_rates returned {"USD": 90.5, "EUR": 98.2}"#,
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_app_flow_reports_unknown_currency() {
    let mock_server = test_utils::create_mock_server(200, DAILY_RESPONSE).await;
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("currency_log.txt");
    let config_path = write_config(
        temp_dir.path(),
        &test_utils::endpoint(&mock_server),
        &log_file,
    );

    let result = xrates::run_command(
        xrates::AppCommand::Rates {
            codes: vec!["USD".to_string(), "XYZ".to_string()],
            endpoint: None,
        },
        Some(config_path.to_str().unwrap()),
    )
    .await;

    let err = result.expect_err("Unknown currency should fail the command");
    assert_eq!(
        err.downcast_ref::<FetchError>(),
        Some(&FetchError::UnknownCurrency("XYZ".to_string()))
    );

    let log = fs::read_to_string(&log_file).expect("Call log was not written");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(
        lines[1],
        r#"ERROR: fetch_rates raised UnknownCurrency: currency "XYZ" is missing"#
    );
}

#[test_log::test(tokio::test)]
async fn test_instrumented_fetch_is_transparent() {
    let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");
    let log_file = temp_dir.path().join("calls.log");

    let mock_server = test_utils::create_mock_server(503, "").await;
    let provider = Arc::new(
        CbrProvider::new("http://127.0.0.1:9/unused", std::time::Duration::from_secs(5))
            .expect("Failed to build provider"),
    );
    let sink = Arc::new(StreamSink::append_file(&log_file).expect("Failed to open log"));
    let fetch = xrates::instrumented_fetch(provider, sink);

    assert_eq!(fetch.name(), "fetch_rates");
    assert!(fetch.description().is_some());

    let request = FetchRequest::new(["USD"]).with_endpoint(test_utils::endpoint(&mock_server));
    let result = fetch.call(request).await;
    assert_eq!(result, Err(FetchError::Unreachable));

    let log = fs::read_to_string(&log_file).expect("Call log was not written");
    let lines: Vec<&str> = log.lines().collect();
    assert_eq!(
        lines,
        vec![
            format!(
                r#"INFO: fetch_rates called with args=(["USD"],), kwargs={{"url": "{}"}}"#,
                test_utils::endpoint(&mock_server)
            ),
            "ERROR: fetch_rates raised Unreachable: API unavailable".to_string(),
        ]
    );
}

#[test_log::test(tokio::test)]
async fn test_missing_config_file_fails() {
    let result = xrates::run_command(
        xrates::AppCommand::Rates {
            codes: vec!["USD".to_string()],
            endpoint: None,
        },
        Some("/definitely/not/here/config.yaml"),
    )
    .await;
    assert!(result.is_err());
}

#[test_log::test(tokio::test)]
#[ignore = "requires network access"]
async fn test_real_cbr_api() {
    use xrates::core::rates::{DEFAULT_ENDPOINT, RatesProvider};

    let provider = CbrProvider::new(DEFAULT_ENDPOINT, std::time::Duration::from_secs(5))
        .expect("Failed to build provider");

    let codes = vec!["USD".to_string(), "EUR".to_string()];
    info!(?codes, "Fetching rates from the CBR daily feed");

    match provider.fetch(&codes, DEFAULT_ENDPOINT).await {
        Ok(rates) => {
            info!(?rates, "Received successful rates response");
            assert_eq!(rates.len(), 2);
            assert!(rates.values().all(|rate| *rate > 0.0));
        }
        Err(e) => {
            error!("CBR API request failed: {e}\n{e:?}");
            panic!("CBR API request failed: {e}");
        }
    }
}
