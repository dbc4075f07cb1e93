//! Spreadsheet row fetch over the Google Sheets values API.
//!
//! One key-authenticated GET per refresh. The fetcher is a trait so tests
//! inject canned responses; the real implementation is a blocking reqwest
//! client with bounded retries. The API key never appears in log output or
//! error messages.

use serde::Deserialize;
use thiserror::Error;
use tracing::{info, warn};

pub const DEFAULT_SHEET_RANGE: &str = "2025!A2:L";

const SHEETS_API_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetsConfig {
    pub spreadsheet_id: String,
    pub api_key: String,
    pub range: String,
    pub timeout_ms: u64,
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
}

impl SheetsConfig {
    pub fn new(spreadsheet_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            api_key: api_key.into(),
            range: DEFAULT_SHEET_RANGE.to_string(),
            timeout_ms: 10_000,
            max_retries: 2,
            retry_backoff_ms: 200,
        }
    }

    fn request_url(&self) -> String {
        format!(
            "{SHEETS_API_BASE}/{}/values/{}?key={}",
            self.spreadsheet_id, self.range, self.api_key
        )
    }

    /// The endpoint with the key stripped, safe for logs and errors.
    fn endpoint(&self) -> String {
        format!(
            "{SHEETS_API_BASE}/{}/values/{}",
            self.spreadsheet_id, self.range
        )
    }
}

#[derive(Debug, Error)]
pub enum SheetsError {
    #[error("missing sheets configuration: {0}")]
    MissingConfig(&'static str),
    #[error("HTTP client build error: {0}")]
    HttpClientBuild(String),
    #[error("HTTP request failed for {endpoint}: {message}")]
    HttpRequest { endpoint: String, message: String },
    #[error("invalid sheets response from {endpoint}: {message}")]
    InvalidResponse { endpoint: String, message: String },
}

/// Builds the fetch configuration from `TICKETBOARD_*` environment
/// variables. Spreadsheet id and API key are required; the range defaults
/// to [`DEFAULT_SHEET_RANGE`].
pub fn sheets_config_from_env() -> Result<SheetsConfig, SheetsError> {
    let spreadsheet_id = non_empty_env("TICKETBOARD_SHEET_ID")
        .ok_or(SheetsError::MissingConfig("TICKETBOARD_SHEET_ID"))?;
    let api_key = non_empty_env("TICKETBOARD_SHEETS_API_KEY")
        .ok_or(SheetsError::MissingConfig("TICKETBOARD_SHEETS_API_KEY"))?;

    let mut config = SheetsConfig::new(spreadsheet_id, api_key);
    if let Some(range) = non_empty_env("TICKETBOARD_SHEET_RANGE") {
        config.range = range;
    }
    Ok(config)
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
}

pub trait ValuesFetcher {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, SheetsError>;
}

pub struct ReqwestBlockingFetcher {
    client: reqwest::blocking::Client,
}

impl ReqwestBlockingFetcher {
    pub fn new(timeout_ms: u64) -> Result<Self, SheetsError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_millis(timeout_ms))
            .build()
            .map_err(|err| SheetsError::HttpClientBuild(err.to_string()))?;
        Ok(Self { client })
    }
}

impl ValuesFetcher for ReqwestBlockingFetcher {
    fn get_bytes(&self, url: &str) -> Result<Vec<u8>, SheetsError> {
        let endpoint = strip_query(url);
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| SheetsError::HttpRequest {
                endpoint: endpoint.clone(),
                message: err.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SheetsError::HttpRequest {
                endpoint,
                message: format!("unexpected HTTP status {status}"),
            });
        }

        response
            .bytes()
            .map(|bytes| bytes.to_vec())
            .map_err(|err| SheetsError::HttpRequest {
                endpoint,
                message: err.to_string(),
            })
    }
}

fn strip_query(url: &str) -> String {
    url.split('?').next().unwrap_or(url).to_string()
}

#[derive(Debug, Deserialize)]
struct ValuesResponse {
    #[serde(default)]
    values: Vec<Vec<serde_json::Value>>,
}

fn cell_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(text) => text.clone(),
        serde_json::Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Fetches the configured range and returns it as raw cell rows, ready for
/// the normalizer. An absent `values` key (empty sheet) is an empty vec.
pub fn fetch_ticket_rows(config: &SheetsConfig) -> Result<Vec<Vec<String>>, SheetsError> {
    let fetcher = ReqwestBlockingFetcher::new(config.timeout_ms)?;
    fetch_ticket_rows_with_fetcher(config, &fetcher)
}

pub fn fetch_ticket_rows_with_fetcher(
    config: &SheetsConfig,
    fetcher: &dyn ValuesFetcher,
) -> Result<Vec<Vec<String>>, SheetsError> {
    info!(
        component = "sheets",
        event = "sheets.fetch.start",
        endpoint = %config.endpoint(),
        range = %config.range
    );

    let url = config.request_url();
    let payload = fetch_with_retry(config, fetcher, &url)?;

    let parsed: ValuesResponse =
        serde_json::from_slice(&payload).map_err(|err| SheetsError::InvalidResponse {
            endpoint: config.endpoint(),
            message: err.to_string(),
        })?;

    let rows: Vec<Vec<String>> = parsed
        .values
        .iter()
        .map(|row| row.iter().map(cell_text).collect())
        .collect();

    if rows.is_empty() {
        warn!(
            component = "sheets",
            event = "sheets.fetch.empty",
            endpoint = %config.endpoint()
        );
    }

    info!(
        component = "sheets",
        event = "sheets.fetch.finish",
        row_count = rows.len()
    );

    Ok(rows)
}

fn fetch_with_retry(
    config: &SheetsConfig,
    fetcher: &dyn ValuesFetcher,
    url: &str,
) -> Result<Vec<u8>, SheetsError> {
    let mut attempt: u32 = 0;
    loop {
        match fetcher.get_bytes(url) {
            Ok(payload) => return Ok(payload),
            Err(err) if attempt >= config.max_retries => return Err(err),
            Err(_) => {
                attempt = attempt.saturating_add(1);
                let shift = attempt.saturating_sub(1).min(10);
                let factor = 1u64 << shift;
                let sleep_ms = config.retry_backoff_ms.saturating_mul(factor);
                std::thread::sleep(std::time::Duration::from_millis(sleep_ms));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    struct MockFetcher {
        responses: RefCell<Vec<Result<Vec<u8>, SheetsError>>>,
    }

    impl MockFetcher {
        fn new(responses: Vec<Result<Vec<u8>, SheetsError>>) -> Self {
            Self {
                responses: RefCell::new(responses),
            }
        }
    }

    impl ValuesFetcher for MockFetcher {
        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, SheetsError> {
            self.responses.borrow_mut().remove(0)
        }
    }

    fn config() -> SheetsConfig {
        let mut config = SheetsConfig::new("sheet-id", "secret-key");
        config.retry_backoff_ms = 0;
        config
    }

    #[test]
    fn parses_values_into_cell_rows() {
        let body = br#"{"range":"2025!A2:L","values":[["Taylor Swift","04/15/2025","A1","$200","Direct","$350"],["Beyonce","05/20/2025","B1",300,"Direct","$450"]]}"#;
        let fetcher = MockFetcher::new(vec![Ok(body.to_vec())]);

        let rows = fetch_ticket_rows_with_fetcher(&config(), &fetcher).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0][0], "Taylor Swift");
        // Numeric cells are carried over as text for the lenient parsers.
        assert_eq!(rows[1][3], "300");
    }

    #[test]
    fn missing_values_key_is_an_empty_sheet() {
        let fetcher = MockFetcher::new(vec![Ok(br#"{"range":"2025!A2:L"}"#.to_vec())]);
        let rows = fetch_ticket_rows_with_fetcher(&config(), &fetcher).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn retries_transient_failures_up_to_the_limit() {
        let fetcher = MockFetcher::new(vec![
            Err(SheetsError::HttpRequest {
                endpoint: "e".to_string(),
                message: "timeout".to_string(),
            }),
            Ok(br#"{"values":[["A","1/1/2025","S1","$1","Direct","$2"]]}"#.to_vec()),
        ]);

        let rows = fetch_ticket_rows_with_fetcher(&config(), &fetcher).unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[test]
    fn exhausted_retries_surface_the_last_error() {
        let failure = || {
            Err(SheetsError::HttpRequest {
                endpoint: "e".to_string(),
                message: "boom".to_string(),
            })
        };
        let fetcher = MockFetcher::new(vec![failure(), failure(), failure()]);

        let err = fetch_ticket_rows_with_fetcher(&config(), &fetcher).unwrap_err();
        assert!(matches!(err, SheetsError::HttpRequest { .. }));
    }

    #[test]
    fn error_and_log_endpoints_never_contain_the_key() {
        let cfg = config();
        assert!(cfg.request_url().contains("secret-key"));
        assert!(!cfg.endpoint().contains("secret-key"));
        assert_eq!(strip_query(&cfg.request_url()), cfg.endpoint());

        let fetcher = MockFetcher::new(vec![Ok(b"not-json".to_vec())]);
        let err = fetch_ticket_rows_with_fetcher(&cfg, &fetcher).unwrap_err();
        assert!(!err.to_string().contains("secret-key"));
    }
}
