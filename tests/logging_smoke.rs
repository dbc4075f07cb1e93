use std::io;
use std::io::Write;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use regex::Regex;
use ticketboard::{
    dashboard_router, fetch_ticket_rows_with_fetcher, log_app_bind, log_app_start,
    log_source_selected, DatasetOrigin, InMemoryTicketSource, LoggingConfig, SheetsConfig,
    SheetsError, TicketDataset, TicketSource, ValuesFetcher,
};
use tower::util::ServiceExt;
use tracing::dispatcher::with_default;
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriter;

#[derive(Clone, Default)]
struct SharedWriter {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedWriter {
    fn output_string(&self) -> String {
        let bytes = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        String::from_utf8_lossy(&bytes).to_string()
    }
}

struct SharedWriterGuard {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl Write for SharedWriterGuard {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut out = self
            .inner
            .lock()
            .expect("writer lock should not be poisoned");
        out.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn capture_logs(max_level: Level, f: impl FnOnce()) -> String {
    let writer = SharedWriter::default();
    let subscriber = tracing_subscriber::fmt()
        .json()
        .with_ansi(false)
        .with_max_level(max_level)
        .with_writer(writer.clone())
        .finish();
    let dispatch = tracing::Dispatch::new(subscriber);

    with_default(&dispatch, f);
    writer.output_string()
}

#[test]
fn server_lifecycle_helpers_emit_baseline_events() {
    let logs = capture_logs(Level::INFO, || {
        let cfg = LoggingConfig::default();
        log_app_start(&cfg);
        log_source_selected("sample", Some("TICKETBOARD_USE_SAMPLE"));
        log_app_bind(SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 8080));
    });

    assert!(logs.contains("\"event\":\"app.start\""));
    assert!(logs.contains("\"event\":\"source.selected\""));
    assert!(logs.contains("\"event\":\"app.bind\""));
}

#[test]
fn snapshot_route_emits_http_snapshot_event() {
    let logs = capture_logs(Level::INFO, || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("single-thread runtime should build");

        rt.block_on(async {
            let source = Arc::new(InMemoryTicketSource::sample());
            let app = dashboard_router(source);

            let response = app
                .oneshot(
                    Request::builder()
                        .uri("/dashboard/snapshot")
                        .body(Body::empty())
                        .expect("request should build"),
                )
                .await
                .expect("snapshot request should succeed");

            assert_eq!(response.status(), StatusCode::OK);
        });
    });

    assert!(logs.contains("\"event\":\"http.snapshot.request\""));
}

#[test]
fn dataset_replacement_logs_origin_and_fingerprint() {
    let logs = capture_logs(Level::INFO, || {
        let source = InMemoryTicketSource::sample();
        let current = source.current();
        source.replace_dataset(TicketDataset::new(
            current.records[..1].to_vec(),
            DatasetOrigin::Live,
        ));
    });

    assert!(logs.contains("\"event\":\"dataset.replaced\""));
    assert!(logs.contains("\"origin\":\"Live Data\""));

    let fingerprint = Regex::new("\"fingerprint\":\"[0-9a-f]{64}\"").expect("valid regex");
    assert!(fingerprint.is_match(&logs));
}

#[test]
fn failed_sheet_fetch_logs_start_without_leaking_the_key() {
    struct FailingFetcher;
    impl ValuesFetcher for FailingFetcher {
        fn get_bytes(&self, _url: &str) -> Result<Vec<u8>, SheetsError> {
            Err(SheetsError::HttpRequest {
                endpoint: "https://sheets.googleapis.com/v4/spreadsheets/sheet-id/values/2025!A2:L"
                    .to_string(),
                message: "simulated outage".to_string(),
            })
        }
    }

    let logs = capture_logs(Level::INFO, || {
        let mut config = SheetsConfig::new("sheet-id", "super-secret-key");
        config.max_retries = 0;
        config.retry_backoff_ms = 0;

        let err = fetch_ticket_rows_with_fetcher(&config, &FailingFetcher)
            .expect_err("fetcher error should bubble up");
        assert!(matches!(err, SheetsError::HttpRequest { .. }));
    });

    assert!(logs.contains("\"event\":\"sheets.fetch.start\""));
    assert!(!logs.contains("super-secret-key"));
}
