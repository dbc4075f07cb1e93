use std::{net::SocketAddr, sync::Arc};

use ticketboard::{
    dashboard_router, init_logging, log_app_bind, log_app_start, log_source_selected,
    logging_config_from_env, sheets_config_from_env, InMemoryTicketSource, LiveSheetsConfig,
    LiveSheetsTicketSource, TicketSource,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;
    log_app_start(&logging_cfg);

    let addr: SocketAddr = std::env::var("TICKETBOARD_DASHBOARD_ADDR")
        .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
        .parse()?;

    let source: Arc<dyn TicketSource> = source_from_env();
    let app = dashboard_router(source);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let bound_addr = listener.local_addr()?;

    log_app_bind(bound_addr);
    axum::serve(listener, app).await?;

    Ok(())
}

fn source_from_env() -> Arc<dyn TicketSource> {
    let force_sample = std::env::var("TICKETBOARD_USE_SAMPLE")
        .map(|raw| raw == "1" || raw.eq_ignore_ascii_case("true"))
        .unwrap_or(false);

    if force_sample {
        log_source_selected("sample", Some("TICKETBOARD_USE_SAMPLE"));
        return Arc::new(InMemoryTicketSource::sample());
    }

    match sheets_config_from_env() {
        Ok(sheets) => {
            let mut config = LiveSheetsConfig::new(sheets);
            if let Some(interval) = refresh_interval_from_env() {
                config.refresh_interval_ms = interval;
            }
            log_source_selected("live_sheets", None);
            tracing::info!(
                component = "dashboard_server",
                event = "source.refresh_interval",
                refresh_interval_ms = config.refresh_interval_ms
            );
            Arc::new(LiveSheetsTicketSource::spawn(config))
        }
        Err(err) => {
            let reason = err.to_string();
            log_source_selected("sample", Some(&reason));
            Arc::new(InMemoryTicketSource::sample())
        }
    }
}

fn refresh_interval_from_env() -> Option<u64> {
    std::env::var("TICKETBOARD_REFRESH_INTERVAL_MS")
        .ok()
        .and_then(|raw| raw.trim().parse().ok())
}
