//! Dashboard data sources and HTTP routes.
//!
//! The ticket collection lives behind a [`TicketSource`]: the in-memory
//! variant holds whatever was last loaded, the live variant refreshes it
//! wholesale from the spreadsheet on a background thread and falls back to
//! the sample dataset when a refresh fails. HTTP handlers only ever read the
//! current dataset; they never touch the network.

use std::str::FromStr;
use std::sync::{Arc, RwLock};

use axum::{
    extract::{Query, State},
    response::{Html, IntoResponse},
    routing::get,
    Json, Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::cells::format_usd;
use crate::filters::FilterSelection;
use crate::sample::sample_dataset_records;
use crate::sheets::{
    fetch_ticket_rows_with_fetcher, ReqwestBlockingFetcher, SheetsConfig, ValuesFetcher,
};
use crate::snapshot::{build_snapshot, ChannelPanel, DashboardSnapshot};
use crate::tickets::{dataset_fingerprint, normalize_rows, SoldRule, TicketRecord};

pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetOrigin {
    Live,
    Sample,
}

impl DatasetOrigin {
    pub fn label(self) -> &'static str {
        match self {
            DatasetOrigin::Live => "Live Data",
            DatasetOrigin::Sample => "Sample Data",
        }
    }
}

/// The process-wide ticket collection plus provenance. Replaced wholesale on
/// every refresh; never updated incrementally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketDataset {
    pub records: Vec<TicketRecord>,
    pub origin: DatasetOrigin,
    pub fetched_at: DateTime<Utc>,
    pub fingerprint: String,
}

impl TicketDataset {
    pub fn new(records: Vec<TicketRecord>, origin: DatasetOrigin) -> Self {
        let fingerprint = dataset_fingerprint(&records);
        Self {
            records,
            origin,
            fetched_at: Utc::now(),
            fingerprint,
        }
    }

    pub fn sample() -> Self {
        Self::new(sample_dataset_records(), DatasetOrigin::Sample)
    }
}

pub trait TicketSource: Send + Sync + 'static {
    fn current(&self) -> TicketDataset;
}

#[derive(Clone)]
pub struct InMemoryTicketSource {
    inner: Arc<RwLock<TicketDataset>>,
}

impl InMemoryTicketSource {
    pub fn new(dataset: TicketDataset) -> Self {
        Self {
            inner: Arc::new(RwLock::new(dataset)),
        }
    }

    pub fn sample() -> Self {
        Self::new(TicketDataset::sample())
    }

    pub fn replace_dataset(&self, dataset: TicketDataset) {
        let mut guard = self
            .inner
            .write()
            .expect("ticket dataset lock should not be poisoned");
        let changed = guard.fingerprint != dataset.fingerprint;
        info!(
            component = "dashboard",
            event = "dataset.replaced",
            origin = dataset.origin.label(),
            row_count = dataset.records.len(),
            fingerprint = %dataset.fingerprint,
            changed = changed
        );
        *guard = dataset;
    }
}

impl TicketSource for InMemoryTicketSource {
    fn current(&self) -> TicketDataset {
        self.inner
            .read()
            .expect("ticket dataset lock should not be poisoned")
            .clone()
    }
}

#[derive(Debug, Clone)]
pub struct LiveSheetsConfig {
    pub sheets: SheetsConfig,
    pub refresh_interval_ms: u64,
    pub sold_rule: SoldRule,
}

impl LiveSheetsConfig {
    pub fn new(sheets: SheetsConfig) -> Self {
        Self {
            sheets,
            refresh_interval_ms: 60_000,
            sold_rule: SoldRule::default(),
        }
    }
}

/// Refreshes the ticket collection from the spreadsheet on a background
/// thread. A failed refresh swaps in the sample dataset for that cycle and
/// nothing propagates to readers.
pub struct LiveSheetsTicketSource {
    inner: InMemoryTicketSource,
}

impl LiveSheetsTicketSource {
    pub fn spawn(config: LiveSheetsConfig) -> Self {
        let inner = InMemoryTicketSource::sample();
        let worker = inner.clone();

        std::thread::Builder::new()
            .name("sheets-refresh".to_string())
            .spawn(move || {
                let fetcher = match ReqwestBlockingFetcher::new(config.sheets.timeout_ms) {
                    Ok(fetcher) => fetcher,
                    Err(err) => {
                        warn!(
                            component = "dashboard",
                            event = "sheets.refresh.disabled",
                            error = %err
                        );
                        return;
                    }
                };

                loop {
                    let dataset = refresh_dataset(&config, &fetcher);
                    worker.replace_dataset(dataset);
                    std::thread::sleep(std::time::Duration::from_millis(
                        config.refresh_interval_ms,
                    ));
                }
            })
            .expect("sheets refresh thread should spawn");

        Self { inner }
    }
}

impl TicketSource for LiveSheetsTicketSource {
    fn current(&self) -> TicketDataset {
        self.inner.current()
    }
}

/// One refresh cycle: fetch, normalize, or fall back to the sample dataset.
fn refresh_dataset(config: &LiveSheetsConfig, fetcher: &dyn ValuesFetcher) -> TicketDataset {
    match fetch_ticket_rows_with_fetcher(&config.sheets, fetcher) {
        Ok(rows) => {
            let (records, _report) = normalize_rows(&rows, config.sold_rule);
            if records.is_empty() {
                warn!(
                    component = "dashboard",
                    event = "sheets.fetch.degraded",
                    reason = "no_valid_rows"
                );
                TicketDataset::sample()
            } else {
                TicketDataset::new(records, DatasetOrigin::Live)
            }
        }
        Err(err) => {
            warn!(
                component = "dashboard",
                event = "sheets.fetch.degraded",
                reason = "fetch_failed",
                error = %err
            );
            TicketDataset::sample()
        }
    }
}

/// Raw query parameters of both dashboard routes. Malformed values degrade
/// to "unset", consistent with the cell-parsing contract.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DashboardQuery {
    pub year: Option<String>,
    pub concert: Option<String>,
    pub sale_type: Option<String>,
    pub date_from: Option<String>,
    pub date_to: Option<String>,
}

impl DashboardQuery {
    pub fn selection(&self) -> FilterSelection {
        FilterSelection {
            year: parse_param(&self.year),
            concert: non_empty(&self.concert),
            sale_type: non_empty(&self.sale_type),
            date_from: parse_param(&self.date_from),
            date_to: parse_param(&self.date_to),
        }
    }
}

fn non_empty(raw: &Option<String>) -> Option<String> {
    raw.as_ref()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_param<T: FromStr>(raw: &Option<String>) -> Option<T> {
    non_empty(raw).and_then(|value| value.parse().ok())
}

#[derive(Debug, Clone, Serialize)]
pub struct SnapshotResponse {
    pub origin: DatasetOrigin,
    pub fetched_at: DateTime<Utc>,
    #[serde(flatten)]
    pub snapshot: DashboardSnapshot,
}

#[derive(Clone)]
struct DashboardAppState {
    source: Arc<dyn TicketSource>,
}

pub fn dashboard_router(source: Arc<dyn TicketSource>) -> Router {
    Router::new()
        .route("/dashboard", get(get_dashboard_html))
        .route("/dashboard/snapshot", get(get_dashboard_snapshot))
        .with_state(DashboardAppState { source })
}

async fn get_dashboard_html(
    State(state): State<DashboardAppState>,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let dataset = state.source.current();
    let snapshot = build_snapshot(&dataset.records, &query.selection());
    Html(render_dashboard_html(&dataset, &snapshot))
}

async fn get_dashboard_snapshot(
    State(state): State<DashboardAppState>,
    Query(query): Query<DashboardQuery>,
) -> impl IntoResponse {
    let dataset = state.source.current();
    let selection = query.selection();
    info!(
        component = "dashboard",
        event = "http.snapshot.request",
        origin = dataset.origin.label(),
        unconstrained = selection.is_unconstrained()
    );
    let snapshot = build_snapshot(&dataset.records, &selection);
    Json(SnapshotResponse {
        origin: dataset.origin,
        fetched_at: dataset.fetched_at,
        snapshot,
    })
}

fn fmt_pct(value: f64) -> String {
    format!("{value:.1}%")
}

fn fmt_trend(trend: Option<f64>) -> String {
    match trend {
        Some(value) if value > 0.0 => format!("&#9650; {value:.1}%"),
        Some(value) if value < 0.0 => format!("&#9660; {:.1}%", value.abs()),
        Some(_) => "0.0%".to_string(),
        None => "-".to_string(),
    }
}

fn fmt_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| "Unknown".to_string())
}

fn push_kpi(out: &mut String, label: &str, value: &str, trend: Option<Option<f64>>) {
    out.push_str("<div class=\"kpi\"><div class=\"kpi-label\">");
    out.push_str(&escape_html(label));
    out.push_str("</div><div class=\"kpi-value\">");
    out.push_str(&escape_html(value));
    out.push_str("</div>");
    if let Some(trend) = trend {
        let class = match trend {
            Some(v) if v > 0.0 => "trend up",
            Some(v) if v < 0.0 => "trend down",
            _ => "trend",
        };
        out.push_str(&format!(
            "<div class=\"{class}\">{}</div>",
            fmt_trend(trend)
        ));
    }
    out.push_str("</div>\n");
}

fn push_table(out: &mut String, title: &str, headers: &[&str], rows: &[Vec<String>]) {
    out.push_str("<section class=\"card\"><h2>");
    out.push_str(&escape_html(title));
    out.push_str("</h2>");
    if rows.is_empty() {
        out.push_str("<p class=\"no-data\">No data for the current filters</p></section>\n");
        return;
    }
    out.push_str("<table><thead><tr>");
    for header in headers {
        out.push_str("<th>");
        out.push_str(&escape_html(header));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in rows {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&escape_html(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table></section>\n");
}

fn push_select(
    out: &mut String,
    name: &str,
    label: &str,
    options: &[String],
    current: &Option<String>,
) {
    out.push_str(&format!(
        "<label>{}<select name=\"{name}\">",
        escape_html(label)
    ));
    out.push_str("<option value=\"\">All</option>");
    for option in options {
        let selected = if current.as_deref() == Some(option.as_str()) {
            " selected"
        } else {
            ""
        };
        out.push_str(&format!(
            "<option value=\"{0}\"{selected}>{0}</option>",
            escape_html(option)
        ));
    }
    out.push_str("</select></label>\n");
}

fn push_channel_panel(out: &mut String, panel: &ChannelPanel) {
    out.push_str("<section class=\"card\"><h2>");
    out.push_str(&escape_html(&panel.label));
    out.push_str(" Sales</h2><div class=\"kpis\">");

    push_kpi(out, "Sales", &panel.comparison.sales_count.to_string(), None);
    push_kpi(
        out,
        "Avg Price",
        &panel
            .comparison
            .avg_sale_price
            .map(format_usd)
            .unwrap_or_else(|| "-".to_string()),
        None,
    );
    push_kpi(
        out,
        "vs Direct",
        &panel
            .comparison
            .vs_direct_pct
            .map(|pct| format!("{pct:+.1}%"))
            .unwrap_or_else(|| "-".to_string()),
        None,
    );
    out.push_str("</div>");

    if panel.recent_sales.is_empty() {
        out.push_str("<p class=\"no-data\">No recent sales</p>");
    } else {
        out.push_str(
            "<table><thead><tr><th>Date</th><th>Concert</th><th>Price</th><th>Profit</th></tr></thead><tbody>",
        );
        for sale in &panel.recent_sales {
            let profit_class = if sale.profit >= 0.0 { "gain" } else { "loss" };
            out.push_str(&format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td class=\"{profit_class}\">{}</td></tr>",
                escape_html(&fmt_date(sale.sold_date)),
                escape_html(&sale.concert),
                escape_html(&format_usd(sale.sale_price)),
                escape_html(&format_usd(sale.profit)),
            ));
        }
        out.push_str("</tbody></table>");
    }

    out.push_str("<table class=\"weekdays\"><thead><tr>");
    for label in WEEKDAY_LABELS {
        out.push_str(&format!("<th>{label}</th>"));
    }
    out.push_str("</tr></thead><tbody><tr>");
    for count in panel.weekday_counts {
        out.push_str(&format!("<td>{count}</td>"));
    }
    out.push_str("</tr></tbody></table></section>\n");
}

pub fn render_dashboard_html(dataset: &TicketDataset, snapshot: &DashboardSnapshot) -> String {
    let now_utc = Utc::now().format("%Y-%m-%d %H:%M:%S UTC").to_string();
    let selection = &snapshot.selection;

    let mut out = String::new();
    out.push_str("<!DOCTYPE html><html><head><meta charset=\"utf-8\">\n");
    out.push_str("<meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\n");
    out.push_str("<title>Ticket Resale Dashboard</title>\n");
    out.push_str("<style>:root{--bg:#f5f1e7;--bg2:#e9f0f2;--card:#ffffff;--ink:#182026;--muted:#5f6a73;--line:#d7dce1;--head:#14343f;--up:#06a06d;--down:#d6455f}*{box-sizing:border-box}body{margin:0;color:var(--ink);font-family:\"Space Grotesk\",\"Avenir Next\",\"Segoe UI\",sans-serif;background:linear-gradient(160deg,var(--bg),var(--bg2));min-height:100vh}.shell{max-width:1200px;margin:0 auto;padding:24px 18px 28px}.hero{background:linear-gradient(135deg,#102f3a 0%,#24576b 100%);color:#f7fbfc;border-radius:16px;padding:18px 20px}.hero h1{margin:0 0 8px;font-size:1.6rem}.hero-meta{display:flex;gap:16px;flex-wrap:wrap;font-size:.92rem;color:#dcebf0}.badge{padding:2px 8px;border-radius:8px;background:#0c5f78;font-weight:700}.filters{margin-top:16px;background:var(--card);border:1px solid var(--line);border-radius:12px;padding:12px 14px;display:flex;gap:14px;flex-wrap:wrap;align-items:end;font-size:.85rem}.filters label{display:flex;flex-direction:column;gap:4px;color:var(--muted)}.filters select,.filters input{padding:5px 8px;border:1px solid var(--line);border-radius:8px}.kpis{display:flex;gap:14px;flex-wrap:wrap;margin-top:12px}.kpi{background:var(--card);border:1px solid var(--line);border-radius:12px;padding:12px 16px;min-width:150px}.kpi-label{font-size:.75rem;text-transform:uppercase;letter-spacing:.04em;color:var(--muted)}.kpi-value{font-size:1.5rem;font-weight:700}.trend{font-size:.8rem;color:var(--muted)}.trend.up{color:var(--up)}.trend.down{color:var(--down)}.card{margin-top:16px;background:var(--card);border:1px solid var(--line);border-radius:12px;padding:14px 16px}.card h2{margin:0 0 10px;font-size:1.05rem}table{width:100%;border-collapse:collapse}thead th{text-align:left;background:var(--head);color:#f2f7f9;font-size:.75rem;text-transform:uppercase;letter-spacing:.04em;padding:7px 9px}tbody td{font-size:.85rem;padding:7px 9px;border-bottom:1px solid var(--line)}.gain{color:var(--up)}.loss{color:var(--down)}.no-data{color:var(--muted);font-style:italic}.weekdays{margin-top:10px}</style>\n");
    out.push_str("</head><body><main class=\"shell\">\n");

    out.push_str(
        "<section class=\"hero\"><h1>Ticket Resale Dashboard</h1><div class=\"hero-meta\">",
    );
    out.push_str(&format!(
        "<span class=\"badge\">{}</span>",
        escape_html(dataset.origin.label())
    ));
    out.push_str(&format!(
        "<span>Refreshed: {}</span>",
        escape_html(
            &dataset
                .fetched_at
                .format("%Y-%m-%d %H:%M:%S UTC")
                .to_string()
        )
    ));
    out.push_str(&format!(
        "<span>Generated: {}</span>",
        escape_html(&now_utc)
    ));
    out.push_str("</div></section>\n");

    // Filter form: plain GET submit, no client scripting.
    out.push_str(
        "<form class=\"filters\" id=\"filters-form\" method=\"get\" action=\"/dashboard\">\n",
    );
    let year_options: Vec<String> = snapshot
        .filter_options
        .years
        .iter()
        .map(|year| year.to_string())
        .collect();
    push_select(
        &mut out,
        "year",
        "Year",
        &year_options,
        &selection.year.map(|year| year.to_string()),
    );
    push_select(
        &mut out,
        "concert",
        "Concert",
        &snapshot.filter_options.concerts,
        &selection.concert,
    );
    push_select(
        &mut out,
        "sale_type",
        "Sale Type",
        &snapshot.filter_options.sale_types,
        &selection.sale_type,
    );
    out.push_str(&format!(
        "<label>From<input type=\"date\" name=\"date_from\" value=\"{}\"></label>\n",
        selection
            .date_from
            .map(|date| date.to_string())
            .unwrap_or_default()
    ));
    out.push_str(&format!(
        "<label>To<input type=\"date\" name=\"date_to\" value=\"{}\"></label>\n",
        selection
            .date_to
            .map(|date| date.to_string())
            .unwrap_or_default()
    ));
    out.push_str("<button type=\"submit\">Apply</button>\n</form>\n");

    out.push_str("<div class=\"kpis\">\n");
    push_kpi(
        &mut out,
        "Total Revenue",
        &format_usd(snapshot.kpis.total_revenue),
        Some(snapshot.kpis.revenue_trend_pct),
    );
    push_kpi(
        &mut out,
        "Avg Profit Margin",
        &fmt_pct(snapshot.kpis.avg_margin_pct),
        Some(snapshot.kpis.margin_trend_pct),
    );
    push_kpi(
        &mut out,
        "Tickets Sold",
        &snapshot.kpis.tickets_sold.to_string(),
        Some(snapshot.kpis.tickets_trend_pct),
    );
    match &snapshot.kpis.top_sale_type {
        Some(top) => {
            push_kpi(
                &mut out,
                "Top Sale Type",
                &format!("{} ({})", top.sale_type, fmt_pct(top.share_pct)),
                None,
            );
        }
        None => push_kpi(&mut out, "Top Sale Type", "-", None),
    }
    out.push_str("</div>\n");

    push_table(
        &mut out,
        "Profit Margin by Concert",
        &["Concert", "Avg Margin"],
        &snapshot
            .margin_by_concert
            .iter()
            .map(|row| vec![row.concert.clone(), fmt_pct(row.avg_margin_pct)])
            .collect::<Vec<_>>(),
    );
    push_table(
        &mut out,
        "Revenue by Sale Type",
        &["Sale Type", "Revenue"],
        &snapshot
            .revenue_by_sale_type
            .iter()
            .map(|row| vec![row.sale_type.clone(), format_usd(row.revenue)])
            .collect::<Vec<_>>(),
    );
    push_table(
        &mut out,
        "Top Concerts by Revenue",
        &["Concert", "Revenue"],
        &snapshot
            .revenue_by_concert
            .iter()
            .map(|row| vec![row.concert.clone(), format_usd(row.revenue)])
            .collect::<Vec<_>>(),
    );
    push_table(
        &mut out,
        "Sale Price Distribution",
        &["Price Range", "Tickets"],
        &snapshot
            .price_distribution
            .iter()
            .map(|row| vec![row.label.clone(), row.count.to_string()])
            .collect::<Vec<_>>(),
    );
    push_table(
        &mut out,
        "Profit by Day",
        &["Date", "Profit"],
        &snapshot
            .profit_by_day
            .iter()
            .map(|row| vec![fmt_date(Some(row.date)), format_usd(row.profit)])
            .collect::<Vec<_>>(),
    );

    for panel in &snapshot.channel_panels {
        push_channel_panel(&mut out, panel);
    }

    out.push_str("</main></body></html>\n");
    out
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}
