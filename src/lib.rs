//! Ticket resale analytics core crate.
//!
//! Implemented scope:
//! - lenient spreadsheet cell parsing and row normalization
//! - filter pipeline and aggregations over the ticket collection
//! - dashboard snapshot assembly and HTTP routes
//! - spreadsheet / CSV data sources with sample-data fallback

mod cells;
mod channels;
mod csv_file;
mod dashboard;
mod filters;
mod metrics;
mod observability;
mod sample;
mod sheets;
mod snapshot;
mod tickets;

pub use cells::{
    format_usd, parse_currency, parse_percent, parse_slash_date, CurrencyValue, PercentValue,
};
pub use channels::{
    channel_label, channel_spec, detect_channel, ChannelKind, ChannelSpec, ALL_CHANNELS,
};
pub use csv_file::{load_ticket_rows, CsvExportError};
pub use dashboard::{
    dashboard_router, render_dashboard_html, DashboardQuery, DatasetOrigin, InMemoryTicketSource,
    LiveSheetsConfig, LiveSheetsTicketSource, SnapshotResponse, TicketDataset, TicketSource,
    WEEKDAY_LABELS,
};
pub use filters::{apply_filters, apply_previous_period, previous_period, FilterSelection};
pub use metrics::{
    average_margin, channel_comparison, margin_by_concert, price_distribution, profit_by_day,
    recent_channel_sales, revenue_by_concert, revenue_by_sale_type, top_sale_type, total_revenue,
    trend_percent, weekday_counts, ChannelComparison, ConcertMargin, ConcertRevenue, DailyProfit,
    PriceBucket, SaleTypeRevenue, TopSaleType, PRICE_BUCKET_BOUNDS, RECENT_SALES_LIMIT,
    TOP_CONCERT_LIMIT,
};
pub use observability::{
    init_logging, log_app_bind, log_app_start, log_source_selected, logging_config_from_env,
    LogFormat, LoggingConfig, LoggingInitError,
};
pub use sample::{sample_dataset_records, sample_rows};
pub use sheets::{
    fetch_ticket_rows, fetch_ticket_rows_with_fetcher, sheets_config_from_env,
    ReqwestBlockingFetcher, SheetsConfig, SheetsError, ValuesFetcher, DEFAULT_SHEET_RANGE,
};
pub use snapshot::{
    build_snapshot, filter_options, ChannelPanel, DashboardSnapshot, FilterOptions, KpiSummary,
    RecentSale,
};
pub use tickets::{
    col, dataset_fingerprint, normalize_row, normalize_rows, NormalizeReport, SoldRule,
    TicketRecord, MIN_ROW_CELLS, SHEET_COLUMN_COUNT,
};
