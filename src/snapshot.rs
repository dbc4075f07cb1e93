//! Assembles the full dashboard snapshot for one filter selection.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::channels::{channel_label, ChannelKind, ALL_CHANNELS};
use crate::filters::{apply_filters, apply_previous_period, FilterSelection};
use crate::metrics::{
    average_margin, channel_comparison, margin_by_concert, price_distribution, profit_by_day,
    recent_channel_sales, revenue_by_concert, revenue_by_sale_type, top_sale_type, total_revenue,
    trend_percent, weekday_counts, ChannelComparison, ConcertMargin, ConcertRevenue, DailyProfit,
    PriceBucket, SaleTypeRevenue, TopSaleType, RECENT_SALES_LIMIT,
};
use crate::tickets::TicketRecord;

/// The KPI tile row: headline numbers plus their previous-period trends.
/// A trend is `None` when there is no previous period to compare against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSummary {
    pub total_revenue: f64,
    pub avg_margin_pct: f64,
    pub tickets_sold: u64,
    pub top_sale_type: Option<TopSaleType>,
    pub revenue_trend_pct: Option<f64>,
    pub margin_trend_pct: Option<f64>,
    pub tickets_trend_pct: Option<f64>,
}

/// One row of a channel panel's recent-sales table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentSale {
    pub sold_date: Option<NaiveDate>,
    pub concert: String,
    pub sale_price: f64,
    pub profit: f64,
}

/// Everything one resale-channel panel displays.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPanel {
    pub kind: ChannelKind,
    pub label: String,
    pub comparison: ChannelComparison,
    pub recent_sales: Vec<RecentSale>,
    pub weekday_counts: [u64; 7],
}

/// Dropdown contents, derived from the full (unfiltered) collection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub concerts: Vec<String>,
    pub sale_types: Vec<String>,
    pub years: Vec<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub selection: FilterSelection,
    pub kpis: KpiSummary,
    pub margin_by_concert: Vec<ConcertMargin>,
    pub revenue_by_sale_type: Vec<SaleTypeRevenue>,
    pub revenue_by_concert: Vec<ConcertRevenue>,
    pub price_distribution: Vec<PriceBucket>,
    pub profit_by_day: Vec<DailyProfit>,
    pub channel_panels: Vec<ChannelPanel>,
    pub filter_options: FilterOptions,
}

fn recent_sale(record: &TicketRecord) -> RecentSale {
    RecentSale {
        sold_date: record.sold_date,
        concert: record.concert.clone(),
        sale_price: record.sale_amount().amount_or_zero(),
        profit: record.profit_amount().amount_or_zero(),
    }
}

fn channel_panel(filtered: &[TicketRecord], kind: ChannelKind) -> ChannelPanel {
    ChannelPanel {
        kind,
        label: channel_label(kind).to_string(),
        comparison: channel_comparison(filtered, kind),
        recent_sales: recent_channel_sales(filtered, kind, RECENT_SALES_LIMIT)
            .iter()
            .map(recent_sale)
            .collect(),
        weekday_counts: weekday_counts(filtered, kind),
    }
}

/// Distinct non-blank values for the filter dropdowns.
pub fn filter_options(records: &[TicketRecord]) -> FilterOptions {
    let mut concerts: Vec<String> = records
        .iter()
        .filter(|record| !record.concert.is_empty())
        .map(|record| record.concert.clone())
        .collect();
    concerts.sort();
    concerts.dedup();

    let mut sale_types: Vec<String> = records
        .iter()
        .filter(|record| !record.sale_type.is_empty())
        .map(|record| record.sale_type.clone())
        .collect();
    sale_types.sort();
    sale_types.dedup();

    let mut years: Vec<i32> = records
        .iter()
        .filter_map(|record| record.concert_year())
        .collect();
    years.sort_unstable();
    years.dedup();
    years.reverse();

    FilterOptions {
        concerts,
        sale_types,
        years,
    }
}

/// Filters the collection, computes the previous-period comparison, and
/// packages every KPI, chart dataset and channel panel. An empty filtered
/// set yields zeroed KPIs and empty datasets; nothing errors.
pub fn build_snapshot(records: &[TicketRecord], selection: &FilterSelection) -> DashboardSnapshot {
    let filtered = apply_filters(records, selection);
    let previous = apply_previous_period(records, selection);

    let revenue = total_revenue(&filtered);
    let margin = average_margin(&filtered);
    let sold = filtered.len() as u64;

    let prev_revenue = total_revenue(&previous);
    let prev_margin = average_margin(&previous);
    let prev_sold = previous.len() as u64;

    let kpis = KpiSummary {
        total_revenue: revenue,
        avg_margin_pct: margin,
        tickets_sold: sold,
        top_sale_type: top_sale_type(&filtered),
        revenue_trend_pct: trend_percent(revenue, prev_revenue),
        margin_trend_pct: trend_percent(margin, prev_margin),
        tickets_trend_pct: trend_percent(sold as f64, prev_sold as f64),
    };

    DashboardSnapshot {
        selection: selection.clone(),
        kpis,
        margin_by_concert: margin_by_concert(&filtered),
        revenue_by_sale_type: revenue_by_sale_type(&filtered),
        revenue_by_concert: revenue_by_concert(&filtered),
        price_distribution: price_distribution(&filtered),
        profit_by_day: profit_by_day(&filtered),
        channel_panels: ALL_CHANNELS
            .iter()
            .map(|spec| channel_panel(&filtered, spec.kind))
            .collect(),
        filter_options: filter_options(records),
    }
}
