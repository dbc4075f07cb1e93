//! Aggregations feeding the KPI tiles and chart datasets.
//!
//! All functions are pure folds over borrowed records: they never mutate
//! their input and never fail, so aggregating the same subset twice always
//! produces identical output.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::channels::ChannelKind;
use crate::tickets::TicketRecord;

pub const TOP_CONCERT_LIMIT: usize = 10;
pub const RECENT_SALES_LIMIT: usize = 5;

/// Fixed sale-price histogram buckets; the open-ended last bucket catches
/// everything at $500 and above.
pub const PRICE_BUCKET_BOUNDS: [(f64, f64, &str); 8] = [
    (0.0, 50.0, "$0-$50"),
    (50.0, 100.0, "$50-$100"),
    (100.0, 150.0, "$100-$150"),
    (150.0, 200.0, "$150-$200"),
    (200.0, 300.0, "$200-$300"),
    (300.0, 400.0, "$300-$400"),
    (400.0, 500.0, "$400-$500"),
    (500.0, f64::INFINITY, "$500+"),
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleTypeRevenue {
    pub sale_type: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopSaleType {
    pub sale_type: String,
    pub count: u64,
    pub share_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcertMargin {
    pub concert: String,
    pub avg_margin_pct: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConcertRevenue {
    pub concert: String,
    pub revenue: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBucket {
    pub label: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyProfit {
    pub date: NaiveDate,
    pub profit: f64,
}

/// Channel vs direct comparison for one channel panel.
///
/// "Direct" here means sold through no resale channel at all, with a
/// non-blank sale type. `vs_direct_pct` is defined only when both sides
/// have sales to average.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelComparison {
    pub sales_count: u64,
    pub avg_sale_price: Option<f64>,
    pub direct_avg_sale_price: Option<f64>,
    pub vs_direct_pct: Option<f64>,
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sum of parsed sale prices.
pub fn total_revenue(records: &[TicketRecord]) -> f64 {
    records
        .iter()
        .map(|record| record.sale_amount().amount_or_zero())
        .sum()
}

/// Mean of the parseable profit percentages; blank and unparsed cells are
/// excluded from both numerator and denominator. Zero when nothing parses.
pub fn average_margin(records: &[TicketRecord]) -> f64 {
    let margins: Vec<f64> = records
        .iter()
        .filter_map(|record| record.margin().value())
        .collect();
    mean(&margins).unwrap_or(0.0)
}

fn sale_type_key(record: &TicketRecord) -> String {
    if record.sale_type.is_empty() {
        "Unknown".to_string()
    } else {
        record.sale_type.clone()
    }
}

/// Revenue grouped by sale type, highest first.
pub fn revenue_by_sale_type(records: &[TicketRecord]) -> Vec<SaleTypeRevenue> {
    let mut by_type: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        *by_type.entry(sale_type_key(record)).or_insert(0.0) +=
            record.sale_amount().amount_or_zero();
    }

    let mut out: Vec<SaleTypeRevenue> = by_type
        .into_iter()
        .map(|(sale_type, revenue)| SaleTypeRevenue { sale_type, revenue })
        .collect();
    out.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.sale_type.cmp(&b.sale_type))
    });
    out
}

/// The most common sale type and its share of sold tickets. Ties break by
/// count descending, then name ascending, so the result is deterministic.
pub fn top_sale_type(records: &[TicketRecord]) -> Option<TopSaleType> {
    if records.is_empty() {
        return None;
    }

    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for record in records {
        *counts.entry(sale_type_key(record)).or_insert(0) += 1;
    }

    let (sale_type, count) = counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))?;

    Some(TopSaleType {
        sale_type,
        count,
        share_pct: count as f64 / records.len() as f64 * 100.0,
    })
}

/// Average profit margin per concert, highest first, top ten. Records with
/// a blank concert or an unparseable margin are skipped.
pub fn margin_by_concert(records: &[TicketRecord]) -> Vec<ConcertMargin> {
    let mut sums: BTreeMap<String, (f64, u64)> = BTreeMap::new();
    for record in records {
        if record.concert.is_empty() {
            continue;
        }
        let Some(margin) = record.margin().value() else {
            continue;
        };
        let entry = sums.entry(record.concert.clone()).or_insert((0.0, 0));
        entry.0 += margin;
        entry.1 += 1;
    }

    let mut out: Vec<ConcertMargin> = sums
        .into_iter()
        .map(|(concert, (total, count))| ConcertMargin {
            concert,
            avg_margin_pct: total / count as f64,
        })
        .collect();
    out.sort_by(|a, b| {
        b.avg_margin_pct
            .total_cmp(&a.avg_margin_pct)
            .then_with(|| a.concert.cmp(&b.concert))
    });
    out.truncate(TOP_CONCERT_LIMIT);
    out
}

/// Revenue per concert, highest first, top ten. A blank concert buckets
/// under "Unknown".
pub fn revenue_by_concert(records: &[TicketRecord]) -> Vec<ConcertRevenue> {
    let mut by_concert: BTreeMap<String, f64> = BTreeMap::new();
    for record in records {
        let key = if record.concert.is_empty() {
            "Unknown".to_string()
        } else {
            record.concert.clone()
        };
        *by_concert.entry(key).or_insert(0.0) += record.sale_amount().amount_or_zero();
    }

    let mut out: Vec<ConcertRevenue> = by_concert
        .into_iter()
        .map(|(concert, revenue)| ConcertRevenue { concert, revenue })
        .collect();
    out.sort_by(|a, b| {
        b.revenue
            .total_cmp(&a.revenue)
            .then_with(|| a.concert.cmp(&b.concert))
    });
    out.truncate(TOP_CONCERT_LIMIT);
    out
}

/// Sale-price histogram over the fixed bucket bounds; empty buckets are
/// dropped from the output.
pub fn price_distribution(records: &[TicketRecord]) -> Vec<PriceBucket> {
    let mut counts = [0u64; PRICE_BUCKET_BOUNDS.len()];
    for record in records {
        let price = record.sale_amount().amount_or_zero();
        if let Some(idx) = PRICE_BUCKET_BOUNDS
            .iter()
            .position(|(min, max, _)| price >= *min && price < *max)
        {
            counts[idx] += 1;
        }
    }

    PRICE_BUCKET_BOUNDS
        .iter()
        .zip(counts)
        .filter(|(_, count)| *count > 0)
        .map(|((_, _, label), count)| PriceBucket {
            label: (*label).to_string(),
            count,
        })
        .collect()
}

/// Channel sales per day of week of the sold date, `[Sun..Sat]`. Channel
/// rows without a sold date cannot be placed and are left out.
pub fn weekday_counts(records: &[TicketRecord], kind: ChannelKind) -> [u64; 7] {
    let mut counts = [0u64; 7];
    for record in records {
        if !record.is_channel(kind) {
            continue;
        }
        if let Some(sold) = record.sold_date {
            counts[sold.weekday().num_days_from_sunday() as usize] += 1;
        }
    }
    counts
}

/// Average-price comparison of one channel against direct sales.
pub fn channel_comparison(records: &[TicketRecord], kind: ChannelKind) -> ChannelComparison {
    let channel_prices: Vec<f64> = records
        .iter()
        .filter(|record| record.is_channel(kind))
        .map(|record| record.sale_amount().amount_or_zero())
        .collect();

    let direct_prices: Vec<f64> = records
        .iter()
        .filter(|record| record.channel.is_none() && !record.sale_type.is_empty())
        .map(|record| record.sale_amount().amount_or_zero())
        .collect();

    let avg_sale_price = mean(&channel_prices);
    let direct_avg_sale_price = mean(&direct_prices);

    let vs_direct_pct = match (avg_sale_price, direct_avg_sale_price) {
        (Some(channel_avg), Some(direct_avg)) if direct_avg > 0.0 => {
            Some((channel_avg - direct_avg) / direct_avg * 100.0)
        }
        _ => None,
    };

    ChannelComparison {
        sales_count: channel_prices.len() as u64,
        avg_sale_price,
        direct_avg_sale_price,
        vs_direct_pct,
    }
}

/// The channel's sales sorted most recent first (undated rows last),
/// truncated to `limit`.
pub fn recent_channel_sales(
    records: &[TicketRecord],
    kind: ChannelKind,
    limit: usize,
) -> Vec<TicketRecord> {
    let mut sales: Vec<TicketRecord> = records
        .iter()
        .filter(|record| record.is_channel(kind))
        .cloned()
        .collect();
    sales.sort_by_key(|record| std::cmp::Reverse(record.sold_date));
    sales.truncate(limit);
    sales
}

/// Profit summed per sold date, in date order. Rows without a sold date or
/// with a blank profit cell are skipped.
pub fn profit_by_day(records: &[TicketRecord]) -> Vec<DailyProfit> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for record in records {
        let Some(sold) = record.sold_date else {
            continue;
        };
        if record.profit.is_empty() {
            continue;
        }
        *by_day.entry(sold).or_insert(0.0) += record.profit_amount().amount_or_zero();
    }

    by_day
        .into_iter()
        .map(|(date, profit)| DailyProfit { date, profit })
        .collect()
}

/// Percent change of a KPI versus the preceding period. An empty or zero
/// previous period has no defined trend; callers render that as a dash
/// rather than inventing a number.
pub fn trend_percent(current: f64, previous: f64) -> Option<f64> {
    if previous > 0.0 {
        Some((current - previous) / previous * 100.0)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tickets::{normalize_row, SoldRule};

    fn record(concert: &str, sale_type: &str, sale_price: &str, date_sold: &str) -> TicketRecord {
        let cells: Vec<String> = [
            concert,
            "04/15/2025",
            "A1",
            "$200",
            sale_type,
            sale_price,
            date_sold,
            "",
            "",
            "$150",
            "50%",
            "$100",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        normalize_row(&cells, SoldRule::default()).unwrap()
    }

    #[test]
    fn end_to_end_scenario_totals_share_and_top_concert() {
        let records = vec![
            record("A", "Direct", "$100", "1/1/2025"),
            record("A", "StubHub", "$200", "1/2/2025"),
        ];

        assert_eq!(total_revenue(&records), 300.0);

        let top = top_sale_type(&records).unwrap();
        assert_eq!(top.count, 1);
        assert_eq!(top.share_pct, 50.0);

        let concerts = revenue_by_concert(&records);
        assert_eq!(concerts.len(), 1);
        assert_eq!(concerts[0].concert, "A");
        assert_eq!(concerts[0].revenue, 300.0);
    }

    #[test]
    fn aggregation_is_idempotent_over_the_same_subset() {
        let records = vec![
            record("A", "Direct", "$100", "1/1/2025"),
            record("B", "Family", "$250", "1/3/2025"),
        ];

        let first = (
            total_revenue(&records),
            revenue_by_sale_type(&records),
            price_distribution(&records),
        );
        let second = (
            total_revenue(&records),
            revenue_by_sale_type(&records),
            price_distribution(&records),
        );
        assert_eq!(first, second);
    }

    #[test]
    fn average_margin_skips_unparseable_cells() {
        let mut with_garbage = record("A", "Direct", "$100", "1/1/2025");
        with_garbage.profit_pct = "n/a".to_string();
        let records = vec![
            record("A", "Direct", "$100", "1/1/2025"),
            with_garbage,
        ];

        assert_eq!(average_margin(&records), 50.0);
        assert_eq!(average_margin(&[]), 0.0);
    }

    #[test]
    fn revenue_by_sale_type_sorts_descending_and_buckets_unknown() {
        let mut unlabeled = record("A", "Direct", "$40", "1/1/2025");
        unlabeled.sale_type = String::new();
        let records = vec![
            record("A", "Direct", "$100", "1/1/2025"),
            record("A", "Family", "$300", "1/2/2025"),
            unlabeled,
        ];

        let by_type = revenue_by_sale_type(&records);
        assert_eq!(by_type[0].sale_type, "Family");
        assert_eq!(by_type[1].sale_type, "Direct");
        assert_eq!(by_type[2].sale_type, "Unknown");
        assert_eq!(by_type[2].revenue, 40.0);
    }

    #[test]
    fn top_sale_type_ties_break_by_name() {
        let records = vec![
            record("A", "Family", "$100", "1/1/2025"),
            record("A", "Direct", "$100", "1/2/2025"),
            record("A", "Family", "$100", "1/3/2025"),
            record("A", "Direct", "$100", "1/4/2025"),
        ];

        let top = top_sale_type(&records).unwrap();
        assert_eq!(top.sale_type, "Direct");
        assert_eq!(top.count, 2);
        assert_eq!(top.share_pct, 50.0);
    }

    #[test]
    fn price_distribution_drops_empty_buckets_and_catches_overflow() {
        let records = vec![
            record("A", "Direct", "$49", "1/1/2025"),
            record("A", "Direct", "$120", "1/1/2025"),
            record("A", "Direct", "$650", "1/1/2025"),
            record("A", "Direct", "$800", "1/1/2025"),
        ];

        let buckets = price_distribution(&records);
        let labels: Vec<&str> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["$0-$50", "$100-$150", "$500+"]);
        assert_eq!(buckets[2].count, 2);
    }

    #[test]
    fn weekday_counts_only_count_dated_channel_sales() {
        let records = vec![
            // 2025-01-05 is a Sunday.
            record("A", "StubHub", "$100", "1/5/2025"),
            record("A", "StubHub", "$100", "1/6/2025"),
            record("A", "StubHub", "$100", ""),
            record("A", "Direct", "$100", "1/5/2025"),
        ];

        let counts = weekday_counts(&records, ChannelKind::StubHub);
        assert_eq!(counts[0], 1);
        assert_eq!(counts[1], 1);
        assert_eq!(counts.iter().sum::<u64>(), 2);
    }

    #[test]
    fn channel_comparison_against_direct_sales() {
        let records = vec![
            record("A", "StubHub", "$400", "1/1/2025"),
            record("A", "Direct", "$200", "1/2/2025"),
            record("A", "Family", "$200", "1/3/2025"),
        ];

        let cmp = channel_comparison(&records, ChannelKind::StubHub);
        assert_eq!(cmp.sales_count, 1);
        assert_eq!(cmp.avg_sale_price, Some(400.0));
        assert_eq!(cmp.direct_avg_sale_price, Some(200.0));
        assert_eq!(cmp.vs_direct_pct, Some(100.0));

        let facebook = channel_comparison(&records, ChannelKind::Facebook);
        assert_eq!(facebook.sales_count, 0);
        assert_eq!(facebook.avg_sale_price, None);
        assert_eq!(facebook.vs_direct_pct, None);
    }

    #[test]
    fn recent_channel_sales_sort_newest_first_with_undated_last() {
        let records = vec![
            record("Old", "StubHub", "$100", "1/1/2025"),
            record("New", "StubHub", "$100", "2/1/2025"),
            record("Undated", "StubHub", "$100", ""),
            record("Direct", "Direct", "$100", "3/1/2025"),
        ];

        let recent = recent_channel_sales(&records, ChannelKind::StubHub, 5);
        let names: Vec<&str> = recent.iter().map(|r| r.concert.as_str()).collect();
        assert_eq!(names, vec!["New", "Old", "Undated"]);

        let capped = recent_channel_sales(&records, ChannelKind::StubHub, 2);
        assert_eq!(capped.len(), 2);
    }

    #[test]
    fn profit_by_day_sums_in_date_order() {
        let records = vec![
            record("A", "Direct", "$100", "1/2/2025"),
            record("B", "Direct", "$100", "1/1/2025"),
            record("C", "Direct", "$100", "1/2/2025"),
        ];

        let daily = profit_by_day(&records);
        assert_eq!(daily.len(), 2);
        assert_eq!(daily[0].date, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
        assert_eq!(daily[0].profit, 100.0);
        assert_eq!(daily[1].profit, 200.0);
    }

    #[test]
    fn trend_has_no_value_without_a_previous_period() {
        assert_eq!(trend_percent(150.0, 100.0), Some(50.0));
        assert_eq!(trend_percent(50.0, 100.0), Some(-50.0));
        assert_eq!(trend_percent(100.0, 0.0), None);
    }
}
