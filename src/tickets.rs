//! Spreadsheet row to ticket record normalization.
//!
//! One row of the sheet (range `A2:L`) becomes one [`TicketRecord`]. Rows
//! that are too short or carry no identity (no concert, date or seat) are
//! dropped; malformed individual cells degrade per the [`crate::cells`]
//! contract and never reject the row.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::info;

use crate::cells::{parse_currency, parse_percent, parse_slash_date, CurrencyValue, PercentValue};
use crate::channels::{detect_channel, ChannelKind};

/// Fixed column positions of the source sheet.
pub mod col {
    pub const CONCERT: usize = 0;
    pub const CONCERT_DATE: usize = 1;
    pub const SEAT: usize = 2;
    pub const LIST_PRICE: usize = 3;
    pub const SALE_TYPE: usize = 4;
    pub const SALE_PRICE: usize = 5;
    pub const DATE_SOLD: usize = 6;
    pub const DATE_PAID: usize = 7;
    pub const BUYER: usize = 8;
    pub const COST: usize = 9;
    pub const PROFIT_PCT: usize = 10;
    pub const PROFIT: usize = 11;
}

pub const SHEET_COLUMN_COUNT: usize = 12;

/// Rows with fewer populated cells than this carry no usable sale data.
pub const MIN_ROW_CELLS: usize = 6;

/// Which rows count as sold.
///
/// The source sheets drifted between "has a literal date-sold" and "has a
/// date-sold or is listed on a resale channel"; the rule is explicit here
/// instead of silently picking one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoldRule {
    RequireSoldDate,
    #[default]
    SoldDateOrChannel,
}

/// Normalized representation of one spreadsheet row.
///
/// Currency-like cells keep their raw text; numeric values are derived on
/// demand so a re-aggregation never observes hidden mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketRecord {
    pub concert: String,
    pub concert_date_raw: String,
    pub concert_date: Option<NaiveDate>,
    pub seat: String,
    pub list_price: String,
    pub sale_type: String,
    pub sale_price: String,
    pub date_sold: String,
    pub sold_date: Option<NaiveDate>,
    pub cost: String,
    pub profit_pct: String,
    pub profit: String,
    pub channel: Option<ChannelKind>,
    pub is_sold: bool,
}

impl TicketRecord {
    pub fn sale_amount(&self) -> CurrencyValue {
        parse_currency(&self.sale_price)
    }

    pub fn profit_amount(&self) -> CurrencyValue {
        parse_currency(&self.profit)
    }

    pub fn cost_amount(&self) -> CurrencyValue {
        parse_currency(&self.cost)
    }

    pub fn margin(&self) -> PercentValue {
        parse_percent(&self.profit_pct)
    }

    pub fn concert_year(&self) -> Option<i32> {
        self.concert_date.map(|date| date.year())
    }

    pub fn is_channel(&self, kind: ChannelKind) -> bool {
        self.channel == Some(kind)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeReport {
    pub input_rows: u64,
    pub kept_rows: u64,
    pub dropped_short: u64,
    pub dropped_blank: u64,
}

fn cell(cells: &[String], idx: usize) -> &str {
    cells.get(idx).map(String::as_str).unwrap_or("")
}

/// Normalizes a single raw row. `None` means the row was dropped (too short
/// or blank identity), never that a cell failed to parse.
pub fn normalize_row(cells: &[String], rule: SoldRule) -> Option<TicketRecord> {
    if cells.len() < MIN_ROW_CELLS {
        return None;
    }

    let concert = cell(cells, col::CONCERT).trim().to_string();
    let concert_date_raw = cell(cells, col::CONCERT_DATE).trim().to_string();
    let seat = cell(cells, col::SEAT).trim().to_string();

    if concert.is_empty() && concert_date_raw.is_empty() && seat.is_empty() {
        return None;
    }

    let sale_type = cell(cells, col::SALE_TYPE).trim().to_string();
    let date_sold = cell(cells, col::DATE_SOLD).trim().to_string();

    let concert_date = parse_slash_date(&concert_date_raw);
    let sold_date = parse_slash_date(&date_sold);
    let channel = detect_channel(&sale_type);

    let is_sold = match rule {
        SoldRule::RequireSoldDate => !date_sold.is_empty(),
        SoldRule::SoldDateOrChannel => !date_sold.is_empty() || channel.is_some(),
    };

    Some(TicketRecord {
        concert,
        concert_date_raw,
        concert_date,
        seat,
        list_price: cell(cells, col::LIST_PRICE).trim().to_string(),
        sale_type,
        sale_price: cell(cells, col::SALE_PRICE).trim().to_string(),
        date_sold,
        sold_date,
        cost: cell(cells, col::COST).trim().to_string(),
        profit_pct: cell(cells, col::PROFIT_PCT).trim().to_string(),
        profit: cell(cells, col::PROFIT).trim().to_string(),
        channel,
        is_sold,
    })
}

/// Normalizes a full fetch worth of rows and reports what was dropped.
pub fn normalize_rows(rows: &[Vec<String>], rule: SoldRule) -> (Vec<TicketRecord>, NormalizeReport) {
    let mut report = NormalizeReport {
        input_rows: rows.len() as u64,
        ..NormalizeReport::default()
    };

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        if row.len() < MIN_ROW_CELLS {
            report.dropped_short += 1;
            continue;
        }
        match normalize_row(row, rule) {
            Some(record) => records.push(record),
            None => report.dropped_blank += 1,
        }
    }
    report.kept_rows = records.len() as u64;

    info!(
        component = "tickets",
        event = "tickets.normalize.finish",
        input_rows = report.input_rows,
        kept_rows = report.kept_rows,
        dropped_short = report.dropped_short,
        dropped_blank = report.dropped_blank
    );

    (records, report)
}

/// Stable content hash of a normalized collection, used by refresh logging
/// to tell whether a fetch actually changed the dataset.
pub fn dataset_fingerprint(records: &[TicketRecord]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("rows:{};", records.len()));
    for record in records {
        hasher.update(record.concert.as_bytes());
        hasher.update(b"|");
        hasher.update(record.concert_date_raw.as_bytes());
        hasher.update(b"|");
        hasher.update(record.seat.as_bytes());
        hasher.update(b"|");
        hasher.update(record.sale_type.as_bytes());
        hasher.update(b"|");
        hasher.update(record.sale_price.as_bytes());
        hasher.update(b"|");
        hasher.update(record.date_sold.as_bytes());
        hasher.update(b"|");
        hasher.update(record.profit.as_bytes());
        hasher.update(b";");
    }
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    fn full_row() -> Vec<String> {
        row(&[
            "Taylor Swift",
            "04/15/2025",
            "A1",
            "$200",
            "Direct",
            "$350",
            "01/15/2025",
            "01/20/2025",
            "J. Doe",
            "$150",
            "75%",
            "$200",
        ])
    }

    #[test]
    fn normalizes_a_complete_row() {
        let record = normalize_row(&full_row(), SoldRule::default()).unwrap();

        assert_eq!(record.concert, "Taylor Swift");
        assert_eq!(record.concert_date, NaiveDate::from_ymd_opt(2025, 4, 15));
        assert_eq!(record.sold_date, NaiveDate::from_ymd_opt(2025, 1, 15));
        assert_eq!(record.seat, "A1");
        assert_eq!(record.sale_type, "Direct");
        assert_eq!(record.channel, None);
        assert!(record.is_sold);
        assert_eq!(record.sale_amount().amount_or_zero(), 350.0);
        assert_eq!(record.margin().value(), Some(75.0));
        assert_eq!(record.concert_year(), Some(2025));
    }

    #[test]
    fn short_rows_and_blank_identity_rows_are_dropped() {
        assert!(normalize_row(&row(&["A", "B", "C"]), SoldRule::default()).is_none());
        assert!(normalize_row(
            &row(&["", "", "", "$10", "Direct", "$20"]),
            SoldRule::default()
        )
        .is_none());
    }

    #[test]
    fn malformed_cells_degrade_without_dropping_the_row() {
        let mut cells = full_row();
        cells[col::CONCERT_DATE] = "not-a-date".to_string();
        cells[col::SALE_PRICE] = "n/a".to_string();
        cells[col::PROFIT_PCT] = "??".to_string();

        let record = normalize_row(&cells, SoldRule::default()).unwrap();
        assert_eq!(record.concert_date, None);
        assert_eq!(record.sale_amount().amount_or_zero(), 0.0);
        assert_eq!(record.margin().value(), None);
    }

    #[test]
    fn unsold_without_date_or_channel_under_both_rules() {
        let mut cells = full_row();
        cells[col::DATE_SOLD] = String::new();

        let strict = normalize_row(&cells, SoldRule::RequireSoldDate).unwrap();
        let loose = normalize_row(&cells, SoldRule::SoldDateOrChannel).unwrap();
        assert!(!strict.is_sold);
        assert!(!loose.is_sold);
    }

    #[test]
    fn channel_listing_counts_as_sold_only_under_the_loose_rule() {
        let mut cells = full_row();
        cells[col::DATE_SOLD] = String::new();
        cells[col::SALE_TYPE] = "Stubhub".to_string();

        let strict = normalize_row(&cells, SoldRule::RequireSoldDate).unwrap();
        let loose = normalize_row(&cells, SoldRule::SoldDateOrChannel).unwrap();
        assert!(!strict.is_sold);
        assert!(loose.is_sold);
        assert_eq!(loose.channel, Some(crate::channels::ChannelKind::StubHub));
    }

    #[test]
    fn normalize_rows_reports_drop_reasons() {
        let rows = vec![
            full_row(),
            row(&["only", "three", "cells"]),
            row(&["", "", "", "", "", ""]),
        ];

        let (records, report) = normalize_rows(&rows, SoldRule::default());
        assert_eq!(records.len(), 1);
        assert_eq!(report.input_rows, 3);
        assert_eq!(report.kept_rows, 1);
        assert_eq!(report.dropped_short, 1);
        assert_eq!(report.dropped_blank, 1);
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let (records, _) = normalize_rows(&[full_row()], SoldRule::default());
        let a = dataset_fingerprint(&records);
        let b = dataset_fingerprint(&records);
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);

        let mut changed = records.clone();
        changed[0].sale_price = "$351".to_string();
        assert_ne!(dataset_fingerprint(&changed), a);
    }
}
