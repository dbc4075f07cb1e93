//! Lenient parsers for raw spreadsheet cell text.
//!
//! Every parser in this module degrades instead of failing: a malformed cell
//! becomes a tagged `Unparsed` value (currency, percent) or "no date"
//! (dates). Aggregation code decides how to treat degraded values; the
//! parsers themselves never error.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A currency-like cell, parsed but with its degradation kept explicit.
///
/// `Blank` and `Unparsed` both aggregate as zero dollars via
/// [`CurrencyValue::amount_or_zero`], but remain distinguishable from a
/// literal `$0` cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CurrencyValue {
    Amount(f64),
    Blank,
    Unparsed(String),
}

impl CurrencyValue {
    pub fn amount_or_zero(&self) -> f64 {
        match self {
            CurrencyValue::Amount(value) => *value,
            CurrencyValue::Blank | CurrencyValue::Unparsed(_) => 0.0,
        }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            CurrencyValue::Amount(value) => Some(*value),
            CurrencyValue::Blank | CurrencyValue::Unparsed(_) => None,
        }
    }
}

/// A percentage cell, same tagged shape as [`CurrencyValue`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PercentValue {
    Value(f64),
    Blank,
    Unparsed(String),
}

impl PercentValue {
    pub fn value(&self) -> Option<f64> {
        match self {
            PercentValue::Value(value) => Some(*value),
            PercentValue::Blank | PercentValue::Unparsed(_) => None,
        }
    }
}

/// Parses US-formatted currency text (`"$1,234"`, `"-$15"`, `"350"`).
///
/// Strips the dollar sign, thousands separators and whitespace, then parses
/// the remainder as a decimal number. No locale awareness beyond that.
pub fn parse_currency(raw: &str) -> CurrencyValue {
    if raw.trim().is_empty() {
        return CurrencyValue::Blank;
    }

    let cleaned: String = raw
        .chars()
        .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
        .collect();

    match cleaned.parse::<f64>() {
        Ok(value) if value.is_finite() => CurrencyValue::Amount(value),
        _ => CurrencyValue::Unparsed(raw.to_string()),
    }
}

/// Parses a `M/D/YYYY` slash-delimited date.
///
/// Wrong part count, unparseable segments, or out-of-range components all
/// yield `None` ("no date") rather than an error.
pub fn parse_slash_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let parts: Vec<&str> = trimmed.split('/').collect();
    if parts.len() != 3 {
        return None;
    }

    let month: u32 = parts[0].trim().parse().ok()?;
    let day: u32 = parts[1].trim().parse().ok()?;
    let year: i32 = parts[2].trim().parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a percentage cell (`"57%"`, `"40"`).
pub fn parse_percent(raw: &str) -> PercentValue {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return PercentValue::Blank;
    }

    let without_suffix = trimmed.strip_suffix('%').unwrap_or(trimmed).trim();
    match without_suffix.parse::<f64>() {
        Ok(value) if value.is_finite() => PercentValue::Value(value),
        _ => PercentValue::Unparsed(raw.to_string()),
    }
}

/// Formats a dollar amount the way the KPI tiles display it: whole dollars
/// with thousands separators (`$1,234`, `-$15`).
pub fn format_usd(value: f64) -> String {
    let rounded = value.round();
    let negative = rounded < 0.0;
    let mut magnitude = rounded.abs() as u64;

    let mut groups = Vec::new();
    loop {
        let group = magnitude % 1_000;
        magnitude /= 1_000;
        if magnitude == 0 {
            groups.push(format!("{group}"));
            break;
        }
        groups.push(format!("{group:03}"));
    }
    groups.reverse();

    let digits = groups.join(",");
    if negative {
        format!("-${digits}")
    } else {
        format!("${digits}")
    }
}
