//! Filter pipeline over the ticket collection.
//!
//! Filters AND-compose; an unset member imposes no constraint. Only sold
//! tickets ever pass. The date range applies to the sold date and is
//! inclusive on both ends (the UI's "to" box means the whole day).

use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::tickets::TicketRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterSelection {
    pub year: Option<i32>,
    pub concert: Option<String>,
    pub sale_type: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl FilterSelection {
    pub fn is_unconstrained(&self) -> bool {
        *self == FilterSelection::default()
    }
}

fn passes(record: &TicketRecord, selection: &FilterSelection) -> bool {
    if !record.is_sold {
        return false;
    }

    if let Some(year) = selection.year {
        match record.concert_date {
            Some(date) if date.year() == year => {}
            _ => return false,
        }
    }

    if let Some(concert) = &selection.concert {
        if record.concert != *concert {
            return false;
        }
    }

    if let Some(sale_type) = &selection.sale_type {
        if record.sale_type != *sale_type {
            return false;
        }
    }

    if let Some(from) = selection.date_from {
        match record.sold_date {
            Some(sold) if sold >= from => {}
            _ => return false,
        }
    }

    if let Some(to) = selection.date_to {
        match record.sold_date {
            Some(sold) if sold <= to => {}
            _ => return false,
        }
    }

    true
}

/// Applies the selection to the full collection, yielding the displayed
/// subset. A selection naming values absent from the data yields an empty
/// result, not an error.
pub fn apply_filters(records: &[TicketRecord], selection: &FilterSelection) -> Vec<TicketRecord> {
    records
        .iter()
        .filter(|record| passes(record, selection))
        .cloned()
        .collect()
}

/// The comparison window of equal length immediately preceding `date_from`,
/// ending the day before it. Defined only when both range bounds are set.
pub fn previous_period(selection: &FilterSelection) -> Option<(NaiveDate, NaiveDate)> {
    let from = selection.date_from?;
    let to = selection.date_to?;
    if to < from {
        return None;
    }

    let span_days = (to - from).num_days() as u64;
    let prev_to = from.checked_sub_days(Days::new(1))?;
    let prev_from = prev_to.checked_sub_days(Days::new(span_days))?;
    Some((prev_from, prev_to))
}

/// Sold records whose sold date falls inside the previous-period window.
/// Trend comparison intentionally ignores the non-date filters, matching the
/// KPI semantics of the source dashboard.
pub fn apply_previous_period(
    records: &[TicketRecord],
    selection: &FilterSelection,
) -> Vec<TicketRecord> {
    let Some((prev_from, prev_to)) = previous_period(selection) else {
        return Vec::new();
    };

    records
        .iter()
        .filter(|record| {
            record.is_sold
                && record
                    .sold_date
                    .map(|sold| sold >= prev_from && sold <= prev_to)
                    .unwrap_or(false)
        })
        .cloned()
        .collect()
}
