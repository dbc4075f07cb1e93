//! Hardcoded fallback dataset.
//!
//! Served whenever the spreadsheet fetch is unavailable or fails. The rows
//! are raw 12-cell rows pushed through the real normalizer so the fallback
//! path exercises the same pipeline as live data.

use crate::tickets::{normalize_rows, SoldRule, TicketRecord};

fn raw(cells: [&str; 12]) -> Vec<String> {
    cells.iter().map(|c| c.to_string()).collect()
}

/// The five canonical sample rows, in sheet column order.
pub fn sample_rows() -> Vec<Vec<String>> {
    vec![
        raw([
            "Taylor Swift",
            "04/15/2025",
            "A1",
            "$200",
            "Direct",
            "$350",
            "01/15/2025",
            "01/20/2025",
            "",
            "$150",
            "75%",
            "$200",
        ]),
        raw([
            "Taylor Swift",
            "04/15/2025",
            "A2",
            "$200",
            "Family",
            "$250",
            "01/20/2025",
            "01/25/2025",
            "",
            "$150",
            "40%",
            "$100",
        ]),
        raw([
            "Beyonce",
            "05/20/2025",
            "B1",
            "$300",
            "Direct",
            "$450",
            "02/15/2025",
            "02/20/2025",
            "",
            "$200",
            "55%",
            "$250",
        ]),
        raw([
            "Madonna",
            "06/10/2025",
            "C1",
            "$250",
            "StubHub",
            "$400",
            "03/15/2025",
            "03/20/2025",
            "",
            "$175",
            "57%",
            "$225",
        ]),
        raw([
            "Ed Sheeran",
            "07/05/2025",
            "D1",
            "$150",
            "Family",
            "$150",
            "04/01/2025",
            "04/05/2025",
            "",
            "$100",
            "33%",
            "$50",
        ]),
    ]
}

pub fn sample_dataset_records() -> Vec<TicketRecord> {
    let (records, _) = normalize_rows(&sample_rows(), SoldRule::default());
    records
}
