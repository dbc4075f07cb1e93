//! Ticket rows from a local CSV export of the spreadsheet.
//!
//! Same 12-column layout as the live sheet; the header row is skipped. Short
//! rows are carried through as-is so the normalizer applies the one dropping
//! policy for both sources.

use std::path::Path;

use csv::ReaderBuilder;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum CsvExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub fn load_ticket_rows(path: &Path) -> Result<Vec<Vec<String>>, CsvExportError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        rows.push(record.iter().map(|cell| cell.to_string()).collect());
    }

    info!(
        component = "csv_file",
        event = "csv.load.finish",
        path = %path.display(),
        row_count = rows.len()
    );

    Ok(rows)
}
