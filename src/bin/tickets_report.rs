use std::path::PathBuf;

use ticketboard::{
    build_snapshot, init_logging, load_ticket_rows, logging_config_from_env, normalize_rows,
    FilterSelection, SoldRule,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let logging_cfg = logging_config_from_env();
    init_logging(&logging_cfg)?;

    let path: PathBuf = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .ok_or("usage: tickets_report <export.csv>")?;

    let rows = load_ticket_rows(&path)?;
    let (records, report) = normalize_rows(&rows, SoldRule::default());
    let snapshot = build_snapshot(&records, &FilterSelection::default());

    let summary = serde_json::json!({
        "source": path.display().to_string(),
        "rows_loaded": report.input_rows,
        "records_kept": report.kept_rows,
        "rows_dropped_short": report.dropped_short,
        "rows_dropped_blank": report.dropped_blank,
        "snapshot": snapshot,
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
