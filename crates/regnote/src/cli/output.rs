//! Output formatting for CLI commands.

use chrono::{DateTime, Local, Utc};
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, Color, ContentArrangement, Table};
use serde::Serialize;

/// Print a table with cyan headers.
pub fn print_table(headers: &[&str], rows: Vec<Vec<String>>) {
    println!("{}", build_table(headers, rows));
}

fn build_table(headers: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let header_cells: Vec<Cell> = headers
        .iter()
        .map(|h| Cell::new(h).fg(Color::Cyan))
        .collect();
    table.set_header(header_cells);

    for row in rows {
        table.add_row(row);
    }
    table
}

/// Print a value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Local wall-clock rendering of a ledger timestamp.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_table_contains_cells() {
        let table = build_table(
            &["Metric", "Count"],
            vec![vec!["files".to_string(), "3".to_string()]],
        );
        let rendered = table.to_string();
        assert!(rendered.contains("Metric"));
        assert!(rendered.contains("files"));
        assert!(rendered.contains('3'));
    }

    #[test]
    fn test_format_timestamp_shape() {
        let formatted = format_timestamp(Utc::now());
        assert_eq!(formatted.len(), "2021-01-15 10:00:00".len());
    }
}
