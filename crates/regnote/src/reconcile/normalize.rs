//! Field normalization applied to every reconciled record.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Placeholder for a date of birth that cannot be parsed.
pub const UNKNOWN_DOB: &str = "n/a";

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
];

/// Format a US phone number as `(NNN)NNN-NNNN`.
///
/// Everything but ASCII digits is dropped first. Anything other than exactly
/// ten digits yields an empty string.
pub fn normalize_phone(raw: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() != 10 {
        return String::new();
    }
    format!("({}){}-{}", &digits[0..3], &digits[3..6], &digits[6..10])
}

/// Reduce a timestamp to `YYYY-MM-DD`, or [`UNKNOWN_DOB`] if it cannot be read.
///
/// Accepts RFC 3339 (`1990-05-01T00:00:00Z`), zone-less datetimes as produced
/// by SQL Server style 127, and bare dates.
pub fn normalize_dob(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return UNKNOWN_DOB.to_string();
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }
    for fmt in NAIVE_DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }

    UNKNOWN_DOB.to_string()
}

/// Translate a raw result code into its display text.
///
/// Codes are matched exactly; unknown codes pass through unchanged.
pub fn interpret_result(code: &str) -> String {
    match code.trim() {
        "D" => "Detected".to_string(),
        "ND" => "Not detected".to_string(),
        "INV" => "Invalid".to_string(),
        "IN" => "Presumptive positive".to_string(),
        other => other.to_string(),
    }
}

/// Report date shown in notifications (`MM/DD/YYYY`).
pub fn format_report_date(date: NaiveDate) -> String {
    date.format("%m/%d/%Y").to_string()
}
