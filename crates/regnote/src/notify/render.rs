//! HTML rendering of client notifications.

use super::batches::ClientBatch;
use crate::reconcile::ReconciledRecord;
use std::fmt::Write;

const COLUMNS: [&str; 17] = [
    "ACCESSION",
    "Final Report Date",
    "First Name",
    "Last Name",
    "Middle Name",
    "DOB",
    "Client ID",
    "Client Name",
    "Phys Name",
    "Test Code",
    "Test Name",
    "Test Result",
    "Patient Address",
    "Patient City",
    "Patient State",
    "Patient Zip",
    "Patient Phone",
];

const HEAD: &str = r#"<!doctype html>
<html xmlns="http://www.w3.org/1999/xhtml">
<head>
    <title>Client report</title>
    <style>
        BODY { font-family: Arial; font-size: 10pt; }
        TABLE { border: 1px solid black; border-collapse: collapse; }
        TH { border: 1px solid black; background: #dddddd; padding: 5px; }
        TD { border: 1px solid black; padding: 5px; }
    </style>
</head>
"#;

/// Builds subject and body for a client batch.
#[derive(Debug, Clone)]
pub struct MessageRenderer {
    subject_template: String,
}

impl MessageRenderer {
    pub fn new(subject_template: impl Into<String>) -> Self {
        Self {
            subject_template: subject_template.into(),
        }
    }

    pub fn subject(&self, batch: &ClientBatch) -> String {
        self.subject_template
            .replace("{client_id}", &batch.client_id)
            .replace("{client_name}", &batch.client_name)
    }

    /// One table, one row per record, in batch order.
    pub fn body(&self, batch: &ClientBatch) -> String {
        let mut html = String::with_capacity(2048 + batch.records.len() * 512);
        html.push_str(HEAD);
        html.push_str("<body>\n    <table>\n        <thead>\n            <tr>\n");
        for column in COLUMNS {
            let _ = writeln!(html, "                <th>{}</th>", column);
        }
        html.push_str("            </tr>\n        </thead>\n        <tbody>\n");
        for record in &batch.records {
            html.push_str("            <tr>\n");
            for cell in row_cells(record) {
                let _ = writeln!(html, "                <td>{}</td>", escape_html(cell));
            }
            html.push_str("            </tr>\n");
        }
        html.push_str("        </tbody>\n    </table>\n</body>\n</html>\n");
        html
    }
}

fn row_cells(record: &ReconciledRecord) -> [&str; 17] {
    [
        &record.accession,
        &record.report_date,
        &record.first_name,
        &record.last_name,
        &record.middle_name,
        &record.dob,
        &record.client_id,
        &record.client_name,
        &record.physician_name,
        &record.test_code,
        &record.test_name,
        &record.result,
        &record.address,
        &record.city,
        &record.state,
        &record.zip,
        &record.phone,
    ]
}

/// Escape text for use inside an HTML element.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}
