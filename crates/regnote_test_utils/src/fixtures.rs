//! Fixture helpers.

use regnote::{ExternalRecord, PipelineSettings, TrackedTest};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub const RESULT_FILE_HEADER: &str = "Accession,Test Code,Result";

/// Write a result file with a header and one row per `(accession, code, value)`.
pub fn write_result_file(dir: &Path, name: &str, rows: &[(&str, &str, &str)]) -> PathBuf {
    let mut content = String::from(RESULT_FILE_HEADER);
    content.push('\n');
    for (accession, code, value) in rows {
        let _ = writeln!(content, "{},{},{}", accession, code, value);
    }
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

/// An external row for `accession` owned by `client_id`, in a reportable state.
pub fn external_record(accession: &str, client_id: &str) -> ExternalRecord {
    ExternalRecord {
        accession: accession.to_string(),
        first_name: "JANE".to_string(),
        last_name: "DOE".to_string(),
        middle_name: "Q".to_string(),
        dob: "1990-05-01T00:00:00".to_string(),
        client_id: client_id.to_string(),
        client_name: format!("Clinic {}", client_id),
        physician_name: "DR SMITH".to_string(),
        result_state: "F".to_string(),
        address: "1 Main St".to_string(),
        city: "Springfield".to_string(),
        state: "IL".to_string(),
        zip: "62701".to_string(),
        phone: "555-123-4567".to_string(),
    }
}

/// Settings with the default tracked tests reading from `source_directory`.
pub fn test_settings(source_directory: &Path) -> PipelineSettings {
    PipelineSettings {
        source_directory: source_directory.to_path_buf(),
        tracked_tests: vec![
            TrackedTest::new("C19", "950Z", "SARS CoV-2, SWAB (PCR)"),
            TrackedTest::new("C19R", "960Z", "SARS CoV-2, SWAB (PCR)"),
        ],
        on_hold_state: "ON".to_string(),
        subject_template: "Client {client_id} COVID-19 Result [secure]".to_string(),
    }
}
