//! Pipeline E2E Tests
//!
//! Real result files and a real SQLite ledger on disk. Only the two remote
//! systems (record store, mail relay) are replaced by in-memory doubles.

use chrono::NaiveDate;
use regnote::{Pipeline, PipelineError, RunSummary};
use regnote_db::{ClientContact, ContactKind, LedgerDb, LedgerStore};
use regnote_test_utils::{
    external_record, test_settings, write_result_file, FailingMailer, FaultyLedger, LedgerOp,
    MemoryRecordStore, RecordingMailer,
};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

struct Harness {
    _tmp: TempDir,
    source: PathBuf,
    ledger: LedgerDb,
}

async fn harness() -> Harness {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("incoming");
    fs::create_dir(&source).unwrap();
    let ledger = LedgerDb::open(tmp.path().join("regnote.sqlite3")).await.unwrap();
    Harness {
        _tmp: tmp,
        source,
        ledger,
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 15).unwrap()
}

async fn add_contact(ledger: &LedgerDb, kind: ContactKind, address: &str, client_id: &str) {
    ledger
        .add_client_contact(&ClientContact::new(kind, address, client_id))
        .await
        .unwrap();
}

async fn pending_accessions(ledger: &dyn LedgerStore, code: &str) -> Vec<String> {
    ledger
        .pending_results(code)
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.accession)
        .collect()
}

async fn run(
    h: &Harness,
    records: &MemoryRecordStore,
    mailer: &dyn regnote::Mailer,
) -> Result<RunSummary, PipelineError> {
    Pipeline::new(&h.ledger, records, mailer, test_settings(&h.source))
        .run(run_date())
        .await
}

// =============================================================================
// INGEST
// =============================================================================

/// One file, header plus two rows of which one is tracked, nothing in the
/// record store: the result is captured and stays pending, nothing is sent.
#[tokio::test]
async fn test_single_file_without_external_record() {
    let h = harness().await;
    let file = write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "ND"), ("B2", "HGB", "13.1")]);
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.files_seen, 1);
    assert_eq!(summary.files_registered, 1);
    assert_eq!(summary.files_extracted, 1);
    assert_eq!(summary.results_extracted, 1);
    assert_eq!(summary.unmatched, 1);
    assert_eq!(summary.notifications_sent, 0);

    let path = file.to_string_lossy().into_owned();
    let rows = h.ledger.results_for_file(&path).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].accession, "A1");
    assert!(h.ledger.get_file(&path).await.unwrap().unwrap().processed);

    assert_eq!(mailer.sent_count(), 0);
    assert_eq!(pending_accessions(&h.ledger, "C19").await, vec!["A1"]);
}

#[tokio::test]
async fn test_rerun_registers_and_extracts_nothing_new() {
    let h = harness().await;
    let file = write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "ND")]);
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    run(&h, &records, &mailer).await.unwrap();
    let second = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(second.files_seen, 1);
    assert_eq!(second.files_registered, 0);
    assert_eq!(second.files_extracted, 0);
    assert_eq!(second.results_extracted, 0);

    let rows = h
        .ledger
        .results_for_file(&file.to_string_lossy())
        .await
        .unwrap();
    assert_eq!(rows.len(), 1, "processed file must not be extracted again");
}

#[tokio::test]
async fn test_file_with_no_tracked_rows_is_still_processed() {
    let h = harness().await;
    let file = write_result_file(&h.source, "chem.csv", &[("B1", "HGB", "12.0"), ("B2", "GLU", "90")]);
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.files_extracted, 1);
    assert_eq!(summary.results_extracted, 0);
    let record = h.ledger.get_file(&file.to_string_lossy()).await.unwrap().unwrap();
    assert!(record.processed);
    assert_eq!(records.lookups(), 0);
}

#[tokio::test]
async fn test_malformed_file_is_isolated_and_retried() {
    let h = harness().await;
    write_result_file(&h.source, "good.csv", &[("A1", "C19", "ND")]);
    let bad = h.source.join("bad.csv");
    fs::write(&bad, "Accession,Test Code,Result\nA2,C19,D\nA3,C19\n").unwrap();
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.files_extracted, 1);
    assert_eq!(summary.files_failed, 1);
    let bad_path = bad.to_string_lossy().into_owned();
    assert!(h.ledger.results_for_file(&bad_path).await.unwrap().is_empty());
    let pending: Vec<String> = h
        .ledger
        .pending_files()
        .await
        .unwrap()
        .into_iter()
        .map(|f| f.path)
        .collect();
    assert_eq!(pending, vec![bad_path.clone()]);

    // Once repaired, the file is picked up by the next run.
    fs::write(&bad, "Accession,Test Code,Result\nA2,C19,D\nA3,C19,ND\n").unwrap();
    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary.files_extracted, 1);
    assert_eq!(summary.files_failed, 0);
    assert_eq!(h.ledger.results_for_file(&bad_path).await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_empty_directory_is_a_clean_run() {
    let h = harness().await;
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary, RunSummary::default());
}

#[tokio::test]
async fn test_missing_source_directory_is_fatal() {
    let h = harness().await;
    fs::remove_dir(&h.source).unwrap();
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let err = run(&h, &records, &mailer).await.unwrap_err();
    assert!(matches!(err, PipelineError::Directory(_)));
}

// =============================================================================
// RECONCILE + NOTIFY
// =============================================================================

#[tokio::test]
async fn test_one_notification_per_client_then_nothing() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    add_contact(&h.ledger, ContactKind::Cc, "office@clinic-100.example", "100").await;
    add_contact(&h.ledger, ContactKind::To, "desk@clinic-200.example", "200").await;

    write_result_file(
        &h.source,
        "batch1.csv",
        &[("A1", "C19", "D"), ("A2", "C19R", "ND"), ("A3", "C19", "INV")],
    );
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));
    records.insert("960Z", external_record("A2", "100"));
    records.insert("950Z", external_record("A3", "200"));
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.reconciled, 3);
    assert_eq!(summary.notifications_sent, 2);
    assert_eq!(summary.accessions_delivered, 3);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 2);

    let first = &sent[0];
    assert_eq!(first.subject, "Client 100 COVID-19 Result [secure]");
    assert_eq!(first.to, vec!["lab@clinic-100.example"]);
    assert_eq!(first.cc, vec!["office@clinic-100.example"]);
    assert!(first.bcc.is_empty());
    assert!(first.body.contains("<td>A1</td>"));
    assert!(first.body.contains("<td>A2</td>"));
    assert!(!first.body.contains("<td>A3</td>"));
    assert!(first.body.contains("<td>Detected</td>"));
    assert!(first.body.contains("<td>Not detected</td>"));
    assert!(first.body.contains("<td>01/15/2021</td>"));
    assert!(first.body.contains("<td>1990-05-01</td>"));
    assert!(first.body.contains("<td>(555)123-4567</td>"));

    assert_eq!(sent[1].to, vec!["desk@clinic-200.example"]);
    assert!(sent[1].body.contains("<td>Invalid</td>"));

    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
    assert!(pending_accessions(&h.ledger, "C19R").await.is_empty());

    // No double delivery.
    let again = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(again.results_pending, 0);
    assert_eq!(again.notifications_sent, 0);
    assert_eq!(mailer.sent_count(), 2);
}

#[tokio::test]
async fn test_redropped_file_is_reported_once() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    write_result_file(&h.source, "batch1-resend.csv", &[("A1", "C19", "D")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.results_extracted, 2);
    assert_eq!(summary.results_pending, 2);
    assert_eq!(summary.duplicates, 1);
    assert_eq!(summary.reconciled, 1);
    assert_eq!(records.lookups(), 1);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body.matches("<td>A1</td>").count(), 1);

    // Both copies are delivered.
    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
}

#[tokio::test]
async fn test_client_without_contacts_is_delivered_without_mail() {
    let h = harness().await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "300"));
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    assert_eq!(summary.clients_skipped, 1);
    assert_eq!(summary.notifications_sent, 0);
    assert_eq!(summary.accessions_delivered, 1);
    assert_eq!(mailer.sent_count(), 0);
    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
}

#[tokio::test]
async fn test_invalid_stored_address_does_not_block_other_clients() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@", "100").await;
    add_contact(&h.ledger, ContactKind::To, "desk@clinic-200.example", "200").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D"), ("A2", "C19", "ND")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));
    records.insert("950Z", external_record("A2", "200"));
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();

    // Client 100 has no usable address left and is treated like a client
    // without contacts.
    assert_eq!(summary.clients_skipped, 1);
    assert_eq!(summary.notifications_sent, 1);
    let sent = mailer.sent();
    assert_eq!(sent[0].to, vec!["desk@clinic-200.example"]);
    assert!(sent[0].body.contains("<td>A2</td>"));
    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
}

#[tokio::test]
async fn test_on_hold_record_stays_pending() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);

    let records = MemoryRecordStore::new();
    let mut held = external_record("A1", "100");
    held.result_state = "ON".to_string();
    records.insert("950Z", held);
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary.unmatched, 1);
    assert_eq!(mailer.sent_count(), 0);
    assert_eq!(pending_accessions(&h.ledger, "C19").await, vec!["A1"]);

    // Released later: the next run picks it up.
    records.insert("950Z", external_record("A1", "100"));
    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary.notifications_sent, 1);
    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
}

#[tokio::test]
async fn test_wrong_external_code_is_a_miss() {
    let h = harness().await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19R", "D")]);
    let records = MemoryRecordStore::new();
    // C19R looks up 960Z; a 950Z row must not satisfy it.
    records.insert("950Z", external_record("A1", "100"));
    let mailer = RecordingMailer::new();

    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary.unmatched, 1);
    assert_eq!(pending_accessions(&h.ledger, "C19R").await, vec!["A1"]);
}

// =============================================================================
// FAILURES
// =============================================================================

#[tokio::test]
async fn test_dispatch_failure_leaves_results_pending() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));

    let failing = FailingMailer::new();
    let err = run(&h, &records, &failing).await.unwrap_err();
    match err {
        PipelineError::Dispatch { client_id, .. } => assert_eq!(client_id, "100"),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(failing.attempts().len(), 1);
    assert_eq!(pending_accessions(&h.ledger, "C19").await, vec!["A1"]);

    // At-least-once: a later healthy run delivers it.
    let mailer = RecordingMailer::new();
    let summary = run(&h, &records, &mailer).await.unwrap();
    assert_eq!(summary.notifications_sent, 1);
    assert!(pending_accessions(&h.ledger, "C19").await.is_empty());
}

#[tokio::test]
async fn test_dispatch_stops_at_first_failed_client() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    add_contact(&h.ledger, ContactKind::To, "desk@clinic-200.example", "200").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D"), ("A2", "C19", "ND")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));
    records.insert("950Z", external_record("A2", "200"));

    let failing = FailingMailer::after(1);
    assert!(run(&h, &records, &failing).await.is_err());
    assert_eq!(pending_accessions(&h.ledger, "C19").await, vec!["A2"]);

    let mailer = RecordingMailer::new();
    run(&h, &records, &mailer).await.unwrap();
    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].to, vec!["desk@clinic-200.example"]);
}

#[tokio::test]
async fn test_record_store_failure_is_fatal_after_extraction() {
    let h = harness().await;
    let file = write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    let records = MemoryRecordStore::new();
    records.fail_with("connection reset");
    let mailer = RecordingMailer::new();

    let err = run(&h, &records, &mailer).await.unwrap_err();
    assert!(matches!(err, PipelineError::RecordStore(_)));

    // Extraction was already durable; the result waits for the next run.
    assert!(h.ledger.get_file(&file.to_string_lossy()).await.unwrap().unwrap().processed);
    assert_eq!(pending_accessions(&h.ledger, "C19").await, vec!["A1"]);
}

#[tokio::test]
async fn test_failed_extraction_commit_aborts_with_file_pending() {
    let h = harness().await;
    let file = write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    let ledger = FaultyLedger::new(h.ledger.clone());
    ledger.fail_on(LedgerOp::CommitExtraction);
    let records = MemoryRecordStore::new();
    let mailer = RecordingMailer::new();

    let err = Pipeline::new(&ledger, &records, &mailer, test_settings(&h.source))
        .run(run_date())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));

    let path = file.to_string_lossy().into_owned();
    assert!(h.ledger.results_for_file(&path).await.unwrap().is_empty());
    assert_eq!(h.ledger.pending_files().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_failed_delivery_mark_resends_next_run() {
    let h = harness().await;
    add_contact(&h.ledger, ContactKind::To, "lab@clinic-100.example", "100").await;
    write_result_file(&h.source, "batch1.csv", &[("A1", "C19", "D")]);
    let records = MemoryRecordStore::new();
    records.insert("950Z", external_record("A1", "100"));
    let mailer = RecordingMailer::new();

    let ledger = FaultyLedger::new(h.ledger.clone());
    ledger.fail_on(LedgerOp::MarkDelivered);
    let settings = test_settings(&h.source);

    let err = Pipeline::new(&ledger, &records, &mailer, settings.clone())
        .run(run_date())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Storage(_)));
    assert_eq!(mailer.sent_count(), 1);
    assert_eq!(pending_accessions(ledger.inner(), "C19").await, vec!["A1"]);

    ledger.heal();
    Pipeline::new(&ledger, &records, &mailer, settings)
        .run(run_date())
        .await
        .unwrap();
    assert_eq!(mailer.sent_count(), 2, "undelivered mark means the message is sent again");
    assert!(pending_accessions(ledger.inner(), "C19").await.is_empty());
}
