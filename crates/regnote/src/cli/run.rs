//! Run command - execute the pipeline once

use crate::cli::error::HelpfulError;
use anyhow::{Context, Result};
use chrono::Local;
use regnote::{Config, MssqlRecordStore, Pipeline, PipelineSettings, SmtpMailer};
use regnote_db::{try_lock_exclusive, LedgerDb, LockError};
use tracing::info;

pub async fn run(config: &Config) -> Result<()> {
    let _lock = match try_lock_exclusive(&config.ledger_path) {
        Ok(guard) => guard,
        Err(LockError::Locked(path)) => return Err(HelpfulError::ledger_locked(&path).into()),
        Err(err) => return Err(err).context("Failed to take the run lock"),
    };

    let ledger = LedgerDb::open(&config.ledger_path)
        .await
        .with_context(|| format!("Failed to open ledger: {}", config.ledger_path.display()))?;

    // Connects on the first lookup, after ingest has been committed.
    let records = MssqlRecordStore::new(&config.record_store.connection_string)
        .context("Invalid record store connection string")?;

    let mailer = SmtpMailer::new(&config.mail).context("Failed to configure the mailer")?;

    let run_date = Local::now().date_naive();
    info!(
        source = %config.source_directory.display(),
        ledger = %config.ledger_path.display(),
        run_date = %run_date,
        "Starting run"
    );

    let pipeline = Pipeline::new(&ledger, &records, &mailer, PipelineSettings::from_config(config));
    let result = pipeline.run(run_date).await;
    ledger.close().await;

    result.context("Run aborted")?;
    Ok(())
}
