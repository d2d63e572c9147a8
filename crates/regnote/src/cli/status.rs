//! Status command - ledger counters

use crate::cli::error::HelpfulError;
use crate::cli::output::{format_timestamp, print_json, print_table};
use anyhow::{Context, Result};
use regnote::Config;
use regnote_db::{LedgerDb, LedgerStore};

#[derive(Debug)]
pub struct StatusArgs {
    pub json: bool,
    /// Also list files that are still pending
    pub pending: bool,
}

pub async fn run(config: &Config, args: StatusArgs) -> Result<()> {
    if !config.ledger_path.exists() {
        return Err(HelpfulError::ledger_not_found(&config.ledger_path).into());
    }
    let ledger = LedgerDb::open_existing(&config.ledger_path)
        .await
        .with_context(|| format!("Failed to open ledger: {}", config.ledger_path.display()))?;

    let stats = ledger.stats().await?;
    let pending = if args.pending {
        ledger.pending_files().await?
    } else {
        Vec::new()
    };
    ledger.close().await;

    if args.json {
        return print_json(&serde_json::json!({
            "ledger": config.ledger_path,
            "stats": stats,
            "pendingFiles": pending,
        }));
    }

    println!("Ledger: {}", config.ledger_path.display());
    print_table(
        &["Metric", "Count"],
        vec![
            vec!["Files".into(), stats.files_total.to_string()],
            vec!["  pending".into(), stats.files_pending.to_string()],
            vec!["  processed".into(), stats.files_processed.to_string()],
            vec!["Results".into(), stats.results_total.to_string()],
            vec!["  pending".into(), stats.results_pending.to_string()],
            vec!["  delivered".into(), stats.results_delivered.to_string()],
            vec!["Client contacts".into(), stats.contacts_total.to_string()],
        ],
    );

    if args.pending && !pending.is_empty() {
        println!("\nPending files:");
        print_table(
            &["Path", "First seen"],
            pending
                .into_iter()
                .map(|f| vec![f.path, format_timestamp(f.first_seen_at)])
                .collect(),
        );
    }

    Ok(())
}
