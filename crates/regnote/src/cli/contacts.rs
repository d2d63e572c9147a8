//! Contacts command - manage client notification addresses

use crate::cli::error::HelpfulError;
use crate::cli::output::{print_json, print_table};
use anyhow::{bail, Context, Result};
use clap::Subcommand;
use regnote::Config;
use regnote_db::{try_lock_exclusive, ClientContact, ContactKind, LedgerDb, LockError, RunLockGuard};

#[derive(Subcommand, Debug, Clone)]
pub enum ContactsAction {
    /// List configured contacts
    List {
        /// Only this client
        #[arg(long)]
        client: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Add a contact address for a client
    Add {
        #[arg(long)]
        client: String,

        /// Recipient slot: to, cc or bcc
        #[arg(long, default_value = "to")]
        kind: ContactKind,

        #[arg(long)]
        address: String,
    },

    /// Remove a contact address from a client
    Remove {
        #[arg(long)]
        client: String,

        #[arg(long)]
        address: String,
    },
}

pub async fn run(config: &Config, action: ContactsAction) -> Result<()> {
    match action {
        ContactsAction::List { client, json } => list(config, client.as_deref(), json).await,
        ContactsAction::Add {
            client,
            kind,
            address,
        } => add(config, ClientContact::new(kind, address, client)).await,
        ContactsAction::Remove { client, address } => remove(config, &client, &address).await,
    }
}

async fn list(config: &Config, client: Option<&str>, json: bool) -> Result<()> {
    if !config.ledger_path.exists() {
        return Err(HelpfulError::ledger_not_found(&config.ledger_path).into());
    }
    let ledger = LedgerDb::open_existing(&config.ledger_path).await?;
    let contacts = ledger.list_client_contacts(client).await?;
    ledger.close().await;

    if json {
        return print_json(&contacts);
    }
    if contacts.is_empty() {
        println!("No contacts configured.");
        return Ok(());
    }

    print_table(
        &["Client", "Kind", "Address"],
        contacts
            .into_iter()
            .map(|c| vec![c.client_id, c.kind.to_string(), c.address])
            .collect(),
    );
    Ok(())
}

async fn add(config: &Config, contact: ClientContact) -> Result<()> {
    if contact.client_id.trim().is_empty() {
        bail!("A contact needs a client id");
    }
    contact
        .address
        .trim()
        .parse::<lettre::Address>()
        .with_context(|| format!("Not a valid email address: '{}'", contact.address))?;

    let _lock = lock(config)?;
    let ledger = LedgerDb::open(&config.ledger_path).await?;
    let added = ledger.add_client_contact(&contact).await?;
    ledger.close().await;

    if added {
        println!(
            "Added {} contact {} for client {}",
            contact.kind, contact.address, contact.client_id
        );
    } else {
        println!("Contact already present");
    }
    Ok(())
}

async fn remove(config: &Config, client: &str, address: &str) -> Result<()> {
    let _lock = lock(config)?;
    let ledger = LedgerDb::open(&config.ledger_path).await?;
    let removed = ledger.remove_client_contact(client, address).await?;
    ledger.close().await;

    if removed == 0 {
        bail!("No contact {} for client {}", address, client);
    }
    println!("Removed {} contact(s)", removed);
    Ok(())
}

fn lock(config: &Config) -> Result<RunLockGuard> {
    match try_lock_exclusive(&config.ledger_path) {
        Ok(guard) => Ok(guard),
        Err(LockError::Locked(path)) => Err(HelpfulError::ledger_locked(&path).into()),
        Err(err) => Err(err).context("Failed to take the ledger lock"),
    }
}
