//! CLI module for RegNote
//!
//! `run` executes the pipeline (also the default with no subcommand);
//! `status` and `contacts` inspect and maintain the ledger.

pub mod contacts;
pub mod error;
pub mod output;
pub mod run;
pub mod status;
