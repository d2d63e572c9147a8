//! Helpful error types for CLI commands
//!
//! Every error includes what went wrong, some context, and what to try next.

use std::fmt;
use std::path::Path;

/// An error with context and suggestions
#[derive(Debug)]
pub struct HelpfulError {
    pub message: String,
    pub context: Option<String>,
    pub suggestions: Vec<String>,
}

impl HelpfulError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            context: None,
            suggestions: Vec::new(),
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_suggestions(mut self, suggestions: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.suggestions.extend(suggestions.into_iter().map(|s| s.into()));
        self
    }

    /// Config file is missing
    pub fn config_not_found(path: &Path) -> Self {
        Self::new(format!("Config file not found: {}", path.display()))
            .with_context("RegNote reads its settings from a YAML file at startup")
            .with_suggestions([
                format!("TRY: Create {} (see config.example.yml)", path.display()),
                "TRY: Point at another file: regnote --config /path/to/config.yml".to_string(),
                "TRY: Set REGNOTE_CONFIG".to_string(),
            ])
    }

    /// Another run holds the ledger lock
    pub fn ledger_locked(ledger_path: &Path) -> Self {
        Self::new(format!("Ledger is in use: {}", ledger_path.display()))
            .with_context("Another regnote run is still in progress")
            .with_suggestions([
                "TRY: Wait for the other run to finish".to_string(),
                format!(
                    "TRY: Check the lock owner: cat {}.lock.json",
                    ledger_path.display()
                ),
            ])
    }

    /// Ledger has not been created yet
    pub fn ledger_not_found(ledger_path: &Path) -> Self {
        Self::new(format!("Ledger not found: {}", ledger_path.display()))
            .with_context("The ledger is created by the first pipeline run")
            .with_suggestions([
                "TRY: Run the pipeline once: regnote run".to_string(),
                "TRY: Check ledger_path in your config".to_string(),
            ])
    }
}

impl fmt::Display for HelpfulError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ERROR: {}", self.message)?;

        if let Some(ctx) = &self.context {
            writeln!(f, "CONTEXT: {}", ctx)?;
        }

        if !self.suggestions.is_empty() {
            writeln!(f)?;
            for suggestion in &self.suggestions {
                writeln!(f, "  {}", suggestion)?;
            }
        }

        Ok(())
    }
}

impl std::error::Error for HelpfulError {}
