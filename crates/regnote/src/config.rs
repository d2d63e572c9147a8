//! Run configuration
//!
//! Loaded once from a YAML file at startup and never mutated afterwards.
//! Paths default to locations under `~/.regnote/` (see
//! [`regnote_logging::regnote_home`]).

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Environment variable that overrides `mail.password`.
pub const SMTP_PASSWORD_ENV: &str = "REGNOTE_SMTP_PASSWORD";

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory the lab system drops result files into
    pub source_directory: PathBuf,

    /// Path to the SQLite ledger
    #[serde(default = "default_ledger_path")]
    pub ledger_path: PathBuf,

    /// Directory for daily log files
    #[serde(default = "default_log_directory")]
    pub log_directory: PathBuf,

    /// Test codes extracted from source files
    #[serde(default = "default_tracked_tests")]
    pub tracked_tests: Vec<TrackedTest>,

    pub record_store: RecordStoreConfig,

    pub mail: MailConfig,
}

/// A test code the pipeline follows from file to notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedTest {
    /// Code as it appears in column 2 of a result file
    pub code: String,
    /// Test code filter used against the external record store
    pub external_code: String,
    /// Display name in notifications
    pub name: String,
}

impl TrackedTest {
    pub fn new(code: &str, external_code: &str, name: &str) -> Self {
        Self {
            code: code.to_string(),
            external_code: external_code.to_string(),
            name: name.to_string(),
        }
    }
}

/// External record store connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordStoreConfig {
    /// ADO.NET style connection string, e.g.
    /// `server=tcp:db.example,1433;database=FINANCE;user=svc;password=...;TrustServerCertificate=true`
    pub connection_string: String,

    /// External result state for results that are held back
    #[serde(default = "default_on_hold_state")]
    pub on_hold_state: String,
}

/// How the SMTP connection is secured.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailTls {
    /// Plain connection upgraded with STARTTLS (port 587)
    #[default]
    Starttls,
    /// TLS from the first byte (port 465)
    Wrapper,
    /// No TLS; only for local relays
    None,
}

/// Mail transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    pub host: String,

    #[serde(default = "default_mail_port")]
    pub port: u16,

    #[serde(default)]
    pub tls: MailTls,

    /// Sender mailbox, e.g. `RegNote <notify@lab.example>`
    pub from: String,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<String>,

    /// Skip certificate verification (self-signed internal relays)
    #[serde(default)]
    pub accept_invalid_certs: bool,

    /// Subject line; `{client_id}` and `{client_name}` are substituted
    #[serde(default = "default_subject_template")]
    pub subject_template: String,
}

fn default_ledger_path() -> PathBuf {
    regnote_logging::regnote_home().join("regnote.sqlite3")
}

fn default_log_directory() -> PathBuf {
    regnote_logging::default_logs_dir()
}

fn default_tracked_tests() -> Vec<TrackedTest> {
    vec![
        TrackedTest::new("C19", "950Z", "SARS CoV-2, SWAB (PCR)"),
        TrackedTest::new("C19R", "960Z", "SARS CoV-2, SWAB (PCR)"),
    ]
}

fn default_on_hold_state() -> String {
    "ON".to_string()
}

fn default_mail_port() -> u16 {
    587
}

fn default_subject_template() -> String {
    "Client {client_id} COVID-19 Result [secure]".to_string()
}

impl Config {
    /// Load configuration from a YAML file, apply environment overrides and
    /// validate it.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let mut config = Self::from_yaml(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;

        if let Ok(password) = std::env::var(SMTP_PASSWORD_ENV) {
            config.mail.password = Some(password);
        }

        Ok(config)
    }

    /// Parse and validate configuration text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.source_directory.as_os_str().is_empty() {
            bail!("source_directory must not be empty");
        }
        if self.tracked_tests.is_empty() {
            bail!("tracked_tests must list at least one test code");
        }

        let mut seen = HashSet::new();
        for test in &self.tracked_tests {
            if test.code.trim().is_empty() || test.external_code.trim().is_empty() {
                bail!("tracked test codes must not be empty");
            }
            if !seen.insert(test.code.as_str()) {
                bail!("tracked test code '{}' is listed twice", test.code);
            }
        }

        if self.record_store.connection_string.trim().is_empty() {
            bail!("record_store.connection_string must not be empty");
        }
        if self.mail.host.trim().is_empty() {
            bail!("mail.host must not be empty");
        }
        if self.mail.from.trim().is_empty() {
            bail!("mail.from must not be empty");
        }
        if self.mail.username.is_some() != self.mail.password.is_some()
            && std::env::var(SMTP_PASSWORD_ENV).is_err()
        {
            bail!("mail.username and mail.password must be set together");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
source_directory: /data/incoming
record_store:
  connection_string: "server=tcp:db.example,1433;database=FINANCE;user=svc;password=pw"
mail:
  host: smtp.example
  from: notify@lab.example
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = Config::from_yaml(MINIMAL).unwrap();

        assert_eq!(config.source_directory, PathBuf::from("/data/incoming"));
        assert!(config.ledger_path.ends_with("regnote.sqlite3"));
        assert_eq!(
            config.tracked_tests,
            vec![
                TrackedTest::new("C19", "950Z", "SARS CoV-2, SWAB (PCR)"),
                TrackedTest::new("C19R", "960Z", "SARS CoV-2, SWAB (PCR)"),
            ]
        );
        assert_eq!(config.record_store.on_hold_state, "ON");
        assert_eq!(config.mail.port, 587);
        assert_eq!(config.mail.tls, MailTls::Starttls);
        assert!(!config.mail.accept_invalid_certs);
        assert!(config.mail.subject_template.contains("{client_id}"));
    }

    #[test]
    fn test_full_config() {
        let yaml = r#"
source_directory: /data/incoming
ledger_path: /var/lib/regnote/ledger.sqlite3
log_directory: /var/log/regnote
tracked_tests:
  - code: FLU
    external_code: 710A
    name: Influenza A/B
record_store:
  connection_string: "server=tcp:db.example,1433"
  on_hold_state: HOLD
mail:
  host: smtp.example
  port: 465
  tls: wrapper
  from: "Lab <notify@lab.example>"
  username: notify
  password: secret
  accept_invalid_certs: true
  subject_template: "Results for {client_name}"
"#;
        let config = Config::from_yaml(yaml).unwrap();
        assert_eq!(config.tracked_tests, vec![TrackedTest::new("FLU", "710A", "Influenza A/B")]);
        assert_eq!(config.record_store.on_hold_state, "HOLD");
        assert_eq!(config.mail.tls, MailTls::Wrapper);
        assert_eq!(config.mail.port, 465);
        assert!(config.mail.accept_invalid_certs);
    }

    #[test]
    fn test_duplicate_tracked_code_is_rejected() {
        let yaml = format!(
            "{}tracked_tests:\n  - {{code: C19, external_code: 950Z, name: a}}\n  - {{code: C19, external_code: 960Z, name: b}}\n",
            MINIMAL
        );
        let err = Config::from_yaml(&yaml).unwrap_err();
        assert!(err.to_string().contains("listed twice"));
    }

    #[test]
    fn test_missing_mail_section_is_rejected() {
        let yaml = r#"
source_directory: /data/incoming
record_store:
  connection_string: "server=tcp:db.example,1433"
"#;
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_empty_tracked_tests_rejected() {
        let yaml = format!("{}tracked_tests: []\n", MINIMAL);
        assert!(Config::from_yaml(&yaml).is_err());
    }
}
