//! Rule store configuration

use changeaudit_core::{rule_set, Error, Result, RuleSet};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Seed rule used when no stored rules can be read
pub const DEFAULT_SEED_RULE: &str = "Ignore identical numerical changes (e.g. 200 to 200).";

/// Where rules are persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TableKind {
    /// JSON documents in a local directory
    #[default]
    File,
    /// A hosted spreadsheet
    Sheets,
    /// Process memory only (nothing survives the process)
    Memory,
}

/// Rule store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleStoreConfig {
    /// Backing table implementation
    #[serde(default)]
    pub backend: TableKind,

    /// Worksheet (table) name
    #[serde(default = "default_worksheet")]
    pub worksheet: String,

    /// Header of the single rule column
    #[serde(default = "default_column")]
    pub column: String,

    /// Directory for the file backend; defaults to the platform data directory
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Spreadsheet identifier for the sheets backend
    #[serde(default)]
    pub spreadsheet_id: Option<String>,

    /// Environment variable holding the sheets bearer token
    #[serde(default)]
    pub token_env: Option<String>,

    /// Base URL of the sheets API
    #[serde(default = "default_sheets_url")]
    pub sheets_url: String,

    /// Request timeout for the sheets backend, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Rules substituted when the store cannot be read
    #[serde(default = "default_seed_rules")]
    pub seed_rules: Vec<String>,
}

impl Default for RuleStoreConfig {
    fn default() -> Self {
        Self {
            backend: TableKind::default(),
            worksheet: default_worksheet(),
            column: default_column(),
            path: None,
            spreadsheet_id: None,
            token_env: None,
            sheets_url: default_sheets_url(),
            timeout_secs: default_timeout_secs(),
            seed_rules: default_seed_rules(),
        }
    }
}

impl RuleStoreConfig {
    /// Seed rules as a set
    pub fn seed(&self) -> RuleSet {
        rule_set(&self.seed_rules)
    }

    /// Directory used by the file backend
    pub fn directory(&self) -> Result<PathBuf> {
        match &self.path {
            Some(path) => Ok(path.clone()),
            None => dirs::data_dir()
                .map(|dir| dir.join("changeaudit"))
                .ok_or_else(|| {
                    Error::config("no platform data directory; set rules.path explicitly")
                }),
        }
    }

    /// Sheets request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve the sheets bearer token from the environment
    pub fn token(&self) -> Result<String> {
        let var = self
            .token_env
            .as_deref()
            .ok_or_else(|| Error::config("sheets rule store requires rules.token_env"))?;
        std::env::var(var).map_err(|_| {
            Error::config(format!(
                "environment variable {} (rules.token_env) is not set",
                var
            ))
        })
    }

    /// Check the configuration before any work starts
    pub fn validate(&self) -> Result<()> {
        if self.worksheet.trim().is_empty() {
            return Err(Error::config("rules.worksheet must not be empty"));
        }
        if self.seed().is_empty() {
            return Err(Error::config("rules.seed_rules must contain at least one rule"));
        }
        match self.backend {
            TableKind::File => {
                self.directory()?;
            }
            TableKind::Sheets => {
                if self.spreadsheet_id.as_deref().map_or(true, |id| id.trim().is_empty()) {
                    return Err(Error::config("sheets rule store requires rules.spreadsheet_id"));
                }
                self.token()?;
            }
            TableKind::Memory => {}
        }
        Ok(())
    }
}

fn default_worksheet() -> String {
    "Memory".to_string()
}

fn default_column() -> String {
    "Rules".to_string()
}

fn default_sheets_url() -> String {
    "https://sheets.googleapis.com/v4".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_seed_rules() -> Vec<String> {
    vec![DEFAULT_SEED_RULE.to_string()]
}
