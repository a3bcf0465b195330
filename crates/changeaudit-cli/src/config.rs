//! Layered configuration
//!
//! Sources, lowest precedence first: built-in defaults, the YAML file,
//! `CHANGEAUDIT__SECTION__KEY` environment variables, command-line flags.

use crate::cli::AuditArgs;
use changeaudit_classifiers::{BackendConfig, PipelineConfig};
use changeaudit_core::{AlignerConfig, Error, ExtractorConfig, Result};
use changeaudit_rules::RuleStoreConfig;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration file read when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "changeaudit.yaml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "CHANGEAUDIT";

/// Complete application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditConfig {
    #[serde(default)]
    pub backend: BackendConfig,

    #[serde(default)]
    pub extractor: ExtractorConfig,

    #[serde(default)]
    pub aligner: AlignerConfig,

    #[serde(default)]
    pub pipeline: PipelineConfig,

    #[serde(default)]
    pub rules: RuleStoreConfig,
}

impl AuditConfig {
    /// Load from the config file and the environment
    ///
    /// An explicitly named file must exist; the default file is optional.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Yaml).required(true),
            None => File::new(DEFAULT_CONFIG_FILE, FileFormat::Yaml).required(false),
        };

        Config::builder()
            .add_source(file)
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))
    }

    /// Apply `audit` command-line overrides
    pub fn apply_overrides(&mut self, args: &AuditArgs) {
        if let Some(kind) = args.backend {
            self.backend.kind = kind;
        }
        if let Some(url) = &args.url {
            self.backend.url = Some(url.clone());
        }
        if let Some(model) = &args.model {
            self.backend.model = model.clone();
        }
        if let Some(threshold) = args.threshold {
            self.aligner.threshold = threshold;
        }
        if let Some(concurrency) = args.concurrency {
            self.pipeline.concurrency = concurrency;
        }
    }

    /// Check everything an audit run needs
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.aligner.threshold) {
            return Err(Error::config(format!(
                "aligner.threshold must be within [0, 1], got {}",
                self.aligner.threshold
            )));
        }
        if self.extractor.header_max_len == 0 {
            return Err(Error::config("extractor.header_max_len must be greater than 0"));
        }
        self.backend.validate()?;
        self.pipeline.validate()?;
        self.rules.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeaudit_classifiers::BackendKind;
    use changeaudit_rules::TableKind;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_file_sections_and_defaults() {
        let file = write_config(
            r#"
backend:
  model: llama3:8b
  timeout_secs: 10
aligner:
  threshold: 0.95
rules:
  backend: memory
"#,
        );
        let config = AuditConfig::load(Some(file.path())).unwrap();

        assert_eq!(config.backend.kind, BackendKind::Local);
        assert_eq!(config.backend.model, "llama3:8b");
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.backend.max_retries, 1);
        assert!((config.aligner.threshold - 0.95).abs() < 1e-6);
        assert_eq!(config.extractor.header_max_len, 40);
        assert_eq!(config.pipeline.concurrency, 1);
        assert_eq!(config.rules.backend, TableKind::Memory);
        assert_eq!(config.rules.worksheet, "Memory");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_explicit_file_is_config_error() {
        let result = AuditConfig::load(Some(Path::new("/nonexistent/changeaudit.yaml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_overrides_win_over_file() {
        let file = write_config("backend:\n  model: llama3:8b\npipeline:\n  concurrency: 2\n");
        let mut config = AuditConfig::load(Some(file.path())).unwrap();

        config.apply_overrides(&AuditArgs {
            backend: Some(BackendKind::Hosted),
            url: Some("https://inference.example.com/models/gemma".to_string()),
            model: Some("gemma3:12b".to_string()),
            threshold: Some(0.9),
            concurrency: Some(4),
            ..Default::default()
        });

        assert_eq!(config.backend.kind, BackendKind::Hosted);
        assert_eq!(config.backend.model, "gemma3:12b");
        assert_eq!(config.pipeline.concurrency, 4);
        assert!((config.aligner.threshold - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_out_of_range_threshold_rejected() {
        let mut config = AuditConfig::default();
        config.rules.backend = TableKind::Memory;
        config.aligner.threshold = 1.5;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }
}
