use changeaudit_classifiers::BackendKind;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "changeaudit")]
#[command(
    author,
    version,
    about = "Audit the changes between two revisions of a structured document"
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path [default: changeaudit.yaml if present]
    #[arg(short, long, global = true, env = "CHANGEAUDIT_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Write Prometheus metrics to this file on exit
    #[arg(long, global = true)]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare two revisions and classify every change
    Audit(AuditArgs),

    /// Inspect or extend the learned rules
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },

    /// Learn rules from a reviewed report
    Train(TrainArgs),
}

#[derive(Args, Debug, Default)]
pub struct AuditArgs {
    /// Previous revision (.docx, .txt or .md)
    #[arg(long)]
    pub old: PathBuf,

    /// Current revision (.docx, .txt or .md)
    #[arg(long)]
    pub new: PathBuf,

    /// Write the report to this file (.json or .jsonl)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Model backend: local or hosted
    #[arg(long, value_parser = parse_backend)]
    pub backend: Option<BackendKind>,

    /// Model endpoint URL
    #[arg(long)]
    pub url: Option<String>,

    /// Model name
    #[arg(long)]
    pub model: Option<String>,

    /// Similarity at or above which a pair counts as unchanged
    #[arg(long)]
    pub threshold: Option<f32>,

    /// Classification requests in flight at once
    #[arg(long)]
    pub concurrency: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum RulesCommand {
    /// Print the stored rules
    List,

    /// Add rules to the store
    Add {
        /// Rule text; repeat for several rules
        #[arg(required = true)]
        rules: Vec<String>,
    },
}

#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Reviewed rows (.json, .jsonl, .yaml)
    #[arg(long)]
    pub corrections: PathBuf,

    /// Print the derived rules without storing them
    #[arg(long)]
    pub dry_run: bool,
}

fn parse_backend(s: &str) -> Result<BackendKind, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "changeaudit",
            "audit",
            "--old",
            "a.docx",
            "--new",
            "b.docx",
            "--backend",
            "cloud",
            "--verbose",
        ])
        .unwrap();

        assert!(cli.verbose);
        match cli.command {
            Commands::Audit(args) => {
                assert_eq!(args.backend, Some(BackendKind::Hosted));
                assert_eq!(args.old, PathBuf::from("a.docx"));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_rules_add_requires_text() {
        assert!(Cli::try_parse_from(["changeaudit", "rules", "add"]).is_err());
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result = Cli::try_parse_from([
            "changeaudit", "audit", "--old", "a", "--new", "b", "--backend", "gpu",
        ]);
        assert!(result.is_err());
    }
}
