//! Subcommand implementations

use crate::cli::{AuditArgs, RulesCommand, TrainArgs};
use crate::config::AuditConfig;
use crate::render;
use anyhow::{bail, Context, Result};
use changeaudit_classifiers::{build_backend, AuditPipeline, ClassifierAgent};
use changeaudit_core::{rule_set, AuditReport, ChangeAligner, Document, DocumentExtractor};
use changeaudit_rules::{derive_rules, load_corrections, RuleStore, Trainer};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Run an audit and print the report
pub async fn audit(
    mut config: AuditConfig,
    args: &AuditArgs,
    cancel: CancellationToken,
) -> Result<AuditReport> {
    config.apply_overrides(args);
    config.validate()?;
    if let Some(path) = &args.output {
        report_extension(path)?;
    }

    let old = Document::open(&args.old)?;
    let new = Document::open(&args.new)?;
    info!(
        old = %args.old.display(),
        new = %args.new.display(),
        old_blocks = old.len(),
        new_blocks = new.len(),
        "Documents loaded"
    );

    let store = RuleStore::from_config(&config.rules)?;
    let rules = store.load().await;

    let backend = build_backend(&config.backend)?;
    let agent = ClassifierAgent::new(backend, &config.backend)?;
    let pipeline = AuditPipeline::new(Arc::new(agent))
        .with_extractor(DocumentExtractor::new(config.extractor.clone()))
        .with_aligner(ChangeAligner::new(config.aligner.clone()))
        .with_config(config.pipeline.clone())
        .with_cancellation(cancel);

    let report = pipeline.run(&old, &new, &rules).await?;

    let stdout = std::io::stdout();
    render::write_table(&report, stdout.lock())?;

    if let Some(path) = &args.output {
        write_report(&report, path)?;
        info!(path = %path.display(), "Report written");
    }
    Ok(report)
}

/// Write the report as `.json` or `.jsonl` depending on the extension
pub fn write_report(report: &AuditReport, path: &Path) -> Result<()> {
    let extension = report_extension(path)?;

    let file = File::create(path)
        .with_context(|| format!("failed to create report file {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    if extension == "json" {
        writer.write_all(report.to_json()?.as_bytes())?;
    } else {
        report.write_jsonl(&mut writer)?;
    }
    writer.flush()?;
    Ok(())
}

fn report_extension(path: &Path) -> Result<String> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    if extension != "json" && extension != "jsonl" {
        bail!(
            "unsupported report format '{}' for {}: use .json or .jsonl",
            extension,
            path.display()
        );
    }
    Ok(extension)
}

/// List or extend the stored rules
pub async fn rules(config: &AuditConfig, command: &RulesCommand) -> Result<()> {
    let store = RuleStore::from_config(&config.rules)?;

    match command {
        RulesCommand::List => {
            for rule in store.load().await {
                println!("{}", rule);
            }
        }
        RulesCommand::Add { rules } => {
            let rules = rule_set(rules);
            if rules.is_empty() {
                bail!("no non-blank rules given");
            }
            let outcome = store.merge(&rules).await?;
            println!(
                "Added {} rule(s); {} stored in total",
                outcome.added,
                outcome.rules.len()
            );
        }
    }
    Ok(())
}

/// Derive rules from reviewed rows and store them
pub async fn train(config: &AuditConfig, args: &TrainArgs) -> Result<()> {
    let corrections = load_corrections(&args.corrections)
        .with_context(|| format!("failed to read corrections from {}", args.corrections.display()))?;

    if args.dry_run {
        let derived = derive_rules(&corrections);
        for rule in &derived {
            println!("{}", rule);
        }
        println!(
            "\n{} rule(s) derived from {} correction(s); nothing stored",
            derived.len(),
            corrections.len()
        );
        return Ok(());
    }

    let store = Arc::new(RuleStore::from_config(&config.rules)?);
    let outcome = Trainer::new(store).learn(&corrections).await?;
    for rule in &outcome.derived {
        println!("{}", rule);
    }
    println!(
        "\n{} rule(s) derived, {} new; {} stored in total",
        outcome.derived.len(),
        outcome.added,
        outcome.total
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeaudit_core::{AlignedPair, ReportEntry, Segment, Verdict};

    fn report() -> AuditReport {
        AuditReport::new(
            1,
            vec![ReportEntry {
                pair: AlignedPair::deleted(Segment::new("Q4", "Old question", 3)),
                verdict: Verdict::new("Question removed", "Q4"),
            }],
        )
    }

    #[test]
    fn test_write_report_formats() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("report.json");
        write_report(&report(), &json).unwrap();
        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(parsed["unchanged"], 1);

        let jsonl = dir.path().join("report.jsonl");
        write_report(&report(), &jsonl).unwrap();
        let content = std::fs::read_to_string(&jsonl).unwrap();
        assert_eq!(content.lines().count(), 1);
        assert!(content.contains("\"description\":\"Question removed\""));
    }

    #[test]
    fn test_write_report_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.csv");
        assert!(write_report(&report(), &path).is_err());
        assert!(!path.exists());
    }
}
