//! Audit pipeline
//!
//! Extract both revisions, align them, classify every pair that changed, and
//! assemble the report in alignment order. Classification runs with bounded
//! concurrency (sequential by default); the report order never depends on
//! completion order.

use crate::classifier::ChangeClassifier;
use crate::config::PipelineConfig;
use changeaudit_core::{
    AlignedPair, AuditReport, ChangeAligner, Document, DocumentExtractor, ReportEntry, Result,
    RuleSet, Segment, Verdict,
};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Orchestrates extraction, alignment, and classification
#[derive(Clone)]
pub struct AuditPipeline {
    extractor: DocumentExtractor,
    aligner: ChangeAligner,
    classifier: Arc<dyn ChangeClassifier>,
    config: PipelineConfig,
    cancel: CancellationToken,
}

impl AuditPipeline {
    /// Create a pipeline with default extraction and alignment settings
    pub fn new(classifier: Arc<dyn ChangeClassifier>) -> Self {
        Self {
            extractor: DocumentExtractor::default(),
            aligner: ChangeAligner::default(),
            classifier,
            config: PipelineConfig::default(),
            cancel: CancellationToken::new(),
        }
    }

    /// Use a custom extractor
    pub fn with_extractor(mut self, extractor: DocumentExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Use a custom aligner
    pub fn with_aligner(mut self, aligner: ChangeAligner) -> Self {
        self.aligner = aligner;
        self
    }

    /// Use custom pipeline settings
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Observe an external cancellation token
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Token that stops new classification requests when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Run a full audit of two parsed revisions
    pub async fn run(&self, old: &Document, new: &Document, rules: &RuleSet) -> Result<AuditReport> {
        self.config.validate()?;

        let old_segments = self.extractor.extract(old);
        let new_segments = self.extractor.extract(new);
        info!(
            old_segments = old_segments.len(),
            new_segments = new_segments.len(),
            rules = rules.len(),
            "Starting audit run"
        );

        self.run_segments(&old_segments, &new_segments, rules).await
    }

    /// Run an audit over already extracted segments
    pub async fn run_segments(
        &self,
        old: &[Segment],
        new: &[Segment],
        rules: &RuleSet,
    ) -> Result<AuditReport> {
        self.config.validate()?;
        let start = Instant::now();

        let pairs = self.aligner.align(old, new);
        let total = pairs.len();
        let changed: Vec<AlignedPair> = pairs.into_iter().filter(AlignedPair::is_change).collect();
        let unchanged = total - changed.len();
        debug!(
            changed = changed.len(),
            unchanged,
            concurrency = self.config.concurrency,
            "Classifying changed pairs"
        );

        let verdicts: Vec<Verdict> = stream::iter(changed.iter())
            .map(|pair| self.classify_one(pair, rules))
            .buffered(self.config.concurrency)
            .collect()
            .await;

        let entries: Vec<ReportEntry> = changed
            .into_iter()
            .zip(verdicts)
            .map(|(pair, verdict)| ReportEntry { pair, verdict })
            .collect();

        let report = AuditReport::new(unchanged, entries);
        let summary = report.summary();
        info!(
            run_id = %report.run_id,
            modified = summary.modified,
            inserted = summary.inserted,
            deleted = summary.deleted,
            unchanged = summary.unchanged,
            errors = summary.errors,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Audit run complete"
        );
        Ok(report)
    }

    async fn classify_one(&self, pair: &AlignedPair, rules: &RuleSet) -> Verdict {
        if self.cancel.is_cancelled() {
            warn!(q_no = pair.id(), "Run cancelled, pair not classified");
            return Verdict::cancelled();
        }
        self.classifier.classify(pair, rules).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use changeaudit_core::PairKind;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct EchoClassifier {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChangeClassifier for EchoClassifier {
        async fn classify(&self, pair: &AlignedPair, _rules: &RuleSet) -> Verdict {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Verdict::new(format!("{} change", pair.kind), pair.id())
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn test_identical_documents_need_no_calls() {
        let classifier = Arc::new(EchoClassifier {
            calls: AtomicU32::new(0),
        });
        let pipeline = AuditPipeline::new(classifier.clone());
        let doc = Document::from_blocks(["Q1", "The rate is 200"]);

        let report = pipeline.run(&doc, &doc, &RuleSet::new()).await.unwrap();
        assert!(report.entries.is_empty());
        assert_eq!(report.unchanged, 2);
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_modified_pair_classified_once() {
        let classifier = Arc::new(EchoClassifier {
            calls: AtomicU32::new(0),
        });
        let pipeline = AuditPipeline::new(classifier.clone());
        let old = vec![Segment::new("Q1", "limit is 5", 0)];
        let new = vec![Segment::new("Q1", "limit is 50", 0)];

        let report = pipeline
            .run_segments(&old, &new, &RuleSet::new())
            .await
            .unwrap();
        assert_eq!(report.entries.len(), 1);
        assert_eq!(report.entries[0].pair.kind, PairKind::Modified);
        assert_eq!(report.entries[0].verdict.description, "modified change");
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn test_cancelled_run_still_reports_every_pair() {
        let classifier = Arc::new(EchoClassifier {
            calls: AtomicU32::new(0),
        });
        let pipeline = AuditPipeline::new(classifier.clone());
        pipeline.cancellation_token().cancel();

        let old = vec![Segment::new("Q1", "a", 0), Segment::new("Q2", "b", 1)];
        let new = vec![Segment::new("Q3", "c", 0)];
        let report = pipeline
            .run_segments(&old, &new, &RuleSet::new())
            .await
            .unwrap();

        assert_eq!(report.entries.len(), 3);
        assert!(report.entries.iter().all(|e| e.verdict.is_error()));
        assert_eq!(classifier.calls.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_zero_concurrency_is_config_error() {
        let classifier = Arc::new(EchoClassifier {
            calls: AtomicU32::new(0),
        });
        let pipeline =
            AuditPipeline::new(classifier).with_config(PipelineConfig { concurrency: 0 });
        let result = pipeline.run_segments(&[], &[], &RuleSet::new()).await;
        assert!(matches!(result, Err(changeaudit_core::Error::Config(_))));
    }
}
