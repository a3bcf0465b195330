//! Core types for ChangeAudit

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::io::Write;
use uuid::Uuid;

/// Section label used before any header line has been seen
pub const DEFAULT_LABEL: &str = "General";

/// One extracted unit of document text with its section label
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Segment {
    /// Section label ("q_no") carried over from the most recent header line
    pub id: String,

    /// Paragraph text
    pub text: String,

    /// Position among the segments of the source document
    pub order: usize,
}

impl Segment {
    /// Create a new segment
    pub fn new(id: impl Into<String>, text: impl Into<String>, order: usize) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            order,
        }
    }
}

/// How an old and a new segment relate after alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PairKind {
    /// Present on both sides with no material change
    Matched,
    /// Only present in the new document
    Inserted,
    /// Only present in the old document
    Deleted,
    /// Present on both sides with a material change
    Modified,
}

impl PairKind {
    /// Stable lowercase name, used in prompts, logs and metric labels
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Inserted => "inserted",
            Self::Deleted => "deleted",
            Self::Modified => "modified",
        }
    }
}

impl fmt::Display for PairKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The result of matching old and new segments for comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlignedPair {
    /// Segment from the old document, if any
    pub old: Option<Segment>,

    /// Segment from the new document, if any
    pub new: Option<Segment>,

    /// Relationship between the two sides
    pub kind: PairKind,

    /// Similarity in [0, 1] for pairs with both sides present
    #[serde(skip_serializing_if = "Option::is_none")]
    pub similarity: Option<f32>,
}

impl AlignedPair {
    /// A pair with both sides present
    pub fn both(old: Segment, new: Segment, similarity: f32, kind: PairKind) -> Self {
        Self {
            old: Some(old),
            new: Some(new),
            kind,
            similarity: Some(similarity),
        }
    }

    /// A segment that only exists in the new document
    pub fn inserted(new: Segment) -> Self {
        Self {
            old: None,
            new: Some(new),
            kind: PairKind::Inserted,
            similarity: None,
        }
    }

    /// A segment that only exists in the old document
    pub fn deleted(old: Segment) -> Self {
        Self {
            old: Some(old),
            new: None,
            kind: PairKind::Deleted,
            similarity: None,
        }
    }

    /// Section label shared by both sides
    pub fn id(&self) -> &str {
        self.old
            .as_ref()
            .or(self.new.as_ref())
            .map(|s| s.id.as_str())
            .unwrap_or(DEFAULT_LABEL)
    }

    /// Old text, if present
    pub fn old_text(&self) -> Option<&str> {
        self.old.as_ref().map(|s| s.text.as_str())
    }

    /// New text, if present
    pub fn new_text(&self) -> Option<&str> {
        self.new.as_ref().map(|s| s.text.as_str())
    }

    /// Whether this pair needs a verdict
    pub fn is_change(&self) -> bool {
        self.kind != PairKind::Matched
    }

    /// The same pair with old and new roles exchanged
    pub fn swapped(self) -> Self {
        let kind = match self.kind {
            PairKind::Inserted => PairKind::Deleted,
            PairKind::Deleted => PairKind::Inserted,
            other => other,
        };
        Self {
            old: self.new,
            new: self.old,
            kind,
            similarity: self.similarity,
        }
    }
}

/// A persisted free-text heuristic used to bias classification
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rule(String);

impl Rule {
    /// Create a rule, trimming surrounding whitespace
    pub fn new(text: impl AsRef<str>) -> Self {
        Self(text.as_ref().trim().to_string())
    }

    /// Rule text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the rule carries no text
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Rule {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Rule {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Unordered, deduplicated rules; iteration order is lexical so prompts are stable
pub type RuleSet = BTreeSet<Rule>;

/// Build a rule set from raw strings, dropping blanks
pub fn rule_set<I, S>(rules: I) -> RuleSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    rules
        .into_iter()
        .map(Rule::new)
        .filter(|r| !r.is_empty())
        .collect()
}

/// The model's structured judgment for one aligned pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    /// Human-readable description of the change
    pub description: String,

    /// Section label as corrected by the model
    pub refined_q_no: String,

    /// Optional category of change
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<String>,

    /// Failure reason for sentinel verdicts
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// Description used by the sentinel verdict
    pub const ERROR_DESCRIPTION: &'static str = "Error in AI generation.";

    /// Section label used by the sentinel verdict
    pub const ERROR_Q_NO: &'static str = "Error";

    /// Create a regular verdict
    pub fn new(description: impl Into<String>, refined_q_no: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            refined_q_no: refined_q_no.into(),
            classification: None,
            error: None,
        }
    }

    /// Attach a classification
    pub fn with_classification(mut self, classification: impl Into<String>) -> Self {
        self.classification = Some(classification.into());
        self
    }

    /// Sentinel verdict substituted when classification fails
    pub fn sentinel(reason: impl Into<String>) -> Self {
        Self {
            description: Self::ERROR_DESCRIPTION.to_string(),
            refined_q_no: Self::ERROR_Q_NO.to_string(),
            classification: None,
            error: Some(reason.into()),
        }
    }

    /// Sentinel verdict for pairs never sent because the run was cancelled
    pub fn cancelled() -> Self {
        Self::sentinel("cancelled before classification")
    }

    /// Whether this is a sentinel verdict
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// One row of the final report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportEntry {
    /// The aligned pair
    pub pair: AlignedPair,

    /// Verdict for the pair (real or sentinel)
    pub verdict: Verdict,
}

/// Counts derived from a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub unchanged: usize,
    pub modified: usize,
    pub inserted: usize,
    pub deleted: usize,
    pub errors: usize,
}

/// Ordered audit results for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditReport {
    /// Unique run identifier
    pub run_id: Uuid,

    /// When the report was assembled
    pub generated_at: DateTime<Utc>,

    /// Number of matched pairs that needed no verdict
    pub unchanged: usize,

    /// One entry per changed pair, in alignment order
    pub entries: Vec<ReportEntry>,
}

impl AuditReport {
    /// Create a report for a fresh run
    pub fn new(unchanged: usize, entries: Vec<ReportEntry>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            generated_at: Utc::now(),
            unchanged,
            entries,
        }
    }

    /// Compute summary counts
    pub fn summary(&self) -> ReportSummary {
        let mut summary = ReportSummary {
            unchanged: self.unchanged,
            ..Default::default()
        };
        for entry in &self.entries {
            match entry.pair.kind {
                PairKind::Modified => summary.modified += 1,
                PairKind::Inserted => summary.inserted += 1,
                PairKind::Deleted => summary.deleted += 1,
                PairKind::Matched => summary.unchanged += 1,
            }
            if entry.verdict.is_error() {
                summary.errors += 1;
            }
        }
        summary
    }

    /// Whether any row carries a sentinel verdict
    pub fn has_errors(&self) -> bool {
        self.entries.iter().any(|e| e.verdict.is_error())
    }

    /// Serialize the whole report as pretty JSON
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write one JSON object per entry, each tagged with the run id
    pub fn write_jsonl<W: Write>(&self, mut writer: W) -> crate::Result<()> {
        for (index, entry) in self.entries.iter().enumerate() {
            let line = serde_json::json!({
                "run_id": self.run_id,
                "index": index,
                "q_no": entry.pair.id(),
                "kind": entry.pair.kind,
                "similarity": entry.pair.similarity,
                "old_text": entry.pair.old_text(),
                "new_text": entry.pair.new_text(),
                "description": entry.verdict.description,
                "refined_q_no": entry.verdict.refined_q_no,
                "classification": entry.verdict.classification,
                "error": entry.verdict.error,
            });
            serde_json::to_writer(&mut writer, &line)?;
            writer.write_all(b"\n")?;
        }
        writer.flush()?;
        Ok(())
    }
}
