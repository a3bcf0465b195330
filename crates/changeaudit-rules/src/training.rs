//! Learning rules from human corrections
//!
//! A reviewer takes an audit report, fills in what the agent should have
//! said, and feeds the rows back. Every disagreement becomes one rule
//! string; the rules are merged into the store and guide later runs.

use crate::store::RuleStore;
use changeaudit_core::{Error, Result, Rule, RuleSet, Verdict};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

const SNIPPET_LEN: usize = 60;

/// One reviewed report row
///
/// Agent fields accept the report's own key names so an exported JSONL
/// report can be edited and fed back directly.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Correction {
    /// Section label of the pair
    pub q_no: String,

    #[serde(default)]
    pub old_text: Option<String>,

    #[serde(default)]
    pub new_text: Option<String>,

    #[serde(default, alias = "description")]
    pub agent_description: String,

    #[serde(default, alias = "classification")]
    pub agent_classification: Option<String>,

    #[serde(default, alias = "refined_q_no")]
    pub agent_q_no: Option<String>,

    /// What the description should have been; blank means no opinion
    #[serde(default)]
    pub human_description: Option<String>,

    #[serde(default)]
    pub human_classification: Option<String>,

    #[serde(default)]
    pub human_q_no: Option<String>,
}

impl Correction {
    /// Whether the agent row is a failure placeholder rather than a judgment
    pub fn is_sentinel(&self) -> bool {
        self.agent_description == Verdict::ERROR_DESCRIPTION
            || self.agent_q_no.as_deref() == Some(Verdict::ERROR_Q_NO)
    }

    fn change_phrase(&self) -> String {
        match (non_blank(&self.old_text), non_blank(&self.new_text)) {
            (Some(old), Some(new)) => format!("\"{}\" changes to \"{}\"", snippet(old), snippet(new)),
            (None, Some(new)) => format!("\"{}\" is inserted", snippet(new)),
            (Some(old), None) => format!("\"{}\" is deleted", snippet(old)),
            (None, None) => "the text changes".to_string(),
        }
    }
}

/// Read corrections from a `.json`, `.jsonl`, `.yaml`, `.yml` or `.csv` file
///
/// CSV files need a header row; columns are matched by field name and
/// unknown columns are ignored.
pub fn load_corrections(path: impl AsRef<Path>) -> Result<Vec<Correction>> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    let corrections = match extension.as_str() {
        "json" => serde_json::from_str(&content)?,
        "jsonl" => content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(serde_json::from_str)
            .collect::<std::result::Result<Vec<Correction>, _>>()?,
        "yaml" | "yml" => serde_yaml::from_str(&content)?,
        "csv" => csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes())
            .deserialize()
            .collect::<std::result::Result<Vec<Correction>, _>>()
            .map_err(|e| {
                Error::config(format!("malformed corrections table {}: {}", path.display(), e))
            })?,
        other => {
            return Err(Error::config(format!(
                "unsupported corrections format '{}' for {}: use json, jsonl, yaml or csv",
                other,
                path.display()
            )))
        }
    };
    Ok(corrections)
}

/// Turn reviewer disagreements into rule strings
///
/// Output is deterministic: the same corrections always produce the same
/// rules, so re-submitting a file adds nothing new.
pub fn derive_rules(corrections: &[Correction]) -> RuleSet {
    let mut rules = RuleSet::new();

    for correction in corrections {
        if correction.is_sentinel() {
            debug!(q_no = %correction.q_no, "Skipping correction of a failed verdict");
            continue;
        }
        let change = correction.change_phrase();

        if let Some(human) = non_blank(&correction.human_description) {
            if !same(human, &correction.agent_description) {
                rules.insert(Rule::new(format!(
                    "In {}, when {}, describe it as \"{}\" rather than \"{}\".",
                    correction.q_no,
                    change,
                    human,
                    correction.agent_description.trim()
                )));
            }
        }

        if let Some(human) = non_blank(&correction.human_classification) {
            let agent = non_blank(&correction.agent_classification);
            if agent.map_or(true, |agent| !same(human, agent)) {
                let rule = match agent {
                    Some(agent) => format!(
                        "When {}, classify the change as {} rather than {}.",
                        change, human, agent
                    ),
                    None => format!("When {}, classify the change as {}.", change, human),
                };
                rules.insert(Rule::new(rule));
            }
        }

        if let Some(human) = non_blank(&correction.human_q_no) {
            let agent = non_blank(&correction.agent_q_no).unwrap_or(correction.q_no.as_str());
            if !same(human, agent) {
                rules.insert(Rule::new(format!(
                    "When {}, the change belongs to section {}, not {}.",
                    change, human, agent
                )));
            }
        }
    }

    rules
}

/// Outcome of a training pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TrainingOutcome {
    /// Rules derived from the corrections
    pub derived: RuleSet,

    /// Derived rules that were new to the store
    pub added: usize,

    /// Rules stored after the merge
    pub total: usize,
}

/// Feeds corrections into a rule store
pub struct Trainer {
    store: Arc<RuleStore>,
}

impl Trainer {
    /// Create a trainer over `store`
    pub fn new(store: Arc<RuleStore>) -> Self {
        Self { store }
    }

    /// Derive rules and merge them into the store
    pub async fn learn(&self, corrections: &[Correction]) -> Result<TrainingOutcome> {
        let derived = derive_rules(corrections);
        if derived.is_empty() {
            info!(corrections = corrections.len(), "No disagreements to learn from");
            return Ok(TrainingOutcome::default());
        }

        let merged = self.store.merge(&derived).await?;
        info!(
            corrections = corrections.len(),
            derived = derived.len(),
            added = merged.added,
            "Training complete"
        );
        Ok(TrainingOutcome {
            derived,
            added: merged.added,
            total: merged.rules.len(),
        })
    }
}

fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn same(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

fn snippet(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= SNIPPET_LEN {
        return text.to_string();
    }
    let cut: String = text.chars().take(SNIPPET_LEN).collect();
    format!("{}...", cut.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correction() -> Correction {
        Correction {
            q_no: "Q3".to_string(),
            old_text: Some("The fee is 200".to_string()),
            new_text: Some("The fee is 250".to_string()),
            agent_description: "Minor wording change".to_string(),
            agent_classification: Some("cosmetic".to_string()),
            agent_q_no: Some("Q3".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_agreement_derives_nothing() {
        let agreed = Correction {
            human_description: Some(" minor wording change ".to_string()),
            human_classification: Some("Cosmetic".to_string()),
            human_q_no: Some("Q3".to_string()),
            ..correction()
        };
        assert!(derive_rules(&[agreed, correction()]).is_empty());
    }

    #[test]
    fn test_each_disagreement_yields_a_rule() {
        let corrected = Correction {
            human_description: Some("Fee increased from 200 to 250".to_string()),
            human_classification: Some("numerical".to_string()),
            human_q_no: Some("Q4".to_string()),
            ..correction()
        };
        let rules = derive_rules(&[corrected]);
        assert_eq!(rules.len(), 3);
        assert!(rules.contains(&Rule::new(
            "When \"The fee is 200\" changes to \"The fee is 250\", classify the change as numerical rather than cosmetic."
        )));
        assert!(rules.iter().any(|r| r.as_str().contains("section Q4, not Q3")));
    }

    #[test]
    fn test_sentinel_rows_are_skipped() {
        let failed = Correction {
            agent_description: Verdict::ERROR_DESCRIPTION.to_string(),
            agent_q_no: Some(Verdict::ERROR_Q_NO.to_string()),
            human_description: Some("Fee increased".to_string()),
            ..correction()
        };
        assert!(derive_rules(&[failed]).is_empty());
    }

    #[test]
    fn test_long_text_is_truncated() {
        let long = "word ".repeat(40);
        let corrected = Correction {
            old_text: None,
            new_text: Some(long),
            human_classification: Some("structural".to_string()),
            ..correction()
        };
        let rules = derive_rules(&[corrected]);
        let rule = rules.iter().next().unwrap();
        assert!(rule.as_str().contains("...\" is inserted"));
        assert!(rule.as_str().len() < 150);
    }

    #[test]
    fn test_report_rows_parse_as_corrections() {
        let row = r#"{"run_id":"00000000-0000-0000-0000-000000000000","index":0,"q_no":"Q1","kind":"modified","similarity":0.9,"old_text":"a","new_text":"b","description":"Changed","refined_q_no":"Q1","classification":null,"error":null,"human_description":"Renamed"}"#;
        let correction: Correction = serde_json::from_str(row).unwrap();
        assert_eq!(correction.agent_description, "Changed");
        assert_eq!(correction.agent_q_no.as_deref(), Some("Q1"));
        assert_eq!(derive_rules(&[correction]).len(), 1);
    }
}
