//! Prompt construction for change classification

use crate::backend::GenerationRequest;
use changeaudit_core::{AlignedPair, RuleSet};
use std::fmt::Write;

/// Fixed task instruction sent with every request
pub const SYSTEM_INSTRUCTION: &str = "You are an auditor comparing two revisions of a survey questionnaire. \
For each change you are given the section label (q_no), the kind of change, and the old and new text. \
Describe the change in one or two plain sentences, state the section label the change really belongs to, \
and classify it as one of: wording, numerical, structural, new_question, removed_question, cosmetic. \
Follow the learned rules when they apply. \
Answer with a single JSON object and nothing else: \
{\"description\": string, \"refined_q_no\": string, \"classification\": string}";

const ABSENT: &str = "(absent)";

/// Build the request for one aligned pair
pub fn build_request(pair: &AlignedPair, rules: &RuleSet) -> GenerationRequest {
    GenerationRequest::new(SYSTEM_INSTRUCTION, build_prompt(pair, rules))
}

/// Per-pair prompt: learned rules, then the pair itself
pub fn build_prompt(pair: &AlignedPair, rules: &RuleSet) -> String {
    let mut prompt = String::new();

    if !rules.is_empty() {
        prompt.push_str("Learned rules:\n");
        for rule in rules {
            let _ = writeln!(prompt, "- {}", rule);
        }
        prompt.push('\n');
    }

    let _ = writeln!(prompt, "q_no: {}", pair.id());
    let _ = writeln!(prompt, "change: {}", pair.kind);
    if let Some(similarity) = pair.similarity {
        let _ = writeln!(prompt, "similarity: {:.3}", similarity);
    }
    let _ = writeln!(prompt, "old text: {}", pair.old_text().unwrap_or(ABSENT));
    let _ = write!(prompt, "new text: {}", pair.new_text().unwrap_or(ABSENT));

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use changeaudit_core::{rule_set, PairKind, Segment};

    #[test]
    fn test_prompt_contains_rules_and_texts() {
        let pair = AlignedPair::both(
            Segment::new("Q4", "limit is 5", 3),
            Segment::new("Q4", "limit is 50", 3),
            0.952,
            PairKind::Modified,
        );
        let rules = rule_set(["Treat currency symbol changes as cosmetic.", "Ignore trailing spaces."]);

        let prompt = build_prompt(&pair, &rules);
        assert!(prompt.starts_with("Learned rules:\n- Ignore trailing spaces.\n- Treat currency"));
        assert!(prompt.contains("q_no: Q4"));
        assert!(prompt.contains("change: modified"));
        assert!(prompt.contains("similarity: 0.952"));
        assert!(prompt.contains("old text: limit is 5\n"));
        assert!(prompt.ends_with("new text: limit is 50"));
    }

    #[test]
    fn test_missing_side_is_marked_absent() {
        let pair = AlignedPair::inserted(Segment::new("Q9", "Do you cycle to work?", 7));
        let prompt = build_prompt(&pair, &RuleSet::new());
        assert!(!prompt.contains("Learned rules"));
        assert!(prompt.contains("old text: (absent)"));
        assert!(!prompt.contains("similarity"));
    }

    #[test]
    fn test_request_carries_system_instruction() {
        let pair = AlignedPair::deleted(Segment::new("Q1", "gone", 0));
        let request = build_request(&pair, &RuleSet::new());
        assert_eq!(request.system, SYSTEM_INSTRUCTION);
        assert!(request.prompt.contains("change: deleted"));
    }
}
