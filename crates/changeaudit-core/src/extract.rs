//! Segment extraction
//!
//! Turns a [`Document`] into labeled [`Segment`]s. A short line containing a
//! digit (e.g. `Q12.` or `3b)`) is treated as a section header: it becomes the
//! label for the paragraphs that follow it.

use crate::document::Document;
use crate::types::{Segment, DEFAULT_LABEL};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Extraction settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractorConfig {
    /// Lines shorter than this (in characters) that contain a digit are headers
    #[serde(default = "default_header_max_len")]
    pub header_max_len: usize,

    /// Label used before the first header
    #[serde(default = "default_label")]
    pub default_label: String,

    /// Also emit header lines as content segments
    #[serde(default = "default_true")]
    pub emit_header_segments: bool,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            header_max_len: default_header_max_len(),
            default_label: default_label(),
            emit_header_segments: true,
        }
    }
}

fn default_header_max_len() -> usize {
    40
}

fn default_label() -> String {
    DEFAULT_LABEL.to_string()
}

fn default_true() -> bool {
    true
}

/// Extracts labeled segments from documents
#[derive(Debug, Clone, Default)]
pub struct DocumentExtractor {
    config: ExtractorConfig,
}

impl DocumentExtractor {
    /// Create an extractor with the given settings
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Settings in use
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Whether a (trimmed) line looks like a section header
    pub fn is_header(&self, text: &str) -> bool {
        text.chars().count() < self.config.header_max_len
            && text.chars().any(|c| c.is_ascii_digit())
    }

    /// Extract segments in document order, skipping blank blocks
    pub fn extract(&self, document: &Document) -> Vec<Segment> {
        let mut current_label = self.config.default_label.clone();
        let mut segments = Vec::with_capacity(document.len());

        for block in document.blocks() {
            let text = block.trim();
            if text.is_empty() {
                continue;
            }

            if self.is_header(text) {
                current_label = text.to_string();
                if !self.config.emit_header_segments {
                    continue;
                }
            }

            segments.push(Segment::new(current_label.as_str(), text, segments.len()));
        }

        debug!(
            blocks = document.len(),
            segments = segments.len(),
            "Extracted document segments"
        );
        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn survey() -> Document {
        Document::from_blocks([
            "Welcome to the survey",
            "",
            "Q1.",
            "How many people live here?",
            "   ",
            "Q2.",
            "What is your monthly rent?",
        ])
    }

    #[test]
    fn test_labels_follow_headers() {
        let segments = DocumentExtractor::default().extract(&survey());
        let labels: Vec<_> = segments.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(labels, ["General", "Q1.", "Q1.", "Q2.", "Q2."]);
        assert_eq!(segments[2].text, "How many people live here?");
    }

    #[test]
    fn test_header_lines_are_also_segments() {
        let segments = DocumentExtractor::default().extract(&survey());
        assert_eq!(segments[1].text, "Q1.");
        assert_eq!(segments[1].id, "Q1.");
    }

    #[test]
    fn test_headers_can_be_suppressed() {
        let extractor = DocumentExtractor::new(ExtractorConfig {
            emit_header_segments: false,
            ..Default::default()
        });
        let segments = extractor.extract(&survey());
        let texts: Vec<_> = segments.iter().map(|s| s.text.as_str()).collect();
        assert_eq!(
            texts,
            [
                "Welcome to the survey",
                "How many people live here?",
                "What is your monthly rent?"
            ]
        );
        assert_eq!(segments[1].id, "Q1.");
        assert_eq!(segments[2].order, 2);
    }

    #[test]
    fn test_long_numeric_line_is_content() {
        let extractor = DocumentExtractor::default();
        let long = "In 2023 the household income threshold was raised considerably";
        assert!(!extractor.is_header(long));
        assert!(extractor.is_header("Section 4"));
        assert!(!extractor.is_header("Section four"));
    }

    #[test]
    fn test_header_length_counts_characters() {
        let extractor = DocumentExtractor::default();
        // 39 characters, several of them multi-byte
        let text = format!("Frage 1 {}", "ä".repeat(31));
        assert_eq!(text.chars().count(), 39);
        assert!(extractor.is_header(&text));
    }

    proptest! {
        #[test]
        fn prop_one_segment_per_non_blank_block(blocks in proptest::collection::vec("[ a-z0-9]{0,60}", 0..40)) {
            let doc = Document::from_blocks(blocks.clone());
            let segments = DocumentExtractor::default().extract(&doc);

            let expected: Vec<String> = blocks
                .iter()
                .map(|b| b.trim().to_string())
                .filter(|b| !b.is_empty())
                .collect();
            let texts: Vec<String> = segments.iter().map(|s| s.text.clone()).collect();
            prop_assert_eq!(texts, expected);

            for (i, segment) in segments.iter().enumerate() {
                prop_assert_eq!(segment.order, i);
            }
        }
    }
}
