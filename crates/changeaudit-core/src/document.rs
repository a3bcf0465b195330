//! Parsed documents
//!
//! A [`Document`] is the ordered list of paragraph-like text blocks of an
//! uploaded revision. Office Open XML (`.docx`) bodies are read with
//! `docx-rs`; plain text files yield one block per line.

use crate::error::{Error, Result};
use docx_rs::{read_docx, DocumentChild, ParagraphChild, RunChild};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Supported input formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    /// Office Open XML word-processing document
    Docx,
    /// UTF-8 text, one paragraph per line
    PlainText,
}

impl DocumentFormat {
    /// Pick a format from a file extension
    pub fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        ext.parse()
    }
}

impl FromStr for DocumentFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "docx" => Ok(Self::Docx),
            "txt" | "text" | "md" => Ok(Self::PlainText),
            other => Err(Error::extraction(format!(
                "unsupported document format: '{}'",
                other
            ))),
        }
    }
}

/// A parsed document exposing its paragraphs in source order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    blocks: Vec<String>,
}

impl Document {
    /// Build a document directly from paragraph texts
    pub fn from_blocks<I, S>(blocks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            blocks: blocks.into_iter().map(Into::into).collect(),
        }
    }

    /// Parse raw bytes in the given format
    pub fn parse(bytes: &[u8], format: DocumentFormat) -> Result<Self> {
        match format {
            DocumentFormat::Docx => Self::parse_docx(bytes),
            DocumentFormat::PlainText => Self::parse_text(bytes),
        }
    }

    /// Read and parse a file, choosing the format by extension
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let format = DocumentFormat::from_path(path)?;
        let bytes = std::fs::read(path).map_err(|e| {
            Error::extraction(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&bytes, format)
    }

    /// Paragraph blocks in source order, including blank ones
    pub fn blocks(&self) -> &[String] {
        &self.blocks
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the document has no blocks at all
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    fn parse_docx(bytes: &[u8]) -> Result<Self> {
        let docx = read_docx(bytes)
            .map_err(|e| Error::extraction(format!("not a readable docx document: {}", e)))?;

        let blocks = docx
            .document
            .children
            .iter()
            .filter_map(|child| match child {
                DocumentChild::Paragraph(para) => Some(
                    para.children
                        .iter()
                        .filter_map(|pc| match pc {
                            ParagraphChild::Run(run) => Some(
                                run.children
                                    .iter()
                                    .filter_map(|rc| match rc {
                                        RunChild::Text(t) => Some(t.text.as_str()),
                                        _ => None,
                                    })
                                    .collect::<String>(),
                            ),
                            _ => None,
                        })
                        .collect::<String>(),
                ),
                // Tables and section properties are not body paragraphs
                _ => None,
            })
            .collect();

        Ok(Self { blocks })
    }

    fn parse_text(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::extraction(format!("document is not valid UTF-8: {}", e)))?;
        Ok(Self::from_blocks(text.lines()))
    }
}
