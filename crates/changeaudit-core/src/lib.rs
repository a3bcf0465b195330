//! ChangeAudit Core
//!
//! Core types, traits, and utilities shared across ChangeAudit components.
//!
//! This crate provides:
//! - The audit data model (segments, aligned pairs, rules, verdicts, reports)
//! - Error types and result handling
//! - Document parsing and labeled segment extraction
//! - Similarity-based alignment of two document revisions

pub mod align;
pub mod document;
pub mod error;
pub mod extract;
pub mod types;

pub use align::{similarity, AlignerConfig, ChangeAligner};
pub use document::{Document, DocumentFormat};
pub use error::{Error, Result};
pub use extract::{DocumentExtractor, ExtractorConfig};
pub use types::{
    rule_set, AlignedPair, AuditReport, PairKind, ReportEntry, ReportSummary, Rule, RuleSet,
    Segment, Verdict, DEFAULT_LABEL,
};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::align::ChangeAligner;
    pub use crate::document::Document;
    pub use crate::error::{Error, Result};
    pub use crate::extract::DocumentExtractor;
    pub use crate::types::{AlignedPair, AuditReport, PairKind, Rule, RuleSet, Segment, Verdict};
}
