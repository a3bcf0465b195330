//! ChangeAudit Rule Memory
//!
//! Persistent store for free-text classification rules learned from human
//! feedback, and the training pass that derives them.
//!
//! Rules are kept in one column of a named worksheet, backed by:
//! - a local directory of JSON documents
//! - a hosted spreadsheet
//! - process memory

pub mod config;
pub mod store;
pub mod table;
pub mod training;

pub use config::{RuleStoreConfig, TableKind, DEFAULT_SEED_RULE};
pub use store::{MergeOutcome, RuleStore};
pub use table::{build_table, FileTable, MemoryTable, SheetsTable, TableBackend};
pub use training::{derive_rules, load_corrections, Correction, Trainer, TrainingOutcome};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::config::RuleStoreConfig;
    pub use crate::store::RuleStore;
    pub use crate::table::TableBackend;
    pub use crate::training::{Correction, Trainer};
}
