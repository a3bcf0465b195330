//! Single-column tables backing the rule store
//!
//! A table is addressed by worksheet name and holds one column of strings,
//! header included. Reads return the whole column; writes replace it.

mod file;
mod memory;
mod sheets;

pub use file::FileTable;
pub use memory::MemoryTable;
pub use sheets::SheetsTable;

use crate::config::{RuleStoreConfig, TableKind};
use async_trait::async_trait;
use changeaudit_core::Result;
use std::sync::Arc;

/// Trait for tabular rule storage
#[async_trait]
pub trait TableBackend: Send + Sync {
    /// Read every cell of the worksheet's column, or `None` if the worksheet does not exist
    async fn read(&self, worksheet: &str) -> Result<Option<Vec<String>>>;

    /// Replace the worksheet's column with `rows`
    async fn write(&self, worksheet: &str, rows: &[String]) -> Result<()>;

    /// Backend name for logs
    fn name(&self) -> &str;
}

/// Create the table selected by the configuration
pub fn build_table(config: &RuleStoreConfig) -> Result<Arc<dyn TableBackend>> {
    config.validate()?;

    let table: Arc<dyn TableBackend> = match config.backend {
        TableKind::File => Arc::new(FileTable::new(config.directory()?)),
        TableKind::Sheets => Arc::new(SheetsTable::from_config(config)?),
        TableKind::Memory => Arc::new(MemoryTable::new()),
    };
    Ok(table)
}
