//! In-memory table with failure injection

use super::TableBackend;
use async_trait::async_trait;
use changeaudit_core::{Error, Result};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Table held in process memory
#[derive(Debug, Default)]
pub struct MemoryTable {
    sheets: RwLock<HashMap<String, Vec<String>>>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    reads: AtomicU32,
    writes: AtomicU32,
}

impl MemoryTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a table with one pre-filled worksheet
    pub fn with_worksheet<I, S>(worksheet: &str, rows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let table = Self::new();
        table
            .sheets
            .write()
            .insert(worksheet.to_string(), rows.into_iter().map(Into::into).collect());
        table
    }

    /// Make subsequent reads fail
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent writes fail
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of read calls so far
    pub fn read_count(&self) -> u32 {
        self.reads.load(Ordering::SeqCst)
    }

    /// Number of successful writes so far
    pub fn write_count(&self) -> u32 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Current rows of a worksheet
    pub fn rows(&self, worksheet: &str) -> Option<Vec<String>> {
        self.sheets.read().get(worksheet).cloned()
    }
}

#[async_trait]
impl TableBackend for MemoryTable {
    async fn read(&self, worksheet: &str) -> Result<Option<Vec<String>>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Error::store_unavailable("memory table read failure"));
        }
        Ok(self.rows(worksheet))
    }

    async fn write(&self, worksheet: &str, rows: &[String]) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store_unavailable("memory table write failure"));
        }
        self.sheets
            .write()
            .insert(worksheet.to_string(), rows.to_vec());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn name(&self) -> &str {
        "memory"
    }
}
