//! File-backed table: one JSON document per worksheet

use super::TableBackend;
use async_trait::async_trait;
use changeaudit_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Stores each worksheet as `<dir>/<worksheet>.json`
#[derive(Debug, Clone)]
pub struct FileTable {
    dir: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct WorksheetFile {
    worksheet: String,
    rows: Vec<String>,
}

impl FileTable {
    /// Create a table rooted at `dir`; the directory is created on first write
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File holding a worksheet
    pub fn worksheet_path(&self, worksheet: &str) -> PathBuf {
        let name: String = worksheet
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

#[async_trait]
impl TableBackend for FileTable {
    async fn read(&self, worksheet: &str) -> Result<Option<Vec<String>>> {
        let path = self.worksheet_path(worksheet);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(Error::store_unavailable(format!(
                    "failed to read {}: {}",
                    path.display(),
                    e
                )))
            }
        };

        let file: WorksheetFile = serde_json::from_str(&content).map_err(|e| {
            Error::store_unavailable(format!("malformed worksheet {}: {}", path.display(), e))
        })?;
        Ok(Some(file.rows))
    }

    async fn write(&self, worksheet: &str, rows: &[String]) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir).await.map_err(|e| {
            Error::store_unavailable(format!("failed to create {}: {}", self.dir.display(), e))
        })?;

        let path = self.worksheet_path(worksheet);
        let tmp = path.with_extension("json.tmp");
        let body = serde_json::to_string_pretty(&WorksheetFile {
            worksheet: worksheet.to_string(),
            rows: rows.to_vec(),
        })?;

        tokio::fs::write(&tmp, body).await.map_err(|e| {
            Error::store_unavailable(format!("failed to write {}: {}", tmp.display(), e))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            Error::store_unavailable(format!("failed to replace {}: {}", path.display(), e))
        })?;

        debug!(path = %path.display(), rows = rows.len(), "Wrote worksheet");
        Ok(())
    }

    fn name(&self) -> &str {
        "file"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_worksheet_reads_none() {
        let dir = tempfile::tempdir().unwrap();
        let table = FileTable::new(dir.path());
        assert_eq!(table.read("Memory").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let table = FileTable::new(dir.path().join("nested"));

        let rows = vec!["Rules".to_string(), "Keep it short.".to_string()];
        table.write("Memory", &rows).await.unwrap();
        assert_eq!(table.read("Memory").await.unwrap(), Some(rows));
        assert!(!table.worksheet_path("Memory").with_extension("json.tmp").exists());
    }

    #[tokio::test]
    async fn test_malformed_file_is_store_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let table = FileTable::new(dir.path());
        std::fs::write(table.worksheet_path("Memory"), "not json").unwrap();

        let result = table.read("Memory").await;
        assert!(matches!(result, Err(Error::StoreUnavailable(_))));
    }

    #[test]
    fn test_worksheet_names_are_sanitized() {
        let table = FileTable::new("/data");
        assert_eq!(
            table.worksheet_path("Team Memory/2024"),
            PathBuf::from("/data/Team_Memory_2024.json")
        );
    }
}
