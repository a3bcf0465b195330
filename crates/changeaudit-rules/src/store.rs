//! Persistent rule memory
//!
//! Rules live in a single named column of a worksheet. Reads are lenient:
//! any failure falls back to the seed rules so an audit can always start.
//! Merges are strict: the stored set is only ever rewritten after a
//! successful read, which keeps it from shrinking.

use crate::config::RuleStoreConfig;
use crate::table::{build_table, TableBackend};
use changeaudit_core::{rule_set, Error, Result, RuleSet};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Result of a successful merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// Full set now stored
    pub rules: RuleSet,

    /// Rules that were not stored before
    pub added: usize,
}

/// Learned-rule store with a read-through cache
pub struct RuleStore {
    table: Arc<dyn TableBackend>,
    worksheet: String,
    column: String,
    seed: RuleSet,
    cache: RwLock<Option<RuleSet>>,
}

impl RuleStore {
    /// Create a store over `table`
    pub fn new(
        table: Arc<dyn TableBackend>,
        worksheet: impl Into<String>,
        column: impl Into<String>,
        seed: RuleSet,
    ) -> Self {
        Self {
            table,
            worksheet: worksheet.into(),
            column: column.into(),
            seed,
            cache: RwLock::new(None),
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &RuleStoreConfig) -> Result<Self> {
        let table = build_table(config)?;
        info!(
            backend = table.name(),
            worksheet = %config.worksheet,
            "Rule store ready"
        );
        Ok(Self::new(
            table,
            config.worksheet.clone(),
            config.column.clone(),
            config.seed(),
        ))
    }

    /// Seed rules returned when nothing can be read
    pub fn seed(&self) -> &RuleSet {
        &self.seed
    }

    /// Worksheet name
    pub fn worksheet(&self) -> &str {
        &self.worksheet
    }

    /// Current rules, or the seed set if the store cannot be read
    pub async fn load(&self) -> RuleSet {
        let cached = self.cache.read().clone();
        if let Some(rules) = cached {
            return rules;
        }

        match self.read_stored().await {
            Ok(Some(rules)) => {
                debug!(rules = rules.len(), worksheet = %self.worksheet, "Loaded rules");
                *self.cache.write() = Some(rules.clone());
                rules
            }
            Ok(None) => {
                warn!(worksheet = %self.worksheet, "Rule worksheet missing, using seed rules");
                metrics::counter!("changeaudit_rule_store_fallbacks_total").increment(1);
                self.seed.clone()
            }
            Err(err) => {
                warn!(
                    worksheet = %self.worksheet,
                    error = %err,
                    "Rule store unavailable, using seed rules"
                );
                metrics::counter!("changeaudit_rule_store_fallbacks_total").increment(1);
                self.seed.clone()
            }
        }
    }

    /// Union `new_rules` into the stored set and persist it
    ///
    /// Fails with [`Error::StoreUnavailable`] if the current set cannot be
    /// read (nothing is written) or the table rejects the write.
    ///
    /// There is no cross-process lock: when two processes merge at the same
    /// time the last write wins.
    pub async fn merge(&self, new_rules: &RuleSet) -> Result<MergeOutcome> {
        let current = match self.read_stored().await? {
            Some(rules) => rules,
            None => self.seed.clone(),
        };

        let merged: RuleSet = current.union(new_rules).cloned().collect();
        let added = merged.len() - current.len();

        let mut rows = Vec::with_capacity(merged.len() + 1);
        rows.push(self.column.clone());
        rows.extend(merged.iter().map(|rule| rule.as_str().to_string()));

        self.table.write(&self.worksheet, &rows).await?;
        self.invalidate();

        info!(
            worksheet = %self.worksheet,
            added,
            total = merged.len(),
            "Merged rules into store"
        );
        Ok(MergeOutcome {
            rules: merged,
            added,
        })
    }

    /// Drop the cached rule set so the next load reads the table
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }

    /// Read and parse the stored column; `None` if the worksheet is missing or empty
    async fn read_stored(&self) -> Result<Option<RuleSet>> {
        let rows = match self.table.read(&self.worksheet).await? {
            Some(rows) => rows,
            None => return Ok(None),
        };

        let mut rows = rows.into_iter();
        let header = match rows.next() {
            Some(header) => header,
            None => return Ok(None),
        };
        if header.trim() != self.column {
            return Err(Error::store_unavailable(format!(
                "worksheet '{}' has no '{}' column (found '{}')",
                self.worksheet,
                self.column,
                header.trim()
            )));
        }

        Ok(Some(rule_set(rows)))
    }
}
