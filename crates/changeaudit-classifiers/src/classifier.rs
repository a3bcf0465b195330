//! Change classifier trait

use async_trait::async_trait;
use changeaudit_core::{AlignedPair, RuleSet, Verdict};

/// Trait for everything that can judge one aligned pair
///
/// Implementations never fail: unrecoverable problems are reported as a
/// sentinel [`Verdict`] so a single pair cannot abort an audit run.
#[async_trait]
pub trait ChangeClassifier: Send + Sync {
    /// Describe and classify the change in `pair`, guided by `rules`
    async fn classify(&self, pair: &AlignedPair, rules: &RuleSet) -> Verdict;

    /// Get the classifier name
    fn name(&self) -> &str;
}
