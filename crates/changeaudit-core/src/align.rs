//! Change alignment between two document revisions
//!
//! Segments are grouped by section label. Within a group every old/new
//! combination is scored and the best-scoring pairs are taken greedily until
//! one side runs out; leftovers become deletions or insertions. Groups are
//! expected to be small (one survey question each), so the quadratic scoring
//! is fine.

use crate::types::{AlignedPair, PairKind, Segment};
use serde::{Deserialize, Serialize};
use similar::TextDiff;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Alignment settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlignerConfig {
    /// Pairs at or above this similarity count as unchanged
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

impl Default for AlignerConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
        }
    }
}

fn default_threshold() -> f32 {
    0.98
}

/// Character-level similarity ratio in [0, 1]
pub fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    TextDiff::from_chars(a, b).ratio()
}

/// Aligns old and new segment sequences
#[derive(Debug, Clone, Default)]
pub struct ChangeAligner {
    config: AlignerConfig,
}

struct Candidate {
    old: usize,
    new: usize,
    score: f32,
    delta: usize,
}

impl ChangeAligner {
    /// Create an aligner with the given settings
    pub fn new(config: AlignerConfig) -> Self {
        Self { config }
    }

    /// Similarity threshold in use
    pub fn threshold(&self) -> f32 {
        self.config.threshold
    }

    /// Align two segment sequences
    ///
    /// Every input segment ends up in exactly one returned pair.
    pub fn align(&self, old: &[Segment], new: &[Segment]) -> Vec<AlignedPair> {
        let mut group_order: Vec<&str> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        let mut groups: HashMap<&str, (Vec<&Segment>, Vec<&Segment>)> = HashMap::new();

        for segment in old {
            if seen.insert(segment.id.as_str()) {
                group_order.push(segment.id.as_str());
            }
            groups.entry(segment.id.as_str()).or_default().0.push(segment);
        }
        for segment in new {
            if seen.insert(segment.id.as_str()) {
                group_order.push(segment.id.as_str());
            }
            groups.entry(segment.id.as_str()).or_default().1.push(segment);
        }

        let mut pairs = Vec::with_capacity(old.len().max(new.len()));
        for id in group_order {
            if let Some((old_group, new_group)) = groups.remove(id) {
                pairs.extend(self.align_group(&old_group, &new_group));
            }
        }

        for pair in &pairs {
            metrics::counter!("changeaudit_pairs_total", "kind" => pair.kind.as_str())
                .increment(1);
        }

        debug!(
            old = old.len(),
            new = new.len(),
            pairs = pairs.len(),
            "Aligned segments"
        );
        pairs
    }

    fn align_group(&self, old: &[&Segment], new: &[&Segment]) -> Vec<AlignedPair> {
        let mut candidates = Vec::with_capacity(old.len() * new.len());
        for (oi, o) in old.iter().enumerate() {
            for (ni, n) in new.iter().enumerate() {
                candidates.push(Candidate {
                    old: oi,
                    new: ni,
                    score: similarity(&o.text, &n.text),
                    delta: o.order.abs_diff(n.order),
                });
            }
        }

        candidates.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.delta.cmp(&b.delta))
                .then(old[a.old].order.cmp(&old[b.old].order))
                .then(new[a.new].order.cmp(&new[b.new].order))
        });

        let mut old_used = vec![false; old.len()];
        let mut new_used = vec![false; new.len()];
        let mut pairs = Vec::with_capacity(old.len().max(new.len()));

        for candidate in candidates {
            if old_used[candidate.old] || new_used[candidate.new] {
                continue;
            }
            old_used[candidate.old] = true;
            new_used[candidate.new] = true;

            let kind = if candidate.score >= self.config.threshold {
                PairKind::Matched
            } else {
                PairKind::Modified
            };
            pairs.push(AlignedPair::both(
                old[candidate.old].clone(),
                new[candidate.new].clone(),
                candidate.score,
                kind,
            ));
        }

        pairs.extend(
            old.iter()
                .zip(&old_used)
                .filter(|(_, used)| !**used)
                .map(|(s, _)| AlignedPair::deleted((*s).clone())),
        );
        pairs.extend(
            new.iter()
                .zip(&new_used)
                .filter(|(_, used)| !**used)
                .map(|(s, _)| AlignedPair::inserted((*s).clone())),
        );

        pairs.sort_by(pair_position);
        pairs
    }
}

/// Pairs with an old side first (by old position), insertions after (by new position)
fn pair_position(a: &AlignedPair, b: &AlignedPair) -> Ordering {
    fn key(pair: &AlignedPair) -> (u8, usize) {
        match (&pair.old, &pair.new) {
            (Some(old), _) => (0, old.order),
            (None, Some(new)) => (1, new.order),
            (None, None) => (2, 0),
        }
    }
    key(a).cmp(&key(b))
}
