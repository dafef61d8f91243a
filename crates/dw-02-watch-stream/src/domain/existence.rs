//! # Existence Filter Evaluation
//!
//! Decides whether a target's locally known documents still agree with the
//! server's digest of that target.
//!
//! ## Rules
//!
//! | Input | Verdict |
//! |-------|---------|
//! | No descriptor | `Skipped` |
//! | `count` equals local document count | `Consistent` |
//! | Descriptor invalid | `Mismatch`, bloom not applied |
//! | Otherwise | `Consistent` iff `local - removed == count` |
//!
//! An omitted `count` is zero on the wire.
//!
//! A local document is a removal candidate when the bloom filter proves it
//! absent from the server's set. Filters can only prove absence.

use std::collections::BTreeSet;

use dw_01_bloom_filter::{BloomFilter, BloomFilterDescriptor, BloomFilterError};

use super::value_objects::TargetId;

/// Result of one existence filter check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterVerdict {
    /// No descriptor was sent; nothing was checked.
    Skipped,
    /// Local and server views agree.
    Consistent,
    /// Local and server views diverged.
    Mismatch,
}

/// Full evaluation record for an existence filter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistenceFilterOutcome {
    /// Target the filter was sent for
    pub target_id: TargetId,
    /// Consistency verdict
    pub verdict: FilterVerdict,
    /// Document count the server reported
    pub expected_count: i32,
    /// Number of documents known locally for the target
    pub local_count: usize,
    /// Local documents the filter proves absent on the server
    pub removed_keys: BTreeSet<String>,
    /// Whether a bloom filter was built and queried
    pub bloom_applied: bool,
    /// Why the descriptor could not be turned into a filter
    pub bloom_error: Option<BloomFilterError>,
}

impl ExistenceFilterOutcome {
    fn new(target_id: TargetId, expected_count: i32, local_count: usize) -> Self {
        Self {
            target_id,
            verdict: FilterVerdict::Skipped,
            expected_count,
            local_count,
            removed_keys: BTreeSet::new(),
            bloom_applied: false,
            bloom_error: None,
        }
    }

    /// Whether the check found divergence.
    pub fn is_mismatch(&self) -> bool {
        self.verdict == FilterVerdict::Mismatch
    }

    /// Signal for the reconciliation collaborator, `None` when skipped.
    pub fn signal(&self) -> Option<ExistenceFilterSignal> {
        if self.verdict == FilterVerdict::Skipped {
            return None;
        }
        Some(ExistenceFilterSignal {
            target_id: self.target_id,
            mismatch: self.is_mismatch(),
            removed_keys: self.removed_keys.iter().cloned().collect(),
            bloom_applied: self.bloom_applied,
        })
    }
}

/// Existence filter result forwarded upward.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExistenceFilterSignal {
    /// Target the filter was evaluated for
    pub target_id: TargetId,
    /// Whether the views diverged
    pub mismatch: bool,
    /// Local documents the filter proves absent, sorted
    pub removed_keys: Vec<String>,
    /// Whether a bloom filter took part in the decision
    pub bloom_applied: bool,
}

/// Evaluate an existence filter against the documents known for its target.
pub fn evaluate_existence_filter(
    target_id: TargetId,
    expected_count: i32,
    descriptor: Option<&BloomFilterDescriptor>,
    local_names: &BTreeSet<String>,
) -> ExistenceFilterOutcome {
    let mut outcome = ExistenceFilterOutcome::new(target_id, expected_count, local_names.len());

    let Some(descriptor) = descriptor else {
        return outcome;
    };

    let expected = usize::try_from(expected_count).ok();
    if expected == Some(local_names.len()) {
        outcome.verdict = FilterVerdict::Consistent;
        return outcome;
    }

    let filter = match BloomFilter::try_from(descriptor) {
        Ok(filter) => filter,
        Err(err) => {
            outcome.verdict = FilterVerdict::Mismatch;
            outcome.bloom_error = Some(err);
            return outcome;
        }
    };

    outcome.bloom_applied = true;
    outcome.removed_keys = local_names
        .iter()
        .filter(|name| !filter.might_contain(name))
        .cloned()
        .collect();

    let remaining = local_names.len() - outcome.removed_keys.len();
    let consistent = expected == Some(remaining);
    outcome.verdict = if consistent {
        FilterVerdict::Consistent
    } else {
        FilterVerdict::Mismatch
    };
    outcome
}
