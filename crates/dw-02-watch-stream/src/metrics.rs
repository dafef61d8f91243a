//! Metrics for watch stream operations
//!
//! Lock-free counters updated on the dispatch path and read through
//! [`WatchMetrics::snapshot`].
//!
//! ## Usage
//!
//! ```ignore
//! let snapshot = stream.metrics();
//! println!("{} frames, {} mismatches", snapshot.messages_received, snapshot.filter_mismatches);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use crate::domain::{DocumentEventKind, FilterVerdict};

/// Counters for one watch stream.
#[derive(Debug, Default)]
pub struct WatchMetrics {
    /// Inbound frames dispatched
    pub messages_received: AtomicU64,
    /// Outbound frames sent
    pub requests_sent: AtomicU64,
    /// Target state transitions applied
    pub target_transitions: AtomicU64,
    /// Document changes forwarded to the cache
    pub documents_changed: AtomicU64,
    /// Document deletes and removes forwarded to the cache
    pub documents_removed: AtomicU64,
    /// Existence filters evaluated against a descriptor
    pub filter_checks: AtomicU64,
    /// Existence filters skipped or ignored
    pub filter_skips: AtomicU64,
    /// Existence filters that detected a mismatch
    pub filter_mismatches: AtomicU64,
    /// Protocol violations that aborted the stream
    pub protocol_errors: AtomicU64,
    /// Frames waiting in the inbound queue
    pub inbound_pending: AtomicU64,
}

impl WatchMetrics {
    /// Create a zeroed collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an outbound frame.
    pub fn record_request_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an inbound frame entering dispatch.
    pub fn record_message(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record `count` target transitions from one frame.
    pub fn record_transitions(&self, count: usize) {
        self.target_transitions
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Record a document event forwarded to the cache.
    pub fn record_document(&self, kind: DocumentEventKind) {
        let counter = match kind {
            DocumentEventKind::Change => &self.documents_changed,
            DocumentEventKind::Delete | DocumentEventKind::Remove => &self.documents_removed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Record the verdict of an existence filter.
    pub fn record_filter(&self, verdict: FilterVerdict) {
        match verdict {
            FilterVerdict::Skipped => {
                self.filter_skips.fetch_add(1, Ordering::Relaxed);
            }
            FilterVerdict::Consistent => {
                self.filter_checks.fetch_add(1, Ordering::Relaxed);
            }
            FilterVerdict::Mismatch => {
                self.filter_checks.fetch_add(1, Ordering::Relaxed);
                self.filter_mismatches.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Record a protocol violation.
    pub fn record_protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// A frame was queued; returns the new queue depth.
    pub fn frame_queued(&self) -> u64 {
        self.inbound_pending.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// A queued frame was taken for dispatch.
    pub fn frame_dequeued(&self) {
        let _ = self
            .inbound_pending
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            target_transitions: self.target_transitions.load(Ordering::Relaxed),
            documents_changed: self.documents_changed.load(Ordering::Relaxed),
            documents_removed: self.documents_removed.load(Ordering::Relaxed),
            filter_checks: self.filter_checks.load(Ordering::Relaxed),
            filter_skips: self.filter_skips.load(Ordering::Relaxed),
            filter_mismatches: self.filter_mismatches.load(Ordering::Relaxed),
            protocol_errors: self.protocol_errors.load(Ordering::Relaxed),
            inbound_pending: self.inbound_pending.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time metrics snapshot
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Inbound frames dispatched
    pub messages_received: u64,
    /// Outbound frames sent
    pub requests_sent: u64,
    /// Target state transitions applied
    pub target_transitions: u64,
    /// Document changes forwarded
    pub documents_changed: u64,
    /// Document deletes and removes forwarded
    pub documents_removed: u64,
    /// Existence filters evaluated
    pub filter_checks: u64,
    /// Existence filters skipped or ignored
    pub filter_skips: u64,
    /// Existence filter mismatches
    pub filter_mismatches: u64,
    /// Stream-aborting protocol violations
    pub protocol_errors: u64,
    /// Inbound queue depth
    pub inbound_pending: u64,
}
