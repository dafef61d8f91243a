//! What a dispatched frame did.

use crate::domain::{DocumentEventKind, ExistenceFilterOutcome, TargetChangeType, TargetId};
use crate::messages::Status;

/// Result of dispatching one inbound frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A target change was applied to these targets, in id order for broadcasts.
    TargetsChanged {
        /// Applied change
        change: TargetChangeType,
        /// Targets transitioned
        target_ids: Vec<TargetId>,
        /// Removal cause sent by the server
        cause: Option<Status>,
    },
    /// A document event was routed to the cache.
    DocumentForwarded {
        /// Event kind
        kind: DocumentEventKind,
        /// Document name
        name: String,
    },
    /// An existence filter was evaluated for a registered target.
    ExistenceFilterEvaluated(ExistenceFilterOutcome),
    /// An existence filter named a target this stream does not track.
    ExistenceFilterIgnored {
        /// Unregistered target
        target_id: TargetId,
    },
}

impl DispatchOutcome {
    /// Whether the frame reported an existence filter mismatch.
    pub fn is_mismatch(&self) -> bool {
        matches!(self, DispatchOutcome::ExistenceFilterEvaluated(outcome) if outcome.is_mismatch())
    }
}
