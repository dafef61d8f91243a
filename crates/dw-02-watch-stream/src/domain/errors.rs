//! # Domain Errors
//!
//! Error taxonomy for the watch stream:
//!
//! | Kind | Type | Effect |
//! |------|------|--------|
//! | Protocol invariant violation | [`ProtocolError`] | Aborts the stream instance |
//! | Lifecycle misuse | [`LifecycleError`] | Rejected synchronously, no side effect |
//! | Transport failure | [`TransportError`] | Surfaced verbatim, never retried here |

use thiserror::Error;

use super::value_objects::TargetId;

/// A target state transition was attempted from a state that forbids it.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TargetStateError {
    /// ADD for a target the server already acknowledged.
    #[error("Target {target_id} is already added")]
    AlreadyAdded {
        /// Offending target
        target_id: TargetId,
    },

    /// Any event other than ADD for a target that is not added.
    #[error("Target {target_id} is not added (event {event})")]
    NotAdded {
        /// Offending target
        target_id: TargetId,
        /// Event that required the target to be added
        event: &'static str,
    },

    /// NO_CHANGE before the target reached a consistent snapshot.
    #[error("Target {target_id} is not current")]
    NotCurrent {
        /// Offending target
        target_id: TargetId,
    },
}

/// The server sent something inconsistent with the tracked client state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A target transition guard failed.
    #[error("Invalid target transition: {0}")]
    InvalidTransition(#[from] TargetStateError),

    /// A target change named a target this stream never registered.
    #[error("Unknown target in target change: {target_id}")]
    UnknownTarget {
        /// Unregistered target
        target_id: TargetId,
    },

    /// A target change carried an unrecognized change type tag.
    #[error("Unknown target change type: {0}")]
    UnknownChangeType(String),
}

/// The caller used the stream outside its contract.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// `open()` called a second time.
    #[error("Stream already opened")]
    AlreadyOpen,

    /// Operation requires an open stream.
    #[error("Stream is not open")]
    NotOpen,

    /// Operation attempted after `close()`.
    #[error("Stream is closed")]
    Closed,

    /// `add_target` with an identifier already registered.
    #[error("Duplicate target: {target_id}")]
    DuplicateTarget {
        /// Already registered target
        target_id: TargetId,
    },

    /// `remove_target` with an identifier that is not registered.
    #[error("Target not registered: {target_id}")]
    UnknownTarget {
        /// Unregistered target
        target_id: TargetId,
    },

    /// The stream hit a fatal protocol error and must be rebuilt.
    #[error("Stream aborted: {0}")]
    Aborted(String),
}

/// Failure reported by the transport collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransportError {
    /// The connection could not be established.
    #[error("Transport unavailable: {0}")]
    Unavailable(String),

    /// The remote end closed the stream with an error status.
    #[error("Stream error [{code}]: {message}")]
    Status {
        /// Status code
        code: i32,
        /// Status message
        message: String,
    },

    /// A message could not be framed for the wire.
    #[error("Frame encoding failed: {0}")]
    Framing(String),

    /// The stream closed cleanly before it finished opening.
    #[error("Stream closed before it opened")]
    ClosedBeforeOpen,

    /// The transport dropped a pending completion without resolving it.
    #[error("Transport dropped the stream")]
    Dropped,
}

/// Umbrella error returned by every watch stream operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WatchError {
    /// Protocol invariant violation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Lifecycle misuse.
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Transport failure.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<TargetStateError> for WatchError {
    fn from(err: TargetStateError) -> Self {
        WatchError::Protocol(ProtocolError::InvalidTransition(err))
    }
}

impl WatchError {
    /// Whether this error aborts the stream instance.
    pub fn is_fatal(&self) -> bool {
        matches!(self, WatchError::Protocol(_) | WatchError::Transport(_))
    }
}
