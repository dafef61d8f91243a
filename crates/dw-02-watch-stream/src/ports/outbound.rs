//! # Outbound Ports
//!
//! Collaborators the watch stream consumes: the transport, the document
//! cache and the existence filter reconciliation listener.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use crate::domain::{DatabaseInfo, ExistenceFilterSignal, TargetId, TransportError};
use crate::messages::{DocumentChange, DocumentDelete, DocumentRemove, ListenRequest, ListenResponse};

/// Fired once when the channel is ready.
pub type OpenCallback = Box<dyn FnOnce() + Send>;

/// Fired once when the channel ends, with the error if it failed.
pub type CloseCallback = Box<dyn FnOnce(Option<TransportError>) + Send>;

/// Fired for every inbound frame, in arrival order.
pub type MessageCallback = Box<dyn FnMut(ListenResponse) + Send>;

/// Builds connections for a database.
#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    /// Connect to the backend described by `info`.
    async fn connect(&self, info: &DatabaseInfo) -> Result<Arc<dyn Connection>, TransportError>;
}

/// A connection able to open duplex streams.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Open a stream for the named operation.
    async fn open_stream(&self, operation: &str) -> Result<Box<dyn StreamHandle>, TransportError>;
}

/// One duplex message channel.
///
/// Callbacks must be registered before the transport reports open. `close()`
/// must eventually fire the close callback.
pub trait StreamHandle: Send + Sync {
    /// Register the open callback.
    fn on_open(&mut self, callback: OpenCallback);

    /// Register the close callback.
    fn on_close(&mut self, callback: CloseCallback);

    /// Register the message callback.
    fn on_message(&mut self, callback: MessageCallback);

    /// Frame and send a request.
    fn send(&mut self, request: &ListenRequest) -> Result<(), TransportError>;

    /// Ask the transport to close the channel.
    fn close(&mut self);
}

/// Receives document events routed by the stream.
pub trait DocumentCache: Send + Sync {
    /// A document was added or updated.
    fn on_document_change(&self, change: &DocumentChange);

    /// A document was deleted.
    fn on_document_delete(&self, delete: &DocumentDelete);

    /// A document stopped matching some targets.
    fn on_document_remove(&self, remove: &DocumentRemove);

    /// Names of the documents currently known to match `target_id`.
    fn target_document_names(&self, target_id: TargetId) -> BTreeSet<String>;
}

/// Receives existence filter results.
pub trait ExistenceFilterListener: Send + Sync {
    /// An existence filter was evaluated.
    fn on_existence_filter(&self, signal: ExistenceFilterSignal);
}

/// Listener that discards every signal.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopFilterListener;

impl ExistenceFilterListener for NoopFilterListener {
    fn on_existence_filter(&self, _signal: ExistenceFilterSignal) {}
}
