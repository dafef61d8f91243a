//! # DW-02 Watch Stream
//!
//! Realtime listen client: registers watch targets on a duplex channel and
//! turns server frames into per-target state transitions.
//!
//! **Subsystem ID:** 2
//! **Architecture:** Hexagonal (DDD + Ports/Adapters)
//!
//! ## Purpose
//!
//! - Track each target through `NotAdded -> Added -> Current` with strict guards
//! - Route document events to the cache collaborator
//! - Check existence filters against locally known documents and report
//!   mismatches upward
//!
//! ## Error Handling
//!
//! | Kind | Type | Effect |
//! |------|------|--------|
//! | Transition guard, unknown target, unknown change tag | `ProtocolError` | Stream aborted |
//! | Double open, use after close, duplicate target | `LifecycleError` | Rejected, no side effect |
//! | Channel failure | `TransportError` | Surfaced as reported, never retried |
//!
//! ## Module Structure
//!
//! ```text
//! dw-02-watch-stream/
//! ├── domain/          # TargetState, existence filter evaluation, errors
//! ├── messages/        # ListenRequest / ListenResponse + JSON codec
//! ├── ports/           # WatchStreamApi (inbound) + transport, cache, listener (outbound)
//! ├── application/     # WatchStream service, completion signals
//! ├── adapters/        # In-memory transport, cache, channel listener
//! ├── config.rs        # WatchStreamConfig
//! └── metrics.rs       # WatchMetrics
//! ```
//!
//! ## Configuration
//!
//! `WatchStreamConfig::from_env` reads `DW_PROJECT_ID`, `DW_DATABASE_ID` and
//! the other `DW_*` variables, falling back to defaults for anything unset.
//!
//! ```ignore
//! use dw_02_watch_stream::WatchStreamConfig;
//! use dw_telemetry::{init_telemetry, TelemetryConfig};
//!
//! init_telemetry(&TelemetryConfig::for_component(dw_02_watch_stream::SUBSYSTEM))?;
//! let config = WatchStreamConfig::from_env();
//! ```
//!
//! ## Usage Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use dw_02_watch_stream::*;
//!
//! let server = InMemoryServer::new();
//! let mut stream = WatchStream::new(
//!     WatchStreamConfig::new("demo-project"),
//!     Arc::new(server.clone()),
//!     Arc::new(InMemoryDocumentCache::new()),
//!     Arc::new(NoopFilterListener),
//! );
//! stream.open().await?;
//! stream.add_target(1, TargetSelector::field_equals("cities", "state", "CA"))?;
//! stream.run().await?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod messages;
pub mod metrics;
pub mod ports;

// Re-exports
pub use adapters::{
    ChannelFilterListener, InMemoryConnection, InMemoryDocumentCache, InMemoryServer,
    InMemoryStreamHandle,
};
pub use application::{Completion, DispatchOutcome, WatchStream};
pub use config::{WatchStreamConfig, DEFAULT_HOST};
pub use domain::{
    evaluate_existence_filter, DatabaseId, DatabaseInfo, DocumentEventKind,
    ExistenceFilterOutcome, ExistenceFilterSignal, FilterVerdict, LifecycleError, ProtocolError,
    ResumePoint, ResumeToken, StreamPhase, TargetChangeType, TargetId, TargetState,
    TargetStateError, TransportError, WatchError, DEFAULT_DATABASE, LISTEN_OPERATION,
};
pub use messages::{
    decode_request, decode_response, encode_request, encode_response, Document,
    DocumentChange, DocumentDelete, DocumentRemove, ExistenceFilter, FieldOperator,
    ListenRequest, ListenResponse, Status, TargetChange, TargetSelector, Value,
};
pub use metrics::{MetricsSnapshot, WatchMetrics};
pub use ports::{
    CloseCallback, Connection, ConnectionFactory, DocumentCache, ExistenceFilterListener,
    MessageCallback, NoopFilterListener, OpenCallback, StreamHandle, WatchStreamApi,
};

/// Subsystem tag carried on every log line of this crate
pub const SUBSYSTEM: &str = "watch-stream";

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
