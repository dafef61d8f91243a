//! # Adapters
//!
//! In-memory implementations of the outbound ports.

pub mod document_cache;
pub mod filter_listener;
pub mod in_memory_transport;

pub use document_cache::InMemoryDocumentCache;
pub use filter_listener::ChannelFilterListener;
pub use in_memory_transport::{InMemoryConnection, InMemoryServer, InMemoryStreamHandle};
