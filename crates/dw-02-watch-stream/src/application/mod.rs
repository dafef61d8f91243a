//! # Application Layer
//!
//! The watch stream service and the completion signals it waits on.

pub mod completion;
pub mod outcome;
pub mod service;

pub use completion::Completion;
pub use outcome::DispatchOutcome;
pub use service::WatchStream;
