//! # Domain Module
//!
//! Core domain types for the watch stream: target state machine, existence
//! filter evaluation, value objects and the error taxonomy.

pub mod errors;
pub mod existence;
pub mod target_state;
pub mod value_objects;

pub use errors::*;
pub use existence::*;
pub use target_state::*;
pub use value_objects::*;
