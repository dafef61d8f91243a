//! # Messages Module
//!
//! Listen protocol frames as typed sum types, plus their JSON codec.

pub mod codec;
pub mod requests;
pub mod responses;

pub use codec::*;
pub use requests::*;
pub use responses::*;
