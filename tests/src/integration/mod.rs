//! # Integration Flows
//!
//! - `golden_bloom`: bit-exact membership against server-produced filters
//! - `watch_flows`: stream lifecycle and target dispatch over the in-memory transport
//! - `existence_filter_flows`: documents, existence filters and mismatch signals end to end

pub mod existence_filter_flows;
pub mod golden_bloom;
pub mod watch_flows;
