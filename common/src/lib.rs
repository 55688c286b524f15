//! Shared domain types for `gscn`: address prefixes, interface snapshots,
//! probe targets, discovered hosts and the error taxonomy.

pub mod config;
pub mod error;
pub mod network;
