//! Background Tasks Module
//!
//! Periodic work running alongside the HTTP server.
//!
//! # Tasks
//! - Expiration sweep: applies lapsed expiration policies
//! - KV purge: drops lapsed entries from the in-memory cache

mod sweep;

pub use sweep::{spawn_kv_purge_task, spawn_sweep_task};
