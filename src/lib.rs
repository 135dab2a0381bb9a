//! Page Resolver - public page resolution with scheduled expiration
//!
//! Resolves short ids to pages through a single-flight read-through cache and
//! expires published content on a schedule.

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod expiration;
pub mod kv;
pub mod models;
pub mod pages;
pub mod store;
pub mod tasks;

pub use api::AppState;
pub use config::Config;
pub use tasks::{spawn_kv_purge_task, spawn_sweep_task};
