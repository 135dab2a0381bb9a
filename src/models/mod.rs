//! Response models for the page resolver API
//!
//! DTOs serialized into HTTP response bodies. Request bodies reuse the
//! expiration setting input types directly.

pub mod responses;

pub use responses::{HealthResponse, PublicPageResponse, StatsResponse};
