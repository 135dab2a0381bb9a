//! API Module
//!
//! HTTP handlers and routing for the page resolver.
//!
//! # Endpoints
//! - `GET /p/:short_id` - Resolve a public page
//! - `POST /pages/:page_id/conversions` - Record a conversion
//! - `GET /pages/:page_id/stats` - Page engagement stats
//! - `DELETE /cache/:short_id` - Invalidate a cached page
//! - `/expiration-settings` - Expiration policy CRUD
//! - `POST /expirations/run` - Trigger an expiration sweep
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
