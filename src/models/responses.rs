//! Response DTOs for the page resolver API
//!
//! Defines the structure of outgoing HTTP response bodies.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::kv::KvCounters;
use crate::pages::{Page, PageStats};

/// Public view of a page (GET /p/:short_id)
///
/// Carries what the rendering path needs; owner and status stay internal.
#[derive(Debug, Clone, Serialize)]
pub struct PublicPageResponse {
    pub page_id: Uuid,
    pub short_id: String,
    pub launch_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub settings: Value,
    pub customization: Value,
    pub content: Value,
}

impl From<Page> for PublicPageResponse {
    fn from(page: Page) -> Self {
        Self {
            page_id: page.id,
            short_id: page.short_id,
            launch_at: page.launch_at,
            expires_at: page.expires_at,
            settings: page.settings,
            customization: page.customization,
            content: page.content,
        }
    }
}

/// Response body for the stats endpoint (GET /pages/:page_id/stats)
#[derive(Debug, Clone, Serialize)]
pub struct StatsResponse {
    pub page_id: Uuid,
    pub views: u64,
    pub conversions: u64,
    /// Percentage of views that converted
    pub conversion_rate: f64,
}

impl StatsResponse {
    pub fn new(page_id: Uuid, stats: PageStats) -> Self {
        Self {
            page_id,
            views: stats.views,
            conversions: stats.conversions,
            conversion_rate: stats.conversion_rate,
        }
    }
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
    /// Durable store lookups currently in flight
    pub inflight_lookups: usize,
    /// Page cache counters, absent when the backend keeps none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache: Option<KvCounters>,
}

impl HealthResponse {
    /// Creates a new HealthResponse stamped at `now`
    pub fn healthy(
        now: DateTime<Utc>,
        inflight_lookups: usize,
        cache: Option<KvCounters>,
    ) -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: now.to_rfc3339(),
            inflight_lookups,
            cache,
        }
    }
}
