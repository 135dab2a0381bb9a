//! Page Model
//!
//! The page records this subsystem reads and mutates. Only the fields the
//! resolver and the expiration sweep inspect are typed; settings,
//! customization and content are owned elsewhere and passed through as JSON.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// == Page Status ==
/// Lifecycle status recorded on a page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageStatus {
    #[default]
    Active,
    /// Set by the expiration sweep. Never reverted here.
    Expired,
}

// == Page ==
/// A publicly addressable page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// Internal, stable identifier
    pub id: Uuid,
    /// Public identifier used in URLs and cache keys; unique and immutable
    pub short_id: String,
    pub owner_id: Uuid,
    pub active: bool,
    #[serde(default)]
    pub status: PageStatus,
    #[serde(default)]
    pub launch_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// Target for visitors once the page expired through a redirect policy
    #[serde(default)]
    pub redirect_url: Option<String>,
    #[serde(default)]
    pub settings: Value,
    #[serde(default)]
    pub customization: Value,
    #[serde(default)]
    pub content: Value,
    pub updated_at: DateTime<Utc>,
}

impl Page {
    /// Creates an active page with empty payloads.
    pub fn new(short_id: impl Into<String>, owner_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            short_id: short_id.into(),
            owner_id,
            active: true,
            status: PageStatus::Active,
            launch_at: None,
            expires_at: None,
            redirect_url: None,
            settings: Value::Null,
            customization: Value::Null,
            content: Value::Null,
            updated_at: now,
        }
    }

    pub fn is_expired_status(&self) -> bool {
        self.status == PageStatus::Expired
    }
}

// == Page Version ==
/// A saved revision of a page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageVersion {
    pub id: Uuid,
    pub page_id: Uuid,
    pub is_published: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    /// May point at a deleted setting; treated as no expiration then.
    #[serde(default)]
    pub expiration_setting_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl PageVersion {
    /// Creates an unpublished draft of `page_id`.
    pub fn draft(page_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            page_id,
            is_published: false,
            published_at: None,
            expiration_setting_id: None,
            created_at: now,
        }
    }

    /// Creates a version published at `published_at`.
    pub fn published(page_id: Uuid, published_at: DateTime<Utc>) -> Self {
        Self {
            is_published: true,
            published_at: Some(published_at),
            ..Self::draft(page_id, published_at)
        }
    }
}

// == Page Stats ==
/// Best-effort engagement counters for one page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageStats {
    pub views: u64,
    pub conversions: u64,
    /// `conversions / views * 100`, or 0 without views
    pub conversion_rate: f64,
}

impl PageStats {
    /// Recomputes `conversion_rate` from the counters.
    pub fn recompute_rate(&mut self) {
        self.conversion_rate = if self.views == 0 {
            0.0
        } else {
            self.conversions as f64 / self.views as f64 * 100.0
        };
    }

    pub fn record_view(&mut self) {
        self.views += 1;
        self.recompute_rate();
    }

    pub fn record_conversion(&mut self) {
        self.conversions += 1;
        self.recompute_rate();
    }
}
