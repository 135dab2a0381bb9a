//! Durable Store Module
//!
//! The authoritative record of pages, versions and expiration settings.
//! Calls are individually atomic; nothing here spans a transaction across
//! calls.

mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::expiration::ExpirationSetting;
use crate::pages::{Page, PageVersion};

pub use memory::{MemoryStore, StoreFixture};

// == Store Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint would be violated
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Backend failure; the call may succeed when retried
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

// == Durable Store Trait ==
#[async_trait]
pub trait DurableStore: Send + Sync {
    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, StoreError>;

    async fn page_by_short_id(&self, short_id: &str) -> Result<Option<Page>, StoreError>;

    async fn version(&self, id: Uuid) -> Result<Option<PageVersion>, StoreError>;

    /// Every published version carrying an expiration reference.
    async fn published_versions_with_expiration(&self) -> Result<Vec<PageVersion>, StoreError>;

    /// Sets the publish flag. Returns whether the version existed and changed.
    async fn set_version_published(
        &self,
        version_id: Uuid,
        published: bool,
    ) -> Result<bool, StoreError>;

    /// Flags a page expired, recording an optional redirect target.
    ///
    /// Returns the updated page, or `None` if it does not exist.
    async fn mark_page_expired(
        &self,
        page_id: Uuid,
        redirect_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Page>, StoreError>;

    async fn expiration_setting(&self, id: Uuid) -> Result<Option<ExpirationSetting>, StoreError>;

    async fn insert_expiration_setting(&self, setting: ExpirationSetting)
        -> Result<(), StoreError>;

    /// Replaces a stored setting. Returns false if it does not exist.
    async fn update_expiration_setting(
        &self,
        setting: ExpirationSetting,
    ) -> Result<bool, StoreError>;

    /// Deletes a setting without touching versions that reference it.
    async fn delete_expiration_setting(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Points a version at a setting (or clears it). Returns false if the
    /// version does not exist.
    async fn attach_expiration(
        &self,
        version_id: Uuid,
        setting_id: Option<Uuid>,
    ) -> Result<bool, StoreError>;
}
