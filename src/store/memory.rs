//! In-Memory Durable Store
//!
//! Map-backed [`DurableStore`] used by the standalone server and the tests.
//! Can be seeded from a JSON fixture.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::expiration::ExpirationSetting;
use crate::pages::{Page, PageStatus, PageVersion};
use crate::store::{DurableStore, StoreError};

// == Fixture ==
/// Seed data for [`MemoryStore`].
#[derive(Debug, Default, Deserialize)]
pub struct StoreFixture {
    #[serde(default)]
    pub pages: Vec<Page>,
    #[serde(default)]
    pub versions: Vec<PageVersion>,
    #[serde(default)]
    pub expiration_settings: Vec<ExpirationSetting>,
}

#[derive(Debug, Default)]
struct Tables {
    pages: HashMap<Uuid, Page>,
    short_ids: HashMap<String, Uuid>,
    versions: HashMap<Uuid, PageVersion>,
    settings: HashMap<Uuid, ExpirationSetting>,
}

// == Memory Store ==
/// Cheap to clone; clones share the same tables.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a store holding the fixture's records.
    pub async fn from_fixture(fixture: StoreFixture) -> Result<Self, StoreError> {
        let store = Self::new();
        for page in fixture.pages {
            store.insert_page(page).await?;
        }
        for version in fixture.versions {
            store.insert_version(version).await;
        }
        for setting in fixture.expiration_settings {
            store.insert_expiration_setting(setting).await?;
        }
        Ok(store)
    }

    /// Loads a JSON fixture file.
    pub async fn load_fixture_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading fixture {}", path.display()))?;
        let fixture: StoreFixture = serde_json::from_str(&raw)
            .with_context(|| format!("parsing fixture {}", path.display()))?;
        Ok(Self::from_fixture(fixture).await?)
    }

    // == Seeding ==
    /// Adds a page. Short ids are unique.
    pub async fn insert_page(&self, page: Page) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(existing) = tables.short_ids.get(&page.short_id) {
            if *existing != page.id {
                return Err(StoreError::Conflict(format!(
                    "short id '{}' already assigned",
                    page.short_id
                )));
            }
        }
        tables.short_ids.insert(page.short_id.clone(), page.id);
        tables.pages.insert(page.id, page);
        Ok(())
    }

    /// Adds or replaces a version.
    pub async fn insert_version(&self, version: PageVersion) {
        self.tables.write().await.versions.insert(version.id, version);
    }
}

#[async_trait]
impl DurableStore for MemoryStore {
    async fn page_by_id(&self, id: Uuid) -> Result<Option<Page>, StoreError> {
        Ok(self.tables.read().await.pages.get(&id).cloned())
    }

    async fn page_by_short_id(&self, short_id: &str) -> Result<Option<Page>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .short_ids
            .get(short_id)
            .and_then(|id| tables.pages.get(id))
            .cloned())
    }

    async fn version(&self, id: Uuid) -> Result<Option<PageVersion>, StoreError> {
        Ok(self.tables.read().await.versions.get(&id).cloned())
    }

    async fn published_versions_with_expiration(&self) -> Result<Vec<PageVersion>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .versions
            .values()
            .filter(|v| v.is_published && v.expiration_setting_id.is_some())
            .cloned()
            .collect())
    }

    async fn set_version_published(
        &self,
        version_id: Uuid,
        published: bool,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.versions.get_mut(&version_id) {
            Some(version) if version.is_published != published => {
                version.is_published = published;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn mark_page_expired(
        &self,
        page_id: Uuid,
        redirect_url: Option<String>,
        at: DateTime<Utc>,
    ) -> Result<Option<Page>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(page) = tables.pages.get_mut(&page_id) else {
            return Ok(None);
        };
        page.status = PageStatus::Expired;
        page.redirect_url = redirect_url;
        page.updated_at = at;
        Ok(Some(page.clone()))
    }

    async fn expiration_setting(&self, id: Uuid) -> Result<Option<ExpirationSetting>, StoreError> {
        Ok(self.tables.read().await.settings.get(&id).cloned())
    }

    async fn insert_expiration_setting(
        &self,
        setting: ExpirationSetting,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.settings.contains_key(&setting.id) {
            return Err(StoreError::Conflict(format!(
                "expiration setting {} already exists",
                setting.id
            )));
        }
        tables.settings.insert(setting.id, setting);
        Ok(())
    }

    async fn update_expiration_setting(
        &self,
        setting: ExpirationSetting,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.settings.get_mut(&setting.id) {
            Some(current) => {
                *current = setting;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_expiration_setting(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.tables.write().await.settings.remove(&id).is_some())
    }

    async fn attach_expiration(
        &self,
        version_id: Uuid,
        setting_id: Option<Uuid>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.versions.get_mut(&version_id) {
            Some(version) => {
                version.expiration_setting_id = setting_id;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
