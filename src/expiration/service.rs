//! Expiration Setting Service
//!
//! Create/read/update/delete of expiration policies, validated before any
//! write reaches the store.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::clock::Clock;
use crate::expiration::{
    ExpirationSetting, ExpirationSettingPatch, NewExpirationSetting, ValidationError,
};
use crate::store::{DurableStore, StoreError};

#[derive(Error, Debug)]
pub enum SettingError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0} not found")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Clone)]
pub struct ExpirationSettingService {
    store: Arc<dyn DurableStore>,
    clock: Arc<dyn Clock>,
}

impl ExpirationSettingService {
    pub fn new(store: Arc<dyn DurableStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub async fn create(&self, input: NewExpirationSetting) -> Result<ExpirationSetting, SettingError> {
        let setting = ExpirationSetting::create(input, self.clock.now())?;
        self.store.insert_expiration_setting(setting.clone()).await?;
        info!(setting_id = %setting.id, action = ?setting.action, "created expiration setting");
        Ok(setting)
    }

    pub async fn get(&self, id: Uuid) -> Result<ExpirationSetting, SettingError> {
        self.store
            .expiration_setting(id)
            .await?
            .ok_or_else(|| SettingError::NotFound(format!("expiration setting {}", id)))
    }

    /// Applies a partial update. The merged setting must still be valid.
    pub async fn update(
        &self,
        id: Uuid,
        patch: ExpirationSettingPatch,
    ) -> Result<ExpirationSetting, SettingError> {
        let current = self.get(id).await?;
        let updated = current.patched(patch, self.clock.now())?;

        if !self.store.update_expiration_setting(updated.clone()).await? {
            return Err(SettingError::NotFound(format!("expiration setting {}", id)));
        }
        info!(setting_id = %id, "updated expiration setting");
        Ok(updated)
    }

    /// Deletes a setting. Versions still pointing at it stop expiring.
    pub async fn delete(&self, id: Uuid) -> Result<(), SettingError> {
        if !self.store.delete_expiration_setting(id).await? {
            return Err(SettingError::NotFound(format!("expiration setting {}", id)));
        }
        info!(setting_id = %id, "deleted expiration setting");
        Ok(())
    }

    /// Attaches an existing setting to a version.
    pub async fn attach(&self, version_id: Uuid, setting_id: Uuid) -> Result<(), SettingError> {
        self.get(setting_id).await?;
        if !self.store.attach_expiration(version_id, Some(setting_id)).await? {
            return Err(SettingError::NotFound(format!("page version {}", version_id)));
        }
        info!(%version_id, %setting_id, "attached expiration setting");
        Ok(())
    }
}
