//! Expiration Setting Model
//!
//! Expiration policies attached to page versions, and the write-time
//! validation that keeps them consistent.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::pages::PageVersion;

// == Enums ==
/// How the expiry instant is expressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationType {
    /// Absolute instant in `expires_at`
    Datetime,
    /// `duration_seconds` after the version was published
    Duration,
}

/// What happens once the policy lapses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpirationAction {
    Unpublish,
    Redirect,
}

// == Validation Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("expires_at is required for datetime expiration")]
    MissingExpiresAt,

    #[error("duration_seconds is required for duration expiration")]
    MissingDuration,

    #[error("duration_seconds must be positive, got {0}")]
    NonPositiveDuration(i64),

    #[error("redirect_url is required for redirect action")]
    MissingRedirectUrl,

    #[error("redirect_url must be an absolute http(s) URL: {0}")]
    InvalidRedirectUrl(String),
}

// == Expiration Setting ==
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExpirationSetting {
    pub id: Uuid,
    pub expiration_type: ExpirationType,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    pub action: ExpirationAction,
    #[serde(default)]
    pub redirect_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a setting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewExpirationSetting {
    pub expiration_type: ExpirationType,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    pub action: ExpirationAction,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

/// Partial update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExpirationSettingPatch {
    #[serde(default)]
    pub expiration_type: Option<ExpirationType>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub duration_seconds: Option<i64>,
    #[serde(default)]
    pub action: Option<ExpirationAction>,
    #[serde(default)]
    pub redirect_url: Option<String>,
}

impl NewExpirationSetting {
    /// Checks the type/action field pairing.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            self.expiration_type,
            self.expires_at,
            self.duration_seconds,
            self.action,
            self.redirect_url.as_deref(),
        )
    }
}

impl ExpirationSetting {
    /// Builds a stored setting from validated input.
    pub fn create(input: NewExpirationSetting, now: DateTime<Utc>) -> Result<Self, ValidationError> {
        input.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            expiration_type: input.expiration_type,
            expires_at: input.expires_at,
            duration_seconds: input.duration_seconds,
            action: input.action,
            redirect_url: input.redirect_url,
            created_at: now,
            updated_at: now,
        })
    }

    /// Returns a copy with `patch` applied, rejected if the result is invalid.
    pub fn patched(
        &self,
        patch: ExpirationSettingPatch,
        now: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let updated = Self {
            expiration_type: patch.expiration_type.unwrap_or(self.expiration_type),
            expires_at: patch.expires_at.or(self.expires_at),
            duration_seconds: patch.duration_seconds.or(self.duration_seconds),
            action: patch.action.unwrap_or(self.action),
            redirect_url: patch.redirect_url.or_else(|| self.redirect_url.clone()),
            updated_at: now,
            ..self.clone()
        };
        updated.validate()?;
        Ok(updated)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(
            self.expiration_type,
            self.expires_at,
            self.duration_seconds,
            self.action,
            self.redirect_url.as_deref(),
        )
    }

    // == Effective Expiration ==
    /// Instant at which `version` lapses under this policy.
    ///
    /// `None` when the policy cannot be evaluated: a missing field on stored
    /// data, or a duration policy on a version without a publish time.
    pub fn effective_expiration(&self, version: &PageVersion) -> Option<DateTime<Utc>> {
        match self.expiration_type {
            ExpirationType::Datetime => self.expires_at,
            ExpirationType::Duration => {
                let published_at = version.published_at?;
                let seconds = self.duration_seconds?;
                published_at.checked_add_signed(Duration::try_seconds(seconds)?)
            }
        }
    }
}

fn validate_fields(
    expiration_type: ExpirationType,
    expires_at: Option<DateTime<Utc>>,
    duration_seconds: Option<i64>,
    action: ExpirationAction,
    redirect_url: Option<&str>,
) -> Result<(), ValidationError> {
    match expiration_type {
        ExpirationType::Datetime if expires_at.is_none() => {
            return Err(ValidationError::MissingExpiresAt)
        }
        ExpirationType::Duration => match duration_seconds {
            None => return Err(ValidationError::MissingDuration),
            Some(secs) if secs <= 0 => return Err(ValidationError::NonPositiveDuration(secs)),
            Some(_) => {}
        },
        ExpirationType::Datetime => {}
    }

    if action == ExpirationAction::Redirect {
        let raw = redirect_url.ok_or(ValidationError::MissingRedirectUrl)?;
        let parsed =
            Url::parse(raw).map_err(|_| ValidationError::InvalidRedirectUrl(raw.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ValidationError::InvalidRedirectUrl(raw.to_string()));
        }
    }

    Ok(())
}
