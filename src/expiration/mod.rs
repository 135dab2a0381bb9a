//! Expiration Module
//!
//! Time-bounded validity of published content: the policies, their CRUD
//! service and the sweep that applies them.

mod engine;
mod service;
mod setting;

pub use engine::{ExpirationEngine, SweepReport};
pub use service::{ExpirationSettingService, SettingError};
pub use setting::{
    ExpirationAction, ExpirationSetting, ExpirationSettingPatch, ExpirationType,
    NewExpirationSetting, ValidationError,
};
