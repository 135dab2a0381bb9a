//! API Handlers
//!
//! HTTP request handlers for public page resolution, stats, cache control and
//! expiration management.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{PageError, Result};
use crate::expiration::{
    ExpirationEngine, ExpirationSetting, ExpirationSettingPatch, ExpirationSettingService,
    NewExpirationSetting, SweepReport,
};
use crate::kv::KeyValueCache;
use crate::models::{HealthResponse, PublicPageResponse, StatsResponse};
use crate::pages::{availability, Availability, PageLookupCache, PageResolver, StatsCounter};
use crate::store::DurableStore;

/// Application state shared across all handlers.
///
/// Built once per process from explicit collaborators; tests build their own.
#[derive(Clone)]
pub struct AppState {
    pub resolver: PageResolver,
    pub settings: ExpirationSettingService,
    pub engine: ExpirationEngine,
    pub kv: Arc<dyn KeyValueCache>,
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Wires the services around a store, a cache and a clock.
    pub fn new(
        store: Arc<dyn DurableStore>,
        kv: Arc<dyn KeyValueCache>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let lookup = PageLookupCache::new(kv.clone(), clock.clone());
        let stats = StatsCounter::new(kv.clone());
        Self {
            resolver: PageResolver::new(store.clone(), lookup.clone(), stats),
            settings: ExpirationSettingService::new(store.clone(), clock.clone()),
            engine: ExpirationEngine::new(store, lookup, clock.clone()),
            kv,
            clock,
        }
    }
}

/// Handler for GET /p/:short_id
///
/// Resolves a page for a visitor and applies the time-dependent checks.
pub async fn resolve_handler(
    State(state): State<AppState>,
    Path(short_id): Path<String>,
) -> Result<Json<PublicPageResponse>> {
    let page = state
        .resolver
        .resolve(&short_id)
        .await?
        .ok_or_else(|| PageError::NotFound(short_id.clone()))?;

    match availability(&page, state.clock.now()) {
        Availability::Available => Ok(Json(page.into())),
        Availability::NotFound => Err(PageError::NotFound(short_id)),
        Availability::Expired { redirect_url } => Err(PageError::Expired {
            short_id,
            redirect_url,
        }),
        Availability::NotYetAvailable { launch_at } => {
            Err(PageError::NotYetAvailable { short_id, launch_at })
        }
    }
}

/// Handler for POST /pages/:page_id/conversions
pub async fn conversion_handler(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<StatsResponse>> {
    let stats = state.resolver.stats().increment_conversions(page_id).await?;
    Ok(Json(StatsResponse::new(page_id, stats)))
}

/// Handler for GET /pages/:page_id/stats
pub async fn stats_handler(
    State(state): State<AppState>,
    Path(page_id): Path<Uuid>,
) -> Result<Json<StatsResponse>> {
    let stats = state
        .resolver
        .stats()
        .get_page_stats(page_id)
        .await?
        .ok_or_else(|| PageError::Internal(format!("stats record of {} is corrupt", page_id)))?;
    Ok(Json(StatsResponse::new(page_id, stats)))
}

/// Handler for DELETE /cache/:short_id
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Path(short_id): Path<String>,
) -> Result<StatusCode> {
    state.resolver.lookup().invalidate_page_cache(&short_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /expiration-settings
pub async fn create_setting_handler(
    State(state): State<AppState>,
    Json(input): Json<NewExpirationSetting>,
) -> Result<(StatusCode, Json<ExpirationSetting>)> {
    let setting = state.settings.create(input).await?;
    Ok((StatusCode::CREATED, Json(setting)))
}

/// Handler for GET /expiration-settings/:id
pub async fn get_setting_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ExpirationSetting>> {
    Ok(Json(state.settings.get(id).await?))
}

/// Handler for PUT /expiration-settings/:id
pub async fn update_setting_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(patch): Json<ExpirationSettingPatch>,
) -> Result<Json<ExpirationSetting>> {
    Ok(Json(state.settings.update(id, patch).await?))
}

/// Handler for DELETE /expiration-settings/:id
pub async fn delete_setting_handler(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode> {
    state.settings.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for PUT /versions/:version_id/expiration/:setting_id
pub async fn attach_setting_handler(
    State(state): State<AppState>,
    Path((version_id, setting_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode> {
    state.settings.attach(version_id, setting_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Handler for POST /expirations/run
///
/// Runs a sweep immediately, outside the schedule.
pub async fn run_sweep_handler(State(state): State<AppState>) -> Result<Json<SweepReport>> {
    Ok(Json(state.engine.process_expirations().await?))
}

/// Handler for GET /health
///
/// Reports in-flight lookups and, when the backend keeps them, cache counters.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse::healthy(
        state.clock.now(),
        state.resolver.inflight_len(),
        state.kv.backend_counters().await,
    ))
}
