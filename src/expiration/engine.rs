//! Expiration Engine
//!
//! One sweep over every published version carrying an expiration policy.
//!
//! Per version the lifecycle only moves forward:
//!
//! ```text
//! draft -> published -> published, page expired (redirect)
//!                    \-> unpublished, page expired (unpublish, terminal)
//! ```
//!
//! Candidates are handled one by one with no shared transaction. A failing
//! candidate is logged and counted; the next sweep re-reads everything from
//! the store, so transient failures converge on their own.
//!
//! Every page the sweep expires is also dropped from the page cache, so a
//! visitor does not keep seeing it until the cached snapshot's TTL runs out.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::expiration::ExpirationAction;
use crate::pages::{PageLookupCache, PageVersion};
use crate::store::{DurableStore, StoreError};

// == Sweep Report ==
/// Tally of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Published versions with an expiration reference
    pub candidates: usize,
    /// Versions whose policy lapsed and was applied in this sweep
    pub expired: usize,
    /// Versions whose policy has not lapsed yet
    pub pending: usize,
    /// Orphaned references, unevaluable policies, pages already expired
    pub skipped: usize,
    /// Candidates that failed and will be retried by the next sweep
    pub errors: usize,
}

enum Outcome {
    Expired,
    Pending,
    Skipped(&'static str),
}

// == Expiration Engine ==
#[derive(Clone)]
pub struct ExpirationEngine {
    store: Arc<dyn DurableStore>,
    lookup: PageLookupCache,
    clock: Arc<dyn Clock>,
}

impl ExpirationEngine {
    pub fn new(store: Arc<dyn DurableStore>, lookup: PageLookupCache, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            lookup,
            clock,
        }
    }

    // == Process Expirations ==
    /// Runs one sweep.
    ///
    /// Only a failure to list the candidates fails the sweep as a whole.
    pub async fn process_expirations(&self) -> Result<SweepReport, StoreError> {
        let candidates = self.store.published_versions_with_expiration().await?;
        let mut report = SweepReport {
            candidates: candidates.len(),
            ..SweepReport::default()
        };

        for version in &candidates {
            match self.process_candidate(version).await {
                Ok(Outcome::Expired) => report.expired += 1,
                Ok(Outcome::Pending) => report.pending += 1,
                Ok(Outcome::Skipped(reason)) => {
                    debug!(version_id = %version.id, reason, "skipped expiration candidate");
                    report.skipped += 1;
                }
                Err(err) => {
                    warn!(version_id = %version.id, error = %err, "expiration candidate failed");
                    report.errors += 1;
                }
            }
        }

        if report.expired > 0 || report.errors > 0 {
            info!(?report, "expiration sweep finished");
        } else {
            debug!(?report, "expiration sweep finished");
        }
        Ok(report)
    }

    async fn process_candidate(&self, version: &PageVersion) -> Result<Outcome, StoreError> {
        let Some(setting_id) = version.expiration_setting_id else {
            return Ok(Outcome::Skipped("no expiration reference"));
        };
        let Some(setting) = self.store.expiration_setting(setting_id).await? else {
            return Ok(Outcome::Skipped("expiration setting deleted"));
        };
        let Some(expires_at) = setting.effective_expiration(version) else {
            return Ok(Outcome::Skipped("expiration instant not computable"));
        };

        let now = self.clock.now();
        if expires_at > now {
            return Ok(Outcome::Pending);
        }

        let redirect_url = match setting.action {
            ExpirationAction::Unpublish => None,
            ExpirationAction::Redirect => {
                let Some(url) = setting.redirect_url.clone() else {
                    return Ok(Outcome::Skipped("redirect policy without target"));
                };
                let already = self.store.page_by_id(version.page_id).await?;
                if already.is_some_and(|page| page.is_expired_status()) {
                    return Ok(Outcome::Skipped("page already expired"));
                }
                Some(url)
            }
        };

        // The version is unpublished last: until then it stays a candidate,
        // so a failure in between is retried by the next sweep.
        let Some(page) = self
            .store
            .mark_page_expired(version.page_id, redirect_url, now)
            .await?
        else {
            return Ok(Outcome::Skipped("owning page missing"));
        };

        if let Err(err) = self.lookup.invalidate_page_cache(&page.short_id).await {
            warn!(short_id = %page.short_id, error = %err, "failed to invalidate expired page");
        }

        if setting.action == ExpirationAction::Unpublish {
            self.store.set_version_published(version.id, false).await?;
        }

        info!(
            page_id = %page.id,
            short_id = %page.short_id,
            version_id = %version.id,
            action = ?setting.action,
            "expired page"
        );
        Ok(Outcome::Expired)
    }
}
