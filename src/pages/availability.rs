//! Page Availability
//!
//! Time-dependent checks applied after a page has been resolved. These live
//! outside the resolver because cached snapshots outlive the instant they
//! were taken at.

use chrono::{DateTime, Utc};

use crate::pages::Page;

/// Whether a resolved page may be shown to a visitor at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    Available,
    /// Inactive pages are indistinguishable from missing ones.
    NotFound,
    Expired { redirect_url: Option<String> },
    NotYetAvailable { launch_at: DateTime<Utc> },
}

/// Evaluates `page` at `now`.
///
/// Precedence: inactive, then expired, then not yet launched.
pub fn availability(page: &Page, now: DateTime<Utc>) -> Availability {
    if !page.active {
        return Availability::NotFound;
    }

    let lapsed = page.expires_at.is_some_and(|at| at <= now);
    if page.is_expired_status() || lapsed {
        return Availability::Expired {
            redirect_url: page.redirect_url.clone(),
        };
    }

    match page.launch_at {
        Some(launch_at) if launch_at > now => Availability::NotYetAvailable { launch_at },
        _ => Availability::Available,
    }
}
