//! Pages Module
//!
//! Public page resolution: the page model, its cache encoding, the lookup
//! cache, engagement counters and the single-flight resolver.

mod availability;
pub mod codec;
mod lookup;
mod model;
mod resolver;
mod stats;


pub use availability::{availability, Availability};
pub use lookup::{page_key, page_ttl, PageLookupCache};
pub use model::{Page, PageStats, PageStatus, PageVersion};
pub use resolver::{FlightResult, PageResolver, ResolveError};
pub use stats::{stats_key, StatsCounter};
