//! Tiered in-memory cache for API responses
//!
//! Responses are memoized under one of four TTL tiers so callers with
//! different staleness tolerances share one store. Used directly by commands
//! and transparently by the cached query-client wrapper.

use std::time::Duration;

pub mod key;
pub mod query;
pub mod tiered;

pub use key::cache_key;
pub use query::CachedQueryClient;
pub use tiered::{CacheStats, TierStats, TieredCache};

/// TTL/capacity policy bucket. A cache binds each entry to exactly one tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheTier {
    /// Long-lived data: tenancy metadata, region lists
    Static,
    /// Medium-lived data: configuration, policy-like responses
    Config,
    /// Short-lived data: inventory listings, topology
    Operational,
    /// Very short-lived data: utilization and metric queries
    Metrics,
}

impl CacheTier {
    pub const ALL: [CacheTier; 4] = [
        CacheTier::Static,
        CacheTier::Config,
        CacheTier::Operational,
        CacheTier::Metrics,
    ];

    /// How long entries in this tier stay valid.
    pub fn ttl(&self) -> Duration {
        match self {
            CacheTier::Static => Duration::from_secs(3600),
            CacheTier::Config => Duration::from_secs(300),
            CacheTier::Operational => Duration::from_secs(60),
            CacheTier::Metrics => Duration::from_secs(30),
        }
    }

    /// Soft capacity; the least-recently-used entry is evicted past this.
    pub fn max_entries(&self) -> usize {
        match self {
            CacheTier::Static => 128,
            CacheTier::Config => 256,
            CacheTier::Operational => 512,
            CacheTier::Metrics => 512,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CacheTier::Static => "static",
            CacheTier::Config => "config",
            CacheTier::Operational => "operational",
            CacheTier::Metrics => "metrics",
        }
    }
}
