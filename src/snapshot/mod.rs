//! Tenancy inventory snapshot
//!
//! A snapshot is a full, indexed scan of a tenancy's resource inventory,
//! persisted locally so name/ID lookups and payload enrichment never need a
//! network round trip. `SnapshotStore` owns the lifecycle: load, staleness
//! checks, and atomic refresh.

pub mod build;
pub mod model;
pub mod store;

pub use build::{SNAPSHOT_FILE, SNAPSHOT_META_FILE, SnapshotBuilder};
pub use model::{ResourceSection, ResourceSnapshot, SnapshotMetadata};
pub use store::{
    DEFAULT_ENRICH_RULES, DEFAULT_MAX_AGE_MINUTES, EnrichIndex, EnrichRule, RefreshOutcome,
    RefreshStatus, SnapshotStore,
};
