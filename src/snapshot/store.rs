//! Snapshot store: lifecycle, lookups, and enrichment
//!
//! Owns at most one in-memory snapshot plus its on-disk artifacts. Readers
//! take a cheap `Arc` of the current document and never block on a refresh;
//! a refresh swaps the reference only after a build fully succeeds, so a
//! failed rebuild can never corrupt data that was already being served.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use chrono::Utc;
use serde::Serialize;
use serde_json::Value;

use super::build::{SNAPSHOT_FILE, SNAPSHOT_META_FILE, SnapshotBuilder, persist};
use super::model::{ResourceSnapshot, SnapshotMetadata};
use crate::client::{
    Compartment, ComputeInstance, Database, IdentityGroup, IdentityUser, NetworkResource, Tenancy,
    TenancyApi,
};
use crate::error::{CacheError, Result};

/// Default staleness threshold: a snapshot older than a day gets rebuilt.
pub const DEFAULT_MAX_AGE_MINUTES: f64 = 24.0 * 60.0;

/// How a refresh request was satisfied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RefreshStatus {
    /// In-memory snapshot was fresh enough; nothing happened
    Fresh,
    /// Loaded a fresh-enough snapshot from the on-disk artifact
    LoadedFromDisk,
    /// Ran a full scan and swapped in the new document
    Rebuilt,
}

/// Result of a refresh request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshOutcome {
    pub status: RefreshStatus,
    pub age_minutes: Option<f64>,
    pub counts: BTreeMap<String, usize>,
}

/// Process-wide snapshot handle.
///
/// Constructed once in the command context and shared by `Arc`; one rebuild
/// may be in flight at a time per store.
pub struct SnapshotStore {
    builder: SnapshotBuilder,
    profile: String,
    tenancy_id: String,
    region: String,
    cache_dir: PathBuf,
    current: RwLock<Option<Arc<ResourceSnapshot>>>,
    refresh_lock: tokio::sync::Mutex<()>,
}

impl SnapshotStore {
    pub fn new(
        client: Arc<dyn TenancyApi>,
        profile: impl Into<String>,
        tenancy_id: impl Into<String>,
        region: impl Into<String>,
        cache_dir: PathBuf,
    ) -> Self {
        Self {
            builder: SnapshotBuilder::new(client),
            profile: profile.into(),
            tenancy_id: tenancy_id.into(),
            region: region.into(),
            cache_dir,
            current: RwLock::new(None),
            refresh_lock: tokio::sync::Mutex::new(()),
        }
    }

    /// Default artifact location (~/.cache/tenop on Linux).
    pub fn default_cache_dir() -> Result<PathBuf> {
        let base = dirs::cache_dir().ok_or(CacheError::NoHome)?;
        Ok(base.join("tenop"))
    }

    /// True iff a snapshot is loaded in memory.
    pub fn is_available(&self) -> bool {
        self.current().is_some()
    }

    /// Cheap handle on the current document, if any.
    pub fn current(&self) -> Option<Arc<ResourceSnapshot>> {
        self.current.read().ok().and_then(|guard| guard.clone())
    }

    /// Age of the loaded snapshot in minutes, if one is loaded.
    pub fn cache_age_minutes(&self) -> Option<f64> {
        self.current()
            .map(|snapshot| snapshot.metadata.age_minutes(Utc::now()))
    }

    /// True if no snapshot is loaded or the loaded one is older than allowed.
    pub fn needs_refresh(&self, max_age_minutes: f64) -> bool {
        match self.cache_age_minutes() {
            Some(age) => age > max_age_minutes,
            None => true,
        }
    }

    /// Read the standalone metadata artifact without touching the full document.
    pub fn disk_metadata(&self) -> Option<SnapshotMetadata> {
        let raw = std::fs::read(self.cache_dir.join(SNAPSHOT_META_FILE)).ok()?;
        serde_json::from_slice(&raw).ok()
    }

    /// Ensure a usable snapshot, rebuilding only when needed.
    ///
    /// With `force` the full scan always runs. Otherwise a fresh in-memory
    /// snapshot wins, then a fresh on-disk artifact, then a rebuild. A failed
    /// rebuild leaves the previously served snapshot untouched and returns
    /// the error.
    pub async fn refresh(&self, force: bool, max_age_minutes: f64) -> Result<RefreshOutcome> {
        let _guard = self.refresh_lock.lock().await;

        if !force {
            if !self.needs_refresh(max_age_minutes) {
                return Ok(self.outcome(RefreshStatus::Fresh));
            }
            if self.try_load_from_disk(max_age_minutes) {
                return Ok(self.outcome(RefreshStatus::LoadedFromDisk));
            }
        }

        let snapshot = self
            .builder
            .build(&self.profile, &self.tenancy_id, &self.region)
            .await?;

        if let Err(e) = persist(&snapshot, &self.cache_dir) {
            // The in-memory document is still good; serve it anyway.
            log::warn!("Snapshot persist failed: {}", e);
        }

        self.install(snapshot);
        Ok(self.outcome(RefreshStatus::Rebuilt))
    }

    /// Attempt to satisfy a refresh from the on-disk artifacts.
    fn try_load_from_disk(&self, max_age_minutes: f64) -> bool {
        let Some(meta) = self.disk_metadata() else {
            return false;
        };
        if meta.tenancy_id != self.tenancy_id {
            log::warn!(
                "Cached snapshot belongs to tenancy {}, ignoring",
                meta.tenancy_id
            );
            return false;
        }
        if meta.age_minutes(Utc::now()) > max_age_minutes {
            log::debug!("On-disk snapshot is stale");
            return false;
        }

        let raw = match std::fs::read(self.cache_dir.join(SNAPSHOT_FILE)) {
            Ok(raw) => raw,
            Err(e) => {
                log::warn!("Failed to read snapshot artifact: {}", e);
                return false;
            }
        };
        match serde_json::from_slice::<ResourceSnapshot>(&raw) {
            Ok(snapshot) => {
                log::info!("Loaded snapshot from {}", self.cache_dir.display());
                self.install(snapshot);
                true
            }
            Err(e) => {
                log::warn!("Corrupt snapshot artifact ignored: {}", e);
                false
            }
        }
    }

    /// Swap in a new document; readers in flight keep their old Arc.
    fn install(&self, snapshot: ResourceSnapshot) {
        if let Ok(mut guard) = self.current.write() {
            *guard = Some(Arc::new(snapshot));
        }
    }

    fn outcome(&self, status: RefreshStatus) -> RefreshOutcome {
        RefreshOutcome {
            status,
            age_minutes: self.cache_age_minutes(),
            counts: self
                .current()
                .map(|s| s.family_counts())
                .unwrap_or_default(),
        }
    }

    pub fn tenancy_info(&self) -> Option<Tenancy> {
        self.current().map(|s| s.tenancy.clone())
    }
}

/// Typed lookups over the snapshot indices. The CLI drives only a few of
/// these directly; the full set is the lookup contract for calling tools.
#[allow(dead_code)]
impl SnapshotStore {
    pub fn get_compartment_by_id(&self, id: &str) -> Option<Compartment> {
        self.current()?.compartments.get_by_id(id).cloned()
    }

    pub fn get_compartment_by_name(&self, name: &str) -> Option<Compartment> {
        self.current()?.compartments.get_by_name(name).cloned()
    }

    pub fn get_instance_by_id(&self, id: &str) -> Option<ComputeInstance> {
        self.current()?.instances.get_by_id(id).cloned()
    }

    pub fn get_instance_by_name(&self, name: &str) -> Option<ComputeInstance> {
        self.current()?.instances.get_by_name(name).cloned()
    }

    pub fn get_database_by_id(&self, id: &str) -> Option<Database> {
        self.current()?.databases.get_by_id(id).cloned()
    }

    pub fn get_database_by_name(&self, name: &str) -> Option<Database> {
        self.current()?.databases.get_by_name(name).cloned()
    }

    pub fn get_network_resource_by_id(&self, id: &str) -> Option<NetworkResource> {
        self.current()?.network.get_by_id(id).cloned()
    }

    pub fn get_network_resource_by_name(&self, name: &str) -> Option<NetworkResource> {
        self.current()?.network.get_by_name(name).cloned()
    }

    pub fn get_user_by_id(&self, id: &str) -> Option<IdentityUser> {
        self.current()?.users.get_by_id(id).cloned()
    }

    pub fn get_user_by_name(&self, name: &str) -> Option<IdentityUser> {
        self.current()?.users.get_by_name(name).cloned()
    }

    pub fn get_group_by_id(&self, id: &str) -> Option<IdentityGroup> {
        self.current()?.groups.get_by_id(id).cloned()
    }

    pub fn get_group_by_name(&self, name: &str) -> Option<IdentityGroup> {
        self.current()?.groups.get_by_name(name).cloned()
    }
}

impl SnapshotStore {
    /// Return a copy of `payload` with sibling name fields filled in for
    /// every rule whose ID field resolves in the snapshot indices. Unknown
    /// IDs are left untouched; the operation is idempotent.
    pub fn enrich_with_names(&self, payload: &Value, rules: &[EnrichRule]) -> Value {
        let mut enriched = payload.clone();
        if let Some(snapshot) = self.current() {
            enrich_value(&snapshot, &mut enriched, rules);
        }
        enriched
    }

    #[cfg(test)]
    pub(crate) fn install_for_tests(&self, snapshot: ResourceSnapshot) {
        self.install(snapshot);
    }
}

/// Which snapshot index an enrichment rule resolves against
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichIndex {
    Compartment,
    Instance,
    Database,
    Network,
    User,
    Group,
}

/// Explicit mapping from an identifier field to the sibling name field it
/// populates and the index that resolves it.
#[derive(Debug, Clone, Copy)]
pub struct EnrichRule {
    pub id_field: &'static str,
    pub name_field: &'static str,
    pub index: EnrichIndex,
}

/// Rules covering the identifier fields the query tools commonly emit.
pub const DEFAULT_ENRICH_RULES: &[EnrichRule] = &[
    EnrichRule {
        id_field: "compartmentId",
        name_field: "compartmentName",
        index: EnrichIndex::Compartment,
    },
    EnrichRule {
        id_field: "instanceId",
        name_field: "instanceName",
        index: EnrichIndex::Instance,
    },
    EnrichRule {
        id_field: "databaseId",
        name_field: "databaseName",
        index: EnrichIndex::Database,
    },
    EnrichRule {
        id_field: "vcnId",
        name_field: "vcnName",
        index: EnrichIndex::Network,
    },
    EnrichRule {
        id_field: "subnetId",
        name_field: "subnetName",
        index: EnrichIndex::Network,
    },
    EnrichRule {
        id_field: "userId",
        name_field: "userName",
        index: EnrichIndex::User,
    },
    EnrichRule {
        id_field: "groupId",
        name_field: "groupName",
        index: EnrichIndex::Group,
    },
];

fn lookup_name<'a>(snapshot: &'a ResourceSnapshot, index: EnrichIndex, id: &str) -> Option<&'a str> {
    match index {
        EnrichIndex::Compartment => snapshot.compartments.name_of(id),
        EnrichIndex::Instance => snapshot.instances.name_of(id),
        EnrichIndex::Database => snapshot.databases.name_of(id),
        EnrichIndex::Network => snapshot.network.name_of(id),
        EnrichIndex::User => snapshot.users.name_of(id),
        EnrichIndex::Group => snapshot.groups.name_of(id),
    }
}

fn enrich_value(snapshot: &ResourceSnapshot, value: &mut Value, rules: &[EnrichRule]) {
    match value {
        Value::Object(map) => {
            for rule in rules {
                let id = match map.get(rule.id_field) {
                    Some(Value::String(id)) => Some(id.clone()),
                    _ => None,
                };
                if let Some(id) = id
                    && let Some(name) = lookup_name(snapshot, rule.index, &id)
                {
                    map.insert(rule.name_field.to_string(), Value::String(name.to_string()));
                }
            }
            for nested in map.values_mut() {
                enrich_value(snapshot, nested, rules);
            }
        }
        Value::Array(items) => {
            for item in items {
                enrich_value(snapshot, item, rules);
            }
        }
        _ => {}
    }
}
