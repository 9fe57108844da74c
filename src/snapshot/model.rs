//! Snapshot document model
//!
//! A snapshot is a full, point-in-time, indexed copy of a tenancy's resource
//! inventory. It is immutable once built; a refresh produces a brand-new
//! document that replaces the old one wholesale.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::client::{
    Compartment, ComputeInstance, Database, Entity, IdentityGroup, IdentityUser, NetworkResource,
    Tenancy,
};

/// Snapshot metadata. Persisted both inside the full document and standalone,
/// so staleness can be checked without deserializing the whole snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// When the snapshot build completed
    pub generated_at: DateTime<Utc>,

    /// Tenancy the snapshot was built against
    pub tenancy_id: String,

    /// Region the listings were scoped to
    pub region: String,

    /// Credentials profile used for the build
    pub profile: String,

    /// Item count per resource family
    #[serde(default)]
    pub counts: BTreeMap<String, usize>,
}

impl SnapshotMetadata {
    /// Age of the snapshot relative to `now`, in minutes.
    pub fn age_minutes(&self, now: DateTime<Utc>) -> f64 {
        (now - self.generated_at).num_seconds() as f64 / 60.0
    }
}

/// Indexed listing for one resource family.
///
/// `list` preserves API order; `by_id` and `by_name` map into it by index.
/// Duplicate display names resolve last-write-wins, matching list order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSection<T> {
    pub list: Vec<T>,
    pub by_id: HashMap<String, usize>,
    pub by_name: HashMap<String, usize>,
    pub count: usize,
}

impl<T: Entity> ResourceSection<T> {
    /// Build the section and its indices in a single pass over the listing.
    pub fn from_list(list: Vec<T>) -> Self {
        let mut by_id = HashMap::with_capacity(list.len());
        let mut by_name = HashMap::with_capacity(list.len());

        for (i, item) in list.iter().enumerate() {
            by_id.insert(item.id().to_string(), i);
            by_name.insert(item.display_name().to_string(), i);
        }

        let count = list.len();
        Self {
            list,
            by_id,
            by_name,
            count,
        }
    }

    /// Empty section, used when a family's listing failed.
    pub fn empty() -> Self {
        Self {
            list: Vec::new(),
            by_id: HashMap::new(),
            by_name: HashMap::new(),
            count: 0,
        }
    }

    pub fn get_by_id(&self, id: &str) -> Option<&T> {
        self.by_id.get(id).and_then(|&i| self.list.get(i))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&T> {
        self.by_name.get(name).and_then(|&i| self.list.get(i))
    }

    /// Display name for an ID, if the ID is known.
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.get_by_id(id).map(|item| item.display_name())
    }
}

/// The top-level persisted snapshot document.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceSnapshot {
    pub metadata: SnapshotMetadata,
    pub tenancy: Tenancy,
    pub compartments: ResourceSection<Compartment>,
    pub instances: ResourceSection<ComputeInstance>,
    pub databases: ResourceSection<Database>,
    pub network: ResourceSection<NetworkResource>,
    pub users: ResourceSection<IdentityUser>,
    pub groups: ResourceSection<IdentityGroup>,
}

impl ResourceSnapshot {
    /// Item count per family, keyed by family name.
    pub fn family_counts(&self) -> BTreeMap<String, usize> {
        BTreeMap::from([
            ("compartments".to_string(), self.compartments.count),
            ("instances".to_string(), self.instances.count),
            ("databases".to_string(), self.databases.count),
            ("network".to_string(), self.network.count),
            ("users".to_string(), self.users.count),
            ("groups".to_string(), self.groups.count),
        ])
    }
}
