//! Snapshot construction and persistence
//!
//! Builds a full snapshot by draining every family's paginated listing.
//! Family listings are best-effort: a family that fails to list is emitted
//! empty and the build carries on. Only the tenancy metadata fetch is fatal,
//! since the document cannot identify itself without it.

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;

use super::model::{ResourceSection, ResourceSnapshot, SnapshotMetadata};
use crate::client::{Entity, TenancyApi, drain_pages};
use crate::error::{Result, SnapshotError};

/// Full snapshot document file name
pub const SNAPSHOT_FILE: &str = "snapshot.json";

/// Metadata-only document file name (cheap staleness checks)
pub const SNAPSHOT_META_FILE: &str = "snapshot-meta.json";

/// Builds snapshots through a resource-listing collaborator.
pub struct SnapshotBuilder {
    client: Arc<dyn TenancyApi>,
}

impl SnapshotBuilder {
    pub fn new(client: Arc<dyn TenancyApi>) -> Self {
        Self { client }
    }

    /// Run a full tenancy scan and assemble the indexed document.
    pub async fn build(
        &self,
        profile: &str,
        tenancy_id: &str,
        region: &str,
    ) -> Result<ResourceSnapshot> {
        log::info!("Building snapshot for tenancy {} ({})", tenancy_id, region);

        let tenancy = self
            .client
            .get_tenancy(tenancy_id)
            .await
            .map_err(|e| SnapshotError::BuildFailed(e.to_string()))?;

        let client = &self.client;
        let compartments = collect("compartments", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_compartments(&tid, token.as_deref()).await }
        })
        .await;
        let instances = collect("instances", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_instances(&tid, token.as_deref()).await }
        })
        .await;
        let databases = collect("databases", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_databases(&tid, token.as_deref()).await }
        })
        .await;
        let network = collect("network", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_network_resources(&tid, token.as_deref()).await }
        })
        .await;
        let users = collect("users", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_users(&tid, token.as_deref()).await }
        })
        .await;
        let groups = collect("groups", |token| {
            let client = Arc::clone(client);
            let tid = tenancy_id.to_string();
            async move { client.list_groups(&tid, token.as_deref()).await }
        })
        .await;

        let mut snapshot = ResourceSnapshot {
            metadata: SnapshotMetadata {
                generated_at: Utc::now(),
                tenancy_id: tenancy_id.to_string(),
                region: region.to_string(),
                profile: profile.to_string(),
                counts: Default::default(),
            },
            tenancy,
            compartments,
            instances,
            databases,
            network,
            users,
            groups,
        };
        snapshot.metadata.counts = snapshot.family_counts();

        log::info!(
            "Snapshot built: {} items across {} families",
            snapshot.metadata.counts.values().sum::<usize>(),
            snapshot.metadata.counts.len()
        );
        Ok(snapshot)
    }
}

/// Drain one family's listing; emit an empty section on failure.
async fn collect<T, F, Fut>(family: &str, fetch: F) -> ResourceSection<T>
where
    T: Entity,
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<crate::client::Page<T>>>,
{
    match drain_pages(fetch).await {
        Ok(list) => {
            log::debug!("Listed {} {}", list.len(), family);
            ResourceSection::from_list(list)
        }
        Err(e) => {
            log::warn!("Failed to list {}: {} (section left empty)", family, e);
            ResourceSection::empty()
        }
    }
}

/// Write the two snapshot artifacts into the cache directory.
///
/// The directory is created owner-only if absent; both files are 0600.
pub fn persist(snapshot: &ResourceSnapshot, cache_dir: &Path) -> Result<()> {
    std::fs::create_dir_all(cache_dir)
        .map_err(|e| SnapshotError::Persist(format!("create {}: {}", cache_dir.display(), e)))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o700);
        std::fs::set_permissions(cache_dir, perms)
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;
    }

    let full = serde_json::to_vec(snapshot).map_err(|e| SnapshotError::Persist(e.to_string()))?;
    write_private(&cache_dir.join(SNAPSHOT_FILE), &full)?;

    let meta =
        serde_json::to_vec(&snapshot.metadata).map_err(|e| SnapshotError::Persist(e.to_string()))?;
    write_private(&cache_dir.join(SNAPSHOT_META_FILE), &meta)?;

    log::debug!("Persisted snapshot artifacts to {}", cache_dir.display());
    Ok(())
}

fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    std::fs::write(path, data)
        .map_err(|e| SnapshotError::Persist(format!("write {}: {}", path.display(), e)))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .map_err(|e| SnapshotError::Persist(e.to_string()))?
            .permissions();
        perms.set_mode(0o600);
        std::fs::set_permissions(path, perms)
            .map_err(|e| SnapshotError::Persist(e.to_string()))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MockClient;
    use crate::client::mock::fixtures;
    use tempfile::TempDir;

    fn full_mock() -> MockClient {
        MockClient::new()
            .with_tenancy(fixtures::tenancy())
            .with_compartments(vec![
                fixtures::compartment("c1", "root"),
                fixtures::compartment("c2", "dev"),
            ])
            .with_instances(vec![fixtures::instance("i1", "web-1", "RUNNING")])
            .with_databases(vec![fixtures::database("d1", "orders")])
            .with_network(vec![fixtures::vcn("v1", "main-vcn")])
            .with_users(vec![fixtures::user("u1", "alice")])
            .with_groups(vec![fixtures::group("g1", "admins")])
    }

    #[tokio::test]
    async fn test_build_populates_all_families() {
        let builder = SnapshotBuilder::new(Arc::new(full_mock()));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        assert_eq!(snapshot.tenancy.name, "acme");
        assert_eq!(snapshot.compartments.count, 2);
        assert_eq!(snapshot.instances.count, 1);
        assert_eq!(snapshot.databases.count, 1);
        assert_eq!(snapshot.network.count, 1);
        assert_eq!(snapshot.users.count, 1);
        assert_eq!(snapshot.groups.count, 1);
        assert_eq!(snapshot.metadata.counts["compartments"], 2);
    }

    #[tokio::test]
    async fn test_build_index_consistency() {
        let builder = SnapshotBuilder::new(Arc::new(full_mock()));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        assert_eq!(snapshot.compartments.count, snapshot.compartments.list.len());
        assert_eq!(snapshot.compartments.count, snapshot.compartments.by_id.len());
        assert_eq!(snapshot.instances.count, snapshot.instances.by_id.len());
    }

    #[tokio::test]
    async fn test_build_drains_pagination() {
        let mock = full_mock().with_instance_pages(vec![
            vec![
                fixtures::instance("i1", "web-1", "RUNNING"),
                fixtures::instance("i2", "web-2", "RUNNING"),
            ],
            vec![fixtures::instance("i3", "worker-1", "STOPPED")],
        ]);
        let builder = SnapshotBuilder::new(Arc::new(mock));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        assert_eq!(snapshot.instances.count, 3);
        assert_eq!(snapshot.instances.list[2].display_name, "worker-1");
    }

    #[tokio::test]
    async fn test_build_fail_soft_on_family_error() {
        let mock = full_mock().failing_family("databases");
        let builder = SnapshotBuilder::new(Arc::new(mock));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        assert_eq!(snapshot.databases.count, 0);
        assert_eq!(snapshot.compartments.count, 2);
        assert_eq!(snapshot.instances.count, 1);
    }

    #[tokio::test]
    async fn test_build_fails_without_tenancy_metadata() {
        let mock = full_mock().failing_family("tenancy");
        let builder = SnapshotBuilder::new(Arc::new(mock));

        let err = builder
            .build("default", "ten-1", "us-west-1")
            .await
            .unwrap_err();
        assert!(err.to_string().contains("build failed"));
    }

    #[tokio::test]
    async fn test_persist_writes_both_artifacts() {
        let dir = TempDir::new().unwrap();
        let builder = SnapshotBuilder::new(Arc::new(full_mock()));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        persist(&snapshot, dir.path()).unwrap();

        let meta_raw = std::fs::read(dir.path().join(SNAPSHOT_META_FILE)).unwrap();
        let meta: SnapshotMetadata = serde_json::from_slice(&meta_raw).unwrap();
        assert_eq!(meta.tenancy_id, "ten-1");
        assert_eq!(meta.counts["instances"], 1);

        let full_raw = std::fs::read(dir.path().join(SNAPSHOT_FILE)).unwrap();
        let full: ResourceSnapshot = serde_json::from_slice(&full_raw).unwrap();
        assert_eq!(full.compartments.count, 2);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_persist_owner_only_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested");
        let builder = SnapshotBuilder::new(Arc::new(full_mock()));
        let snapshot = builder.build("default", "ten-1", "us-west-1").await.unwrap();

        persist(&snapshot, &target).unwrap();

        let dir_mode = std::fs::metadata(&target).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        let file_mode = std::fs::metadata(target.join(SNAPSHOT_FILE))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(file_mode & 0o777, 0o600);
    }
}
