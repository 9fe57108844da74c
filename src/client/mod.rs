//! Cloud tenancy API client
//!
//! Defines the collaborator traits the cache and skill layers call through:
//! paginated resource listings, opaque named query tools, and an optional
//! analysis (LLM) collaborator. The production implementation is `RestClient`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[cfg(test)]
pub mod mock;
pub mod pagination;
pub mod rest;

#[cfg(test)]
#[allow(unused_imports)]
pub use mock::MockClient;
pub use pagination::{Page, drain_pages};
pub use rest::RestClient;

/// Paginated resource-listing collaborator.
///
/// One `list_*` call per resource family, each returning a single page plus
/// an opaque continuation token. Snapshot builds drain these fully.
#[async_trait]
pub trait TenancyApi: Send + Sync {
    /// Fetch tenancy metadata (name, home region, subscribed regions)
    async fn get_tenancy(&self, tenancy_id: &str) -> Result<Tenancy>;

    /// List compartments in the tenancy
    async fn list_compartments(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Compartment>>;

    /// List compute instances across the tenancy
    async fn list_instances(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ComputeInstance>>;

    /// List database systems across the tenancy
    async fn list_databases(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Database>>;

    /// List network objects (VCNs, subnets, security lists, gateways)
    async fn list_network_resources(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<NetworkResource>>;

    /// List identity users
    async fn list_users(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<IdentityUser>>;

    /// List identity groups
    async fn list_groups(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<IdentityGroup>>;
}

/// Opaque query collaborator for cost/inventory/network tools.
///
/// Tools are identified by name plus a parameter map and return an opaque
/// structured result. The skill layer treats them as black boxes.
#[async_trait]
pub trait QueryApi: Send + Sync {
    async fn query(&self, tool: &str, params: &Value) -> Result<Value>;
}

/// Optional language-model collaborator for report synthesis.
///
/// Absence is never fatal: callers fall back to a deterministic summary.
#[async_trait]
pub trait Analyst: Send + Sync {
    async fn analyze(&self, prompt: &str, data: &Value, max_tokens: usize) -> Result<String>;
}

/// Access to the identifying fields shared by every listed resource.
///
/// Snapshot sections index entities by these two accessors.
pub trait Entity {
    fn id(&self) -> &str;
    fn display_name(&self) -> &str;
}

/// Tenancy metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tenancy {
    /// Tenancy ID
    pub id: String,

    /// Tenancy name
    pub name: String,

    /// Home region identifier
    pub home_region: String,

    /// Regions the tenancy is subscribed to
    #[serde(default)]
    pub subscribed_regions: Vec<String>,
}

/// Compartment resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Compartment {
    /// Compartment ID
    pub id: String,

    /// Compartment display name
    pub name: String,

    /// Parent compartment ID (None for the root compartment)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,

    /// Lifecycle state (ACTIVE, DELETED, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,
}

impl Entity for Compartment {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Compute instance resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeInstance {
    /// Instance ID
    pub id: String,

    /// Instance display name
    pub display_name: String,

    /// Owning compartment ID
    pub compartment_id: String,

    /// Instance shape (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<String>,

    /// Lifecycle state (RUNNING, STOPPED, TERMINATED, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,

    /// Region the instance lives in (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl Entity for ComputeInstance {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Database system resource
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Database {
    /// Database ID
    pub id: String,

    /// Database display name
    pub display_name: String,

    /// Owning compartment ID
    pub compartment_id: String,

    /// Database engine/edition (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engine: Option<String>,

    /// Lifecycle state (AVAILABLE, STOPPED, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,

    /// Allocated storage in gigabytes (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_gb: Option<u64>,
}

impl Entity for Database {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Kind of network object returned by the network listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkKind {
    Vcn,
    Subnet,
    SecurityList,
    Gateway,
}

/// Network resource (VCN, subnet, security list, or gateway)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkResource {
    /// Resource ID
    pub id: String,

    /// Resource display name
    pub display_name: String,

    /// Owning compartment ID
    pub compartment_id: String,

    /// What kind of network object this is
    pub kind: NetworkKind,

    /// CIDR block (VCNs and subnets)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cidr_block: Option<String>,
}

impl Entity for NetworkResource {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.display_name
    }
}

/// Identity user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityUser {
    /// User ID
    pub id: String,

    /// User name
    pub name: String,

    /// Email address (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Lifecycle state (ACTIVE, INACTIVE, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle_state: Option<String>,
}

impl Entity for IdentityUser {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}

/// Identity group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityGroup {
    /// Group ID
    pub id: String,

    /// Group name
    pub name: String,

    /// Group description (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Entity for IdentityGroup {
    fn id(&self) -> &str {
        &self.id
    }
    fn display_name(&self) -> &str {
        &self.name
    }
}
