//! Mock tenancy API client for testing
//!
//! Provides a configurable implementation of the collaborator traits for
//! unit testing without network access.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use super::{
    Analyst, Compartment, ComputeInstance, Database, IdentityGroup, IdentityUser, NetworkResource,
    Page, QueryApi, Tenancy, TenancyApi,
};
use crate::error::{ApiError, Result};

/// Mock API client for testing.
///
/// Configure canned responses via builder methods, then use in tests.
/// Listings return everything in one page unless per-page data is set.
pub struct MockClient {
    tenancy: Arc<Mutex<Option<Tenancy>>>,
    compartments: Arc<Mutex<Vec<Compartment>>>,
    instances: Arc<Mutex<Vec<ComputeInstance>>>,
    databases: Arc<Mutex<Vec<Database>>>,
    network: Arc<Mutex<Vec<NetworkResource>>>,
    users: Arc<Mutex<Vec<IdentityUser>>>,
    groups: Arc<Mutex<Vec<IdentityGroup>>>,
    /// Per-page instance listings for pagination tests
    instance_pages: Arc<Mutex<Option<Vec<Vec<ComputeInstance>>>>>,
    /// Families whose listing call fails with a Forbidden error
    fail_families: Arc<Mutex<HashSet<String>>>,
    /// Canned query tool responses by tool name
    query_responses: Arc<Mutex<HashMap<String, Value>>>,
    /// Tools whose query call fails with a ServerError
    fail_tools: Arc<Mutex<HashSet<String>>>,
    call_counts: Arc<Mutex<CallCounts>>,
}

/// Tracks API call counts for test verification
#[derive(Default, Debug, Clone)]
pub struct CallCounts {
    pub get_tenancy: usize,
    pub list_compartments: usize,
    pub list_instances: usize,
    pub list_databases: usize,
    pub list_network_resources: usize,
    pub list_users: usize,
    pub list_groups: usize,
    pub query: usize,
}

impl Default for MockClient {
    fn default() -> Self {
        Self {
            tenancy: Arc::new(Mutex::new(None)),
            compartments: Arc::new(Mutex::new(Vec::new())),
            instances: Arc::new(Mutex::new(Vec::new())),
            databases: Arc::new(Mutex::new(Vec::new())),
            network: Arc::new(Mutex::new(Vec::new())),
            users: Arc::new(Mutex::new(Vec::new())),
            groups: Arc::new(Mutex::new(Vec::new())),
            instance_pages: Arc::new(Mutex::new(None)),
            fail_families: Arc::new(Mutex::new(HashSet::new())),
            query_responses: Arc::new(Mutex::new(HashMap::new())),
            fail_tools: Arc::new(Mutex::new(HashSet::new())),
            call_counts: Arc::new(Mutex::new(CallCounts::default())),
        }
    }
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tenancy(self, tenancy: Tenancy) -> Self {
        *self.tenancy.lock().unwrap() = Some(tenancy);
        self
    }

    pub fn with_compartments(self, compartments: Vec<Compartment>) -> Self {
        *self.compartments.lock().unwrap() = compartments;
        self
    }

    pub fn with_instances(self, instances: Vec<ComputeInstance>) -> Self {
        *self.instances.lock().unwrap() = instances;
        self
    }

    pub fn with_databases(self, databases: Vec<Database>) -> Self {
        *self.databases.lock().unwrap() = databases;
        self
    }

    pub fn with_network(self, network: Vec<NetworkResource>) -> Self {
        *self.network.lock().unwrap() = network;
        self
    }

    pub fn with_users(self, users: Vec<IdentityUser>) -> Self {
        *self.users.lock().unwrap() = users;
        self
    }

    pub fn with_groups(self, groups: Vec<IdentityGroup>) -> Self {
        *self.groups.lock().unwrap() = groups;
        self
    }

    /// Serve instances page by page instead of in one response.
    pub fn with_instance_pages(self, pages: Vec<Vec<ComputeInstance>>) -> Self {
        *self.instance_pages.lock().unwrap() = Some(pages);
        self
    }

    /// Make the named family's listing call fail (e.g. "databases").
    pub fn failing_family(self, family: &str) -> Self {
        self.fail_families.lock().unwrap().insert(family.to_string());
        self
    }

    /// Inject a family failure after construction (for refresh-failure tests).
    pub fn set_failing_family(&self, family: &str) {
        self.fail_families.lock().unwrap().insert(family.to_string());
    }

    /// Canned response for a query tool.
    pub fn with_query_response(self, tool: &str, response: Value) -> Self {
        self.query_responses
            .lock().unwrap()
            .insert(tool.to_string(), response);
        self
    }

    /// Make the named query tool fail.
    pub fn failing_tool(self, tool: &str) -> Self {
        self.fail_tools.lock().unwrap().insert(tool.to_string());
        self
    }

    pub fn call_counts(&self) -> CallCounts {
        self.call_counts.lock().unwrap().clone()
    }

    fn check_family(&self, family: &str) -> Result<()> {
        if self.fail_families.lock().unwrap().contains(family) {
            return Err(ApiError::Forbidden.into());
        }
        Ok(())
    }
}

/// Slice canned pages by token: no token means page 0, token "n" means page n.
fn page_from<T: Clone>(pages: &[Vec<T>], token: Option<&str>) -> Page<T> {
    let index: usize = token.and_then(|t| t.parse().ok()).unwrap_or(0);
    let items = pages.get(index).cloned().unwrap_or_default();
    if index + 1 < pages.len() {
        Page::with_token(items, (index + 1).to_string())
    } else {
        Page::last(items)
    }
}

#[async_trait]
impl TenancyApi for MockClient {
    async fn get_tenancy(&self, tenancy_id: &str) -> Result<Tenancy> {
        self.call_counts.lock().unwrap().get_tenancy += 1;
        self.check_family("tenancy")?;
        self.tenancy
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::NotFound(tenancy_id.to_string()).into())
    }

    async fn list_compartments(
        &self,
        _tenancy_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page<Compartment>> {
        self.call_counts.lock().unwrap().list_compartments += 1;
        self.check_family("compartments")?;
        Ok(Page::last(self.compartments.lock().unwrap().clone()))
    }

    async fn list_instances(
        &self,
        _tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ComputeInstance>> {
        self.call_counts.lock().unwrap().list_instances += 1;
        self.check_family("instances")?;

        if let Some(ref pages) = *self.instance_pages.lock().unwrap() {
            return Ok(page_from(pages, page_token));
        }
        Ok(Page::last(self.instances.lock().unwrap().clone()))
    }

    async fn list_databases(
        &self,
        _tenancy_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page<Database>> {
        self.call_counts.lock().unwrap().list_databases += 1;
        self.check_family("databases")?;
        Ok(Page::last(self.databases.lock().unwrap().clone()))
    }

    async fn list_network_resources(
        &self,
        _tenancy_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page<NetworkResource>> {
        self.call_counts.lock().unwrap().list_network_resources += 1;
        self.check_family("network")?;
        Ok(Page::last(self.network.lock().unwrap().clone()))
    }

    async fn list_users(
        &self,
        _tenancy_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page<IdentityUser>> {
        self.call_counts.lock().unwrap().list_users += 1;
        self.check_family("users")?;
        Ok(Page::last(self.users.lock().unwrap().clone()))
    }

    async fn list_groups(
        &self,
        _tenancy_id: &str,
        _page_token: Option<&str>,
    ) -> Result<Page<IdentityGroup>> {
        self.call_counts.lock().unwrap().list_groups += 1;
        self.check_family("groups")?;
        Ok(Page::last(self.groups.lock().unwrap().clone()))
    }
}

#[async_trait]
impl QueryApi for MockClient {
    async fn query(&self, tool: &str, _params: &Value) -> Result<Value> {
        self.call_counts.lock().unwrap().query += 1;

        if self.fail_tools.lock().unwrap().contains(tool) {
            return Err(ApiError::ServerError(format!("{} unavailable", tool)).into());
        }
        self.query_responses
            .lock()
            .unwrap()
            .get(tool)
            .cloned()
            .ok_or_else(|| ApiError::UnknownTool(tool.to_string()).into())
    }
}

/// Canned analyst for testing LLM-assisted synthesis paths.
pub struct MockAnalyst {
    reply: String,
    fail: bool,
}

impl MockAnalyst {
    pub fn replying(reply: &str) -> Self {
        Self {
            reply: reply.to_string(),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            reply: String::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl Analyst for MockAnalyst {
    async fn analyze(&self, _prompt: &str, _data: &Value, _max_tokens: usize) -> Result<String> {
        if self.fail {
            return Err(ApiError::ServerError("sampling unavailable".to_string()).into());
        }
        Ok(self.reply.clone())
    }
}

/// Convenience fixtures shared by snapshot and skill tests.
pub mod fixtures {
    use super::*;
    use crate::client::NetworkKind;

    pub fn tenancy() -> Tenancy {
        Tenancy {
            id: "ten-1".to_string(),
            name: "acme".to_string(),
            home_region: "us-west-1".to_string(),
            subscribed_regions: vec!["us-west-1".to_string(), "eu-central-1".to_string()],
        }
    }

    pub fn compartment(id: &str, name: &str) -> Compartment {
        Compartment {
            id: id.to_string(),
            name: name.to_string(),
            parent_id: None,
            lifecycle_state: Some("ACTIVE".to_string()),
        }
    }

    pub fn instance(id: &str, name: &str, state: &str) -> ComputeInstance {
        ComputeInstance {
            id: id.to_string(),
            display_name: name.to_string(),
            compartment_id: "c1".to_string(),
            shape: Some("VM.Standard.2".to_string()),
            lifecycle_state: Some(state.to_string()),
            region: Some("us-west-1".to_string()),
        }
    }

    pub fn database(id: &str, name: &str) -> Database {
        Database {
            id: id.to_string(),
            display_name: name.to_string(),
            compartment_id: "c1".to_string(),
            engine: Some("postgres".to_string()),
            lifecycle_state: Some("AVAILABLE".to_string()),
            storage_gb: Some(256),
        }
    }

    pub fn vcn(id: &str, name: &str) -> NetworkResource {
        NetworkResource {
            id: id.to_string(),
            display_name: name.to_string(),
            compartment_id: "c1".to_string(),
            kind: NetworkKind::Vcn,
            cidr_block: Some("10.0.0.0/16".to_string()),
        }
    }

    pub fn user(id: &str, name: &str) -> IdentityUser {
        IdentityUser {
            id: id.to_string(),
            name: name.to_string(),
            email: Some(format!("{}@acme.example", name)),
            lifecycle_state: Some("ACTIVE".to_string()),
        }
    }

    pub fn group(id: &str, name: &str) -> IdentityGroup {
        IdentityGroup {
            id: id.to_string(),
            name: name.to_string(),
            description: None,
        }
    }
}
