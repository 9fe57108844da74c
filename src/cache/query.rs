//! Cached wrapper for the query collaborator
//!
//! Wraps any `QueryApi` so repeated tool calls within a tier's TTL are served
//! from memory. Tools map to tiers by how volatile their answers are.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{CacheTier, TieredCache, cache_key};
use crate::client::QueryApi;
use crate::error::Result;

/// Tier assignment per query tool.
///
/// Cost aggregates move slowly, utilization metrics churn, everything else
/// (topology, discovery) sits in between.
fn tier_for_tool(tool: &str) -> CacheTier {
    match tool {
        "tenancy_info" | "regions" => CacheTier::Static,
        t if t.starts_with("cost_") => CacheTier::Config,
        t if t.starts_with("metrics_") || t.ends_with("_utilization") => CacheTier::Metrics,
        _ => CacheTier::Operational,
    }
}

/// Caching wrapper for any `QueryApi` implementation.
pub struct CachedQueryClient<Q: QueryApi> {
    inner: Arc<Q>,
    cache: Arc<TieredCache>,
}

impl<Q: QueryApi> CachedQueryClient<Q> {
    pub fn new(inner: Arc<Q>, cache: Arc<TieredCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl<Q: QueryApi + 'static> QueryApi for CachedQueryClient<Q> {
    async fn query(&self, tool: &str, params: &Value) -> Result<Value> {
        // serde_json maps iterate sorted by key, so this rendering is stable.
        let params_repr = params.to_string();
        let key = cache_key(tool, None, &[("params", &params_repr)]);
        let tier = tier_for_tool(tool);

        let inner = Arc::clone(&self.inner);
        self.cache
            .get_or_compute(tier, &key, || async move {
                log::debug!("Cache miss: {} ({})", tool, tier.name());
                inner.query(tool, params).await
            })
            .await
    }
}
