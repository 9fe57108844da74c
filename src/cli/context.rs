//! Command execution context
//!
//! One place to load config, build the API client, and wire up the shared
//! cache and snapshot store that every command uses.

use std::sync::Arc;

use crate::cache::{CachedQueryClient, TieredCache};
use crate::cli::OutputFormat;
use crate::client::{QueryApi, RestClient, TenancyApi};
use crate::config::Config;
use crate::error::Result;
use crate::skills::SkillExecutor;
use crate::snapshot::SnapshotStore;

/// Context for command execution containing config, client, and shared state.
///
/// The snapshot store and cache are constructed once here and passed by
/// handle, so every command in the process shares the same instances.
pub struct CommandContext {
    /// Loaded and validated configuration
    pub config: Config,
    /// Live API client (Arc-wrapped for shared use)
    pub client: Arc<RestClient>,
    /// Tiered response cache
    pub cache: Arc<TieredCache>,
    /// Snapshot store over the configured cache directory
    pub store: Arc<SnapshotStore>,
    /// Output format preference
    pub format: OutputFormat,
    /// Whether responses bypass the cache
    pub no_cache: bool,
}

impl CommandContext {
    /// Create a new command context with full initialization.
    ///
    /// # Errors
    /// Returns an error if config cannot be loaded or is missing the API key
    /// or tenancy.
    pub fn new(
        format: OutputFormat,
        region_override: Option<&str>,
        config_path: Option<&str>,
        no_cache: bool,
    ) -> Result<Self> {
        let mut config = Config::load_at(config_path)?;
        config.validate()?;

        if let Some(region) = region_override {
            config.region = Some(region.to_string());
        }

        let api_key = config.api_key.clone().unwrap_or_default();
        let client = Arc::new(match config.endpoint.clone() {
            Some(endpoint) => RestClient::with_base_url(api_key, endpoint)?,
            None => RestClient::new(api_key)?,
        });

        let cache_dir = match config.cache_dir.clone() {
            Some(dir) => dir,
            None => SnapshotStore::default_cache_dir()?,
        };
        let tenancy_id = config.tenancy_id.clone().unwrap_or_default();
        let store = Arc::new(SnapshotStore::new(
            Arc::clone(&client) as Arc<dyn TenancyApi>,
            config.profile.clone(),
            tenancy_id,
            config.region().to_string(),
            cache_dir,
        ));

        Ok(Self {
            config,
            client,
            cache: Arc::new(TieredCache::new()),
            store,
            format,
            no_cache,
        })
    }

    /// Tenancy ID; guaranteed present after validation.
    pub fn tenancy_id(&self) -> &str {
        self.config.tenancy_id.as_deref().unwrap_or_default()
    }

    /// Snapshot staleness threshold from preferences.
    pub fn max_snapshot_age_minutes(&self) -> f64 {
        self.config.preferences.max_snapshot_age_minutes
    }

    /// Build a skill executor for one report invocation.
    ///
    /// Query calls go through the tiered cache unless `--no-cache` was given.
    pub fn skill_executor(&self) -> SkillExecutor {
        if self.no_cache {
            SkillExecutor::new(Arc::clone(&self.client) as Arc<dyn QueryApi>)
        } else {
            let cached =
                CachedQueryClient::new(Arc::clone(&self.client), Arc::clone(&self.cache));
            SkillExecutor::new(Arc::new(cached) as Arc<dyn QueryApi>)
        }
    }
}
