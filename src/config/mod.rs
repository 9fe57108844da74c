//! Configuration management for Tenop

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{ConfigError, Result};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the credentials profile this config represents
    #[serde(default = "default_profile")]
    pub profile: String,

    /// API key for the cloud endpoint
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Custom API endpoint (defaults to the public endpoint)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Tenancy all operations are scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tenancy_id: Option<String>,

    /// Region listings are scoped to
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Override for the snapshot/cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// User preferences
    #[serde(default)]
    pub preferences: Preferences,
}

/// User preferences
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preferences {
    /// Default output format
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,

    /// Snapshot age past which commands trigger a rebuild, in minutes
    #[serde(default = "default_max_snapshot_age")]
    pub max_snapshot_age_minutes: f64,
}

fn default_profile() -> String {
    "default".to_string()
}

fn default_max_snapshot_age() -> f64 {
    24.0 * 60.0
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            format: None,
            max_snapshot_age_minutes: default_max_snapshot_age(),
        }
    }
}

impl Config {
    /// Get the default config file path
    pub fn default_path() -> Result<PathBuf> {
        let home = dirs::home_dir().ok_or(ConfigError::Invalid(
            "Could not determine home directory".to_string(),
        ))?;

        Ok(home.join(".tenop").join("config.yaml"))
    }

    /// Resolve a config path override, falling back to the default location
    pub fn resolve_path(path: Option<&str>) -> Result<PathBuf> {
        match path {
            Some(p) => Ok(PathBuf::from(p)),
            None => Self::default_path(),
        }
    }

    /// Load configuration from an optional path override
    pub fn load_at(path: Option<&str>) -> Result<Self> {
        Self::load_from(Self::resolve_path(path)?)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: PathBuf) -> Result<Self> {
        if !path.exists() {
            return Err(ConfigError::NotFound.into());
        }

        let contents = std::fs::read_to_string(&path)?;
        let config: Config = serde_yaml::from_str(&contents).map_err(ConfigError::from)?;

        Ok(config)
    }

    /// Save configuration to an optional path override
    pub fn save_at(&self, path: Option<&str>) -> Result<()> {
        self.save_to(Self::resolve_path(path)?)
    }

    /// Save configuration to a specific path
    pub fn save_to(&self, path: PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents =
            serde_yaml::to_string(self).map_err(|e| ConfigError::SaveError(e.to_string()))?;

        std::fs::write(&path, contents)?;

        // Config holds an API key: owner read/write only.
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mut perms = std::fs::metadata(&path)?.permissions();
            perms.set_mode(0o600);
            std::fs::set_permissions(&path, perms)?;
        }

        Ok(())
    }

    /// Validate that required configuration is present
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_none() {
            return Err(ConfigError::MissingApiKey.into());
        }
        if self.tenancy_id.is_none() {
            return Err(ConfigError::MissingTenancy.into());
        }
        Ok(())
    }

    /// Region with a sensible default
    pub fn region(&self) -> &str {
        self.region.as_deref().unwrap_or("us-west-1")
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_key: None,
            endpoint: None,
            tenancy_id: None,
            region: None,
            cache_dir: None,
            preferences: Preferences::default(),
        }
    }
}
