//! Error types for the Tenop CLI

use std::time::Duration;
use thiserror::Error;

/// Result type alias for Tenop operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for the application
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Operation failed: {0}")]
    Other(String),
}

/// API-related errors
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum ApiError {
    #[error("Authentication failed. Run `tenop init` to set up your API key.")]
    Unauthorized,

    #[error("Access denied. You don't have permission to access this resource.")]
    Forbidden,

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Rate limit exceeded. Retry after {0:?}")]
    RateLimit(Duration),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ApiError::Network("Request timed out".to_string())
        } else if err.is_connect() {
            ApiError::Network("Failed to connect to API".to_string())
        } else {
            ApiError::Network(err.to_string())
        }
    }
}

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found. Run `tenop init` to set up.")]
    NotFound,

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to save configuration: {0}")]
    SaveError(String),

    #[error("API key not configured. Run `tenop init` to set up your API key.")]
    MissingApiKey,

    #[error("Tenancy not configured. Run `tenop init --tenancy <ID>` to set the tenancy.")]
    MissingTenancy,
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

/// Response cache errors
#[derive(Debug, Error)]
#[allow(dead_code)]
pub enum CacheError {
    #[error("Could not determine cache directory")]
    NoHome,

    #[error("Cache I/O error: {0}")]
    Io(String),

    #[error("Cache serialization error: {0}")]
    Serialize(String),
}

/// Snapshot lifecycle errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("No snapshot available. Run `tenop snapshot refresh` to build one.")]
    NotAvailable,

    #[error("Snapshot build failed: {0}")]
    BuildFailed(String),

    #[error("Failed to persist snapshot: {0}")]
    Persist(String),

    #[error("Failed to load snapshot: {0}")]
    Load(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_unauthorized_message() {
        let err = ApiError::Unauthorized;
        assert!(err.to_string().contains("tenop init"));
    }

    #[test]
    fn test_api_error_not_found() {
        let err = ApiError::NotFound("Compartment abc-123".to_string());
        assert!(err.to_string().contains("abc-123"));
    }

    #[test]
    fn test_api_error_rate_limit() {
        let err = ApiError::RateLimit(Duration::from_secs(30));
        let msg = err.to_string();
        assert!(msg.contains("Rate limit"));
        assert!(msg.contains("30"));
    }

    #[test]
    fn test_api_error_unknown_tool() {
        let err = ApiError::UnknownTool("cost_by_galaxy".to_string());
        assert!(err.to_string().contains("cost_by_galaxy"));
    }

    #[test]
    fn test_config_error_missing_api_key() {
        let err = ConfigError::MissingApiKey;
        assert!(err.to_string().contains("tenop init"));
    }

    #[test]
    fn test_snapshot_error_not_available() {
        let err = SnapshotError::NotAvailable;
        assert!(err.to_string().contains("snapshot refresh"));
    }

    #[test]
    fn test_error_from_api_error() {
        let api_err = ApiError::Forbidden;
        let err: Error = api_err.into();

        match err {
            Error::Api(ApiError::Forbidden) => (),
            _ => panic!("Expected Error::Api(ApiError::Forbidden)"),
        }
    }

    #[test]
    fn test_error_from_snapshot_error() {
        let snap_err = SnapshotError::BuildFailed("listing timed out".to_string());
        let err: Error = snap_err.into();

        match err {
            Error::Snapshot(SnapshotError::BuildFailed(msg)) => {
                assert!(msg.contains("timed out"));
            }
            _ => panic!("Expected Error::Snapshot(SnapshotError::BuildFailed)"),
        }
    }

    #[test]
    fn test_config_error_from_yaml_error() {
        let yaml_str = "invalid: [yaml: content";
        let yaml_err = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let config_err: ConfigError = yaml_err.into();

        match config_err {
            ConfigError::ParseError(_) => (),
            _ => panic!("Expected ConfigError::ParseError"),
        }
    }
}
