//! REST implementation of the tenancy API collaborators
//!
//! Speaks JSON over HTTPS with bearer-key auth and client-side rate limiting.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client as HttpClient, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::{
    Compartment, ComputeInstance, Database, IdentityGroup, IdentityUser, NetworkResource, Page,
    QueryApi, Tenancy, TenancyApi,
};
use crate::error::{ApiError, Result};

/// Default API base URL
const API_BASE_URL: &str = "https://api.tenop.cloud/v1";

/// Rate limit: 300 requests per minute (5 per second)
const RATE_LIMIT_PER_SECOND: u32 = 5;

/// REST API client for tenancy listings and query tools
pub struct RestClient {
    http: HttpClient,
    base_url: String,
    api_key: String,
    rate_limiter: Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RestClient {
    /// Create a new client against the default endpoint.
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, API_BASE_URL.to_string())
    }

    /// Create a new client against a custom endpoint (config override, tests).
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let quota = Quota::per_second(
            std::num::NonZeroU32::new(RATE_LIMIT_PER_SECOND)
                .ok_or_else(|| ApiError::Network("invalid rate limit quota".to_string()))?,
        );
        let rate_limiter = Arc::new(RateLimiter::direct(quota));

        Ok(Self {
            http,
            base_url,
            api_key,
            rate_limiter,
        })
    }

    /// GET a JSON document from an API path.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        page_token: Option<&str>,
    ) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let mut request = self
            .http
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key));
        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token)]);
        }

        let response = request.send().await.map_err(ApiError::from)?;
        Self::decode(response).await
    }

    /// POST a JSON body to an API path and decode the reply.
    async fn post_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let url = format!("{}{}", self.base_url, path);
        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(body)
            .send()
            .await
            .map_err(ApiError::from)?;
        Self::decode(response).await
    }

    /// Map response status to a typed result.
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let status = response.status();
        match status {
            StatusCode::OK => {
                let data = response.json::<T>().await.map_err(|e| {
                    ApiError::InvalidResponse(format!("Failed to parse response: {}", e))
                })?;
                Ok(data)
            }
            StatusCode::UNAUTHORIZED => Err(ApiError::Unauthorized.into()),
            StatusCode::FORBIDDEN => Err(ApiError::Forbidden.into()),
            StatusCode::NOT_FOUND => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Resource not found".to_string());
                Err(ApiError::NotFound(error_msg).into())
            }
            StatusCode::TOO_MANY_REQUESTS => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(60);
                Err(ApiError::RateLimit(Duration::from_secs(retry_after)).into())
            }
            StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| "Bad request".to_string());
                Err(ApiError::BadRequest(error_msg).into())
            }
            status if status.is_server_error() => {
                let error_msg = response
                    .text()
                    .await
                    .unwrap_or_else(|_| format!("Server error: {}", status));
                Err(ApiError::ServerError(error_msg).into())
            }
            _ => {
                let error_msg = format!("Unexpected status code: {}", status);
                Err(ApiError::InvalidResponse(error_msg).into())
            }
        }
    }
}

#[async_trait]
impl TenancyApi for RestClient {
    async fn get_tenancy(&self, tenancy_id: &str) -> Result<Tenancy> {
        self.get_json(&format!("/tenancies/{}", tenancy_id), None)
            .await
    }

    async fn list_compartments(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Compartment>> {
        self.get_json(&format!("/tenancies/{}/compartments", tenancy_id), page_token)
            .await
    }

    async fn list_instances(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<ComputeInstance>> {
        self.get_json(&format!("/tenancies/{}/instances", tenancy_id), page_token)
            .await
    }

    async fn list_databases(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<Database>> {
        self.get_json(&format!("/tenancies/{}/databases", tenancy_id), page_token)
            .await
    }

    async fn list_network_resources(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<NetworkResource>> {
        self.get_json(&format!("/tenancies/{}/network", tenancy_id), page_token)
            .await
    }

    async fn list_users(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<IdentityUser>> {
        self.get_json(&format!("/tenancies/{}/users", tenancy_id), page_token)
            .await
    }

    async fn list_groups(
        &self,
        tenancy_id: &str,
        page_token: Option<&str>,
    ) -> Result<Page<IdentityGroup>> {
        self.get_json(&format!("/tenancies/{}/groups", tenancy_id), page_token)
            .await
    }
}

#[async_trait]
impl QueryApi for RestClient {
    async fn query(&self, tool: &str, params: &Value) -> Result<Value> {
        self.post_json(&format!("/tools/{}", tool), params).await
    }
}
