//! Client for the streaming platform's user API.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use overlay_common::ViewerId;
use serde::Deserialize;
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::adapters::UsernameLookup;
use crate::error::ApiError;

/// How long a resolved username is reused before asking the platform again.
const USERNAME_TTL: Duration = Duration::from_secs(600);

#[derive(Debug, Deserialize)]
struct UsersResponse {
    data: Vec<HelixUser>,
}

#[derive(Debug, Deserialize)]
struct HelixUser {
    id: String,
    login: String,
    #[serde(default)]
    display_name: String,
}

/// Resolves user ids to display names via `GET {base}/users?id=`.
#[derive(Clone)]
pub struct HelixClient {
    base_url: String,
    client_id: String,
    token: Option<String>,
    http: reqwest::Client,
    cache: Arc<RwLock<HashMap<ViewerId, (String, Instant)>>>,
}

impl HelixClient {
    pub fn new(base_url: &str, client_id: &str, token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.to_string(),
            token,
            http: reqwest::Client::new(),
            cache: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    async fn cached(&self, viewer: &ViewerId) -> Option<String> {
        let cache = self.cache.read().await;
        cache
            .get(viewer)
            .filter(|(_, at)| at.elapsed() < USERNAME_TTL)
            .map(|(name, _)| name.clone())
    }

    /// Store a resolved name. Expired entries are evicted on every insert so
    /// the cache only holds names seen within the TTL.
    async fn remember(&self, viewer: &ViewerId, name: &str) {
        let mut cache = self.cache.write().await;
        cache.retain(|_, (_, at)| at.elapsed() < USERNAME_TTL);
        cache.insert(viewer.clone(), (name.to_string(), Instant::now()));
    }

    async fn fetch(&self, viewer: &ViewerId) -> Result<Option<String>, ApiError> {
        let url = format!("{}/users", self.base_url);
        tracing::debug!(%url, user_id = %viewer, "resolving username");

        let mut request = self
            .http
            .get(&url)
            .query(&[("id", viewer.as_str())])
            .header("Client-Id", &self.client_id);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request
            .send()
            .await
            .map_err(|e| ApiError::upstream(format!("user lookup failed: {e}")))?
            .error_for_status()
            .map_err(|e| ApiError::upstream(format!("user lookup rejected: {e}")))?;

        let body: UsersResponse = resp
            .json()
            .await
            .map_err(|e| ApiError::upstream(format!("user lookup parse failed: {e}")))?;

        Ok(body
            .data
            .into_iter()
            .find(|user| user.id == viewer.as_str())
            .map(|user| {
                if user.display_name.is_empty() {
                    user.login
                } else {
                    user.display_name
                }
            }))
    }
}

#[async_trait]
impl UsernameLookup for HelixClient {
    async fn username(&self, viewer: &ViewerId) -> Result<Option<String>, ApiError> {
        if let Some(name) = self.cached(viewer).await {
            return Ok(Some(name));
        }

        let name = self.fetch(viewer).await?;
        if let Some(name) = &name {
            self.remember(viewer, name).await;
        }
        Ok(name)
    }
}
