#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum_test::TestServer;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use overlay_common::{ChannelId, ViewerId};
use parking_lot::Mutex;
use serde_json::json;

use overlay_api::adapters::UsernameLookup;
use overlay_api::auth::extension::{JwtVerifier, RECEIPT_TOPIC};
use overlay_api::config::Config;
use overlay_api::error::ApiError;
use overlay_api::models::item::Item;
use overlay_api::store::memory::MemoryStore;
use overlay_api::stream::router::{EventRouter, RouterConfig, RouterHandle};
use overlay_api::AppState;

pub const TEST_SECRET: &[u8] = b"overlay-test-secret";

pub fn test_config() -> Config {
    Config {
        client_id: "test-client".to_string(),
        client_secret: String::new(),
        database_url: "postgres://localhost/overlay_test".to_string(),
        cors_origins: Vec::new(),
        port: 0,
        helix_url: "http://127.0.0.1:1".to_string(),
        helix_token: None,
        subscriber_queue_capacity: 256,
    }
}

/// Username lookup backed by a fixed map.
#[derive(Default)]
pub struct StubUsernames {
    names: Mutex<HashMap<ViewerId, String>>,
}

impl StubUsernames {
    pub fn insert(&self, viewer: &str, name: &str) {
        self.names.lock().insert(ViewerId::from(viewer), name.to_string());
    }
}

#[async_trait]
impl UsernameLookup for StubUsernames {
    async fn username(&self, viewer: &ViewerId) -> Result<Option<String>, ApiError> {
        Ok(self.names.lock().get(viewer).cloned())
    }
}

/// Everything a test needs to drive the app and inspect its collaborators.
pub struct TestApp {
    pub state: AppState,
    pub router: RouterHandle,
    pub store: Arc<MemoryStore>,
    pub usernames: Arc<StubUsernames>,
    /// Default item every viewer can use.
    pub default_item: Item,
}

impl TestApp {
    pub fn new() -> Self {
        let router = EventRouter::spawn(RouterConfig::default());
        let store = Arc::new(MemoryStore::new());
        let usernames = Arc::new(StubUsernames::default());
        let default_item = store.insert_item(Item::default_item("plain", "plain.png"));

        let state = AppState::new(
            test_config(),
            router.clone(),
            store.clone(),
            usernames.clone(),
            Arc::new(JwtVerifier::new(TEST_SECRET)),
        );

        Self {
            state,
            router,
            store,
            usernames,
            default_item,
        }
    }

    pub fn app(&self) -> Router {
        Router::new()
            .merge(overlay_api::routes::router())
            .with_state(self.state.clone())
    }

    pub fn server(&self) -> TestServer {
        TestServer::new(self.app()).unwrap()
    }

    /// Serve the app on an ephemeral port and return its base URL.
    pub async fn spawn_http(&self) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = self.app();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }
}

fn exp() -> i64 {
    chrono::Utc::now().timestamp() + 300
}

fn sign(claims: &serde_json::Value) -> String {
    jsonwebtoken::encode(
        &Header::new(Algorithm::HS256),
        claims,
        &EncodingKey::from_secret(TEST_SECRET),
    )
    .unwrap()
}

/// Extension JWT for a viewer who has shared their identity.
pub fn extension_token(channel: &ChannelId, user_id: &str) -> String {
    sign(&json!({
        "exp": exp(),
        "channel_id": channel.as_str(),
        "user_id": user_id,
        "opaque_user_id": format!("U{user_id}"),
        "role": "viewer",
    }))
}

/// Extension JWT for a viewer who has not shared their identity.
pub fn anonymous_extension_token(channel: &ChannelId) -> String {
    sign(&json!({
        "exp": exp(),
        "channel_id": channel.as_str(),
        "opaque_user_id": "ARxyz",
        "role": "viewer",
    }))
}

pub fn receipt(user_id: &str, sku: &str) -> String {
    sign(&json!({
        "topic": RECEIPT_TOPIC,
        "exp": exp(),
        "data": {
            "transactionId": "tx-1",
            "userId": user_id,
            "time": "2024-01-01T00:00:00Z",
            "product": { "sku": sku, "domainId": "twitch.ext.test" },
        },
    }))
}
