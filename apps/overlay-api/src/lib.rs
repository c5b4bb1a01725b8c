pub mod adapters;
pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod routes;
pub mod store;
pub mod stream;
pub mod upstream;

use std::sync::Arc;

use adapters::{ItemCatalog, OverlayIdVerifier, SelectedItemLookup, TokenVerifier, UsernameLookup};
use config::Config;
use stream::announce::Announcer;
use stream::router::{RouterHandle, Subscriber};

/// Shared application state available to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Lifecycle and stats access to the event router.
    pub router: RouterHandle,
    pub announcer: Announcer,
    pub subscriber: Arc<dyn Subscriber>,
    pub selected_items: Arc<dyn SelectedItemLookup>,
    pub items: Arc<dyn ItemCatalog>,
    pub overlays: Arc<dyn OverlayIdVerifier>,
    pub usernames: Arc<dyn UsernameLookup>,
    pub tokens: Arc<dyn TokenVerifier>,
}

impl AppState {
    /// Wire the router and one store that serves items, selections, and
    /// overlay bindings.
    pub fn new<S>(
        config: Config,
        router: RouterHandle,
        store: Arc<S>,
        usernames: Arc<dyn UsernameLookup>,
        tokens: Arc<dyn TokenVerifier>,
    ) -> Self
    where
        S: SelectedItemLookup + ItemCatalog + OverlayIdVerifier + 'static,
    {
        Self {
            config: Arc::new(config),
            announcer: Announcer::new(Arc::new(router.clone())),
            subscriber: Arc::new(router.clone()),
            router,
            selected_items: store.clone(),
            items: store.clone(),
            overlays: store,
            usernames,
            tokens,
        }
    }
}
