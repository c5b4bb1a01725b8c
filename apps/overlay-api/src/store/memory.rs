//! In-memory store for tests and local runs without PostgreSQL.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use overlay_common::{ChannelId, ViewerId};
use parking_lot::Mutex;
use uuid::Uuid;

use crate::adapters::{ItemCatalog, OverlayIdVerifier, SelectedItemLookup};
use crate::error::ApiError;
use crate::models::item::Item;

#[derive(Default)]
struct Inner {
    items: HashMap<Uuid, Item>,
    overlays: HashMap<ChannelId, Uuid>,
    ownership: HashSet<(ViewerId, Uuid)>,
    selections: HashMap<(ChannelId, ViewerId), Uuid>,
}

impl Inner {
    fn default_item(&self) -> Option<&Item> {
        self.items.values().find(|item| item.is_default)
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item to the catalog. A new default item replaces the old one.
    pub fn insert_item(&self, item: Item) -> Item {
        let mut inner = self.inner.lock();
        if item.is_default {
            for existing in inner.items.values_mut() {
                existing.is_default = false;
            }
        }
        inner.items.insert(item.id, item.clone());
        item
    }

    /// Register a channel with a fresh overlay id.
    pub fn register_channel(&self, channel: &ChannelId) -> Uuid {
        let overlay_id = Uuid::new_v4();
        self.inner.lock().overlays.insert(channel.clone(), overlay_id);
        overlay_id
    }

    pub fn selection(&self, channel: &ChannelId, viewer: &ViewerId) -> Option<Uuid> {
        self.inner
            .lock()
            .selections
            .get(&(channel.clone(), viewer.clone()))
            .copied()
    }
}

#[async_trait]
impl SelectedItemLookup for MemoryStore {
    async fn selected_image(&self, channel: &ChannelId, viewer: &ViewerId) -> Result<Option<String>, ApiError> {
        let inner = self.inner.lock();
        let selected = inner
            .selections
            .get(&(channel.clone(), viewer.clone()))
            .and_then(|id| inner.items.get(id));
        Ok(selected.or_else(|| inner.default_item()).map(|item| item.image.clone()))
    }
}

#[async_trait]
impl ItemCatalog for MemoryStore {
    async fn item_by_name(&self, name: &str) -> Result<Option<Item>, ApiError> {
        Ok(self
            .inner
            .lock()
            .items
            .values()
            .find(|item| item.name == name)
            .cloned())
    }

    async fn item_by_id(&self, id: Uuid) -> Result<Option<Item>, ApiError> {
        Ok(self.inner.lock().items.get(&id).cloned())
    }

    async fn select_item(&self, channel: &ChannelId, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError> {
        self.inner
            .lock()
            .selections
            .insert((channel.clone(), viewer.clone()), item_id);
        Ok(())
    }

    async fn grant_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError> {
        self.inner.lock().ownership.insert((viewer.clone(), item_id));
        Ok(())
    }

    async fn owns_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<bool, ApiError> {
        Ok(self.inner.lock().ownership.contains(&(viewer.clone(), item_id)))
    }
}

#[async_trait]
impl OverlayIdVerifier for MemoryStore {
    async fn verify(&self, channel: &ChannelId, overlay_id: &Uuid) -> Result<bool, ApiError> {
        Ok(self.inner.lock().overlays.get(channel) == Some(overlay_id))
    }
}
