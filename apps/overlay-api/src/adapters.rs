//! Collaborators the overlay core reaches through narrow interfaces.
//!
//! Storage, identity, and the platform API each sit behind one of these
//! traits so handlers and tests can swap implementations freely.

use async_trait::async_trait;
use overlay_common::{ChannelId, ViewerId};
use uuid::Uuid;

use crate::auth::extension::{ExtensionClaims, ReceiptClaims};
use crate::error::ApiError;
use crate::models::item::Item;

/// Resolves the image a joining viewer shows on a channel's overlay.
#[async_trait]
pub trait SelectedItemLookup: Send + Sync {
    /// The viewer's selected item image on `channel`, falling back to the
    /// default item. `None` when neither exists.
    async fn selected_image(&self, channel: &ChannelId, viewer: &ViewerId) -> Result<Option<String>, ApiError>;
}

/// Item catalog, ownership, and per-channel selections.
#[async_trait]
pub trait ItemCatalog: Send + Sync {
    async fn item_by_name(&self, name: &str) -> Result<Option<Item>, ApiError>;

    async fn item_by_id(&self, id: Uuid) -> Result<Option<Item>, ApiError>;

    /// Record `item_id` as the viewer's selection on `channel`, replacing any
    /// previous one.
    async fn select_item(&self, channel: &ChannelId, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError>;

    /// Idempotent.
    async fn grant_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<(), ApiError>;

    async fn owns_item(&self, viewer: &ViewerId, item_id: Uuid) -> Result<bool, ApiError>;
}

#[async_trait]
pub trait UsernameLookup: Send + Sync {
    /// Display name for a platform user id, `None` if the user does not exist.
    async fn username(&self, viewer: &ViewerId) -> Result<Option<String>, ApiError>;
}

/// Checks that an overlay id is the one bound to a channel.
#[async_trait]
pub trait OverlayIdVerifier: Send + Sync {
    async fn verify(&self, channel: &ChannelId, overlay_id: &Uuid) -> Result<bool, ApiError>;
}

/// Signed token parsing. Verification is local, so this is synchronous.
pub trait TokenVerifier: Send + Sync {
    fn verify_extension(&self, token: &str) -> Result<ExtensionClaims, ApiError>;

    fn verify_receipt(&self, token: &str) -> Result<ReceiptClaims, ApiError>;
}
