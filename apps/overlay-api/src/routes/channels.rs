//! Chat-bot producer endpoints: viewers joining, leaving, acting, and
//! changing items on a channel's overlay.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use overlay_common::{ChannelId, ViewerId};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::adapters::{ItemCatalog, SelectedItemLookup, UsernameLookup};
use crate::error::{ApiError, FieldError};
use crate::models::item::Item;
use crate::stream::events::Viewer;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/channels/{channel_id}/users", post(join_channel))
        .route(
            "/channels/{channel_id}/users/{user_id}",
            put(update_viewer).delete(part_channel),
        )
        .route(
            "/channels/{channel_id}/users/{user_id}/{action}",
            post(viewer_action),
        )
}

// ---------------------------------------------------------------------------
// POST /channels/:channel_id/users
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct JoinRequest {
    pub user_id: String,
    /// Resolved from the platform when omitted.
    #[serde(default)]
    pub username: Option<String>,
}

#[utoipa::path(
    post,
    path = "/channels/{channel_id}/users",
    tag = "Channels",
    params(("channel_id" = String, Path, description = "Channel ID")),
    request_body = JoinRequest,
    responses(
        (status = 204, description = "Viewer announced"),
        (status = 400, description = "Unknown user or no usable item", body = crate::error::ApiErrorBody),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn join_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<String>,
    Json(body): Json<JoinRequest>,
) -> Result<StatusCode, ApiError> {
    let channel = ChannelId::new(channel_id);
    let viewer_id = ViewerId::new(body.user_id.trim());
    if viewer_id.is_empty() {
        return Err(ApiError::validation(vec![FieldError::new(
            "user_id",
            "user_id is required",
        )]));
    }

    let username = match body
        .username
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
    {
        Some(name) => name,
        None => state
            .usernames
            .username(&viewer_id)
            .await?
            .ok_or_else(|| ApiError::not_found("User not found"))?,
    };

    let image = state
        .selected_items
        .selected_image(&channel, &viewer_id)
        .await?
        .ok_or_else(|| ApiError::not_found("No selected or default item"))?;

    state
        .announcer
        .announce_join(&channel, Viewer::new(viewer_id, username, image))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// DELETE /channels/:channel_id/users/:user_id
// ---------------------------------------------------------------------------

#[utoipa::path(
    delete,
    path = "/channels/{channel_id}/users/{user_id}",
    tag = "Channels",
    params(
        ("channel_id" = String, Path, description = "Channel ID"),
        ("user_id" = String, Path, description = "Viewer ID"),
    ),
    responses(
        (status = 204, description = "Viewer removed"),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn part_channel(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .announcer
        .announce_part(&ChannelId::new(channel_id), &ViewerId::new(user_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /channels/:channel_id/users/:user_id/:action
// ---------------------------------------------------------------------------

#[utoipa::path(
    post,
    path = "/channels/{channel_id}/users/{user_id}/{action}",
    tag = "Channels",
    params(
        ("channel_id" = String, Path, description = "Channel ID"),
        ("user_id" = String, Path, description = "Viewer ID"),
        ("action" = String, Path, description = "Animation name, e.g. JUMP"),
    ),
    responses(
        (status = 204, description = "Action announced"),
        (status = 400, description = "Invalid action", body = crate::error::ApiErrorBody),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn viewer_action(
    State(state): State<AppState>,
    Path((channel_id, user_id, action)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    state
        .announcer
        .announce_action(&ChannelId::new(channel_id), &ViewerId::new(user_id), &action)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// PUT /channels/:channel_id/users/:user_id
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateViewerRequest {
    pub item_name: String,
}

#[utoipa::path(
    put,
    path = "/channels/{channel_id}/users/{user_id}",
    tag = "Channels",
    params(
        ("channel_id" = String, Path, description = "Channel ID"),
        ("user_id" = String, Path, description = "Viewer ID"),
    ),
    request_body = UpdateViewerRequest,
    responses(
        (status = 204, description = "Item selected and announced"),
        (status = 400, description = "Unknown or unowned item", body = crate::error::ApiErrorBody),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn update_viewer(
    State(state): State<AppState>,
    Path((channel_id, user_id)): Path<(String, String)>,
    Json(body): Json<UpdateViewerRequest>,
) -> Result<StatusCode, ApiError> {
    let channel = ChannelId::new(channel_id);
    let viewer_id = ViewerId::new(user_id);

    let item = state
        .items
        .item_by_name(body.item_name.trim())
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    select_and_announce(&state, &channel, &viewer_id, &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Check the viewer may use `item`, persist it as their selection on
/// `channel`, and push the new image to the channel's overlays.
pub(crate) async fn select_and_announce(
    state: &AppState,
    channel: &ChannelId,
    viewer_id: &ViewerId,
    item: &Item,
) -> Result<(), ApiError> {
    ensure_usable(state.items.as_ref(), viewer_id, item).await?;
    state.items.select_item(channel, viewer_id, item.id).await?;
    state
        .announcer
        .announce_update(channel, viewer_id, &item.image)
        .await
}

async fn ensure_usable(items: &dyn ItemCatalog, viewer_id: &ViewerId, item: &Item) -> Result<(), ApiError> {
    if item.is_default || items.owns_item(viewer_id, item.id).await? {
        Ok(())
    } else {
        Err(ApiError::bad_request("Viewer does not own this item"))
    }
}
