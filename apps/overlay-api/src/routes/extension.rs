//! Endpoints called by the extension panel with an extension JWT.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{post, put};
use axum::{Json, Router};
use serde::Deserialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::adapters::{ItemCatalog, TokenVerifier};
use crate::auth::middleware::ExtensionUser;
use crate::error::ApiError;
use crate::routes::channels::select_and_announce;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/extension/items", put(select_item))
        .route("/extension/purchases", post(redeem_purchase))
}

// ---------------------------------------------------------------------------
// PUT /extension/items
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct SelectItemRequest {
    pub item_id: Uuid,
}

#[utoipa::path(
    put,
    path = "/extension/items",
    tag = "Extension",
    request_body = SelectItemRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Item selected and announced"),
        (status = 400, description = "Unknown or unowned item", body = crate::error::ApiErrorBody),
        (status = 401, description = "Missing or invalid extension token", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn select_item(
    user: ExtensionUser,
    State(state): State<AppState>,
    Json(body): Json<SelectItemRequest>,
) -> Result<StatusCode, ApiError> {
    let item = state
        .items
        .item_by_id(body.item_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    select_and_announce(&state, &user.channel, &user.viewer, &item).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /extension/purchases
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize, ToSchema)]
pub struct PurchaseRequest {
    /// Signed transaction receipt from the platform.
    pub receipt: String,
}

#[utoipa::path(
    post,
    path = "/extension/purchases",
    tag = "Extension",
    request_body = PurchaseRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Item granted"),
        (status = 400, description = "Receipt names an unknown item", body = crate::error::ApiErrorBody),
        (status = 401, description = "Invalid token or receipt", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn redeem_purchase(
    user: ExtensionUser,
    State(state): State<AppState>,
    Json(body): Json<PurchaseRequest>,
) -> Result<StatusCode, ApiError> {
    let receipt = state.tokens.verify_receipt(&body.receipt)?;
    if receipt.buyer() != user.viewer {
        return Err(ApiError::invalid_receipt("Receipt belongs to another user"));
    }

    let sku = &receipt.data.product.sku;
    let item = state
        .items
        .item_by_name(sku)
        .await?
        .ok_or_else(|| ApiError::not_found("Item not found"))?;

    state.items.grant_item(&user.viewer, item.id).await?;

    tracing::info!(
        user_id = %user.viewer,
        item = %item.name,
        transaction_id = %receipt.data.transaction_id,
        "purchase redeemed"
    );

    Ok(StatusCode::NO_CONTENT)
}
