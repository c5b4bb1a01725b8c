//! `GET /overlay/listen`: the SSE endpoint overlays connect to.

use std::convert::Infallible;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::response::sse::{Event, Sse};
use axum::routing::get;
use axum::Router;
use futures_util::Stream;
use overlay_common::ChannelId;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use super::router::Subscriber;
use super::session::OverlaySession;
use crate::adapters::OverlayIdVerifier;
use crate::error::ApiError;
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/overlay/listen", get(listen))
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListenParams {
    /// Channel to watch.
    pub channel_id: String,
    /// Overlay id bound to the channel.
    pub overlay_id: String,
}

#[utoipa::path(
    get,
    path = "/overlay/listen",
    tag = "Overlay",
    params(ListenParams),
    responses(
        (status = 200, description = "Event stream", content_type = "text/event-stream"),
        (status = 401, description = "Overlay id not bound to channel", body = crate::error::ApiErrorBody),
        (status = 503, description = "Server is shutting down", body = crate::error::ApiErrorBody),
    ),
)]
pub async fn listen(
    State(state): State<AppState>,
    query: Result<Query<ListenParams>, QueryRejection>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, ApiError> {
    // A missing or unreadable id is the same failure as a wrong one.
    let Query(params) = query.map_err(|rejection| {
        tracing::info!(%rejection, "overlay listen query rejected");
        ApiError::id_mismatch()
    })?;
    let channel = ChannelId::new(params.channel_id);
    let overlay_id = Uuid::parse_str(params.overlay_id.trim()).map_err(|_| ApiError::id_mismatch())?;

    if channel.is_empty() || !state.overlays.verify(&channel, &overlay_id).await? {
        tracing::info!(%channel, %overlay_id, "overlay id rejected");
        return Err(ApiError::id_mismatch());
    }

    let subscription = state.subscriber.subscribe(channel).await?;
    Ok(Sse::new(OverlaySession::new(subscription).into_stream()))
}
