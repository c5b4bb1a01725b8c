pub mod channels;
pub mod extension;
pub mod health;

use axum::Router;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(crate::stream::server::router())
        .merge(channels::router())
        .merge(extension::router())
}

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health,
        // Overlay
        crate::stream::server::listen,
        // Channels
        channels::join_channel,
        channels::part_channel,
        channels::viewer_action,
        channels::update_viewer,
        // Extension
        extension::select_item,
        extension::redeem_purchase,
    ),
    components(
        schemas(
            crate::error::ApiErrorBody,
            crate::error::FieldError,
            crate::models::item::Item,
            crate::stream::events::Viewer,
            health::HealthResponse,
            channels::JoinRequest,
            channels::UpdateViewerRequest,
            extension::SelectItemRequest,
            extension::PurchaseRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check"),
        (name = "Overlay", description = "Overlay event stream"),
        (name = "Channels", description = "Chat-bot producer endpoints"),
        (name = "Extension", description = "Extension panel endpoints"),
    )
)]
pub struct ApiDoc;
