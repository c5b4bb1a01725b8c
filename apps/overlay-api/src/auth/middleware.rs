//! Extension JWT extraction.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use overlay_common::{ChannelId, ViewerId};

use crate::adapters::TokenVerifier;
use crate::auth::extension::ExtensionClaims;
use crate::error::ApiError;
use crate::AppState;

/// Header the extension frontend may use instead of `Authorization`.
pub const EXTENSION_JWT_HEADER: &str = "x-extension-jwt";

/// A viewer authenticated by an extension JWT who has shared their identity.
#[derive(Debug, Clone)]
pub struct ExtensionUser {
    pub channel: ChannelId,
    pub viewer: ViewerId,
    pub claims: ExtensionClaims,
}

impl FromRequestParts<AppState> for ExtensionUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)
            .ok_or_else(|| ApiError::invalid_token("Missing extension token"))?;

        let claims = state.tokens.verify_extension(token)?;

        let viewer = claims
            .user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .map(ViewerId::from)
            .ok_or_else(|| ApiError::invalid_token("Viewer has not shared their identity"))?;

        Ok(ExtensionUser {
            channel: claims.channel(),
            viewer,
            claims,
        })
    }
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    if let Some(header) = parts.headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok()) {
        return header.strip_prefix("Bearer ").map(str::trim);
    }
    parts
        .headers
        .get(EXTENSION_JWT_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
}
