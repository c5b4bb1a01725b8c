//! Typed producer entry points. HTTP handlers never build events by hand.

use std::sync::Arc;

use overlay_common::{ChannelId, ViewerId};

use super::events::{OverlayEvent, Viewer};
use super::router::Publisher;
use crate::error::{ApiError, FieldError};

/// Longest accepted action name.
pub const MAX_ACTION_LEN: usize = 32;

#[derive(Clone)]
pub struct Announcer {
    publisher: Arc<dyn Publisher>,
}

impl Announcer {
    pub fn new(publisher: Arc<dyn Publisher>) -> Self {
        Self { publisher }
    }

    pub async fn announce_join(&self, channel: &ChannelId, viewer: Viewer) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require_channel(channel, &mut errors);
        require_viewer(&viewer.user_id, &mut errors);
        require("username", &viewer.username, &mut errors);
        require("image", &viewer.color, &mut errors);
        reject(errors)?;

        self.publish(OverlayEvent::Join {
            channel: channel.clone(),
            viewer,
        })
        .await
    }

    pub async fn announce_part(&self, channel: &ChannelId, viewer_id: &ViewerId) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require_channel(channel, &mut errors);
        require_viewer(viewer_id, &mut errors);
        reject(errors)?;

        self.publish(OverlayEvent::Part {
            channel: channel.clone(),
            viewer_id: viewer_id.clone(),
        })
        .await
    }

    pub async fn announce_action(
        &self,
        channel: &ChannelId,
        viewer_id: &ViewerId,
        action: &str,
    ) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require_channel(channel, &mut errors);
        require_viewer(viewer_id, &mut errors);
        if let Err(message) = validate_action(action) {
            errors.push(FieldError::new("action", message));
        }
        reject(errors)?;

        self.publish(OverlayEvent::Action {
            channel: channel.clone(),
            viewer_id: viewer_id.clone(),
            action: action.to_string(),
        })
        .await
    }

    pub async fn announce_update(
        &self,
        channel: &ChannelId,
        viewer_id: &ViewerId,
        image: &str,
    ) -> Result<(), ApiError> {
        let mut errors = Vec::new();
        require_channel(channel, &mut errors);
        require_viewer(viewer_id, &mut errors);
        require("image", image, &mut errors);
        reject(errors)?;

        self.publish(OverlayEvent::ColorUpdate {
            channel: channel.clone(),
            viewer_id: viewer_id.clone(),
            image: image.to_string(),
        })
        .await
    }

    async fn publish(&self, event: OverlayEvent) -> Result<(), ApiError> {
        let channel = event.channel().clone();
        let kind = event.kind();
        self.publisher.publish(event).await.map_err(|err| {
            tracing::warn!(%channel, kind, "publish rejected: {err}");
            ApiError::from(err)
        })?;
        tracing::debug!(%channel, kind, "event published");
        Ok(())
    }
}

/// Action names end up in the SSE `event:` line, so they are kept to a
/// conservative charset.
pub fn validate_action(action: &str) -> Result<(), String> {
    if action.is_empty() {
        return Err("Action is required".to_string());
    }
    if action.len() > MAX_ACTION_LEN {
        return Err(format!("Action must be at most {MAX_ACTION_LEN} characters"));
    }
    if !action.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("Action may only contain letters, digits, and underscores".to_string());
    }
    Ok(())
}

fn require_channel(channel: &ChannelId, errors: &mut Vec<FieldError>) {
    require("channel_id", channel.as_str(), errors);
}

/// Viewer ids are spliced into SSE `event:` names (`COLOR-<id>`,
/// `<action>-<id>`), which cannot carry line breaks.
fn require_viewer(viewer_id: &ViewerId, errors: &mut Vec<FieldError>) {
    let id = viewer_id.as_str();
    if id.trim().is_empty() {
        errors.push(FieldError::new("user_id", "user_id is required"));
    } else if id.chars().any(char::is_control) {
        errors.push(FieldError::new(
            "user_id",
            "user_id may not contain control characters",
        ));
    }
}

fn require(field: &str, value: &str, errors: &mut Vec<FieldError>) {
    if value.trim().is_empty() {
        errors.push(FieldError::new(field, format!("{field} is required")));
    }
}

fn reject(errors: Vec<FieldError>) -> Result<(), ApiError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(ApiError::validation(errors))
    }
}
