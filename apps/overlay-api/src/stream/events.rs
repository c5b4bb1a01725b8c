//! Overlay event types and their SSE wire format.

use overlay_common::{ChannelId, ViewerId};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

/// Event tags written to the `event:` line of an SSE frame.
pub struct EventName;

impl EventName {
    pub const JOIN: &'static str = "JOIN";
    pub const PART: &'static str = "PART";
    pub const COLOR_PREFIX: &'static str = "COLOR";
    pub const HEARTBEAT: &'static str = "heartbeat";
}

/// Payload of the idle keep-alive frame.
pub const HEARTBEAT_PAYLOAD: &str = "ping";

// ---------------------------------------------------------------------------
// Viewer state
// ---------------------------------------------------------------------------

/// The visible state of a viewer on an overlay.
///
/// This is also the JOIN payload: `{"userId": .., "username": .., "color": ..}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    #[schema(value_type = String)]
    pub user_id: ViewerId,
    pub username: String,
    /// Image of the viewer's selected item.
    pub color: String,
}

impl Viewer {
    pub fn new(user_id: impl Into<ViewerId>, username: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            color: color.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A state change on one channel, fanned out to every overlay watching it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayEvent {
    Join {
        channel: ChannelId,
        viewer: Viewer,
    },
    Part {
        channel: ChannelId,
        viewer_id: ViewerId,
    },
    /// A transient animation such as `JUMP`. Never cached.
    Action {
        channel: ChannelId,
        viewer_id: ViewerId,
        action: String,
    },
    ColorUpdate {
        channel: ChannelId,
        viewer_id: ViewerId,
        image: String,
    },
}

impl OverlayEvent {
    pub fn channel(&self) -> &ChannelId {
        match self {
            OverlayEvent::Join { channel, .. }
            | OverlayEvent::Part { channel, .. }
            | OverlayEvent::Action { channel, .. }
            | OverlayEvent::ColorUpdate { channel, .. } => channel,
        }
    }

    /// The viewer this event is about.
    pub fn viewer_id(&self) -> &ViewerId {
        match self {
            OverlayEvent::Join { viewer, .. } => &viewer.user_id,
            OverlayEvent::Part { viewer_id, .. }
            | OverlayEvent::Action { viewer_id, .. }
            | OverlayEvent::ColorUpdate { viewer_id, .. } => viewer_id,
        }
    }

    /// The SSE `event:` tag. Overlays key their listeners on these exact strings.
    pub fn tag(&self) -> String {
        match self {
            OverlayEvent::Join { .. } => EventName::JOIN.to_string(),
            OverlayEvent::Part { .. } => EventName::PART.to_string(),
            OverlayEvent::Action {
                viewer_id, action, ..
            } => format!("{action}-{viewer_id}"),
            OverlayEvent::ColorUpdate { viewer_id, .. } => {
                format!("{}-{viewer_id}", EventName::COLOR_PREFIX)
            }
        }
    }

    /// The SSE `data:` payload as JSON.
    pub fn payload(&self) -> Value {
        match self {
            OverlayEvent::Join { viewer, .. } => serde_json::json!({
                "userId": viewer.user_id,
                "username": viewer.username,
                "color": viewer.color,
            }),
            OverlayEvent::Part { viewer_id, .. } | OverlayEvent::Action { viewer_id, .. } => {
                Value::String(viewer_id.to_string())
            }
            OverlayEvent::ColorUpdate { image, .. } => Value::String(image.clone()),
        }
    }

    /// Short kind name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            OverlayEvent::Join { .. } => "join",
            OverlayEvent::Part { .. } => "part",
            OverlayEvent::Action { .. } => "action",
            OverlayEvent::ColorUpdate { .. } => "color_update",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chan() -> ChannelId {
        ChannelId::from("chanA")
    }

    #[test]
    fn join_tag_and_payload() {
        let event = OverlayEvent::Join {
            channel: chan(),
            viewer: Viewer::new("u1", "A", "red"),
        };
        assert_eq!(event.tag(), "JOIN");
        assert_eq!(
            event.payload(),
            serde_json::json!({ "userId": "u1", "username": "A", "color": "red" })
        );
    }

    #[test]
    fn part_payload_is_viewer_id_string() {
        let event = OverlayEvent::Part {
            channel: chan(),
            viewer_id: ViewerId::from("u1"),
        };
        assert_eq!(event.tag(), "PART");
        assert_eq!(serde_json::to_string(&event.payload()).unwrap(), "\"u1\"");
    }

    #[test]
    fn action_tag_joins_action_and_viewer() {
        let event = OverlayEvent::Action {
            channel: chan(),
            viewer_id: ViewerId::from("u1"),
            action: "JUMP".to_string(),
        };
        assert_eq!(event.tag(), "JUMP-u1");
        assert_eq!(event.payload(), Value::String("u1".to_string()));
    }

    #[test]
    fn color_update_tag_and_payload() {
        let event = OverlayEvent::ColorUpdate {
            channel: chan(),
            viewer_id: ViewerId::from("u1"),
            image: "blue".to_string(),
        };
        assert_eq!(event.tag(), "COLOR-u1");
        assert_eq!(event.payload(), Value::String("blue".to_string()));
    }

    #[test]
    fn viewer_serializes_camel_case() {
        let json = serde_json::to_value(Viewer::new("u1", "A", "red")).unwrap();
        assert_eq!(json, serde_json::json!({ "userId": "u1", "username": "A", "color": "red" }));
    }
}
