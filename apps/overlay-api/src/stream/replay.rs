//! Per-channel replay cache of viewers currently present on the overlay.
//!
//! Owned by the router worker and mutated only from the publish path, so a
//! snapshot taken during subscribe is always consistent with the live stream
//! that follows it.

use std::collections::HashMap;

use overlay_common::{ChannelId, ViewerId};

use super::events::{OverlayEvent, Viewer};

#[derive(Debug, Default)]
pub struct ReplayCache {
    channels: HashMap<ChannelId, HashMap<ViewerId, Viewer>>,
}

impl ReplayCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one published event into the cache.
    pub fn apply(&mut self, event: &OverlayEvent) {
        match event {
            OverlayEvent::Join { channel, viewer } => self.apply_join(channel, viewer.clone()),
            OverlayEvent::Part { channel, viewer_id } => self.apply_part(channel, viewer_id),
            OverlayEvent::ColorUpdate {
                channel,
                viewer_id,
                image,
            } => self.apply_update(channel, viewer_id, image),
            OverlayEvent::Action {
                channel,
                viewer_id,
                action,
            } => self.apply_action(channel, viewer_id, action),
        }
    }

    /// Insert or overwrite the viewer's entry.
    pub fn apply_join(&mut self, channel: &ChannelId, viewer: Viewer) {
        self.channels
            .entry(channel.clone())
            .or_default()
            .insert(viewer.user_id.clone(), viewer);
    }

    /// Remove the viewer. No-op if the viewer or the channel is unknown.
    pub fn apply_part(&mut self, channel: &ChannelId, viewer_id: &ViewerId) {
        if let Some(viewers) = self.channels.get_mut(channel) {
            viewers.remove(viewer_id);
            if viewers.is_empty() {
                self.channels.remove(channel);
            }
        }
    }

    /// Replace the stored viewer's image. Dropped if the viewer never joined.
    pub fn apply_update(&mut self, channel: &ChannelId, viewer_id: &ViewerId, image: &str) {
        if let Some(viewer) = self
            .channels
            .get_mut(channel)
            .and_then(|viewers| viewers.get_mut(viewer_id))
        {
            viewer.color = image.to_string();
        }
    }

    /// Actions are transient animations, not state.
    pub fn apply_action(&mut self, _channel: &ChannelId, _viewer_id: &ViewerId, _action: &str) {}

    /// Value copy of the channel's present viewers, in unspecified order.
    pub fn snapshot(&self, channel: &ChannelId) -> Vec<Viewer> {
        self.channels
            .get(channel)
            .map(|viewers| viewers.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn viewer_count(&self, channel: &ChannelId) -> usize {
        self.channels.get(channel).map_or(0, HashMap::len)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Total cached viewers across all channels.
    pub fn total_viewers(&self) -> usize {
        self.channels.values().map(HashMap::len).sum()
    }
}
