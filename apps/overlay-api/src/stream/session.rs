//! Per-connection overlay session: turns a subscription into SSE frames.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::response::sse::Event;
use futures_util::stream::{self, Stream};
use serde_json::Value;

use super::events::{EventName, OverlayEvent, HEARTBEAT_PAYLOAD};
use super::router::Subscription;

/// Idle time after which a heartbeat frame is written.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(60);

/// One unit written to the SSE response.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionFrame {
    Event(Arc<OverlayEvent>),
    Heartbeat,
}

impl SessionFrame {
    pub fn tag(&self) -> String {
        match self {
            SessionFrame::Event(event) => event.tag(),
            SessionFrame::Heartbeat => EventName::HEARTBEAT.to_string(),
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            SessionFrame::Event(event) => event.payload(),
            SessionFrame::Heartbeat => Value::String(HEARTBEAT_PAYLOAD.to_string()),
        }
    }

    pub fn into_sse(self) -> Event {
        Event::default()
            .event(self.tag())
            .data(self.payload().to_string())
    }
}

/// State for a single SSE connection.
pub struct OverlaySession {
    subscription: Subscription,
    heartbeat: Duration,
    frames: u64,
}

impl OverlaySession {
    pub fn new(subscription: Subscription) -> Self {
        Self::with_heartbeat(subscription, HEARTBEAT_INTERVAL)
    }

    pub fn with_heartbeat(subscription: Subscription, heartbeat: Duration) -> Self {
        tracing::info!(
            subscriber_id = %subscription.id(),
            channel = %subscription.channel(),
            "overlay session started"
        );
        Self {
            subscription,
            heartbeat,
            frames: 0,
        }
    }

    pub fn subscription(&self) -> &Subscription {
        &self.subscription
    }

    /// Next frame to write, or `None` when the router has closed the queue
    /// and every event enqueued before the close has been returned.
    pub async fn next_frame(&mut self) -> Option<SessionFrame> {
        let frame = match tokio::time::timeout(self.heartbeat, self.subscription.recv()).await {
            Ok(Some(event)) => SessionFrame::Event(event),
            Ok(None) => return None,
            Err(_idle) => SessionFrame::Heartbeat,
        };
        self.frames += 1;
        Some(frame)
    }

    /// SSE body stream. Dropping it (client disconnect, write error) drops
    /// the subscription, which unsubscribes and discards anything buffered.
    pub fn into_stream(self) -> impl Stream<Item = Result<Event, Infallible>> + Send {
        stream::unfold(self, |mut session| async move {
            let frame = session.next_frame().await?;
            Some((Ok(frame.into_sse()), session))
        })
    }
}

impl Drop for OverlaySession {
    fn drop(&mut self) {
        tracing::info!(
            subscriber_id = %self.subscription.id(),
            channel = %self.subscription.channel(),
            frames = self.frames,
            "overlay session ended"
        );
    }
}
