//! Single-writer event router.
//!
//! One worker task owns the subscriber registry and the replay cache. Every
//! subscribe, unsubscribe, and publish is a command on its own unbounded
//! channel, and the worker applies them one at a time, so neither structure
//! needs a lock. Events leave the worker through per-subscriber
//! [`OutboundQueue`]s, which never block the worker.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use overlay_common::id::{prefix, prefixed_ulid};
use overlay_common::ChannelId;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::events::{OverlayEvent, Viewer};
use super::queue::{OutboundQueue, PushOutcome, SUBSCRIBER_QUEUE_CAPACITY};
use super::replay::ReplayCache;

pub type SubscriberId = String;

// ---------------------------------------------------------------------------
// Errors, state, config
// ---------------------------------------------------------------------------

/// Returned by every router call made after shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouterStopped;

impl fmt::Display for RouterStopped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("event router has stopped")
    }
}

impl std::error::Error for RouterStopped {}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterState {
    Running,
    ShuttingDown,
    Stopped,
}

impl RouterState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => RouterState::Running,
            1 => RouterState::ShuttingDown,
            _ => RouterState::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            RouterState::Running => 0,
            RouterState::ShuttingDown => 1,
            RouterState::Stopped => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouterState::Running => "running",
            RouterState::ShuttingDown => "shutting_down",
            RouterState::Stopped => "stopped",
        }
    }
}

#[derive(Debug, Clone)]
pub struct RouterConfig {
    /// Per-subscriber outbound queue capacity.
    pub queue_capacity: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            queue_capacity: SUBSCRIBER_QUEUE_CAPACITY,
        }
    }
}

/// Point-in-time counters reported by the worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouterStats {
    pub channels: usize,
    pub subscribers: usize,
    pub cached_viewers: usize,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Publish side of the router. Producers only ever need this.
#[async_trait]
pub trait Publisher: Send + Sync {
    /// Returns once the worker has updated the replay cache and dispatched
    /// the event to the channel's current subscribers.
    async fn publish(&self, event: OverlayEvent) -> Result<(), RouterStopped>;
}

/// Subscribe side of the router. The SSE endpoint only ever needs this.
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Registers a subscriber for `channel`. On return the replay burst is
    /// already in the subscription's queue, ahead of any live event.
    async fn subscribe(&self, channel: ChannelId) -> Result<Subscription, RouterStopped>;

    /// Removes the subscriber. Idempotent.
    async fn unsubscribe(&self, subscription: &Subscription);
}

// ---------------------------------------------------------------------------
// Commands
// ---------------------------------------------------------------------------

struct SubscribeCmd {
    channel: ChannelId,
    reply: oneshot::Sender<(SubscriberId, Arc<OutboundQueue>)>,
}

struct UnsubscribeCmd {
    channel: ChannelId,
    id: SubscriberId,
    ack: Option<oneshot::Sender<()>>,
}

struct PublishCmd {
    event: Arc<OverlayEvent>,
    ack: oneshot::Sender<()>,
}

enum ControlCmd {
    Stats(oneshot::Sender<RouterStats>),
    Snapshot(ChannelId, oneshot::Sender<Vec<Viewer>>),
    Shutdown(oneshot::Sender<()>),
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

/// One registered overlay's view of the router.
///
/// Dropping a subscription requests unsubscribe and discards anything still
/// buffered, so a disconnected overlay never holds events in memory.
pub struct Subscription {
    id: SubscriberId,
    channel: ChannelId,
    queue: Arc<OutboundQueue>,
    unsubscribe_tx: mpsc::UnboundedSender<UnsubscribeCmd>,
    released: AtomicBool,
}

impl Subscription {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn channel(&self) -> &ChannelId {
        &self.channel
    }

    pub fn queue(&self) -> &Arc<OutboundQueue> {
        &self.queue
    }

    /// Next event, or `None` once the router closed this subscriber's queue
    /// and it has been drained.
    pub async fn recv(&self) -> Option<Arc<OverlayEvent>> {
        self.queue.recv().await
    }

    /// Remove this subscriber and wait until the router has done so.
    pub async fn unsubscribe(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        let (ack, done) = oneshot::channel();
        let cmd = UnsubscribeCmd {
            channel: self.channel.clone(),
            id: self.id.clone(),
            ack: Some(ack),
        };
        if self.unsubscribe_tx.send(cmd).is_err() {
            // Router is gone; it closed every queue on the way out.
            self.queue.close();
            return;
        }
        let _ = done.await;
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("channel", &self.channel)
            .field("buffered", &self.queue.len())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.released.swap(true, Ordering::AcqRel) {
            let _ = self.unsubscribe_tx.send(UnsubscribeCmd {
                channel: self.channel.clone(),
                id: self.id.clone(),
                ack: None,
            });
        }
        let drained = self.queue.drain();
        if drained > 0 {
            tracing::debug!(
                subscriber_id = %self.id,
                channel = %self.channel,
                drained,
                "discarded undelivered events"
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Handle
// ---------------------------------------------------------------------------

/// Cloneable handle to the router worker. Store in `AppState`.
#[derive(Clone)]
pub struct RouterHandle {
    subscribe_tx: mpsc::UnboundedSender<SubscribeCmd>,
    unsubscribe_tx: mpsc::UnboundedSender<UnsubscribeCmd>,
    publish_tx: mpsc::UnboundedSender<PublishCmd>,
    control_tx: mpsc::UnboundedSender<ControlCmd>,
    state: Arc<AtomicU8>,
}

/// Entry point for starting the router.
pub struct EventRouter;

impl EventRouter {
    /// Spawn the worker on the current tokio runtime.
    pub fn spawn(config: RouterConfig) -> RouterHandle {
        let (subscribe_tx, subscribe_rx) = mpsc::unbounded_channel();
        let (unsubscribe_tx, unsubscribe_rx) = mpsc::unbounded_channel();
        let (publish_tx, publish_rx) = mpsc::unbounded_channel();
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let state = Arc::new(AtomicU8::new(RouterState::Running.as_u8()));

        let worker = RouterWorker {
            cache: ReplayCache::new(),
            registry: HashMap::new(),
            queue_capacity: config.queue_capacity.max(1),
            state: state.clone(),
            subscribe_rx,
            unsubscribe_rx,
            publish_rx,
            control_rx,
        };
        tokio::spawn(worker.run());

        tracing::info!(queue_capacity = config.queue_capacity, "event router started");

        RouterHandle {
            subscribe_tx,
            unsubscribe_tx,
            publish_tx,
            control_tx,
            state,
        }
    }
}

impl RouterHandle {
    pub fn state(&self) -> RouterState {
        RouterState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub async fn stats(&self) -> Result<RouterStats, RouterStopped> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(ControlCmd::Stats(reply))
            .map_err(|_| RouterStopped)?;
        rx.await.map_err(|_| RouterStopped)
    }

    /// Current replay cache contents for one channel.
    pub async fn snapshot(&self, channel: &ChannelId) -> Result<Vec<Viewer>, RouterStopped> {
        let (reply, rx) = oneshot::channel();
        self.control_tx
            .send(ControlCmd::Snapshot(channel.clone(), reply))
            .map_err(|_| RouterStopped)?;
        rx.await.map_err(|_| RouterStopped)
    }

    /// Drain pending publishes, close every subscriber, and stop the worker.
    /// Later calls on any handle fail with [`RouterStopped`].
    pub async fn shutdown(&self) {
        let (ack, done) = oneshot::channel();
        if self.control_tx.send(ControlCmd::Shutdown(ack)).is_ok() {
            let _ = done.await;
        }
    }
}

#[async_trait]
impl Publisher for RouterHandle {
    async fn publish(&self, event: OverlayEvent) -> Result<(), RouterStopped> {
        let (ack, done) = oneshot::channel();
        self.publish_tx
            .send(PublishCmd {
                event: Arc::new(event),
                ack,
            })
            .map_err(|_| RouterStopped)?;
        done.await.map_err(|_| RouterStopped)
    }
}

#[async_trait]
impl Subscriber for RouterHandle {
    async fn subscribe(&self, channel: ChannelId) -> Result<Subscription, RouterStopped> {
        let (reply, rx) = oneshot::channel();
        self.subscribe_tx
            .send(SubscribeCmd {
                channel: channel.clone(),
                reply,
            })
            .map_err(|_| RouterStopped)?;
        let (id, queue) = rx.await.map_err(|_| RouterStopped)?;
        Ok(Subscription {
            id,
            channel,
            queue,
            unsubscribe_tx: self.unsubscribe_tx.clone(),
            released: AtomicBool::new(false),
        })
    }

    async fn unsubscribe(&self, subscription: &Subscription) {
        subscription.unsubscribe().await;
    }
}

// ---------------------------------------------------------------------------
// Worker
// ---------------------------------------------------------------------------

struct RouterWorker {
    cache: ReplayCache,
    registry: HashMap<ChannelId, HashMap<SubscriberId, Arc<OutboundQueue>>>,
    queue_capacity: usize,
    state: Arc<AtomicU8>,
    subscribe_rx: mpsc::UnboundedReceiver<SubscribeCmd>,
    unsubscribe_rx: mpsc::UnboundedReceiver<UnsubscribeCmd>,
    publish_rx: mpsc::UnboundedReceiver<PublishCmd>,
    control_rx: mpsc::UnboundedReceiver<ControlCmd>,
}

impl RouterWorker {
    async fn run(mut self) {
        loop {
            tokio::select! {
                Some(cmd) = self.subscribe_rx.recv() => self.handle_subscribe(cmd),
                Some(cmd) = self.unsubscribe_rx.recv() => self.handle_unsubscribe(cmd),
                Some(cmd) = self.publish_rx.recv() => self.handle_publish(cmd),
                cmd = self.control_rx.recv() => match cmd {
                    Some(ControlCmd::Stats(reply)) => {
                        let _ = reply.send(self.stats());
                    }
                    Some(ControlCmd::Snapshot(channel, reply)) => {
                        let _ = reply.send(self.cache.snapshot(&channel));
                    }
                    Some(ControlCmd::Shutdown(ack)) => {
                        self.shutdown();
                        let _ = ack.send(());
                        break;
                    }
                    // Every handle is gone.
                    None => {
                        self.shutdown();
                        break;
                    }
                },
            }
        }
        tracing::info!("event router stopped");
    }

    fn handle_subscribe(&mut self, cmd: SubscribeCmd) {
        let SubscribeCmd { channel, reply } = cmd;
        let id = prefixed_ulid(prefix::SUBSCRIBER);
        let queue = Arc::new(OutboundQueue::new(self.queue_capacity));

        self.registry
            .entry(channel.clone())
            .or_default()
            .insert(id.clone(), queue.clone());

        // The replay burst goes out here, on the worker, before the next
        // command is taken, so no live event can land in front of it.
        let snapshot = self.cache.snapshot(&channel);
        let replayed = snapshot.len();
        for viewer in snapshot {
            let event = OverlayEvent::Join {
                channel: channel.clone(),
                viewer,
            };
            if queue.push(Arc::new(event)) == PushOutcome::DroppedOldest {
                tracing::warn!(subscriber_id = %id, %channel, "replay burst exceeded queue capacity");
            }
        }

        if reply.send((id.clone(), queue)).is_err() {
            // Caller went away before the handle reached it.
            self.remove_subscriber(&channel, &id);
            return;
        }

        tracing::info!(subscriber_id = %id, %channel, replayed, "subscriber registered");
    }

    fn handle_unsubscribe(&mut self, cmd: UnsubscribeCmd) {
        if self.remove_subscriber(&cmd.channel, &cmd.id) {
            tracing::info!(subscriber_id = %cmd.id, channel = %cmd.channel, "subscriber removed");
        }
        if let Some(ack) = cmd.ack {
            let _ = ack.send(());
        }
    }

    fn handle_publish(&mut self, cmd: PublishCmd) {
        self.dispatch(&cmd.event);
        let _ = cmd.ack.send(());
    }

    fn dispatch(&mut self, event: &Arc<OverlayEvent>) {
        self.cache.apply(event);

        let channel = event.channel();
        let Some(subscribers) = self.registry.get(channel) else {
            tracing::debug!(%channel, kind = event.kind(), "no subscribers; cache updated");
            return;
        };

        for (id, queue) in subscribers {
            if queue.push(event.clone()) == PushOutcome::DroppedOldest {
                tracing::warn!(
                    subscriber_id = %id,
                    %channel,
                    dropped_total = queue.dropped(),
                    "subscriber queue full; dropped oldest event"
                );
            }
        }

        tracing::debug!(
            %channel,
            kind = event.kind(),
            tag = %event.tag(),
            subscribers = subscribers.len(),
            "event dispatched"
        );
    }

    /// Returns whether the subscriber was registered.
    fn remove_subscriber(&mut self, channel: &ChannelId, id: &str) -> bool {
        let Some(subscribers) = self.registry.get_mut(channel) else {
            return false;
        };
        let Some(queue) = subscribers.remove(id) else {
            return false;
        };
        queue.close();
        if subscribers.is_empty() {
            self.registry.remove(channel);
        }
        true
    }

    fn stats(&self) -> RouterStats {
        RouterStats {
            channels: self.registry.len(),
            subscribers: self.registry.values().map(HashMap::len).sum(),
            cached_viewers: self.cache.total_viewers(),
        }
    }

    fn set_state(&self, state: RouterState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    fn shutdown(&mut self) {
        self.set_state(RouterState::ShuttingDown);

        self.publish_rx.close();
        let mut drained = 0usize;
        while let Ok(cmd) = self.publish_rx.try_recv() {
            self.handle_publish(cmd);
            drained += 1;
        }

        // Pending subscribers see their reply dropped and get RouterStopped.
        self.subscribe_rx.close();
        while self.subscribe_rx.try_recv().is_ok() {}

        self.unsubscribe_rx.close();
        while let Ok(cmd) = self.unsubscribe_rx.try_recv() {
            self.handle_unsubscribe(cmd);
        }

        let mut closed = 0usize;
        for (_, subscribers) in self.registry.drain() {
            for (_, queue) in subscribers {
                queue.close();
                closed += 1;
            }
        }

        self.set_state(RouterState::Stopped);
        tracing::info!(drained_publishes = drained, closed_subscribers = closed, "event router shut down");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use overlay_common::ViewerId;

    use super::*;

    fn chan(id: &str) -> ChannelId {
        ChannelId::from(id)
    }

    fn join(channel: &str, id: &str, name: &str, color: &str) -> OverlayEvent {
        OverlayEvent::Join {
            channel: chan(channel),
            viewer: Viewer::new(id, name, color),
        }
    }

    fn part(channel: &str, id: &str) -> OverlayEvent {
        OverlayEvent::Part {
            channel: chan(channel),
            viewer_id: ViewerId::from(id),
        }
    }

    fn update(channel: &str, id: &str, image: &str) -> OverlayEvent {
        OverlayEvent::ColorUpdate {
            channel: chan(channel),
            viewer_id: ViewerId::from(id),
            image: image.to_string(),
        }
    }

    fn action(channel: &str, id: &str, action: &str) -> OverlayEvent {
        OverlayEvent::Action {
            channel: chan(channel),
            viewer_id: ViewerId::from(id),
            action: action.to_string(),
        }
    }

    async fn next(sub: &Subscription) -> Arc<OverlayEvent> {
        tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("timed out waiting for event")
            .expect("queue closed")
    }

    fn buffered(sub: &Subscription) -> Vec<Arc<OverlayEvent>> {
        std::iter::from_fn(|| sub.queue().try_recv()).collect()
    }

    async fn wait_for_subscribers(router: &RouterHandle, expected: usize) {
        for _ in 0..100 {
            if router.stats().await.unwrap().subscribers == expected {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("subscriber count never reached {expected}");
    }

    #[tokio::test]
    async fn empty_channel_subscribe_then_join_is_delivered_live() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();
        assert!(sub.queue().is_empty());

        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();

        let event = next(&sub).await;
        assert_eq!(event.tag(), "JOIN");
        assert_eq!(event.viewer_id().as_str(), "u1");
    }

    #[tokio::test]
    async fn late_subscriber_gets_replayed_join_with_current_image() {
        let router = EventRouter::spawn(RouterConfig::default());
        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();

        let sub = router.subscribe(chan("chanA")).await.unwrap();
        let first = next(&sub).await;
        assert_eq!(*first, join("chanA", "u1", "A", "red"));

        router.publish(update("chanA", "u1", "blue")).await.unwrap();
        let live = next(&sub).await;
        assert_eq!(live.tag(), "COLOR-u1");
        assert_eq!(live.payload(), serde_json::json!("blue"));

        let fresh = router.subscribe(chan("chanA")).await.unwrap();
        assert_eq!(buffered(&fresh), vec![Arc::new(join("chanA", "u1", "A", "blue"))]);
    }

    #[tokio::test]
    async fn part_is_delivered_and_clears_replay() {
        let router = EventRouter::spawn(RouterConfig::default());
        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();
        let sub = router.subscribe(chan("chanA")).await.unwrap();
        next(&sub).await;

        router.publish(part("chanA", "u1")).await.unwrap();
        let event = next(&sub).await;
        assert_eq!(event.tag(), "PART");
        assert_eq!(event.payload(), serde_json::json!("u1"));

        let fresh = router.subscribe(chan("chanA")).await.unwrap();
        assert!(buffered(&fresh).is_empty());
    }

    #[tokio::test]
    async fn action_is_delivered_but_not_cached() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();

        router.publish(action("chanA", "u1", "JUMP")).await.unwrap();
        let event = next(&sub).await;
        assert_eq!(event.tag(), "JUMP-u1");
        assert_eq!(event.payload(), serde_json::json!("u1"));

        assert!(router.snapshot(&chan("chanA")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn events_only_reach_their_own_channel() {
        let router = EventRouter::spawn(RouterConfig::default());
        let a = router.subscribe(chan("chanA")).await.unwrap();
        let b = router.subscribe(chan("chanB")).await.unwrap();

        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();

        assert_eq!(buffered(&a).len(), 1);
        assert!(buffered(&b).is_empty());
    }

    #[tokio::test]
    async fn publish_without_subscribers_still_updates_cache() {
        let router = EventRouter::spawn(RouterConfig::default());
        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();
        router.publish(update("chanA", "u1", "blue")).await.unwrap();

        let snapshot = router.snapshot(&chan("chanA")).await.unwrap();
        assert_eq!(snapshot, vec![Viewer::new("u1", "A", "blue")]);
    }

    #[tokio::test]
    async fn part_and_update_of_unknown_viewer_still_fan_out() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();

        router.publish(part("chanA", "ghost")).await.unwrap();
        router.publish(update("chanA", "ghost", "blue")).await.unwrap();

        let tags: Vec<String> = buffered(&sub).iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["PART", "COLOR-ghost"]);
        assert!(router.snapshot(&chan("chanA")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn replay_prefix_precedes_live_events_without_duplicates() {
        let router = EventRouter::spawn(RouterConfig::default());
        for i in 0..5 {
            router
                .publish(join("chanA", &format!("u{i}"), "n", "red"))
                .await
                .unwrap();
        }

        let sub = router.subscribe(chan("chanA")).await.unwrap();
        for i in 5..8 {
            router
                .publish(join("chanA", &format!("u{i}"), "n", "red"))
                .await
                .unwrap();
        }

        let events = buffered(&sub);
        assert_eq!(events.len(), 8);
        let mut replayed: Vec<String> = events[..5].iter().map(|e| e.viewer_id().to_string()).collect();
        replayed.sort();
        assert_eq!(replayed, vec!["u0", "u1", "u2", "u3", "u4"]);
        let live: Vec<String> = events[5..].iter().map(|e| e.viewer_id().to_string()).collect();
        assert_eq!(live, vec!["u5", "u6", "u7"]);
    }

    #[tokio::test]
    async fn concurrent_publishers_keep_per_subscriber_order_consistent() {
        let router = EventRouter::spawn(RouterConfig::default());
        let first = router.subscribe(chan("chanA")).await.unwrap();
        let second = router.subscribe(chan("chanA")).await.unwrap();

        let mut tasks = Vec::new();
        for p in 0..4 {
            let router = router.clone();
            tasks.push(tokio::spawn(async move {
                for i in 0..20 {
                    router
                        .publish(action("chanA", &format!("p{p}"), &format!("A{i}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let a: Vec<String> = buffered(&first).iter().map(|e| e.tag()).collect();
        let b: Vec<String> = buffered(&second).iter().map(|e| e.tag()).collect();
        assert_eq!(a.len(), 80);
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn two_subscribes_to_empty_channel_get_identical_empty_replays() {
        let router = EventRouter::spawn(RouterConfig::default());
        let (a, b) = tokio::join!(router.subscribe(chan("chanA")), router.subscribe(chan("chanA")));
        assert!(buffered(&a.unwrap()).is_empty());
        assert!(buffered(&b.unwrap()).is_empty());
    }

    #[tokio::test]
    async fn unsubscribe_is_idempotent_and_stops_delivery() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();

        router.unsubscribe(&sub).await;
        router.unsubscribe(&sub).await;
        sub.unsubscribe().await;

        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();
        assert!(sub.queue().is_closed());
        assert!(sub.recv().await.is_none());
        assert_eq!(router.stats().await.unwrap().subscribers, 0);
    }

    #[tokio::test]
    async fn unsubscribe_keeps_already_enqueued_events_readable() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();
        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();

        sub.unsubscribe().await;

        assert_eq!(next(&sub).await.tag(), "JOIN");
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropping_subscription_unregisters_it() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();
        wait_for_subscribers(&router, 1).await;

        drop(sub);
        wait_for_subscribers(&router, 0).await;
    }

    #[tokio::test]
    async fn slow_subscriber_drops_oldest_without_stalling_router() {
        let router = EventRouter::spawn(RouterConfig { queue_capacity: 4 });
        let slow = router.subscribe(chan("chanA")).await.unwrap();

        for i in 0..10 {
            router
                .publish(action("chanA", "u1", &format!("A{i}")))
                .await
                .unwrap();
        }

        assert_eq!(slow.queue().len(), 4);
        assert_eq!(slow.queue().dropped(), 6);
        let tags: Vec<String> = buffered(&slow).iter().map(|e| e.tag()).collect();
        assert_eq!(tags, vec!["A6-u1", "A7-u1", "A8-u1", "A9-u1"]);
    }

    #[tokio::test]
    async fn shutdown_closes_subscribers_and_rejects_commands() {
        let router = EventRouter::spawn(RouterConfig::default());
        let sub = router.subscribe(chan("chanA")).await.unwrap();
        router.publish(join("chanA", "u1", "A", "red")).await.unwrap();

        router.shutdown().await;
        assert_eq!(router.state(), RouterState::Stopped);

        // Already-enqueued events remain readable, then end-of-stream.
        assert_eq!(next(&sub).await.tag(), "JOIN");
        assert!(sub.recv().await.is_none());

        assert_eq!(
            router.publish(join("chanA", "u2", "B", "red")).await,
            Err(RouterStopped)
        );
        assert!(router.subscribe(chan("chanA")).await.is_err());
        assert!(router.stats().await.is_err());

        // Unsubscribing after shutdown is harmless.
        sub.unsubscribe().await;
        router.shutdown().await;
    }

    #[tokio::test]
    async fn state_starts_running() {
        let router = EventRouter::spawn(RouterConfig::default());
        assert_eq!(router.state(), RouterState::Running);
        assert_eq!(router.state().as_str(), "running");
    }
}
