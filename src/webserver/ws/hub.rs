/// Central WebSocket Hub - registry and broadcaster
///
/// The WsHub owns one bounded queue per subscriber and fans every broadcast
/// out to all of them. Delivery never waits on a subscriber: a queue that
/// is full (slow observer) or closed (connection gone) gets its subscriber
/// evicted during that same broadcast, so a stalled observer can neither
/// delay the others nor linger in the registry.
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::{
    arguments::is_debug_hub_enabled,
    logger::{self, LogTag},
};

use super::message::Envelope;
use super::metrics::HubMetrics;

// ============================================================================
// HUB TYPES
// ============================================================================

/// Subscriber ID (unique per registration)
pub type SubscriberId = u64;

/// Serialized envelope shared by every queue it is pushed to
pub type Frame = Arc<str>;

/// One observer's delivery handle
///
/// Receives only envelopes broadcast after `subscribe` returned. When the
/// hub evicts or unsubscribes it, `recv` drains what is queued and then
/// yields `None`.
#[derive(Debug)]
pub struct Subscriber {
    id: SubscriberId,
    rx: mpsc::Receiver<Frame>,
}

impl Subscriber {
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<Frame> {
        self.rx.recv().await
    }

    pub fn try_recv(&mut self) -> Result<Frame, mpsc::error::TryRecvError> {
        self.rx.try_recv()
    }
}

// ============================================================================
// WS HUB
// ============================================================================

pub struct WsHub {
    /// Active subscribers (id → queue sender)
    subscribers: RwLock<HashMap<SubscriberId, mpsc::Sender<Frame>>>,

    next_id: AtomicU64,

    metrics: Arc<HubMetrics>,

    /// Per-subscriber queue capacity
    buffer_size: usize,
}

impl WsHub {
    pub fn new(buffer_size: usize) -> Arc<Self> {
        Arc::new(Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            metrics: HubMetrics::new(),
            buffer_size: buffer_size.max(1),
        })
    }

    /// Register a new subscriber
    pub async fn subscribe(&self) -> Subscriber {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::channel(self.buffer_size);

        let active = {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(id, tx);
            subscribers.len()
        };
        self.metrics.subscriber_added();

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!("subscriber {} registered (active={})", id, active),
            );
        }

        Subscriber { id, rx }
    }

    /// Remove a subscriber; safe to call repeatedly or after eviction
    ///
    /// Returns whether the subscriber was still registered.
    pub async fn unsubscribe(&self, id: SubscriberId) -> bool {
        let (removed, active) = {
            let mut subscribers = self.subscribers.write().await;
            let removed = subscribers.remove(&id).is_some();
            (removed, subscribers.len())
        };

        if removed {
            self.metrics.subscriber_removed();
            if is_debug_hub_enabled() {
                logger::debug(
                    LogTag::Hub,
                    &format!("subscriber {} unregistered (active={})", id, active),
                );
            }
        }

        removed
    }

    /// Deliver an envelope to every registered subscriber
    ///
    /// Serializes once and pushes with `try_send`; never blocks on a
    /// subscriber and never fails towards the caller. Returns how many
    /// subscribers the envelope was queued for.
    pub async fn broadcast(&self, envelope: Envelope) -> usize {
        let frame: Frame = match envelope.to_json() {
            Ok(json) => Arc::from(json),
            Err(e) => {
                logger::error(
                    LogTag::Hub,
                    &format!("Failed to serialize '{}' envelope: {}", envelope.kind, e),
                );
                return 0;
            }
        };

        let mut evicted: Vec<(SubscriberId, &'static str)> = Vec::new();
        let (delivered, active) = {
            let mut subscribers = self.subscribers.write().await;
            if subscribers.is_empty() {
                return 0;
            }

            let mut delivered = 0usize;
            subscribers.retain(|id, sender| match sender.try_send(Arc::clone(&frame)) {
                Ok(()) => {
                    delivered += 1;
                    true
                }
                Err(mpsc::error::TrySendError::Full(_)) => {
                    evicted.push((*id, "queue full"));
                    false
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    evicted.push((*id, "closed"));
                    false
                }
            });
            (delivered, subscribers.len())
        };

        self.metrics.broadcast(delivered as u64);
        for (id, reason) in &evicted {
            self.metrics.subscriber_evicted();
            self.metrics.subscriber_removed();
            logger::warning(
                LogTag::Hub,
                &format!("subscriber {} evicted during broadcast ({})", id, reason),
            );
        }

        if is_debug_hub_enabled() {
            logger::debug(
                LogTag::Hub,
                &format!(
                    "broadcast {} (delivered={}, evicted={}, active={})",
                    envelope.kind,
                    delivered,
                    evicted.len(),
                    active
                ),
            );
        }

        delivered
    }

    pub fn metrics(&self) -> Arc<HubMetrics> {
        Arc::clone(&self.metrics)
    }

    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }
}
