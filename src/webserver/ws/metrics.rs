use serde::Serialize;
/// WebSocket metrics collection
///
/// Hub-wide counters plus per-connection statistics for monitoring.
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

// ============================================================================
// CONNECTION METRICS
// ============================================================================

/// Per-connection metrics
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    frames_sent: AtomicU64,
    frames_received: AtomicU64,
    pings_sent: AtomicU64,
}

impl ConnectionMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn inc_sent(&self) {
        self.frames_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_received(&self) {
        self.frames_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_pings(&self) {
        self.pings_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConnectionMetricsSnapshot {
        ConnectionMetricsSnapshot {
            frames_sent: self.frames_sent.load(Ordering::Relaxed),
            frames_received: self.frames_received.load(Ordering::Relaxed),
            pings_sent: self.pings_sent.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConnectionMetricsSnapshot {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub pings_sent: u64,
}

// ============================================================================
// HUB METRICS
// ============================================================================

/// Hub-level metrics (aggregate across all subscribers)
#[derive(Debug, Default)]
pub struct HubMetrics {
    /// Subscribers ever registered
    total_subscribers: AtomicU64,

    /// Currently registered subscribers
    active_subscribers: AtomicUsize,

    /// Broadcast calls made
    broadcasts: AtomicU64,

    /// Envelopes queued for delivery
    messages_delivered: AtomicU64,

    /// Envelopes lost because a subscriber queue was full or closed
    messages_dropped: AtomicU64,

    /// Subscribers removed by broadcast (slow or dead)
    subscribers_evicted: AtomicU64,
}

impl HubMetrics {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn subscriber_added(&self) {
        self.total_subscribers.fetch_add(1, Ordering::Relaxed);
        self.active_subscribers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn subscriber_removed(&self) {
        self.active_subscribers.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn broadcast(&self, delivered: u64) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.messages_delivered.fetch_add(delivered, Ordering::Relaxed);
    }

    pub fn subscriber_evicted(&self) {
        self.messages_dropped.fetch_add(1, Ordering::Relaxed);
        self.subscribers_evicted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> HubMetricsSnapshot {
        HubMetricsSnapshot {
            total_subscribers: self.total_subscribers.load(Ordering::Relaxed),
            active_subscribers: self.active_subscribers.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            messages_dropped: self.messages_dropped.load(Ordering::Relaxed),
            subscribers_evicted: self.subscribers_evicted.load(Ordering::Relaxed),
        }
    }
}

/// Hub metrics snapshot (served on `/api/hub`)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HubMetricsSnapshot {
    pub total_subscribers: u64,
    pub active_subscribers: usize,
    pub broadcasts: u64,
    pub messages_delivered: u64,
    pub messages_dropped: u64,
    pub subscribers_evicted: u64,
}
