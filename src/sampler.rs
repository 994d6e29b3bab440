/// Host metrics sampler
///
/// Fixed-interval loop: every tick asks the snapshot source for a fresh
/// snapshot and broadcasts it through the hub as a `systemStats` envelope.
/// A failing or slow source only costs that tick.
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{interval, timeout, MissedTickBehavior};

use crate::{
    arguments::is_debug_sampler_enabled,
    config::SamplerConfig,
    errors::SourceError,
    logger::{self, LogTag},
    metrics::SnapshotSource,
    webserver::ws::{Envelope, WsHub},
};

/// Shortest accepted period; `tokio::time::interval` rejects zero
const MIN_INTERVAL: Duration = Duration::from_millis(1);

pub struct Sampler {
    source: Arc<dyn SnapshotSource>,
    hub: Arc<WsHub>,
    interval: Duration,
}

impl Sampler {
    /// Create a sampler; a zero interval is raised to one millisecond
    pub fn new(source: Arc<dyn SnapshotSource>, hub: Arc<WsHub>, interval: Duration) -> Self {
        Self {
            source,
            hub,
            interval: interval.max(MIN_INTERVAL),
        }
    }

    pub fn from_config(cfg: &SamplerConfig, source: Arc<dyn SnapshotSource>, hub: Arc<WsHub>) -> Self {
        Self::new(source, hub, Duration::from_millis(cfg.interval_ms))
    }

    /// Take one snapshot and broadcast it
    ///
    /// A source call is bounded by one interval. Returns the number of
    /// subscribers the envelope was queued for.
    pub async fn sample_once(&self) -> Result<usize, SourceError> {
        let snapshot = match timeout(self.interval, self.source.snapshot()).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(SourceError::Timeout {
                    millis: self.interval.as_millis() as u64,
                })
            }
        };

        let envelope = Envelope::system_stats(&snapshot)
            .map_err(|e| SourceError::Collection(format!("Failed to encode snapshot: {}", e)))?;

        Ok(self.hub.broadcast(envelope).await)
    }

    /// Run until `shutdown` is notified
    pub async fn run(self, shutdown: Arc<Notify>) {
        let mut ticker = interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        logger::info(
            LogTag::Sampler,
            &format!(
                "Sampler started (source={}, interval={}ms)",
                self.source.name(),
                self.interval.as_millis()
            ),
        );

        let mut consecutive_failures: u32 = 0;

        loop {
            tokio::select! {
                _ = shutdown.notified() => {
                    logger::info(LogTag::Sampler, "Sampler shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    match self.sample_once().await {
                        Ok(delivered) => {
                            if consecutive_failures > 0 {
                                logger::info(
                                    LogTag::Sampler,
                                    &format!("Sampling recovered after {} failure(s)", consecutive_failures),
                                );
                                consecutive_failures = 0;
                            }
                            if is_debug_sampler_enabled() {
                                logger::debug(
                                    LogTag::Sampler,
                                    &format!("Snapshot broadcast to {} subscriber(s)", delivered),
                                );
                            }
                        }
                        Err(e) => {
                            consecutive_failures += 1;
                            logger::warning(
                                LogTag::Sampler,
                                &format!("Sampling failed (consecutive={}): {}", consecutive_failures, e),
                            );
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::MetricsSnapshot;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::Instant;

    /// Fails the first `failures` calls, then reports `calls` as CPU usage
    struct FlakySource {
        calls: AtomicUsize,
        failures: usize,
        called_at: Mutex<Vec<Instant>>,
    }

    impl FlakySource {
        fn new(failures: usize) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                failures,
                called_at: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SnapshotSource for FlakySource {
        fn name(&self) -> &'static str {
            "flaky"
        }

        async fn snapshot(&self) -> Result<MetricsSnapshot, SourceError> {
            self.called_at.lock().push(Instant::now());
            let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            if call <= self.failures {
                return Err(SourceError::Collection(format!("call {} failed", call)));
            }
            let mut snapshot = MetricsSnapshot::default();
            snapshot.cpu.usage_percent = call as f32;
            Ok(snapshot)
        }
    }

    struct StuckSource;

    #[async_trait]
    impl SnapshotSource for StuckSource {
        fn name(&self) -> &'static str {
            "stuck"
        }

        async fn snapshot(&self) -> Result<MetricsSnapshot, SourceError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(MetricsSnapshot::default())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_do_not_stop_sampling() {
        let hub = WsHub::new(8);
        let mut subscriber = hub.subscribe().await;
        let source = Arc::new(FlakySource::new(3));

        let started = Instant::now();
        let sampler = Sampler::new(source.clone(), Arc::clone(&hub), Duration::from_secs(5));
        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(sampler.run(Arc::clone(&shutdown)));

        // ticks at 0s, 5s, 10s fail; 15s succeeds
        let frame = tokio::time::timeout(Duration::from_secs(60), subscriber.recv())
            .await
            .unwrap()
            .unwrap();
        let envelope = Envelope::parse(&frame).unwrap();
        assert_eq!(envelope.kind, "systemStats");
        assert_eq!(envelope.data["cpu"]["usagePercent"], 4.0);
        assert_eq!(source.calls.load(Ordering::SeqCst), 4);

        // failed ticks keep the cadence: no immediate retry, no drift
        let called_at = source.called_at.lock().clone();
        assert_eq!(called_at.len(), 4);
        for (n, at) in called_at.iter().enumerate() {
            let expected = Duration::from_secs(5 * n as u64);
            let offset = *at - started;
            assert!(
                offset >= expected && offset < expected + Duration::from_millis(5),
                "call {} at {:?}, expected ~{:?}",
                n + 1,
                offset,
                expected
            );
        }

        shutdown.notify_one();
        task.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_times_out_after_one_interval() {
        let hub = WsHub::new(8);
        let sampler = Sampler::new(Arc::new(StuckSource), hub, Duration::from_millis(500));

        let started = tokio::time::Instant::now();
        let err = sampler.sample_once().await.unwrap_err();

        assert_eq!(err, SourceError::Timeout { millis: 500 });
        assert!(started.elapsed() >= Duration::from_millis(500));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_loop() {
        let hub = WsHub::new(8);
        let source = Arc::new(FlakySource::new(0));
        let sampler = Sampler::new(source, hub, Duration::from_secs(1));
        let shutdown = Arc::new(Notify::new());
        shutdown.notify_one();

        tokio::time::timeout(Duration::from_secs(5), sampler.run(shutdown))
            .await
            .expect("sampler must exit once notified");
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_interval_is_clamped() {
        let hub = WsHub::new(8);
        let source = Arc::new(FlakySource::new(0));
        let sampler = Sampler::new(source.clone(), hub, Duration::ZERO);
        assert_eq!(sampler.interval, MIN_INTERVAL);

        let shutdown = Arc::new(Notify::new());
        let task = tokio::spawn(sampler.run(Arc::clone(&shutdown)));
        tokio::time::sleep(Duration::from_millis(10)).await;
        shutdown.notify_one();
        task.await.unwrap();

        assert!(source.calls.load(Ordering::SeqCst) >= 2);
    }
}
