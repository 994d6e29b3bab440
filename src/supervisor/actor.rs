/// Connection supervisor
///
/// A single actor task owns the reconnect machine, the live transport and
/// the reconnect timer. Commands from `Supervisor` handles, transport
/// events and the timer are multiplexed by one `select!` loop, so
/// transitions never interleave.
///
/// Every transport gets a generation number. Closing or replacing a
/// transport bumps the generation, and events tagged with an older one are
/// dropped, so a late close from a superseded socket cannot trigger a
/// reconnect.
use std::future::pending;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{sleep, timeout, Sleep};

use super::machine::{Action, ConnectionState, Event, ReconnectMachine, ReconnectPolicy};
use super::status::SupervisorStatus;
use super::transport::{Connector, WsConnector};
use crate::{
    arguments::is_debug_supervisor_enabled,
    config::SupervisorConfig,
    errors::TransportError,
    logger::{self, LogTag},
    metrics::MetricsSnapshot,
    webserver::ws::{Envelope, Payload},
};

/// How long a closing transport may take before its task is aborted
const TRANSPORT_CLOSE_GRACE: Duration = Duration::from_secs(2);

type Generation = u64;

enum Command {
    Start,
    Stop(oneshot::Sender<()>),
    Send(String),
    ManualReconnect,
    Shutdown(oneshot::Sender<()>),
}

#[derive(Debug)]
enum TransportEvent {
    Opened,
    OpenFailed(TransportError),
    Message(String),
    Closed(TransportError),
}

type EventSender = mpsc::UnboundedSender<(Generation, TransportEvent)>;

// ============================================================================
// TRANSPORT TASK
// ============================================================================

struct LiveTransport {
    outbound: mpsc::UnboundedSender<String>,
    task: JoinHandle<()>,
}

impl LiveTransport {
    fn spawn(connector: Arc<dyn Connector>, generation: Generation, events: EventSender) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(pump(connector, generation, events, outbound_rx));
        Self { outbound, task }
    }

    /// Close the connection and wait for the pump to finish
    ///
    /// Queued outbound messages are flushed first.
    async fn shutdown(self) {
        let LiveTransport { outbound, mut task } = self;
        drop(outbound);
        if timeout(TRANSPORT_CLOSE_GRACE, &mut task).await.is_err() {
            task.abort();
        }
    }
}

/// Connect, then shuttle frames until either side ends the connection
///
/// Reports `Opened`/`OpenFailed` once and `Closed` when the peer or an I/O
/// error ends the connection. A close requested by the supervisor (outbound
/// channel dropped) is not reported.
async fn pump(
    connector: Arc<dyn Connector>,
    generation: Generation,
    events: EventSender,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let connected = tokio::select! {
        result = connector.connect() => result,
        _ = outbound.recv() => return,
    };

    let mut transport = match connected {
        Ok(transport) => transport,
        Err(e) => {
            let _ = events.send((generation, TransportEvent::OpenFailed(e)));
            return;
        }
    };
    let _ = events.send((generation, TransportEvent::Opened));

    let reason = loop {
        tokio::select! {
            message = outbound.recv() => match message {
                Some(text) => {
                    if let Err(e) = transport.send_text(text).await {
                        break e;
                    }
                }
                None => {
                    transport.close().await;
                    return;
                }
            },
            frame = transport.recv() => match frame {
                Some(Ok(text)) => {
                    let _ = events.send((generation, TransportEvent::Message(text)));
                }
                Some(Err(e)) => break e,
                None => break TransportError::Closed("connection ended".to_string()),
            },
        }
    };

    transport.close().await;
    let _ = events.send((generation, TransportEvent::Closed(reason)));
}

// ============================================================================
// ACTOR
// ============================================================================

struct SupervisorActor {
    machine: ReconnectMachine,
    connector: Arc<dyn Connector>,
    generation: Generation,
    transport: Option<LiveTransport>,
    reconnect_timer: Option<Pin<Box<Sleep>>>,
    events_tx: EventSender,
    status: watch::Sender<SupervisorStatus>,
}

async fn wait_timer(timer: &mut Option<Pin<Box<Sleep>>>) {
    match timer {
        Some(sleep) => sleep.as_mut().await,
        None => pending().await,
    }
}

impl SupervisorActor {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut events: mpsc::UnboundedReceiver<(Generation, TransportEvent)>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Start) => self.apply(Event::Start).await,
                    Some(Command::Stop(ack)) => {
                        self.apply(Event::Stop).await;
                        let _ = ack.send(());
                    }
                    Some(Command::Send(text)) => self.forward(text),
                    Some(Command::ManualReconnect) => {
                        logger::info(LogTag::Supervisor, "Manual reconnect requested");
                        self.apply(Event::ManualReconnect).await;
                    }
                    Some(Command::Shutdown(ack)) => {
                        self.apply(Event::Stop).await;
                        let _ = ack.send(());
                        break;
                    }
                    // every handle dropped
                    None => {
                        self.apply(Event::Stop).await;
                        break;
                    }
                },

                Some((generation, event)) = events.recv() => {
                    self.on_transport_event(generation, event).await;
                }

                _ = wait_timer(&mut self.reconnect_timer) => {
                    self.reconnect_timer = None;
                    self.apply(Event::TimerFired).await;
                }
            }
        }

        logger::info(LogTag::Supervisor, "Supervisor task stopped");
    }

    /// Run one machine transition and its side effects, then publish
    async fn apply(&mut self, event: Event) {
        let from = self.machine.state();
        let actions = self.machine.handle(event);
        for action in actions {
            self.execute(action).await;
        }
        let to = self.machine.state();

        if from != to {
            logger::info(LogTag::Supervisor, &format!("State {} → {}", from, to));
            if to == ConnectionState::Failed {
                logger::error(
                    LogTag::Supervisor,
                    &format!(
                        "Giving up on {} after {} reconnect attempt(s); manual reconnect required",
                        self.connector.endpoint(),
                        self.machine.policy().max_attempts
                    ),
                );
            }
        }

        self.publish();
    }

    async fn execute(&mut self, action: Action) {
        match action {
            Action::OpenTransport => {
                self.generation += 1;
                if is_debug_supervisor_enabled() {
                    logger::debug(
                        LogTag::Supervisor,
                        &format!(
                            "Connecting to {} (generation {})",
                            self.connector.endpoint(),
                            self.generation
                        ),
                    );
                }
                self.transport = Some(LiveTransport::spawn(
                    Arc::clone(&self.connector),
                    self.generation,
                    self.events_tx.clone(),
                ));
            }
            Action::CloseTransport => {
                self.generation += 1;
                if let Some(transport) = self.transport.take() {
                    transport.shutdown().await;
                }
            }
            Action::ScheduleReconnect(delay) => {
                let policy = self.machine.policy();
                logger::info(
                    LogTag::Supervisor,
                    &format!(
                        "Reconnecting in {}ms (attempt {}/{})",
                        delay.as_millis(),
                        self.machine.attempts(),
                        policy.max_attempts
                    ),
                );
                self.reconnect_timer = Some(Box::pin(sleep(delay)));
            }
            Action::CancelReconnect => {
                self.reconnect_timer = None;
            }
            Action::ClearSnapshot => {
                self.status.send_if_modified(|status| status.snapshot.take().is_some());
            }
        }
    }

    async fn on_transport_event(&mut self, generation: Generation, event: TransportEvent) {
        if generation != self.generation {
            if is_debug_supervisor_enabled() {
                logger::debug(
                    LogTag::Supervisor,
                    &format!(
                        "Ignoring {:?} from superseded transport (generation {} < {})",
                        event, generation, self.generation
                    ),
                );
            }
            return;
        }

        match event {
            TransportEvent::Opened => {
                logger::info(
                    LogTag::Supervisor,
                    &format!("Connected to {}", self.connector.endpoint()),
                );
                self.apply(Event::Opened).await;
            }
            TransportEvent::OpenFailed(e) => {
                logger::warning(LogTag::Supervisor, &format!("Connection attempt failed: {}", e));
                self.apply(Event::OpenFailed(e)).await;
            }
            TransportEvent::Closed(e) => {
                logger::warning(
                    LogTag::Supervisor,
                    &format!("Connection lost ({}): {}", e.kind(), e),
                );
                self.apply(Event::Closed(e)).await;
            }
            TransportEvent::Message(text) => self.on_message(&text),
        }
    }

    fn on_message(&mut self, text: &str) {
        if !self.machine.state().is_open() {
            return;
        }

        let envelope = match Envelope::parse(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                logger::warning(
                    LogTag::Supervisor,
                    &format!("Discarding malformed frame: {}", e),
                );
                return;
            }
        };

        match envelope.payload() {
            Ok(Payload::SystemStats(snapshot)) => {
                if is_debug_supervisor_enabled() {
                    logger::debug(
                        LogTag::Supervisor,
                        &format!(
                            "systemStats: cpu={:.1}% mem={:.1}% (ts={})",
                            snapshot.cpu.usage_percent,
                            snapshot.memory.usage_percent,
                            snapshot.timestamp
                        ),
                    );
                }
                self.status.send_modify(|status| status.snapshot = Some(snapshot));
            }
            Ok(other) => {
                if is_debug_supervisor_enabled() {
                    logger::debug(
                        LogTag::Supervisor,
                        &format!("Ignoring '{}' frame ({:?})", envelope.kind, other),
                    );
                }
            }
            Err(e) => {
                logger::warning(
                    LogTag::Supervisor,
                    &format!("Discarding '{}' frame with bad payload: {}", envelope.kind, e),
                );
            }
        }
    }

    fn forward(&mut self, text: String) {
        let state = self.machine.state();
        if !state.is_open() {
            logger::warning(
                LogTag::Supervisor,
                &format!("Not connected (state={}), dropping outbound message", state),
            );
            return;
        }

        let delivered = self
            .transport
            .as_ref()
            .map(|transport| transport.outbound.send(text).is_ok())
            .unwrap_or(false);
        if !delivered {
            logger::warning(
                LogTag::Supervisor,
                "Transport unavailable, dropping outbound message",
            );
        }
    }

    fn publish(&mut self) {
        let state = self.machine.state();
        let attempts = self.machine.attempts();
        self.status.send_if_modified(|status| {
            let changed = status.state != state || status.reconnect_attempts != attempts;
            status.state = state;
            status.connected = state.is_open();
            status.reconnect_attempts = attempts;
            changed
        });
    }
}

// ============================================================================
// HANDLE
// ============================================================================

/// Handle to a running supervisor task
///
/// Cheap to clone. The task stops (after an implicit `stop`) once every
/// handle is dropped or `shutdown` is called.
#[derive(Clone)]
pub struct Supervisor {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<SupervisorStatus>,
}

impl Supervisor {
    /// Spawn the supervisor task in `Idle`; nothing connects until `start`
    pub fn spawn(connector: Arc<dyn Connector>, policy: ReconnectPolicy) -> Self {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (status_tx, status_rx) = watch::channel(SupervisorStatus::default());

        logger::info(
            LogTag::Supervisor,
            &format!(
                "Supervisor ready for {} (delay={}ms, max_attempts={})",
                connector.endpoint(),
                policy.delay.as_millis(),
                policy.max_attempts
            ),
        );

        let actor = SupervisorActor {
            machine: ReconnectMachine::new(policy),
            connector,
            generation: 0,
            transport: None,
            reconnect_timer: None,
            events_tx,
            status: status_tx,
        };
        tokio::spawn(actor.run(commands_rx, events_rx));

        Self {
            commands: commands_tx,
            status: status_rx,
        }
    }

    /// WebSocket supervisor for `[supervisor] url`
    pub fn from_config(cfg: &SupervisorConfig) -> Self {
        Self::spawn(
            Arc::new(WsConnector::new(cfg.url.clone())),
            ReconnectPolicy::from_config(cfg),
        )
    }

    fn command(&self, command: Command) -> bool {
        if self.commands.send(command).is_err() {
            if is_debug_supervisor_enabled() {
                logger::debug(LogTag::Supervisor, "Supervisor task has exited, command ignored");
            }
            return false;
        }
        true
    }

    /// Begin connecting; no-op unless `Idle`
    pub fn start(&self) {
        self.command(Command::Start);
    }

    /// Return to `Idle`
    ///
    /// Once this resolves the timer is cancelled and the transport closed,
    /// so nothing can move the state until the next `start`.
    pub async fn stop(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.command(Command::Stop(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    /// Forward a text frame when `Open`, otherwise log and drop it
    pub fn send(&self, message: impl Into<String>) {
        self.command(Command::Send(message.into()));
    }

    /// Drop the current connection and retry now with a fresh attempt budget
    pub fn manual_reconnect(&self) {
        self.command(Command::ManualReconnect);
    }

    /// `stop`, then end the supervisor task
    pub async fn shutdown(&self) {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.command(Command::Shutdown(ack_tx)) {
            let _ = ack_rx.await;
        }
    }

    pub fn status(&self) -> SupervisorStatus {
        self.status.borrow().clone()
    }

    pub fn state(&self) -> ConnectionState {
        self.status.borrow().state
    }

    pub fn is_connected(&self) -> bool {
        self.status.borrow().connected
    }

    pub fn latest_snapshot(&self) -> Option<MetricsSnapshot> {
        self.status.borrow().snapshot.clone()
    }

    /// Change notifications for state, liveness and snapshot
    pub fn subscribe(&self) -> watch::Receiver<SupervisorStatus> {
        self.status.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceError;
    use crate::metrics::SnapshotSource;
    use crate::sampler::Sampler;
    use crate::supervisor::testing::{HubConnector, ScriptedConnector};
    use crate::webserver::ws::WsHub;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use tokio::sync::Notify;
    use tokio::time::Instant;

    fn policy(delay_secs: u64, max_attempts: u32) -> ReconnectPolicy {
        ReconnectPolicy::new(Duration::from_secs(delay_secs), max_attempts)
    }

    async fn wait_for<F>(supervisor: &Supervisor, predicate: F) -> SupervisorStatus
    where
        F: FnMut(&SupervisorStatus) -> bool,
    {
        let mut rx = supervisor.subscribe();
        let result = timeout(Duration::from_secs(120), rx.wait_for(predicate)).await;
        let status = result
            .expect("status never reached")
            .expect("supervisor task gone")
            .clone();
        status
    }

    /// Let every runnable task drain its queues
    async fn settle() {
        sleep(Duration::from_millis(10)).await;
    }

    fn assert_near(actual: Duration, expected: Duration) {
        assert!(
            actual >= expected && actual < expected + Duration::from_millis(5),
            "expected ~{:?}, got {:?}",
            expected,
            actual
        );
    }

    fn stats_frame(cpu: f32, mem: f64, timestamp: i64) -> (MetricsSnapshot, String) {
        let mut snapshot = MetricsSnapshot::default();
        snapshot.cpu.usage_percent = cpu;
        snapshot.memory.usage_percent = mem;
        snapshot.timestamp = timestamp;
        let frame = Envelope::system_stats(&snapshot).unwrap().to_json().unwrap();
        (snapshot, frame)
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausts_reconnect_attempts_then_fails() {
        let connector = ScriptedConnector::new();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();

        let status = wait_for(&supervisor, |s| s.state == ConnectionState::Failed).await;
        assert!(!status.connected);
        assert_eq!(status.reconnect_attempts, 5);

        // initial attempt + 5 reconnects, each one delay apart
        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 6);
        for pair in attempts.windows(2) {
            assert_near(pair[1] - pair[0], Duration::from_secs(3));
        }

        // stays failed without a manual reconnect
        sleep(Duration::from_secs(30)).await;
        assert_eq!(supervisor.state(), ConnectionState::Failed);
        assert_eq!(connector.attempts().len(), 6);
    }

    #[tokio::test(start_paused = true)]
    async fn test_successful_open_resets_attempts() {
        let connector = ScriptedConnector::new();
        connector.push_fail();
        connector.push_fail();
        let remote = connector.push_open();

        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 2));
        supervisor.start();

        let status = wait_for(&supervisor, |s| s.connected).await;
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(connector.attempts().len(), 3);

        // the budget is full again after the drop
        drop(remote);
        let status = wait_for(&supervisor, |s| s.state == ConnectionState::Failed).await;
        assert_eq!(status.reconnect_attempts, 2);
        assert_eq!(connector.attempts().len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_at_t0_retries_at_3s_and_6s_then_fails() {
        let connector = ScriptedConnector::new();
        let remote = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 2));
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        let t0 = Instant::now();
        drop(remote);

        tokio::time::sleep_until(t0 + Duration::from_millis(5900)).await;
        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::ReconnectScheduled);
        assert_eq!(status.reconnect_attempts, 2);

        tokio::time::sleep_until(t0 + Duration::from_millis(6010)).await;
        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Failed);
        assert!(!status.connected);

        let attempts = connector.attempts();
        assert_eq!(attempts.len(), 3);
        assert_near(attempts[1] - t0, Duration::from_secs(3));
        assert_near(attempts[2] - t0, Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_pending_reconnect() {
        let connector = ScriptedConnector::new();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();
        wait_for(&supervisor, |s| s.state == ConnectionState::ReconnectScheduled).await;

        supervisor.stop().await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);

        sleep(Duration::from_secs(10)).await;
        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Idle);
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(connector.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_while_open_clears_snapshot() {
        let connector = ScriptedConnector::new();
        let remote = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        let (_, frame) = stats_frame(10.0, 20.0, 1);
        remote.push(&frame);
        wait_for(&supervisor, |s| s.snapshot.is_some()).await;

        supervisor.stop().await;
        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Idle);
        assert!(!status.connected);
        assert_eq!(status.snapshot, None);

        sleep(Duration::from_secs(10)).await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);
        assert_eq!(connector.attempts().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_only_forwards_when_open() {
        let connector = ScriptedConnector::new();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));

        supervisor.send("too early");
        settle().await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);
        assert!(connector.attempts().is_empty());

        let remote = connector.push_open();
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        supervisor.send(r#"{"type":"ping"}"#);
        supervisor.stop().await;
        assert_eq!(remote.sent(), vec![r#"{"type":"ping"}"#.to_string()]);

        supervisor.send("after stop");
        settle().await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);
        assert_eq!(remote.sent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_reconnecting_or_failed_is_dropped() {
        let connector = ScriptedConnector::new();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 1));
        supervisor.start();

        let scheduled = wait_for(&supervisor, |s| s.state == ConnectionState::ReconnectScheduled).await;
        supervisor.send("while scheduled");
        settle().await;
        assert_eq!(supervisor.status(), scheduled);
        assert_eq!(connector.attempts().len(), 1);

        let failed = wait_for(&supervisor, |s| s.state == ConnectionState::Failed).await;
        supervisor.send("while failed");
        settle().await;
        assert_eq!(supervisor.status(), failed);
        assert_eq!(connector.attempts().len(), 2);

        // dropped messages are not replayed on the next connection
        let remote = connector.push_open();
        supervisor.manual_reconnect();
        wait_for(&supervisor, |s| s.connected).await;
        settle().await;
        assert!(remote.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_frames_leave_state_and_snapshot() {
        let connector = ScriptedConnector::new();
        let remote = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        let (snapshot, frame) = stats_frame(10.0, 20.0, 1);
        remote.push(&frame);
        wait_for(&supervisor, |s| s.snapshot.is_some()).await;

        remote.push("not json");
        remote.push(r#"{"type":"diskAlert","data":{"mount":"/"}}"#);
        remote.push(r#"{"type":"systemStats","data":"cpu=10"}"#);
        settle().await;

        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Open);
        assert!(status.connected);
        assert_eq!(status.snapshot, Some(snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_is_idempotent() {
        let connector = ScriptedConnector::new();
        let _remote = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));

        supervisor.start();
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;
        supervisor.start();
        settle().await;

        assert_eq!(connector.attempts().len(), 1);
        assert_eq!(supervisor.state(), ConnectionState::Open);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_reconnect_recovers_from_failed() {
        let connector = ScriptedConnector::new();
        let supervisor = Supervisor::spawn(connector.clone(), policy(1, 1));
        supervisor.start();
        wait_for(&supervisor, |s| s.state == ConnectionState::Failed).await;

        let _remote = connector.push_open();
        supervisor.manual_reconnect();

        let status = wait_for(&supervisor, |s| s.connected).await;
        assert_eq!(status.state, ConnectionState::Open);
        assert_eq!(status.reconnect_attempts, 0);
        assert_eq!(connector.attempts().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_superseded_transport_is_ignored() {
        let connector = ScriptedConnector::new();
        let first = connector.push_open();
        let second = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        supervisor.manual_reconnect();
        settle().await;
        assert_eq!(connector.attempts().len(), 2);

        // frames and closes from the old connection change nothing
        let (_, frame) = stats_frame(99.0, 99.0, 1);
        first.push(&frame);
        drop(first);
        settle().await;

        let status = supervisor.status();
        assert_eq!(status.state, ConnectionState::Open);
        assert_eq!(status.snapshot, None);

        let (snapshot, frame) = stats_frame(10.0, 20.0, 2);
        second.push(&frame);
        let status = wait_for(&supervisor, |s| s.snapshot.is_some()).await;
        assert_eq!(status.snapshot, Some(snapshot));
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_task() {
        let connector = ScriptedConnector::new();
        let _remote = connector.push_open();
        let supervisor = Supervisor::spawn(connector.clone(), policy(3, 5));
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;

        supervisor.shutdown().await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);

        // the task is gone: commands are ignored and nothing reconnects
        supervisor.start();
        supervisor.stop().await;
        sleep(Duration::from_secs(10)).await;
        assert_eq!(supervisor.state(), ConnectionState::Idle);
        assert_eq!(connector.attempts().len(), 1);
    }

    /// Plays back fixed snapshots, repeating the last one
    struct SequenceSource {
        snapshots: Mutex<VecDeque<MetricsSnapshot>>,
    }

    #[async_trait]
    impl SnapshotSource for SequenceSource {
        fn name(&self) -> &'static str {
            "sequence"
        }

        async fn snapshot(&self) -> Result<MetricsSnapshot, SourceError> {
            let mut snapshots = self.snapshots.lock();
            let next = if snapshots.len() > 1 {
                snapshots.pop_front()
            } else {
                snapshots.front().cloned()
            };
            next.ok_or_else(|| SourceError::Collection("no snapshots".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_sampler_to_supervisor_end_to_end() {
        let hub = WsHub::new(8);
        let supervisor = Supervisor::spawn(
            Arc::new(HubConnector::new(Arc::clone(&hub))),
            ReconnectPolicy::default(),
        );
        supervisor.start();
        wait_for(&supervisor, |s| s.connected).await;
        assert_eq!(hub.subscriber_count().await, 1);

        let (first, _) = stats_frame(10.0, 20.0, 0);
        let (second, _) = stats_frame(10.0, 20.0, 5000);
        let source = Arc::new(SequenceSource {
            snapshots: Mutex::new(VecDeque::from(vec![first.clone(), second.clone()])),
        });

        let shutdown = Arc::new(Notify::new());
        let t0 = Instant::now();
        tokio::spawn(
            Sampler::new(source, Arc::clone(&hub), Duration::from_secs(5)).run(Arc::clone(&shutdown)),
        );

        let status = wait_for(&supervisor, |s| s.snapshot.is_some()).await;
        assert_eq!(status.snapshot, Some(first));

        tokio::time::sleep_until(t0 + Duration::from_millis(5100)).await;
        assert_eq!(supervisor.latest_snapshot(), Some(second));

        shutdown.notify_one();
        supervisor.shutdown().await;
        assert_eq!(hub.subscriber_count().await, 0);
    }
}
