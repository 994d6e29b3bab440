/// Reconnect state machine
///
/// Pure transition logic for the connection supervisor. `handle` takes one
/// event and returns the side effects the actor must carry out; no I/O,
/// no clock. Timing lives in `ReconnectPolicy` and is executed by the actor.
///
/// ```text
///   Idle ──start──▶ Connecting ──opened──▶ Open
///                     ▲    │                 │
///        timer fired  │    │ open failed     │ closed
///                     │    ▼                 ▼
///        ReconnectScheduled ◀──(attempts left)── Closed ──(exhausted)──▶ Failed
/// ```
///
/// `Closed` is transient: it resolves within the same `handle` call.
/// `stop` returns to `Idle` from anywhere; `manual_reconnect` enters
/// `Connecting` from anywhere with a fresh attempt budget.
use serde::Serialize;
use std::fmt;
use std::time::Duration;

use crate::config::SupervisorConfig;
use crate::errors::TransportError;

// ============================================================================
// STATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Idle,
    Connecting,
    Open,
    Closed,
    ReconnectScheduled,
    Failed,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Idle => "idle",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Open => "open",
            ConnectionState::Closed => "closed",
            ConnectionState::ReconnectScheduled => "reconnect_scheduled",
            ConnectionState::Failed => "failed",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, ConnectionState::Open)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// POLICY
// ============================================================================

/// Fixed-delay retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            max_attempts: 5,
        }
    }
}

impl ReconnectPolicy {
    pub fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    pub fn from_config(cfg: &SupervisorConfig) -> Self {
        Self::new(
            Duration::from_millis(cfg.reconnect_delay_ms),
            cfg.max_reconnect_attempts,
        )
    }
}

// ============================================================================
// EVENTS AND ACTIONS
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    Start,
    Stop,
    ManualReconnect,
    Opened,
    OpenFailed(TransportError),
    Closed(TransportError),
    TimerFired,
}

/// Side effects requested by a transition, in execution order
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    OpenTransport,
    CloseTransport,
    ScheduleReconnect(Duration),
    CancelReconnect,
    ClearSnapshot,
}

// ============================================================================
// MACHINE
// ============================================================================

#[derive(Debug, Clone)]
pub struct ReconnectMachine {
    state: ConnectionState,
    attempts: u32,
    policy: ReconnectPolicy,
}

impl ReconnectMachine {
    pub fn new(policy: ReconnectPolicy) -> Self {
        Self {
            state: ConnectionState::Idle,
            attempts: 0,
            policy,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Reconnect attempts made since the last successful open
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn policy(&self) -> ReconnectPolicy {
        self.policy
    }

    /// Apply one event; events that do not fit the current state are ignored
    pub fn handle(&mut self, event: Event) -> Vec<Action> {
        use ConnectionState::*;

        match (self.state, event) {
            (_, Event::Stop) => {
                self.state = Idle;
                self.attempts = 0;
                vec![
                    Action::CancelReconnect,
                    Action::CloseTransport,
                    Action::ClearSnapshot,
                ]
            }

            (_, Event::ManualReconnect) => {
                self.state = Connecting;
                self.attempts = 0;
                vec![
                    Action::CancelReconnect,
                    Action::CloseTransport,
                    Action::OpenTransport,
                ]
            }

            (Idle, Event::Start) => {
                self.state = Connecting;
                vec![Action::OpenTransport]
            }

            (Connecting, Event::Opened) => {
                self.state = Open;
                self.attempts = 0;
                Vec::new()
            }

            (Connecting, Event::OpenFailed(_))
            | (Connecting, Event::Closed(_))
            | (Open, Event::Closed(_)) => {
                self.state = Closed;
                self.after_close()
            }

            (ReconnectScheduled, Event::TimerFired) => {
                self.state = Connecting;
                vec![Action::OpenTransport]
            }

            _ => Vec::new(),
        }
    }

    fn after_close(&mut self) -> Vec<Action> {
        if self.attempts < self.policy.max_attempts {
            self.attempts += 1;
            self.state = ConnectionState::ReconnectScheduled;
            vec![
                Action::CloseTransport,
                Action::ScheduleReconnect(self.policy.delay),
            ]
        } else {
            self.state = ConnectionState::Failed;
            vec![Action::CloseTransport]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(max_attempts: u32) -> ReconnectMachine {
        ReconnectMachine::new(ReconnectPolicy::new(Duration::from_secs(3), max_attempts))
    }

    fn refused() -> Event {
        Event::OpenFailed(TransportError::Connect {
            url: "ws://127.0.0.1:1/ws".to_string(),
            reason: "refused".to_string(),
        })
    }

    fn dropped() -> Event {
        Event::Closed(TransportError::Closed("reset".to_string()))
    }

    #[test]
    fn test_start_only_from_idle() {
        let mut m = machine(5);
        assert_eq!(m.handle(Event::Start), vec![Action::OpenTransport]);
        assert_eq!(m.state(), ConnectionState::Connecting);

        assert!(m.handle(Event::Start).is_empty());
        m.handle(Event::Opened);
        assert!(m.handle(Event::Start).is_empty());
        assert_eq!(m.state(), ConnectionState::Open);
    }

    #[test]
    fn test_exhausts_exactly_max_attempts() {
        let mut m = machine(3);
        m.handle(Event::Start);

        for attempt in 1..=3 {
            let actions = m.handle(refused());
            assert_eq!(
                actions,
                vec![
                    Action::CloseTransport,
                    Action::ScheduleReconnect(Duration::from_secs(3))
                ]
            );
            assert_eq!(m.state(), ConnectionState::ReconnectScheduled);
            assert_eq!(m.attempts(), attempt);

            assert_eq!(m.handle(Event::TimerFired), vec![Action::OpenTransport]);
        }

        assert_eq!(m.handle(refused()), vec![Action::CloseTransport]);
        assert_eq!(m.state(), ConnectionState::Failed);

        // only manual reconnect leaves Failed
        assert!(m.handle(Event::Start).is_empty());
        assert!(m.handle(Event::TimerFired).is_empty());
        assert_eq!(m.state(), ConnectionState::Failed);
    }

    #[test]
    fn test_open_resets_attempts() {
        let mut m = machine(2);
        m.handle(Event::Start);
        m.handle(refused());
        m.handle(Event::TimerFired);
        m.handle(refused());
        assert_eq!(m.attempts(), 2);

        m.handle(Event::TimerFired);
        m.handle(Event::Opened);
        assert_eq!(m.attempts(), 0);

        m.handle(dropped());
        assert_eq!(m.state(), ConnectionState::ReconnectScheduled);
        assert_eq!(m.attempts(), 1);
    }

    #[test]
    fn test_stop_from_every_state_returns_to_idle() {
        let drive: Vec<Vec<Event>> = vec![
            vec![],
            vec![Event::Start],
            vec![Event::Start, Event::Opened],
            vec![Event::Start, refused()],
            vec![Event::Start, refused(), Event::TimerFired, refused()],
        ];

        for events in drive {
            let mut m = machine(1);
            for event in events {
                m.handle(event);
            }
            let actions = m.handle(Event::Stop);
            assert_eq!(m.state(), ConnectionState::Idle);
            assert_eq!(m.attempts(), 0);
            assert!(actions.contains(&Action::CancelReconnect));
            assert!(actions.contains(&Action::ClearSnapshot));

            // a timer that raced the stop changes nothing
            assert!(m.handle(Event::TimerFired).is_empty());
            assert_eq!(m.state(), ConnectionState::Idle);
        }
    }

    #[test]
    fn test_manual_reconnect_from_failed() {
        let mut m = machine(0);
        m.handle(Event::Start);
        m.handle(refused());
        assert_eq!(m.state(), ConnectionState::Failed);

        let actions = m.handle(Event::ManualReconnect);
        assert_eq!(actions.last(), Some(&Action::OpenTransport));
        assert_eq!(m.state(), ConnectionState::Connecting);
        assert_eq!(m.attempts(), 0);
    }

    #[test]
    fn test_out_of_order_events_are_ignored() {
        let mut m = machine(5);
        assert!(m.handle(Event::Opened).is_empty());
        assert!(m.handle(dropped()).is_empty());
        assert_eq!(m.state(), ConnectionState::Idle);

        m.handle(Event::Start);
        m.handle(Event::Opened);
        assert!(m.handle(Event::TimerFired).is_empty());
        assert!(m.handle(refused()).is_empty());
        assert_eq!(m.state(), ConnectionState::Open);
    }
}
