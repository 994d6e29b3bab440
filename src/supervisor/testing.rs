//! Test transports for the supervisor
//!
//! - `ScriptedConnector`: each connect pops the next scripted outcome
//!   (refused when the script is empty) and records when it was called
//! - `HubConnector`: subscribes straight to an in-process `WsHub`

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

use super::transport::{Connector, Transport};
use crate::errors::TransportError;
use crate::webserver::ws::{Subscriber, WsHub};

const SCRIPTED_URL: &str = "scripted://test";

enum Step {
    Fail,
    Open(ScriptedTransport),
}

pub(crate) struct ScriptedConnector {
    steps: Mutex<VecDeque<Step>>,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedConnector {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            steps: Mutex::new(VecDeque::new()),
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub(crate) fn push_fail(&self) {
        self.steps.lock().push_back(Step::Fail);
    }

    /// Script a successful connect; the returned end plays the server
    pub(crate) fn push_open(&self) -> RemoteEnd {
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        self.steps.lock().push_back(Step::Open(ScriptedTransport {
            inbound: inbound_rx,
            sent: Arc::clone(&sent),
        }));
        RemoteEnd {
            inbound: inbound_tx,
            sent,
        }
    }

    /// When each connect call happened (tokio clock)
    pub(crate) fn attempts(&self) -> Vec<Instant> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    fn endpoint(&self) -> &str {
        SCRIPTED_URL
    }

    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        self.attempts.lock().push(Instant::now());
        let step = self.steps.lock().pop_front();
        match step {
            Some(Step::Open(transport)) => Ok(Box::new(transport)),
            Some(Step::Fail) | None => Err(TransportError::Connect {
                url: SCRIPTED_URL.to_string(),
                reason: "connection refused".to_string(),
            }),
        }
    }
}

struct ScriptedTransport {
    inbound: mpsc::UnboundedReceiver<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send_text(&mut self, text: String) -> Result<(), TransportError> {
        self.sent.lock().push(text);
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.inbound.close();
    }
}

/// Server side of a scripted connection; dropping it closes the connection
pub(crate) struct RemoteEnd {
    inbound: mpsc::UnboundedSender<String>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl RemoteEnd {
    pub(crate) fn push(&self, text: &str) {
        let _ = self.inbound.send(text.to_string());
    }

    /// Everything the supervisor wrote to this connection
    pub(crate) fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

pub(crate) struct HubConnector {
    hub: Arc<WsHub>,
}

impl HubConnector {
    pub(crate) fn new(hub: Arc<WsHub>) -> Self {
        Self { hub }
    }
}

#[async_trait]
impl Connector for HubConnector {
    fn endpoint(&self) -> &str {
        "hub://in-process"
    }

    async fn connect(&self) -> Result<Box<dyn Transport>, TransportError> {
        let subscriber = self.hub.subscribe().await;
        Ok(Box::new(HubTransport {
            hub: Arc::clone(&self.hub),
            subscriber,
        }))
    }
}

struct HubTransport {
    hub: Arc<WsHub>,
    subscriber: Subscriber,
}

#[async_trait]
impl Transport for HubTransport {
    async fn send_text(&mut self, _text: String) -> Result<(), TransportError> {
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<String, TransportError>> {
        self.subscriber.recv().await.map(|frame| Ok(frame.to_string()))
    }

    async fn close(&mut self) {
        self.hub.unsubscribe(self.subscriber.id()).await;
    }
}
