//! Scripted request/response backend.
//!
//! Answers `start` with the session key derived from the request and `send`
//! with `{"status": "sent"}` unless a test queued a different outcome. Every
//! request is recorded. An optional latency is slept on the tokio clock, so
//! under paused time it costs nothing but still orders completions.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use relayline_client::{Backend, BackendError};
use relayline_proto::{SendRequest, SendResponse, StartRequest, StartResponse};

#[derive(Default)]
struct Script {
    starts: VecDeque<Result<StartResponse, BackendError>>,
    sends: VecDeque<Result<SendResponse, BackendError>>,
    start_log: Vec<StartRequest>,
    send_log: Vec<SendRequest>,
    latency: Duration,
}

/// In-memory [`Backend`] with scripted outcomes.
#[derive(Clone, Default)]
pub struct SimBackend {
    script: Arc<Mutex<Script>>,
}

impl SimBackend {
    /// Backend that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every response by `latency`.
    #[must_use]
    pub fn with_latency(self, latency: Duration) -> Self {
        self.script().latency = latency;
        self
    }

    /// Queue the outcome of the next `start`.
    pub fn push_start(&self, outcome: Result<StartResponse, BackendError>) {
        self.script().starts.push_back(outcome);
    }

    /// Queue the outcome of the next `send`.
    pub fn push_send(&self, outcome: Result<SendResponse, BackendError>) {
        self.script().sends.push_back(outcome);
    }

    /// `start` requests received so far.
    pub fn starts(&self) -> Vec<StartRequest> {
        self.script().start_log.clone()
    }

    /// `send` requests received so far.
    pub fn sends(&self) -> Vec<SendRequest> {
        self.script().send_log.clone()
    }

    fn script(&self) -> MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn delay(&self) {
        let latency = self.script().latency;
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
    }
}

#[async_trait]
impl Backend for SimBackend {
    async fn start(&self, request: StartRequest) -> Result<StartResponse, BackendError> {
        self.delay().await;

        let mut script = self.script();
        let outcome = script.starts.pop_front().unwrap_or_else(|| {
            Ok(StartResponse { client_id: format!("{}_{}", request.user_id, request.agent_id) })
        });
        script.start_log.push(request);
        outcome
    }

    async fn send(&self, request: SendRequest) -> Result<SendResponse, BackendError> {
        self.delay().await;

        let mut script = self.script();
        let outcome =
            script.sends.pop_front().unwrap_or_else(|| Ok(SendResponse { status: "sent".into() }));
        script.send_log.push(request);
        outcome
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use relayline_proto::SendContent;

    use super::*;

    fn send_request() -> SendRequest {
        SendRequest {
            client_id: "U_A".into(),
            to: "1555@c.us".into(),
            content: SendContent::Text { message: "hi".into() },
        }
    }

    #[tokio::test]
    async fn start_echoes_session_key() {
        let backend = SimBackend::new();

        let response = backend
            .start(StartRequest { user_id: "U".into(), agent_id: "A".into() })
            .await
            .unwrap();

        assert_eq!(response.client_id, "U_A");
        assert_eq!(backend.starts().len(), 1);
    }

    #[tokio::test]
    async fn scripted_outcomes_come_first() {
        let backend = SimBackend::new();
        backend.push_send(Err(BackendError::Rejected { status: 404, detail: "nope".into() }));

        assert!(backend.send(send_request()).await.is_err());
        assert_eq!(backend.send(send_request()).await.unwrap().status, "sent");
        assert_eq!(backend.sends().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_uses_tokio_clock() {
        let backend = SimBackend::new().with_latency(Duration::from_millis(250));
        let start = tokio::time::Instant::now();

        backend.send(send_request()).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }
}
