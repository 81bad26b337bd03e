//! Client state machine.
//!
//! The `Client` is the top-level state machine of one session. It combines
//! the session state machine, the push-channel lifecycle, the inbound
//! dispatcher and the outbound composer behind a single event/action
//! interface. It performs no I/O.

use std::collections::HashMap;

use relayline_core::{
    Channel, ChannelAction, ChannelPhase, Session, SessionAction, SessionIdentity, SessionStatus,
    env::Environment,
};
use relayline_proto::{SendResponse, StartRequest, StartResponse};
use tracing::{debug, info, warn};

use crate::{
    backend::BackendError,
    composer::{Composer, OutboundDraft, SendFailure, SendRoute, local_echo},
    config::ClientConfig,
    dispatcher::{Dispatched, Dispatcher},
    error::ClientError,
    event::{ClientAction, ClientEvent, SendAck, SendId},
    message::ChatMessage,
};

/// Session detail once the reconnect policy gave up.
pub const RECONNECTS_EXHAUSTED: &str = "reconnect attempts exhausted";

/// Progress of the `POST /start` bootstrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bootstrap {
    Pending,
    InFlight,
    Done,
}

/// Client for one relay session.
pub struct Client<E: Environment> {
    /// Environment for randomness.
    env: E,

    config: ClientConfig,

    session: Session,

    channel: Channel<E::Instant>,

    /// Message log owner.
    dispatcher: Dispatcher,

    composer: Composer,

    /// In-flight request-channel sends, with the draft they were built from.
    pending: HashMap<SendId, OutboundDraft>,

    bootstrap: Bootstrap,
}

impl<E: Environment> Client<E> {
    /// Create a client for `identity`.
    ///
    /// # Errors
    ///
    /// - `ClientError::Channel` if the gateway URL does not parse
    pub fn new(
        env: E,
        config: ClientConfig,
        identity: SessionIdentity,
    ) -> Result<Self, ClientError> {
        let channel = Channel::new(&config.gateway_url, config.reconnect)?;
        let composer = Composer::new(config.recipient_domain.clone());
        let bootstrap = if config.bootstrap { Bootstrap::Pending } else { Bootstrap::Done };

        Ok(Self {
            env,
            config,
            session: Session::new(identity),
            channel,
            dispatcher: Dispatcher::new(),
            composer,
            pending: HashMap::new(),
            bootstrap,
        })
    }

    /// Session state machine
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Status snapshot
    pub fn status(&self) -> SessionStatus {
        self.session.status()
    }

    /// Message log in display order
    pub fn messages(&self) -> &[ChatMessage] {
        self.dispatcher.log().entries()
    }

    /// Current draft
    pub fn draft(&self) -> &OutboundDraft {
        self.composer.draft()
    }

    /// Number of in-flight request-channel sends
    pub fn pending_sends(&self) -> usize {
        self.pending.len()
    }

    /// Push-channel phase
    pub fn channel_phase(&self) -> ChannelPhase {
        self.channel.phase()
    }

    /// Deadline of the pending reconnect, if any.
    pub fn reconnect_deadline(&self) -> Option<E::Instant> {
        self.channel.reconnect_deadline()
    }

    /// Configuration
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Process an event and return actions for the caller to execute.
    pub fn handle(&mut self, event: ClientEvent<E::Instant>) -> Vec<ClientAction> {
        match event {
            ClientEvent::Open => self.handle_open(),
            ClientEvent::StartCompleted(response) => self.handle_start_completed(&response),
            ClientEvent::StartFailed(err) => self.handle_start_failed(&err),
            ClientEvent::ChannelOpened { attempt } => {
                if self.channel.handle_opened(attempt) {
                    info!(attempt, "channel opened");
                    self.session.handle_channel_opened();
                } else {
                    debug!(attempt, "ignoring stale opened signal");
                }
                Vec::new()
            },
            ClientEvent::ChannelFrame { attempt, text } => self.handle_frame(attempt, &text),
            ClientEvent::ChannelClosed { attempt, reason, now } => {
                self.handle_lost(attempt, now, None, reason.as_deref().unwrap_or("closed"))
            },
            ClientEvent::ChannelError { attempt, cause, now } => {
                self.handle_lost(attempt, now, Some(cause.clone()), &cause)
            },
            ClientEvent::Tick { now } => {
                let actions = self.channel.tick(now);
                self.channel_actions(actions)
            },
            ClientEvent::EditDraft(draft) => {
                self.composer.set_draft(draft);
                Vec::new()
            },
            ClientEvent::Submit => self.handle_submit(),
            ClientEvent::SendCompleted { id, result } => self.handle_send_completed(id, result),
            ClientEvent::Shutdown => self.handle_shutdown(),
        }
    }

    fn handle_open(&mut self) -> Vec<ClientAction> {
        if matches!(self.channel.phase(), ChannelPhase::Opening | ChannelPhase::Open)
            || self.bootstrap == Bootstrap::InFlight
        {
            debug!("open ignored, session already active");
            return Vec::new();
        }

        let mut actions = Self::session_actions(self.session.begin_connecting());
        if self.bootstrap == Bootstrap::Pending {
            self.bootstrap = Bootstrap::InFlight;
            let identity = self.session.identity();
            info!(user_id = identity.user_id(), agent_id = identity.agent_id(), "starting session");
            actions.push(ClientAction::StartSession(StartRequest {
                user_id: identity.user_id().to_owned(),
                agent_id: identity.agent_id().to_owned(),
            }));
        } else {
            actions.extend(self.open_channel());
        }
        actions
    }

    fn handle_start_completed(&mut self, response: &StartResponse) -> Vec<ClientAction> {
        if self.bootstrap != Bootstrap::InFlight {
            debug!("ignoring start response with no bootstrap in flight");
            return Vec::new();
        }

        self.bootstrap = Bootstrap::Done;
        info!(client_id = %response.client_id, "backend session started");
        self.open_channel()
    }

    fn handle_start_failed(&mut self, err: &BackendError) -> Vec<ClientAction> {
        if self.bootstrap != Bootstrap::InFlight {
            debug!("ignoring start failure with no bootstrap in flight");
            return Vec::new();
        }

        self.bootstrap = Bootstrap::Pending;
        warn!(error = %err, "failed to start session");
        Self::session_actions(self.session.handle_start_failed())
    }

    fn handle_frame(&mut self, attempt: u64, text: &str) -> Vec<ClientAction> {
        if !self.channel.is_current(attempt) {
            debug!(attempt, "dropping frame from stale connection");
            return Vec::new();
        }

        match self.dispatcher.dispatch(text, &mut self.session) {
            Ok(Dispatched::Appended(message)) => {
                debug!(sender = %message.sender, "message received");
                vec![ClientAction::MessageAppended(message)]
            },
            Ok(Dispatched::Session(actions)) => {
                let ended = actions.iter().any(|a| matches!(a, SessionAction::ServerError(_)));
                let mut out = Self::session_actions(actions);
                if ended {
                    // Backend ended the session; `open()` starts a fresh connection
                    let released = self.channel.close();
                    out.extend(self.channel_actions(released));
                }
                out
            },
            Err(err) if err.is_unrecognized() => {
                warn!(error = %err, "ignoring unrecognized event");
                Vec::new()
            },
            Err(err) => {
                warn!(error = %err, "dropping malformed frame");
                Vec::new()
            },
        }
    }

    fn handle_lost(
        &mut self,
        attempt: u64,
        now: E::Instant,
        detail: Option<String>,
        cause: &str,
    ) -> Vec<ClientAction> {
        if !self.channel.is_current(attempt) {
            debug!(attempt, "ignoring lifecycle signal from stale connection");
            return Vec::new();
        }

        info!(attempt, cause, "channel lost");
        let channel_actions = self.channel.handle_closed(attempt, now);
        let gave_up = channel_actions.iter().any(|a| matches!(a, ChannelAction::GaveUp { .. }));
        let detail = if gave_up { Some(RECONNECTS_EXHAUSTED.to_owned()) } else { detail };

        let mut actions = Self::session_actions(self.session.handle_channel_lost(detail));
        actions.extend(self.channel_actions(channel_actions));
        actions
    }

    fn handle_submit(&mut self) -> Vec<ClientAction> {
        let id = SendId(self.env.random_uuid());
        let client_id = self.session.client_id();

        match self.config.send_route {
            SendRoute::Http => match self.composer.compose(client_id) {
                Ok(request) => {
                    info!(%id, to = %request.to, "submitting send");
                    self.pending.insert(id, self.composer.draft().clone());
                    vec![ClientAction::SubmitSend { id, request }]
                },
                Err(failure) => Self::settle_failed(id, failure),
            },
            SendRoute::Channel => {
                let frame = self.composer.compose_frame(client_id).and_then(|request| {
                    self.channel
                        .check_send()
                        .map_err(|e| SendFailure::Unreachable { detail: e.to_string() })?;
                    request.encode().map_err(|e| SendFailure::Unreachable { detail: e.to_string() })
                });

                match frame {
                    Ok(text) => {
                        info!(%id, "sending over push channel");
                        let draft = self.composer.draft().clone();
                        let mut actions = vec![ClientAction::SendFrame(text)];
                        actions.extend(self.complete_send(id, &draft, SendAck { status: String::new() }));
                        actions
                    },
                    Err(failure) => Self::settle_failed(id, failure),
                }
            },
        }
    }

    fn handle_send_completed(
        &mut self,
        id: SendId,
        result: Result<SendResponse, BackendError>,
    ) -> Vec<ClientAction> {
        let Some(draft) = self.pending.remove(&id) else {
            warn!(%id, "completion for unknown send");
            return Vec::new();
        };

        match result {
            Ok(response) => {
                info!(%id, status = %response.status, "send acknowledged");
                self.complete_send(id, &draft, SendAck { status: response.status })
            },
            Err(err) => {
                warn!(%id, error = %err, "send failed");
                vec![ClientAction::SendSettled { id, outcome: Err(err.into()) }]
            },
        }
    }

    fn handle_shutdown(&mut self) -> Vec<ClientAction> {
        info!("shutting down session");
        if self.bootstrap == Bootstrap::InFlight {
            self.bootstrap = Bootstrap::Pending;
        }

        let channel_actions = self.channel.close();
        let mut actions = self.channel_actions(channel_actions);
        actions.extend(Self::session_actions(self.session.handle_shutdown()));
        actions
    }

    fn complete_send(&mut self, id: SendId, draft: &OutboundDraft, ack: SendAck) -> Vec<ClientAction> {
        let message = local_echo(draft, &self.config.local_sender);
        self.dispatcher.append_local(message.clone());
        self.composer.clear_if_unchanged(draft);

        vec![
            ClientAction::MessageAppended(message),
            ClientAction::SendSettled { id, outcome: Ok(ack) },
        ]
    }

    fn settle_failed(id: SendId, failure: SendFailure) -> Vec<ClientAction> {
        debug!(%id, %failure, "send rejected locally");
        vec![ClientAction::SendSettled { id, outcome: Err(failure) }]
    }

    fn open_channel(&mut self) -> Vec<ClientAction> {
        match self.channel.open(self.session.identity()) {
            Ok(actions) => self.channel_actions(actions),
            Err(err) => {
                warn!(error = %err, "cannot open channel");
                Vec::new()
            },
        }
    }

    fn reconnect(&mut self) -> Vec<ClientAction> {
        let mut actions = Self::session_actions(self.session.begin_connecting());
        actions.extend(self.open_channel());
        actions
    }

    fn channel_actions(&mut self, actions: Vec<ChannelAction>) -> Vec<ClientAction> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                ChannelAction::Connect { url, attempt } => {
                    info!(attempt, %url, "connecting");
                    out.push(ClientAction::Connect { url, attempt });
                },
                ChannelAction::Disconnect => out.push(ClientAction::Disconnect),
                ChannelAction::ScheduleReconnect { delay, failures } => {
                    info!(?delay, failures, "reconnect scheduled");
                    out.push(ClientAction::ReconnectScheduled { delay });
                },
                ChannelAction::Reconnect => {
                    info!("reconnecting");
                    out.extend(self.reconnect());
                },
                ChannelAction::ReconnectCancelled => debug!("pending reconnect cancelled"),
                ChannelAction::GaveUp { failures } => {
                    warn!(failures, "giving up on reconnecting");
                },
            }
        }
        out
    }

    fn session_actions(actions: Vec<SessionAction>) -> Vec<ClientAction> {
        let mut out = Vec::with_capacity(actions.len());
        for action in actions {
            match action {
                SessionAction::StatusChanged(status) => {
                    info!(%status, "session status changed");
                    out.push(ClientAction::StatusChanged(status));
                },
                SessionAction::PairingUpdated(payload) => {
                    info!("pairing code updated");
                    out.push(ClientAction::PairingUpdated(payload));
                },
                SessionAction::IdentityConfirmed(client_id) => {
                    info!(%client_id, "session identity confirmed");
                },
                SessionAction::ServerError(detail) => warn!(%detail, "backend reported error"),
                SessionAction::Ignored { kind, reason } => {
                    warn!(kind, %reason, "ignoring event");
                },
            }
        }
        out
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::{
        future::Future,
        sync::{
            Arc,
            atomic::{AtomicU8, Ordering},
        },
        time::{Duration, Instant},
    };

    use relayline_core::{ConnectionState, IdentityResolver, ReconnectPolicy};
    use relayline_proto::SendContent;

    use super::*;
    use crate::composer::MediaPayload;

    #[derive(Clone, Default)]
    struct TestEnv(Arc<AtomicU8>);

    impl Environment for TestEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl Future<Output = ()> + Send {
            async {}
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            let seed = self.0.fetch_add(1, Ordering::Relaxed);
            buffer.fill(seed);
        }
    }

    fn client_with(config: ClientConfig) -> Client<TestEnv> {
        let env = TestEnv::default();
        let identity = IdentityResolver::new(env.clone()).resolve("U", "A").unwrap();
        Client::new(env, config, identity).unwrap()
    }

    fn client() -> Client<TestEnv> {
        client_with(ClientConfig::default())
    }

    /// Drive a client through bootstrap, open and `client_ready`.
    fn connected() -> Client<TestEnv> {
        let mut client = client();
        client.handle(ClientEvent::Open);
        client.handle(ClientEvent::StartCompleted(StartResponse { client_id: "U_A".into() }));
        client.handle(ClientEvent::ChannelOpened { attempt: 1 });
        client.handle(frame(1, r#"{"type":"client_ready","clientId":"U_A"}"#));
        assert_eq!(client.session().state(), ConnectionState::Connected);
        client
    }

    fn frame(attempt: u64, text: &str) -> ClientEvent {
        ClientEvent::ChannelFrame { attempt, text: text.to_owned() }
    }

    fn submit(client: &mut Client<TestEnv>, draft: OutboundDraft) -> Vec<ClientAction> {
        client.handle(ClientEvent::EditDraft(draft));
        client.handle(ClientEvent::Submit)
    }

    #[test]
    fn open_bootstraps_before_connecting() {
        let mut client = client();

        let actions = client.handle(ClientEvent::Open);

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::StatusChanged(SessionStatus { state: ConnectionState::Connecting, .. }),
             ClientAction::StartSession(StartRequest { user_id, agent_id })]
                if user_id == "U" && agent_id == "A"
        ));

        let actions = client.handle(ClientEvent::StartCompleted(StartResponse {
            client_id: "U_A".into(),
        }));
        assert!(matches!(
            actions.as_slice(),
            [ClientAction::Connect { url, attempt: 1 }] if url.contains("webSocketId=")
        ));
    }

    #[test]
    fn start_failure_is_erroring() {
        let mut client = client();
        client.handle(ClientEvent::Open);

        let actions = client.handle(ClientEvent::StartFailed(BackendError::Unreachable("x".into())));

        assert_eq!(
            actions,
            vec![ClientAction::StatusChanged(SessionStatus {
                state: ConnectionState::Erroring,
                detail: Some("Error starting client".into()),
            })]
        );

        // Retry from Erroring bootstraps again
        let retry = client.handle(ClientEvent::Open);
        assert!(retry.iter().any(|a| matches!(a, ClientAction::StartSession(_))));
    }

    #[test]
    fn bootstrap_can_be_disabled() {
        let mut client = client_with(ClientConfig { bootstrap: false, ..ClientConfig::default() });

        let actions = client.handle(ClientEvent::Open);

        assert!(actions.iter().any(|a| matches!(a, ClientAction::Connect { attempt: 1, .. })));
        assert!(!actions.iter().any(|a| matches!(a, ClientAction::StartSession(_))));
    }

    #[test]
    fn qr_then_ready_keeps_pairing() {
        let mut client = client();
        client.handle(ClientEvent::Open);
        client.handle(ClientEvent::StartCompleted(StartResponse { client_id: "U_A".into() }));
        client.handle(ClientEvent::ChannelOpened { attempt: 1 });

        let actions = client.handle(frame(1, r#"{"type":"qr","qr":"XYZ"}"#));
        assert_eq!(actions, vec![ClientAction::PairingUpdated("XYZ".into())]);

        client.handle(frame(1, r#"{"type":"client_ready","clientId":"U_A"}"#));
        assert_eq!(client.session().state(), ConnectionState::Connected);
        assert_eq!(client.session().pairing(), Some("XYZ"));
    }

    #[test]
    fn malformed_and_unknown_frames_change_nothing() {
        let mut client = connected();

        for raw in ["{", "[]", r#"{"type":"typing"}"#, r#"{"type":"client_ready"}"#] {
            assert!(client.handle(frame(1, raw)).is_empty());
        }
        assert_eq!(client.session().state(), ConnectionState::Connected);
        assert!(client.messages().is_empty());
    }

    #[test]
    fn inbound_message_is_logged() {
        let mut client = connected();

        let actions =
            client.handle(frame(1, r#"{"type":"message","chatName":"Bob","text":"hello"}"#));

        assert!(matches!(actions.as_slice(), [ClientAction::MessageAppended(m)] if m.sender == "Bob"));
        assert_eq!(client.messages().len(), 1);
    }

    #[test]
    fn close_disconnects_and_schedules_reconnect() {
        let mut client = connected();
        let t0 = Instant::now();

        let actions = client.handle(ClientEvent::ChannelClosed { attempt: 1, reason: None, now: t0 });

        assert_eq!(
            actions,
            vec![
                ClientAction::StatusChanged(SessionStatus {
                    state: ConnectionState::Disconnected,
                    detail: None
                }),
                ClientAction::ReconnectScheduled { delay: Duration::from_millis(5000) },
            ]
        );
        assert_eq!(client.session().client_id(), None);

        // Trailing error from the same connection schedules nothing
        let trailing = client.handle(ClientEvent::ChannelError {
            attempt: 1,
            cause: "reset".into(),
            now: t0,
        });
        assert!(trailing.is_empty());

        assert!(client.handle(ClientEvent::Tick { now: t0 + Duration::from_millis(4999) }).is_empty());
        let actions = client.handle(ClientEvent::Tick { now: t0 + Duration::from_millis(5000) });
        assert!(matches!(
            actions.as_slice(),
            [ClientAction::StatusChanged(SessionStatus { state: ConnectionState::Connecting, .. }),
             ClientAction::Connect { attempt: 2, .. }]
        ));
    }

    #[test]
    fn frames_from_stale_connection_are_dropped() {
        let mut client = connected();
        let t0 = Instant::now();
        client.handle(ClientEvent::ChannelClosed { attempt: 1, reason: None, now: t0 });
        client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(5) });
        client.handle(ClientEvent::ChannelOpened { attempt: 2 });

        let actions = client.handle(frame(1, r#"{"type":"client_ready","clientId":"U_A"}"#));

        assert!(actions.is_empty());
        assert_eq!(client.session().state(), ConnectionState::Connecting);
    }

    #[test]
    fn open_while_reconnect_pending_cancels_it() {
        let mut client = connected();
        let t0 = Instant::now();
        client.handle(ClientEvent::ChannelError { attempt: 1, cause: "reset".into(), now: t0 });

        let actions = client.handle(ClientEvent::Open);
        assert!(actions.iter().any(|a| matches!(a, ClientAction::Connect { attempt: 2, .. })));
        assert_eq!(client.reconnect_deadline(), None);

        assert!(client.handle(ClientEvent::Tick { now: t0 + Duration::from_secs(10) }).is_empty());
    }

    #[test]
    fn exhausted_reconnects_set_detail() {
        let config = ClientConfig {
            reconnect: ReconnectPolicy::default().with_max_attempts(0),
            ..ClientConfig::default()
        };
        let mut client = client_with(config);
        client.handle(ClientEvent::Open);
        client.handle(ClientEvent::StartCompleted(StartResponse { client_id: "U_A".into() }));

        let actions = client.handle(ClientEvent::ChannelError {
            attempt: 1,
            cause: "refused".into(),
            now: Instant::now(),
        });

        assert_eq!(
            actions,
            vec![ClientAction::StatusChanged(SessionStatus {
                state: ConnectionState::Disconnected,
                detail: Some(RECONNECTS_EXHAUSTED.into()),
            })]
        );
        assert_eq!(client.reconnect_deadline(), None);
    }

    #[test]
    fn submit_requires_confirmed_identity() {
        let mut client = client();

        let actions = submit(&mut client, OutboundDraft::text("1555", "hi"));

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::SendSettled { outcome: Err(SendFailure::NotConnected), .. }]
        ));
    }

    #[test]
    fn empty_draft_is_rejected() {
        let mut client = connected();

        let actions =
            submit(&mut client, OutboundDraft { recipient: "1555".into(), ..Default::default() });

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::SendSettled { outcome: Err(SendFailure::EmptyDraft), .. }]
        ));
        assert_eq!(client.pending_sends(), 0);
    }

    #[test]
    fn ack_appends_local_message_and_clears_draft() {
        let mut client = connected();

        let actions = submit(&mut client, OutboundDraft::text("15551234567", "hi"));
        let [ClientAction::SubmitSend { id, request }] = actions.as_slice() else {
            unreachable!("expected a single submit action, got {actions:?}");
        };
        assert_eq!(request.to, "15551234567@c.us");
        assert_eq!(client.pending_sends(), 1);

        let actions = client.handle(ClientEvent::SendCompleted {
            id: *id,
            result: Ok(SendResponse { status: "sent".into() }),
        });

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::MessageAppended(m), ClientAction::SendSettled { outcome: Ok(_), .. }]
                if m.sender == "You" && m.text() == Some("hi")
        ));
        assert_eq!(client.draft(), &OutboundDraft::default());
        assert_eq!(client.pending_sends(), 0);
    }

    #[test]
    fn media_only_send_yields_media_message() {
        let mut client = connected();
        let media = MediaPayload {
            mime_type: "image/png".into(),
            filename: "a.png".into(),
            data: vec![9, 9],
        };

        let actions = submit(&mut client, OutboundDraft::media("1555", media));
        let [ClientAction::SubmitSend { id, request }] = actions.as_slice() else {
            unreachable!("expected a single submit action, got {actions:?}");
        };
        assert!(matches!(request.content, SendContent::Media { caption: None, .. }));

        client.handle(ClientEvent::SendCompleted {
            id: *id,
            result: Ok(SendResponse { status: "sent".into() }),
        });

        let message = &client.messages()[0];
        assert!(message.body.is_media());
        assert_eq!(message.text(), None);
    }

    #[test]
    fn rejection_keeps_draft_and_connection() {
        let mut client = connected();
        let draft = OutboundDraft::text("1555", "hi");

        let actions = submit(&mut client, draft.clone());
        let [ClientAction::SubmitSend { id, .. }] = actions.as_slice() else {
            unreachable!("expected a single submit action, got {actions:?}");
        };

        let actions = client.handle(ClientEvent::SendCompleted {
            id: *id,
            result: Err(BackendError::Rejected { status: 404, detail: "Client not found".into() }),
        });

        assert_eq!(
            actions,
            vec![ClientAction::SendSettled {
                id: *id,
                outcome: Err(SendFailure::Rejected { detail: "Client not found".into() }),
            }]
        );
        assert_eq!(client.draft(), &draft);
        assert_eq!(client.session().state(), ConnectionState::Connected);
    }

    #[test]
    fn unknown_completion_is_ignored() {
        let mut client = connected();
        let id = SendId(uuid::Uuid::nil());

        let actions = client.handle(ClientEvent::SendCompleted {
            id,
            result: Ok(SendResponse { status: "sent".into() }),
        });

        assert!(actions.is_empty());
        assert!(client.messages().is_empty());
    }

    #[test]
    fn channel_route_writes_frame() {
        let mut client = client_with(ClientConfig {
            send_route: SendRoute::Channel,
            ..ClientConfig::default()
        });
        client.handle(ClientEvent::Open);
        client.handle(ClientEvent::StartCompleted(StartResponse { client_id: "U_A".into() }));
        client.handle(ClientEvent::ChannelOpened { attempt: 1 });
        client.handle(frame(1, r#"{"type":"client_ready","clientId":"U_A"}"#));

        let actions = submit(&mut client, OutboundDraft::text("1555", "hi"));

        let Some(ClientAction::SendFrame(text)) = actions.first() else {
            unreachable!("expected a frame, got {actions:?}");
        };
        let value: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["type"], "send_message");
        assert_eq!(value["clientId"], "U_A");
        assert_eq!(value["to"], "1555@c.us");
        assert_eq!(value["message"], "hi");
        assert_eq!(client.messages().len(), 1);
    }

    #[test]
    fn shutdown_releases_connection_and_cancels_reconnect() {
        let mut client = connected();

        let actions = client.handle(ClientEvent::Shutdown);
        assert_eq!(actions[0], ClientAction::Disconnect);
        assert_eq!(client.session().state(), ConnectionState::Disconnected);

        let mut client = connected();
        client.handle(ClientEvent::ChannelClosed { attempt: 1, reason: None, now: Instant::now() });
        client.handle(ClientEvent::Shutdown);
        assert_eq!(client.reconnect_deadline(), None);
    }

    #[test]
    fn server_error_disconnects_without_reconnect() {
        let mut client = connected();

        let actions = client.handle(frame(1, r#"{"type":"error","error":"session expired"}"#));

        assert!(actions.contains(&ClientAction::Disconnect));
        assert_eq!(client.session().state(), ConnectionState::Disconnected);
        assert_eq!(client.session().detail(), Some("session expired"));
        assert_eq!(client.channel_phase(), ChannelPhase::Idle);
        assert_eq!(client.reconnect_deadline(), None);
    }

    #[test]
    fn open_after_server_error_starts_new_attempt() {
        let mut client = connected();
        client.handle(frame(1, r#"{"type":"error","error":"session expired"}"#));

        let actions = client.handle(ClientEvent::Open);

        assert!(matches!(
            actions.as_slice(),
            [ClientAction::StatusChanged(SessionStatus { state: ConnectionState::Connecting, .. }),
             ClientAction::Connect { attempt: 2, .. }]
        ));

        // Late ready from the released connection is stale
        client.handle(frame(1, r#"{"type":"client_ready","clientId":"U_A"}"#));
        assert_eq!(client.session().state(), ConnectionState::Connecting);

        client.handle(ClientEvent::ChannelOpened { attempt: 2 });
        client.handle(frame(2, r#"{"type":"client_ready","clientId":"U_A"}"#));
        assert_eq!(client.session().state(), ConnectionState::Connected);
    }
}
