//! Generic runtime for session orchestration.
//!
//! The Runtime drives the session event loop, coordinating between:
//! - [`Client`]: session state machine
//! - [`Driver`]: push-channel I/O
//! - [`Backend`]: request/response I/O, run as spawned tasks
//! - [`SessionHandle`]: user commands
//!
//! It is the single dispatch path: every input becomes a [`ClientEvent`] and
//! every resulting [`ClientAction`] is executed here.

use std::collections::{HashMap, VecDeque};

use relayline_client::{
    Backend, BackendError, Client, ClientAction, ClientEvent, Environment, SendId,
};
use relayline_core::{ChannelSignal, SignalKind};
use relayline_proto::{SendResponse, StartResponse};
use thiserror::Error;
use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinSet,
};
use tracing::{debug, info, warn};

use crate::{
    Driver,
    handle::{Command, SendOutcome, SessionHandle},
    view::SessionView,
};

/// Capacity of the command queue shared by all handles.
const COMMAND_QUEUE: usize = 64;

/// Fatal runtime failure.
#[derive(Error, Debug)]
pub enum RuntimeError<E: std::error::Error + 'static> {
    /// Driver could not attempt a connection
    #[error("driver failed: {0}")]
    Driver(#[source] E),
}

/// Result of a spawned backend request.
enum Completion {
    Start(Result<StartResponse, BackendError>),
    Send { id: SendId, result: Result<SendResponse, BackendError> },
}

/// Generic runtime that orchestrates Client, Driver and Backend.
///
/// # Type Parameters
///
/// - `D`: push-channel driver
/// - `B`: request/response backend
/// - `E`: environment for time and randomness
pub struct Runtime<D, B, E>
where
    D: Driver,
    B: Backend,
    E: Environment,
{
    driver: D,
    backend: B,
    env: E,
    client: Client<E>,
    commands: mpsc::Receiver<Command>,
    tasks: JoinSet<Completion>,
    view: watch::Sender<SessionView>,
    /// Callers waiting for the outcome of a submission.
    waiting: HashMap<SendId, oneshot::Sender<SendOutcome>>,
}

impl<D, B, E> Runtime<D, B, E>
where
    D: Driver,
    B: Backend,
    E: Environment,
{
    /// Create a runtime and the first handle to it.
    pub fn new(driver: D, backend: B, env: E, client: Client<E>) -> (Self, SessionHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_QUEUE);
        let (view, view_rx) = watch::channel(SessionView::capture(&client));

        let runtime = Self {
            driver,
            backend,
            env,
            client,
            commands,
            tasks: JoinSet::new(),
            view,
            waiting: HashMap::new(),
        };
        (runtime, SessionHandle::new(commands_tx, view_rx))
    }

    /// Run the event loop until shutdown.
    ///
    /// The loop ends on an explicit shutdown or once every handle is dropped.
    /// The connection is released and in-flight requests are cancelled on
    /// every exit path.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot attempt a connection.
    pub async fn run(mut self) -> Result<(), RuntimeError<D::Error>> {
        let result = self.event_loop().await;

        if result.is_err() {
            self.dispatch(ClientEvent::Shutdown).ok();
        }
        self.driver.disconnect();
        self.tasks.abort_all();
        self.waiting.clear();

        info!("session runtime stopped");
        result
    }

    /// Client state machine
    pub fn client(&self) -> &Client<E> {
        &self.client
    }

    async fn event_loop(&mut self) -> Result<(), RuntimeError<D::Error>> {
        loop {
            let deadline = self.client.reconnect_deadline();

            tokio::select! {
                signal = self.driver.next_signal() => {
                    let event = self.signal_event(signal);
                    self.dispatch(event)?;
                },
                () = sleep_until(&self.env, deadline), if deadline.is_some() => {
                    let now = self.env.now();
                    self.dispatch(ClientEvent::Tick { now })?;
                },
                Some(joined) = self.tasks.join_next(), if !self.tasks.is_empty() => {
                    match joined {
                        Ok(completion) => self.complete(completion)?,
                        Err(err) => warn!(error = %err, "backend task failed"),
                    }
                },
                command = self.commands.recv() => match command {
                    Some(Command::Shutdown) => {
                        self.dispatch(ClientEvent::Shutdown)?;
                        return Ok(());
                    },
                    Some(command) => self.command(command)?,
                    None => {
                        debug!("all handles dropped");
                        self.dispatch(ClientEvent::Shutdown)?;
                        return Ok(());
                    },
                },
            }
        }
    }

    fn command(&mut self, command: Command) -> Result<(), RuntimeError<D::Error>> {
        match command {
            Command::Open => self.dispatch(ClientEvent::Open),
            Command::EditDraft(draft) => self.dispatch(ClientEvent::EditDraft(draft)),
            Command::Submit { reply } => self.submit(reply),
            Command::Send { draft, reply } => {
                self.client.handle(ClientEvent::EditDraft(draft));
                self.submit(Some(reply))
            },
            Command::Shutdown => self.dispatch(ClientEvent::Shutdown),
        }
    }

    fn submit(
        &mut self,
        reply: Option<oneshot::Sender<SendOutcome>>,
    ) -> Result<(), RuntimeError<D::Error>> {
        let actions = self.client.handle(ClientEvent::Submit);
        if let Some(reply) = reply
            && let Some(id) = actions.iter().find_map(submission_id)
        {
            self.waiting.insert(id, reply);
        }
        self.execute(actions)
    }

    fn complete(&mut self, completion: Completion) -> Result<(), RuntimeError<D::Error>> {
        let event = match completion {
            Completion::Start(Ok(response)) => ClientEvent::StartCompleted(response),
            Completion::Start(Err(err)) => ClientEvent::StartFailed(err),
            Completion::Send { id, result } => ClientEvent::SendCompleted { id, result },
        };
        self.dispatch(event)
    }

    fn signal_event(&self, signal: ChannelSignal) -> ClientEvent<E::Instant> {
        let attempt = signal.attempt;
        match signal.kind {
            SignalKind::Opened => ClientEvent::ChannelOpened { attempt },
            SignalKind::Frame(text) => ClientEvent::ChannelFrame { attempt, text },
            SignalKind::Closed { reason } => {
                ClientEvent::ChannelClosed { attempt, reason, now: self.env.now() }
            },
            SignalKind::Error { cause } => {
                ClientEvent::ChannelError { attempt, cause, now: self.env.now() }
            },
        }
    }

    fn dispatch(&mut self, event: ClientEvent<E::Instant>) -> Result<(), RuntimeError<D::Error>> {
        let actions = self.client.handle(event);
        self.execute(actions)
    }

    /// Execute actions in order, then publish the new view.
    fn execute(&mut self, actions: Vec<ClientAction>) -> Result<(), RuntimeError<D::Error>> {
        let mut queue = VecDeque::from(actions);

        while let Some(action) = queue.pop_front() {
            match action {
                ClientAction::StartSession(request) => {
                    let backend = self.backend.clone();
                    self.tasks.spawn(async move { Completion::Start(backend.start(request).await) });
                },
                ClientAction::Connect { url, attempt } => {
                    self.driver.connect(&url, attempt).map_err(RuntimeError::Driver)?;
                },
                ClientAction::Disconnect => self.driver.disconnect(),
                ClientAction::SendFrame(text) => {
                    if let Err(err) = self.driver.send_frame(text) {
                        warn!(error = %err, "failed to write frame");
                    }
                },
                ClientAction::SubmitSend { id, request } => {
                    let backend = self.backend.clone();
                    self.tasks.spawn(async move {
                        Completion::Send { id, result: backend.send(request).await }
                    });
                },
                ClientAction::SendSettled { id, outcome } => {
                    if let Some(reply) = self.waiting.remove(&id) {
                        // Caller may have stopped waiting
                        reply.send(outcome).ok();
                    }
                },
                ClientAction::StatusChanged(_)
                | ClientAction::PairingUpdated(_)
                | ClientAction::MessageAppended(_)
                | ClientAction::ReconnectScheduled { .. } => {},
            }
        }

        self.publish();
        Ok(())
    }

    fn publish(&mut self) {
        let next = SessionView::capture(&self.client);
        self.view.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next;
                true
            }
        });
    }
}

fn submission_id(action: &ClientAction) -> Option<SendId> {
    match action {
        ClientAction::SubmitSend { id, .. } | ClientAction::SendSettled { id, .. } => Some(*id),
        _ => None,
    }
}

/// Sleep until `deadline`; returns at once if it has passed.
async fn sleep_until<E: Environment>(env: &E, deadline: Option<E::Instant>) {
    if let Some(deadline) = deadline {
        let now = env.now();
        if deadline > now {
            env.sleep(deadline - now).await;
        }
    }
}
