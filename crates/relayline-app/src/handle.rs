//! Command handle for a running session.

use relayline_client::{OutboundDraft, SendAck, SendFailure};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};

use crate::view::SessionView;

/// Detail reported for sends issued after the runtime stopped.
pub const SESSION_STOPPED: &str = "session stopped";

/// Outcome of one submission.
pub type SendOutcome = Result<SendAck, SendFailure>;

/// Commands from handles to the runtime.
#[derive(Debug)]
pub(crate) enum Command {
    Open,
    EditDraft(OutboundDraft),
    Submit { reply: Option<oneshot::Sender<SendOutcome>> },
    /// Replace the draft and submit it without yielding to other commands
    Send { draft: OutboundDraft, reply: oneshot::Sender<SendOutcome> },
    Shutdown,
}

/// The runtime is gone.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleError {
    /// Runtime stopped; no more commands are accepted
    #[error("session runtime stopped")]
    Stopped,
}

/// Cloneable command API of a session.
///
/// The runtime keeps running while at least one handle exists; dropping the
/// last handle shuts the session down.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    view: watch::Receiver<SessionView>,
}

impl SessionHandle {
    pub(crate) fn new(commands: mpsc::Sender<Command>, view: watch::Receiver<SessionView>) -> Self {
        Self { commands, view }
    }

    /// Start the session, or restart it after a drop or failure.
    ///
    /// Cancels a pending reconnect. Ignored while the session is already
    /// opening or open.
    pub async fn open(&self) -> Result<(), HandleError> {
        self.command(Command::Open).await
    }

    /// Replace the draft.
    pub async fn edit_draft(&self, draft: OutboundDraft) -> Result<(), HandleError> {
        self.command(Command::EditDraft(draft)).await
    }

    /// Submit the current draft and wait for its outcome.
    ///
    /// The draft is shared by every handle; concurrent callers should use
    /// [`send`](Self::send) instead.
    pub async fn submit(&self) -> SendOutcome {
        let (reply, outcome) = oneshot::channel();
        self.request(Command::Submit { reply: Some(reply) }, outcome).await
    }

    /// Replace the draft with `draft`, submit it and wait for the outcome.
    ///
    /// The runtime applies both steps at once, so concurrent sends never
    /// submit each other's drafts.
    pub async fn send(&self, draft: OutboundDraft) -> SendOutcome {
        let (reply, outcome) = oneshot::channel();
        self.request(Command::Send { draft, reply }, outcome).await
    }

    /// Stop the session. The runtime exits once the command is processed.
    pub async fn shutdown(&self) -> Result<(), HandleError> {
        self.command(Command::Shutdown).await
    }

    /// Latest published state.
    pub fn view(&self) -> SessionView {
        self.view.borrow().clone()
    }

    /// Receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view.clone()
    }

    /// Whether the runtime is still accepting commands.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    async fn command(&self, command: Command) -> Result<(), HandleError> {
        self.commands.send(command).await.map_err(|_| HandleError::Stopped)
    }

    async fn request(
        &self,
        command: Command,
        outcome: oneshot::Receiver<SendOutcome>,
    ) -> SendOutcome {
        if self.command(command).await.is_err() {
            return Err(stopped());
        }
        outcome.await.unwrap_or_else(|_| Err(stopped()))
    }
}

fn stopped() -> SendFailure {
    SendFailure::Unreachable { detail: SESSION_STOPPED.to_owned() }
}
