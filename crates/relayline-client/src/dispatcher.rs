//! Inbound frame dispatch.
//!
//! Decodes raw push-channel frames and routes each event: chat messages are
//! appended to the log, everything else goes to the session state machine.
//! Frames are applied one at a time in receipt order.

use relayline_core::{Session, SessionAction};
use relayline_proto::{DecodeError, ProtocolEvent};

use crate::message::{ChatMessage, MessageLog};

/// Result of dispatching one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// An inbound chat message was appended to the log
    Appended(ChatMessage),
    /// A session event was applied
    Session(Vec<SessionAction>),
}

/// Routes decoded events and owns the message log.
#[derive(Debug, Clone, Default)]
pub struct Dispatcher {
    log: MessageLog,
}

impl Dispatcher {
    /// Create a dispatcher with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode and apply one raw frame.
    ///
    /// # Errors
    ///
    /// Returns the decode error unchanged. A frame that fails to decode has no
    /// effect on the log or the session.
    pub fn dispatch(
        &mut self,
        raw: &str,
        session: &mut Session,
    ) -> Result<Dispatched, DecodeError> {
        let event = ProtocolEvent::decode(raw)?;
        Ok(self.apply(event, session))
    }

    /// Apply an already decoded event.
    pub fn apply(&mut self, event: ProtocolEvent, session: &mut Session) -> Dispatched {
        match event {
            ProtocolEvent::Message(message) => {
                let message = ChatMessage::from(message);
                self.log.push(message.clone());
                Dispatched::Appended(message)
            },
            other => Dispatched::Session(session.handle_event(&other)),
        }
    }

    /// Append a locally authored message.
    pub fn append_local(&mut self, message: ChatMessage) {
        self.log.push(message);
    }

    /// Message log
    pub fn log(&self) -> &MessageLog {
        &self.log
    }
}
