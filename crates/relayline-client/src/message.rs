//! Chat log entries.

use relayline_proto::{InboundMessage, MessageBody};

/// One entry of the session's message log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    /// Display name of the sender (chat name for inbound, local label for
    /// messages we sent)
    pub sender: String,
    /// Message content
    pub body: MessageBody,
}

impl ChatMessage {
    /// Text content, if any.
    pub fn text(&self) -> Option<&str> {
        self.body.text()
    }
}

impl From<InboundMessage> for ChatMessage {
    fn from(message: InboundMessage) -> Self {
        Self { sender: message.chat_name, body: message.body }
    }
}

/// Ordered, append-only message log. Insertion order is display order.
#[derive(Debug, Clone, Default)]
pub struct MessageLog {
    entries: Vec<ChatMessage>,
}

impl MessageLog {
    /// Append a message at the end.
    pub fn push(&mut self, message: ChatMessage) {
        self.entries.push(message);
    }

    /// All messages in display order
    pub fn entries(&self) -> &[ChatMessage] {
        &self.entries
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
