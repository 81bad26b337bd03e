//! Outbound request composition.
//!
//! Validates the current draft, normalizes its recipient and builds the wire
//! request. Preconditions are checked in a fixed order so the first failure is
//! always the most fundamental one.

use relayline_proto::{ChannelRequest, MediaUpload, MessageBody, SendContent, SendRequest};
use thiserror::Error;

use crate::message::ChatMessage;

/// Default domain appended to bare phone numbers.
pub const DEFAULT_RECIPIENT_DOMAIN: &str = "c.us";

/// Media attached to a draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    /// MIME type of the attachment
    pub mime_type: String,
    /// File name of the attachment
    pub filename: String,
    /// Raw attachment bytes
    pub data: Vec<u8>,
}

/// Locally composed, not yet submitted message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboundDraft {
    /// Recipient as typed by the user
    pub recipient: String,
    /// Message text, or media caption when media is attached
    pub text: Option<String>,
    /// Attachment
    pub media: Option<MediaPayload>,
}

impl OutboundDraft {
    /// Text-only draft.
    pub fn text(recipient: impl Into<String>, text: impl Into<String>) -> Self {
        Self { recipient: recipient.into(), text: Some(text.into()), media: None }
    }

    /// Media-only draft.
    pub fn media(recipient: impl Into<String>, media: MediaPayload) -> Self {
        Self { recipient: recipient.into(), text: None, media: Some(media) }
    }

    /// Attach caption text.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Text if it contains anything besides whitespace.
    pub fn non_blank_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|text| !text.trim().is_empty())
    }
}

/// Which channel carries outbound messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SendRoute {
    /// `POST /send` on the request channel
    #[default]
    Http,
    /// `send_message` frame on the push channel (text only)
    Channel,
}

/// Why a submission failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    /// No confirmed client identity yet
    #[error("not connected")]
    NotConnected,

    /// Recipient empty or not an address
    #[error("recipient is required")]
    MissingRecipient,

    /// Neither text nor media
    #[error("message text or media is required")]
    EmptyDraft,

    /// Draft shape cannot travel over the selected route
    #[error("unsupported: {detail}")]
    Unsupported {
        /// What is not supported
        detail: String,
    },

    /// Backend refused the request; detail is its error text verbatim
    #[error("{detail}")]
    Rejected {
        /// Backend error text
        detail: String,
    },

    /// Request never got a usable answer
    #[error("backend unreachable: {detail}")]
    Unreachable {
        /// Transport failure description
        detail: String,
    },
}

impl SendFailure {
    /// Returns true if editing the draft can fix this failure.
    pub fn is_user_correctable(&self) -> bool {
        matches!(self, Self::MissingRecipient | Self::EmptyDraft | Self::Unsupported { .. })
    }
}

/// Normalize a recipient address.
///
/// Anything containing `@` is taken as fully qualified. Otherwise every
/// non-digit is dropped and `@{domain}` is appended. Returns `None` when no
/// address remains.
pub fn normalize_recipient(raw: &str, domain: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.contains('@') {
        return Some(raw.to_owned());
    }

    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    Some(format!("{digits}@{domain}"))
}

/// Holds the current draft and turns it into requests.
#[derive(Debug, Clone)]
pub struct Composer {
    recipient_domain: String,
    draft: OutboundDraft,
}

impl Default for Composer {
    fn default() -> Self {
        Self::new(DEFAULT_RECIPIENT_DOMAIN)
    }
}

impl Composer {
    /// Create a composer with an empty draft.
    pub fn new(recipient_domain: impl Into<String>) -> Self {
        Self { recipient_domain: recipient_domain.into(), draft: OutboundDraft::default() }
    }

    /// Current draft
    pub fn draft(&self) -> &OutboundDraft {
        &self.draft
    }

    /// Replace the draft.
    pub fn set_draft(&mut self, draft: OutboundDraft) {
        self.draft = draft;
    }

    /// Clear the draft unless it was edited after `submitted` was taken.
    pub fn clear_if_unchanged(&mut self, submitted: &OutboundDraft) {
        if &self.draft == submitted {
            self.draft = OutboundDraft::default();
        }
    }

    /// Build a request-channel send from the current draft.
    ///
    /// # Errors
    ///
    /// In order: `NotConnected`, `MissingRecipient`, `EmptyDraft`.
    pub fn compose(&self, client_id: Option<&str>) -> Result<SendRequest, SendFailure> {
        let (client_id, to) = self.check_preconditions(client_id)?;

        let text = self.draft.non_blank_text().map(str::to_owned);
        let content = match &self.draft.media {
            Some(media) => SendContent::Media {
                media: MediaUpload::from_bytes(&media.mime_type, &media.filename, &media.data),
                caption: text,
            },
            None => SendContent::Text { message: text.ok_or(SendFailure::EmptyDraft)? },
        };

        Ok(SendRequest { client_id, to, content })
    }

    /// Build a push-channel send from the current draft.
    ///
    /// # Errors
    ///
    /// Same preconditions as [`Self::compose`], plus `Unsupported` for
    /// drafts with media.
    pub fn compose_frame(&self, client_id: Option<&str>) -> Result<ChannelRequest, SendFailure> {
        let (client_id, to) = self.check_preconditions(client_id)?;
        if self.draft.media.is_some() {
            return Err(SendFailure::Unsupported {
                detail: "media requires the request channel".to_owned(),
            });
        }

        let message = self.draft.non_blank_text().ok_or(SendFailure::EmptyDraft)?.to_owned();
        Ok(ChannelRequest::SendMessage { client_id, to: Some(to), message })
    }

    fn check_preconditions(
        &self,
        client_id: Option<&str>,
    ) -> Result<(String, String), SendFailure> {
        let client_id = client_id.ok_or(SendFailure::NotConnected)?;
        let to = normalize_recipient(&self.draft.recipient, &self.recipient_domain)
            .ok_or(SendFailure::MissingRecipient)?;
        if self.draft.non_blank_text().is_none() && self.draft.media.is_none() {
            return Err(SendFailure::EmptyDraft);
        }
        Ok((client_id.to_owned(), to))
    }
}

/// Log entry for a message we sent.
pub fn local_echo(draft: &OutboundDraft, sender: &str) -> ChatMessage {
    let text = draft.non_blank_text().map(str::to_owned);
    let body = match &draft.media {
        Some(media) => MessageBody::Media {
            mime_type: media.mime_type.clone(),
            data: media.data.clone(),
            filename: media.filename.clone(),
            caption: text,
        },
        None => MessageBody::Text { text: text.unwrap_or_default() },
    };
    ChatMessage { sender: sender.to_owned(), body }
}
