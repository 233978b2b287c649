//! Inbound messages and outbound replies.

use serde::{Deserialize, Serialize};

/// Payload of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MessageContent {
    /// Plain text.
    Conversation {
        /// Message body.
        text: String,
    },
    /// Text with a link preview, quote, or mention attached.
    ExtendedText {
        /// Message body.
        text: String,
    },
    /// Image, possibly captioned.
    Image {
        /// Caption, if any.
        #[serde(default)]
        caption: Option<String>,
    },
    /// Video, possibly captioned.
    Video {
        /// Caption, if any.
        #[serde(default)]
        caption: Option<String>,
    },
    /// Document, possibly captioned.
    Document {
        /// Caption, if any.
        #[serde(default)]
        caption: Option<String>,
    },
    /// Anything without text (stickers, reactions, calls).
    Unsupported,
}

impl MessageContent {
    /// The text a command could be read from, if any.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Conversation { text } | Self::ExtendedText { text } => Some(text),
            Self::Image { caption } | Self::Video { caption } | Self::Document { caption } => {
                caption.as_deref()
            },
            Self::Unsupported => None,
        }
    }
}

/// A message delivered by the protocol client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    /// Sender (chat) identifier. Replies go back here.
    pub from: String,
    /// Sent by this bot's own account.
    pub from_me: bool,
    /// Payload.
    pub content: MessageContent,
}

impl InboundMessage {
    /// A plain-text message from another account.
    #[must_use]
    pub fn text(from: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            from_me: false,
            content: MessageContent::Conversation { text: text.into() },
        }
    }
}

/// A reply produced by the command router.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReply {
    /// Destination identifier.
    pub to: String,
    /// Reply body.
    pub text: String,
}
