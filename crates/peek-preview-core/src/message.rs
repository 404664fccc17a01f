//! Inbound transport messages.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One frame from the preview server, tagged by `action`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum InboundMessage {
    /// The document changed: new rendered HTML and total source line count.
    Show { html: String, lcount: u32 },
    /// The cursor moved to a source line.
    Scroll { line: u32 },
    /// Base for resolving relative links.
    Base {
        #[serde(alias = "uri")]
        base: String,
    },
    /// Anything newer than this client understands.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Decode a UTF-8 JSON frame (text or binary).
    pub fn decode(frame: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(frame)?)
    }

    pub fn action(&self) -> &'static str {
        match self {
            InboundMessage::Show { .. } => "show",
            InboundMessage::Scroll { .. } => "scroll",
            InboundMessage::Base { .. } => "base",
            InboundMessage::Unknown => "unknown",
        }
    }
}
