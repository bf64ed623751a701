// src/message.rs

//! Inbound/outbound chat messages and the emitter that sends reports.
//!
//! The message shape follows the host bot's JSON envelope:
//!
//! ```json
//! {"user": {...}, "room": {...}, "message": {"id": "1", "text": "/python\nprint(1)"}}
//! ```
//!
//! Only `message.text` and `mode` are interpreted. Everything else is carried
//! through untouched so replies keep the sender/room addressing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::mpsc;
use tracing::{debug, error, warn};

use crate::report::Report;

/// How the transport should deliver an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Send,
    Reply,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageBody {
    pub text: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message: MessageBody,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<Mode>,

    /// Sender, room and any other host metadata.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Message {
    /// A message carrying only text, with no addressing metadata.
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            message: MessageBody {
                text: text.into(),
                extra: Map::new(),
            },
            mode: None,
            extra: Map::new(),
        }
    }

    pub fn text(&self) -> &str {
        &self.message.text
    }

    /// Independent copy of `self` replying to the sender with `text`.
    pub fn reply_with(&self, text: impl Into<String>) -> Self {
        let mut reply = self.clone();
        reply.message.text = text.into();
        reply.mode = Some(Mode::Reply);
        reply
    }
}

/// Outbound queue shared with the transport.
pub type OutboundSender = mpsc::Sender<Message>;

/// Sends reports for one session as replies to its originating message.
#[derive(Debug, Clone)]
pub struct Emitter {
    origin: Message,
    sink: OutboundSender,
}

impl Emitter {
    pub fn new(origin: Message, sink: OutboundSender) -> Self {
        Self { origin, sink }
    }

    pub fn origin(&self) -> &Message {
        &self.origin
    }

    /// Send `report` to the transport.
    ///
    /// Failures are logged and reported through the return value; they are
    /// never retried.
    pub async fn emit(&self, report: &Report) -> bool {
        let tag = report.tag();
        let reply = self.origin.reply_with(report.text());

        match self.sink.send(reply).await {
            Ok(()) => {
                debug!(%tag, bytes = report.text().len(), "report emitted");
                true
            }
            Err(err) if tag.is_terminal() => {
                error!(%tag, error = %err, "failed to emit terminal report");
                false
            }
            Err(err) => {
                warn!(%tag, error = %err, "failed to emit report");
                false
            }
        }
    }
}
