use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use super::data_url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    User,
    Bot,
    /// Transient UI notices, never written to a conversation
    System,
}

impl Sender {
    pub fn is_persistable(&self) -> bool {
        !matches!(self, Sender::System)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageBody {
    Text {
        text: String,
    },
    Audio {
        /// Self-contained `data:` URL of the recording
        #[serde(rename = "dataUrl", alias = "url")]
        data_url: String,
        /// Length of the recording in milliseconds
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<u64>,
    },
}

/// A persisted chat message, one element of a conversation log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub sender: Sender,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub body: MessageBody,
}

impl Message {
    pub fn text(sender: Sender, text: impl Into<String>) -> Self {
        Self {
            sender,
            timestamp: now_millis(),
            body: MessageBody::Text { text: text.into() },
        }
    }

    pub fn audio(sender: Sender, data_url: impl Into<String>, duration: Option<u64>) -> Self {
        Self {
            sender,
            timestamp: now_millis(),
            body: MessageBody::Audio {
                data_url: data_url.into(),
                duration,
            },
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp.trunc_subsecs(3);
        self
    }

    pub fn as_text(&self) -> Option<&str> {
        match &self.body {
            MessageBody::Text { text } => Some(text),
            MessageBody::Audio { .. } => None,
        }
    }
}

// Stored timestamps carry millisecond precision only
fn now_millis() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(3)
}

/// Session-local reference to an in-memory recording.
///
/// Only valid while the owning session is alive, so it must never be
/// written to a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobHandle(String);

impl BlobHandle {
    pub const SCHEME: &'static str = "blob:polypal/";

    pub fn new() -> Self {
        Self(format!("{}{}", Self::SCHEME, Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for BlobHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a playable audio entry gets its bytes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// `data:` URL, valid across restarts
    Encoded(String),
    Ephemeral(BlobHandle),
}

impl AudioSource {
    /// Classify a stored source string
    pub fn from_url(url: &str) -> Self {
        if data_url::is_data_url(url) {
            AudioSource::Encoded(url.to_string())
        } else {
            AudioSource::Ephemeral(BlobHandle(url.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            AudioSource::Encoded(url) => url,
            AudioSource::Ephemeral(handle) => handle.as_str(),
        }
    }

    pub fn is_self_contained(&self) -> bool {
        matches!(self, AudioSource::Encoded(_))
    }
}
