//! Configuration for the chat session
//!
//! Provides centralized configuration for all components.

use crate::audio::host::default_preferences;
use crate::messages::filter::{DEFAULT_BANNED_TERMS, DEFAULT_MASK_CHAR};
use crate::messages::storage::DEFAULT_NAMESPACE;
use crate::{PolypalError, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable overriding the conversation directory
pub const DATA_DIR_ENV: &str = "POLYPAL_DATA_DIR";

pub const DEFAULT_PARTNERS: &[&str] = &["Ana", "Kenji", "Lucía", "Marie", "Omar"];

#[derive(Clone, Debug)]
pub struct ChatConfig {
    /// Key prefix for conversation entries
    pub namespace: String,

    /// Directory the file store writes to
    pub data_dir: PathBuf,

    /// Conversation partners shown in the friend list
    pub partners: Vec<String>,

    /// Words rejected in outgoing text
    pub banned_terms: Vec<String>,

    /// Character used to mask banned words
    pub mask_char: char,

    /// Automatic reply after each sent message, `None` disables it
    pub bot_reply: Option<String>,

    /// Delay before the automatic reply shows up
    pub bot_reply_delay: Duration,

    /// Encodings to try before the host default, best first
    pub encoding_preferences: Vec<String>,

    /// Pending jobs the audio conversion worker will queue
    pub conversion_queue: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            namespace: DEFAULT_NAMESPACE.to_string(),
            data_dir: default_data_dir(),
            partners: DEFAULT_PARTNERS.iter().map(|s| s.to_string()).collect(),
            banned_terms: DEFAULT_BANNED_TERMS.iter().map(|s| s.to_string()).collect(),
            mask_char: DEFAULT_MASK_CHAR,
            bot_reply: Some("Thanks for your message!".to_string()),
            bot_reply_delay: Duration::from_millis(1000),
            encoding_preferences: default_preferences(),
            conversion_queue: 32,
        }
    }
}

impl ChatConfig {
    /// Defaults, with the data directory taken from the environment when set
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        config
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_partners<I, S>(mut self, partners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partners = partners.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_banned_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.banned_terms = terms.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_mask_char(mut self, mask_char: char) -> Self {
        self.mask_char = mask_char;
        self
    }

    pub fn with_bot_reply(mut self, reply: impl Into<String>, delay: Duration) -> Self {
        self.bot_reply = Some(reply.into());
        self.bot_reply_delay = delay;
        self
    }

    /// Disable the automatic bot reply
    pub fn without_bot_reply(mut self) -> Self {
        self.bot_reply = None;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.namespace.is_empty() {
            return Err(PolypalError::ConfigError(
                "Storage namespace must not be empty".into(),
            ));
        }

        if self.partners.iter().any(|p| p.trim().is_empty()) {
            return Err(PolypalError::ConfigError(
                "Partner names must not be blank".into(),
            ));
        }

        if self.mask_char.is_whitespace() {
            return Err(PolypalError::ConfigError(
                "Mask character must be visible".into(),
            ));
        }

        if self.conversion_queue == 0 {
            return Err(PolypalError::ConfigError(
                "Conversion queue must hold at least 1 job".into(),
            ));
        }

        Ok(())
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .map(|p| p.join("polypal").join("conversations"))
        .unwrap_or_else(|| PathBuf::from("./.polypal/conversations"))
}
