//! Conversation selector
//!
//! Holds the friend list and the active partner. Selecting a partner clears
//! the visible log and replays that partner's stored history without
//! writing it back.

use super::renderer::{MessageRenderer, RenderContent};
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct ConversationSelector {
    partners: Vec<String>,
    active: Option<String>,
    /// Current text of the friend search box
    pub query: String,
}

impl ConversationSelector {
    pub fn new<I, S>(partners: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            partners: partners.into_iter().map(Into::into).collect(),
            active: None,
            query: String::new(),
        }
    }

    pub fn partners(&self) -> &[String] {
        &self.partners
    }

    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// Partners whose name contains `query`, ignoring case
    pub fn filter<'a>(&'a self, query: &str) -> Vec<&'a str> {
        let needle = query.trim().to_lowercase();
        self.partners
            .iter()
            .map(String::as_str)
            .filter(|name| needle.is_empty() || name.to_lowercase().contains(&needle))
            .collect()
    }

    /// Partners matching the current search box
    pub fn visible(&self) -> Vec<&str> {
        self.filter(&self.query)
    }

    /// Make `partner` active and replay its history; returns the number of replayed messages
    pub fn select(&mut self, partner: &str, renderer: &mut MessageRenderer) -> usize {
        if !self.partners.iter().any(|p| p == partner) {
            debug!("Selecting partner {:?} outside the friend list", partner);
        }

        self.active = Some(partner.to_string());
        renderer.log_mut().clear();

        let history = renderer.store().load(partner);
        let count = history.len();
        for message in &history {
            renderer.render_at(
                RenderContent::from_message(message),
                message.sender,
                false,
                Some(partner),
                message.timestamp,
            );
        }

        info!("Opened conversation with {:?} ({} messages)", partner, count);
        count
    }
}
