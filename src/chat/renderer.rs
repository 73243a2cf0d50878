//! Message renderer
//!
//! Turns text and audio content into entries of the visible chat log and,
//! for new messages, hands a record to the conversation store. Building the
//! record ([`plan_persistence`]) is kept separate from writing it
//! ([`MessageRenderer::persist`]).

use super::persist::{ConversionEvent, ConversionJob, ConversionWorker};
use crate::audio::AudioArtifact;
use crate::messages::{AudioSource, ConversationStore, Message, Sender};
use chrono::{DateTime, SubsecRound, Utc};
use tracing::{debug, warn};

/// Audio to show in the log
#[derive(Debug, Clone, PartialEq)]
pub struct AudioDescriptor {
    pub source: AudioSource,
    /// Raw recording, needed when `source` is only an ephemeral handle
    pub payload: Option<AudioArtifact>,
    pub duration_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderContent {
    Text(String),
    Audio(AudioDescriptor),
}

impl From<&str> for RenderContent {
    fn from(text: &str) -> Self {
        RenderContent::Text(text.to_string())
    }
}

impl RenderContent {
    /// Content for replaying a stored message
    pub fn from_message(message: &Message) -> Self {
        match &message.body {
            crate::messages::MessageBody::Text { text } => RenderContent::Text(text.clone()),
            crate::messages::MessageBody::Audio { data_url, duration } => {
                RenderContent::Audio(AudioDescriptor {
                    source: AudioSource::from_url(data_url),
                    payload: None,
                    duration_ms: *duration,
                })
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EntryBody {
    Text(String),
    Audio {
        source: AudioSource,
        /// Whole seconds, e.g. "3s"
        duration_label: Option<String>,
    },
}

/// One visible row of the chat log
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub id: u64,
    pub sender: Sender,
    pub timestamp: DateTime<Utc>,
    pub body: EntryBody,
}

/// The visible conversation, rebuilt from the store on every switch
#[derive(Debug, Default)]
pub struct ChatLog {
    entries: Vec<LogEntry>,
    next_id: u64,
    scroll_to_bottom: bool,
}

impl ChatLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, sender: Sender, timestamp: DateTime<Utc>, body: EntryBody) -> &LogEntry {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push(LogEntry {
            id,
            sender,
            timestamp,
            body,
        });
        self.scroll_to_bottom = true;
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.scroll_to_bottom = false;
    }

    /// Returns true once after each append so the view can jump to the newest entry
    pub fn take_scroll_request(&mut self) -> bool {
        std::mem::take(&mut self.scroll_to_bottom)
    }
}

pub fn duration_label(duration_ms: u64) -> String {
    format!("{}s", (duration_ms as f64 / 1000.0).round() as u64)
}

/// How a rendered message should reach the store
#[derive(Debug, Clone, PartialEq)]
pub enum PersistPlan {
    /// Ready to append as is
    Store { partner: String, message: Message },
    /// Needs its payload encoded first
    Convert(ConversionJob),
    Skip(&'static str),
}

/// Decide what, if anything, to persist for a rendered message
pub fn plan_persistence(
    content: &RenderContent,
    sender: Sender,
    partner: Option<&str>,
    timestamp: DateTime<Utc>,
) -> PersistPlan {
    if !sender.is_persistable() {
        return PersistPlan::Skip("system notices are not persisted");
    }

    let Some(partner) = partner else {
        return PersistPlan::Skip("no active conversation");
    };

    let partner = partner.to_string();
    let timestamp = timestamp.trunc_subsecs(3);

    match content {
        RenderContent::Text(text) => PersistPlan::Store {
            partner,
            message: Message::text(sender, text.clone()).with_timestamp(timestamp),
        },
        RenderContent::Audio(audio) => match (&audio.source, &audio.payload) {
            (AudioSource::Encoded(url), _) => PersistPlan::Store {
                partner,
                message: Message::audio(sender, url.clone(), audio.duration_ms)
                    .with_timestamp(timestamp),
            },
            (AudioSource::Ephemeral(_), Some(artifact)) => {
                PersistPlan::Convert(ConversionJob {
                    partner,
                    sender,
                    timestamp,
                    artifact: AudioArtifact {
                        duration_ms: audio.duration_ms.or(artifact.duration_ms),
                        ..artifact.clone()
                    },
                })
            }
            (AudioSource::Ephemeral(_), None) => {
                PersistPlan::Skip("audio has only an ephemeral handle")
            }
        },
    }
}

/// Owns the visible log and the path from rendered messages to storage
pub struct MessageRenderer {
    log: ChatLog,
    store: ConversationStore,
    converter: Option<ConversionWorker>,
    pending_conversions: usize,
}

impl MessageRenderer {
    pub fn new(store: ConversationStore, converter: Option<ConversionWorker>) -> Self {
        Self {
            log: ChatLog::new(),
            store,
            converter,
            pending_conversions: 0,
        }
    }

    pub fn log(&self) -> &ChatLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut ChatLog {
        &mut self.log
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn pending_conversions(&self) -> usize {
        self.pending_conversions
    }

    /// Show `content` in the log and, when `persist` is set, store it for `partner`
    pub fn render(
        &mut self,
        content: RenderContent,
        sender: Sender,
        persist: bool,
        partner: Option<&str>,
    ) -> &LogEntry {
        self.render_at(content, sender, persist, partner, Utc::now())
    }

    /// [`render`](Self::render) with an explicit timestamp, used when
    /// replaying stored history
    pub fn render_at(
        &mut self,
        content: RenderContent,
        sender: Sender,
        persist: bool,
        partner: Option<&str>,
        timestamp: DateTime<Utc>,
    ) -> &LogEntry {
        if persist {
            let plan = plan_persistence(&content, sender, partner, timestamp);
            self.persist(plan);
        }

        let body = match content {
            RenderContent::Text(text) => EntryBody::Text(text),
            RenderContent::Audio(audio) => EntryBody::Audio {
                source: audio.source,
                duration_label: audio.duration_ms.map(duration_label),
            },
        };

        self.log.push(sender, timestamp, body)
    }

    /// Carry out a persistence plan; never blocks on audio conversion
    pub fn persist(&mut self, plan: PersistPlan) {
        match plan {
            PersistPlan::Store { partner, message } => self.store.append(&partner, message),
            PersistPlan::Convert(job) => {
                let Some(converter) = &self.converter else {
                    warn!("No conversion worker, voice message for {:?} not saved", job.partner);
                    return;
                };
                let partner = job.partner.clone();
                match converter.submit(job) {
                    Ok(()) => self.pending_conversions += 1,
                    Err(e) => warn!("Could not persist audio message for {:?}: {}", partner, e),
                }
            }
            PersistPlan::Skip(reason) => debug!("Not persisting message: {}", reason),
        }
    }

    /// Store finished conversions; returns how many were saved
    pub fn poll_conversions(&mut self) -> usize {
        let events = match &self.converter {
            Some(converter) => converter.try_events(),
            None => return 0,
        };

        events.into_iter().filter(|e| self.apply_conversion(e.clone())).count()
    }

    /// Block until outstanding conversions land or `timeout` passes
    pub fn flush_conversions(&mut self, timeout: std::time::Duration) -> bool {
        let deadline = std::time::Instant::now() + timeout;

        while self.pending_conversions > 0 {
            let remaining = deadline.saturating_duration_since(std::time::Instant::now());
            if remaining.is_zero() {
                warn!("{} voice messages still converting", self.pending_conversions);
                return false;
            }

            let Some(converter) = &self.converter else {
                return false;
            };
            match converter.recv_timeout(remaining) {
                Ok(Some(event)) => {
                    self.apply_conversion(event);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("{} voice messages lost: {}", self.pending_conversions, e);
                    return false;
                }
            }
        }
        true
    }

    fn apply_conversion(&mut self, event: ConversionEvent) -> bool {
        self.pending_conversions = self.pending_conversions.saturating_sub(1);
        match event {
            ConversionEvent::Ready { partner, message } => {
                self.store.append(&partner, message);
                true
            }
            ConversionEvent::Failed { partner, error } => {
                // Already on screen; the stored history just lacks it
                warn!("Could not persist audio message for {:?}: {}", partner, error);
                false
            }
        }
    }
}
