//! Chat session
//!
//! The context object every UI event goes through. It owns the active
//! conversation, the renderer and store, the capture controller, the
//! conversion worker and any scheduled bot replies.

use super::persist::ConversionWorker;
use super::renderer::{AudioDescriptor, ChatLog, MessageRenderer, RenderContent};
use super::selector::ConversationSelector;
use crate::audio::{
    default_host, AudioArtifact, AudioCaptureController, AudioHost, BlobRegistry, CaptureOutcome,
    CaptureState, MicAffordance,
};
use crate::integration::ChatConfig;
use crate::messages::{
    data_url, open_file_store, AudioSource, ConversationStore, Message, ProfanityFilter, Sender,
};
use crate::{PolypalError, Result};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const BLOCKED_NOTICE: &str = "Message blocked: contains prohibited language.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was blank, nothing happened
    Empty,
    /// Input contained banned terms and was replaced by its masked form
    Blocked { masked: String },
    Sent,
}

#[derive(Debug, Clone)]
struct PendingReply {
    /// Conversation that was active when the user sent the message
    partner: Option<String>,
    text: String,
    due: Instant,
}

pub struct ChatSession {
    config: ChatConfig,
    renderer: MessageRenderer,
    selector: ConversationSelector,
    capture: AudioCaptureController,
    blobs: BlobRegistry,
    filter: ProfanityFilter,
    /// Contents of the message input box
    pub input_text: String,
    pending_replies: Vec<PendingReply>,
    last_alert: Option<String>,
}

impl ChatSession {
    pub fn new(config: ChatConfig, store: ConversationStore, host: Box<dyn AudioHost>) -> Result<Self> {
        config.validate()?;

        let filter = ProfanityFilter::new(&config.banned_terms, config.mask_char)?;
        let converter = ConversionWorker::start(config.conversion_queue)?;
        let store = store.with_namespace(config.namespace.clone());
        let capture = AudioCaptureController::new(host)
            .with_preferences(config.encoding_preferences.clone());

        info!(
            "Chat session ready: {} partners, {} banned terms, store {:?}",
            config.partners.len(),
            filter.term_count(),
            store
        );

        Ok(Self {
            selector: ConversationSelector::new(config.partners.clone()),
            renderer: MessageRenderer::new(store, Some(converter)),
            capture,
            blobs: BlobRegistry::new(),
            filter,
            input_text: String::new(),
            pending_replies: Vec::new(),
            last_alert: None,
            config,
        })
    }

    /// Session backed by the configured data directory and the platform microphone
    pub fn open(config: ChatConfig) -> Result<Self> {
        let store = open_file_store(config.data_dir.clone());
        Self::new(config, store, default_host())
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    pub fn log(&self) -> &ChatLog {
        self.renderer.log()
    }

    pub fn log_mut(&mut self) -> &mut ChatLog {
        self.renderer.log_mut()
    }

    pub fn store(&self) -> &ConversationStore {
        self.renderer.store()
    }

    pub fn selector(&self) -> &ConversationSelector {
        &self.selector
    }

    pub fn selector_mut(&mut self) -> &mut ConversationSelector {
        &mut self.selector
    }

    pub fn active_partner(&self) -> Option<&str> {
        self.selector.active()
    }

    /// Switch conversations; handles of the previous one are revoked
    pub fn select(&mut self, partner: &str) -> usize {
        if !self.blobs.is_empty() {
            debug!("Revoking {} audio handles", self.blobs.len());
            self.blobs.clear();
        }
        self.selector.select(partner, &mut self.renderer)
    }

    pub fn send_text(&mut self) -> SendOutcome {
        let text = self.input_text.trim().to_string();
        if text.is_empty() {
            return SendOutcome::Empty;
        }

        if self.filter.contains_banned(&text) {
            warn!("Blocked outgoing message with banned terms");
            self.renderer
                .render(BLOCKED_NOTICE.into(), Sender::System, false, None);
            let masked = self.filter.mask(&text);
            self.input_text = masked.clone();
            return SendOutcome::Blocked { masked };
        }

        let partner = self.selector.active().map(str::to_string);
        self.renderer.render(
            RenderContent::Text(text),
            Sender::User,
            true,
            partner.as_deref(),
        );
        self.input_text.clear();

        if let Some(reply) = &self.config.bot_reply {
            self.pending_replies.push(PendingReply {
                partner,
                text: reply.clone(),
                due: Instant::now() + self.config.bot_reply_delay,
            });
        }

        SendOutcome::Sent
    }

    pub fn toggle_recording(&mut self) -> CaptureOutcome {
        let outcome = self.capture.toggle();

        match &outcome {
            CaptureOutcome::Finished(artifact) => self.render_recording(artifact.clone()),
            CaptureOutcome::Unavailable(e) => {
                self.last_alert = Some(e.user_message());
            }
            CaptureOutcome::EncodingFailed(e) => {
                self.renderer
                    .render(RenderContent::Text(e.user_message()), Sender::System, false, None);
            }
            CaptureOutcome::Started | CaptureOutcome::Stopped => {}
        }

        outcome
    }

    fn render_recording(&mut self, artifact: AudioArtifact) {
        let duration_ms = artifact.duration_ms;
        let handle = self.blobs.register(artifact.clone());
        let partner = self.selector.active().map(str::to_string);

        self.renderer.render(
            RenderContent::Audio(AudioDescriptor {
                source: AudioSource::Ephemeral(handle),
                payload: Some(artifact),
                duration_ms,
            }),
            Sender::User,
            true,
            partner.as_deref(),
        );
    }

    pub fn capture_state(&self) -> CaptureState {
        self.capture.state()
    }

    pub fn is_recording(&self) -> bool {
        self.capture.is_recording()
    }

    pub fn mic_affordance(&self) -> MicAffordance {
        self.capture.affordance()
    }

    pub fn recording_secs(&self) -> f32 {
        self.capture.elapsed_secs()
    }

    /// Per-frame housekeeping; returns true when something visible changed
    pub fn poll_events(&mut self) -> bool {
        self.capture.pump();
        let stored = self.renderer.poll_conversions();
        let replied = self.deliver_due_replies(Instant::now());
        stored > 0 || replied > 0
    }

    fn deliver_due_replies(&mut self, now: Instant) -> usize {
        let (due, waiting): (Vec<_>, Vec<_>) = std::mem::take(&mut self.pending_replies)
            .into_iter()
            .partition(|r| r.due <= now);
        self.pending_replies = waiting;

        for reply in &due {
            let partner = reply.partner.as_deref();
            if partner == self.selector.active() {
                self.renderer
                    .render(reply.text.as_str().into(), Sender::Bot, true, partner);
            } else if let Some(partner) = partner {
                // The user moved on; file the reply under its own conversation
                debug!("Storing reply for inactive conversation {:?}", partner);
                self.renderer
                    .store()
                    .append(partner, Message::text(Sender::Bot, reply.text.clone()));
            }
        }
        due.len()
    }

    pub fn pending_replies(&self) -> usize {
        self.pending_replies.len()
    }

    /// Time until the next bot reply is due
    pub fn next_reply_in(&self) -> Option<Duration> {
        let now = Instant::now();
        self.pending_replies
            .iter()
            .map(|r| r.due.saturating_duration_since(now))
            .min()
    }

    pub fn pending_conversions(&self) -> usize {
        self.renderer.pending_conversions()
    }

    /// Wait for in-flight voice message conversions to be stored
    pub fn flush_conversions(&mut self, timeout: Duration) -> bool {
        self.renderer.flush_conversions(timeout)
    }

    /// Raw recording behind an audio entry
    pub fn resolve_audio(&self, source: &AudioSource) -> Result<AudioArtifact> {
        match source {
            AudioSource::Encoded(url) => {
                let (mime, bytes) = data_url::decode(url)?;
                Ok(AudioArtifact::new(mime, bytes, None))
            }
            AudioSource::Ephemeral(handle) => self.blobs.get(handle).cloned().ok_or_else(|| {
                PolypalError::EncodingFailure(format!("Audio handle {} is no longer valid", handle))
            }),
        }
    }

    pub fn last_alert(&self) -> Option<&str> {
        self.last_alert.as_deref()
    }

    pub fn dismiss_alert(&mut self) {
        self.last_alert = None;
    }

    /// Report a failure outside the session, e.g. playback, to the user
    pub fn raise_alert(&mut self, error: &PolypalError) {
        self.last_alert = Some(error.user_message());
    }
}
