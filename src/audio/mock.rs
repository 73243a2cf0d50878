//! Scriptable audio host for headless runs and tests
//!
//! Emits a fixed set of chunks when recording starts and counts how many
//! input handles are acquired and still held.

use super::artifact::PcmClip;
use super::host::{AudioHost, InputHandle};
use super::wav::{encode_wav, WAV_MIME};
use crate::{PolypalError, Result};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Shared counters for handles handed out by a [`MockAudioHost`]
#[derive(Debug, Clone, Default)]
pub struct HostProbe {
    acquired: Arc<AtomicUsize>,
    active: Arc<AtomicUsize>,
}

impl HostProbe {
    /// Total handles ever acquired
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }

    /// Handles acquired and not yet released
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone)]
pub struct MockAudioHost {
    supported: bool,
    deny_access: bool,
    fail_encoding: bool,
    fail_stream: bool,
    supported_types: Vec<String>,
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
    probe: HostProbe,
}

impl Default for MockAudioHost {
    fn default() -> Self {
        Self {
            supported: true,
            deny_access: false,
            fail_encoding: false,
            fail_stream: false,
            supported_types: Vec::new(),
            chunks: vec![vec![0.25; 1600]; 10],
            sample_rate: 16_000,
            probe: HostProbe::default(),
        }
    }
}

impl MockAudioHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A host without any capture support
    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::default()
        }
    }

    /// A host where the user refuses microphone access
    pub fn denied() -> Self {
        Self {
            deny_access: true,
            ..Self::default()
        }
    }

    pub fn with_supported_types(mut self, types: &[&str]) -> Self {
        self.supported_types = types.iter().map(|t| t.to_string()).collect();
        self
    }

    pub fn with_chunks(mut self, chunks: Vec<Vec<f32>>) -> Self {
        self.chunks = chunks;
        self
    }

    pub fn with_failing_encoder(mut self) -> Self {
        self.fail_encoding = true;
        self
    }

    /// Access is granted but the input stream refuses to start
    pub fn with_failing_stream(mut self) -> Self {
        self.fail_stream = true;
        self
    }

    pub fn probe(&self) -> HostProbe {
        self.probe.clone()
    }
}

impl AudioHost for MockAudioHost {
    fn is_capture_supported(&self) -> bool {
        self.supported
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        self.supported_types.iter().any(|t| t == mime)
    }

    fn default_mime(&self) -> String {
        WAV_MIME.to_string()
    }

    fn request_input(&mut self) -> Result<Box<dyn InputHandle>> {
        if self.deny_access {
            return Err(PolypalError::HardwareUnavailable(
                "Permission denied".into(),
            ));
        }

        self.probe.acquired.fetch_add(1, Ordering::SeqCst);
        self.probe.active.fetch_add(1, Ordering::SeqCst);

        Ok(Box::new(MockInput {
            chunks: self.chunks.clone(),
            sample_rate: self.sample_rate,
            fail_start: self.fail_stream,
            chunk_tx: None,
            released: false,
            probe: self.probe.clone(),
        }))
    }

    fn encode(&self, _mime: &str, clip: &PcmClip) -> Result<Vec<u8>> {
        if self.fail_encoding {
            return Err(PolypalError::EncodingFailure("Encoder crashed".into()));
        }
        encode_wav(clip)
    }
}

struct MockInput {
    chunks: Vec<Vec<f32>>,
    sample_rate: u32,
    fail_start: bool,
    chunk_tx: Option<Sender<Vec<f32>>>,
    released: bool,
    probe: HostProbe,
}

impl InputHandle for MockInput {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn channels(&self) -> u16 {
        1
    }

    fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.fail_start {
            return Err(PolypalError::HardwareUnavailable(
                "Input stream failed to start".into(),
            ));
        }

        for chunk in self.chunks.drain(..) {
            chunk_tx
                .send(chunk)
                .map_err(|e| PolypalError::ChannelError(e.to_string()))?;
        }
        self.chunk_tx = Some(chunk_tx);
        Ok(())
    }

    fn release(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.chunk_tx = None;
        self.probe.active.fetch_sub(1, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        !self.released
    }
}

impl Drop for MockInput {
    fn drop(&mut self) {
        self.release();
    }
}
