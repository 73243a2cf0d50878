//! Voice message capture state machine
//!
//! Idle -> Requesting -> Recording -> Idle. A denied or unsupported
//! microphone goes straight from Requesting back to Idle. The controller is
//! the only owner of the input handle and releases it on every exit path.
//!
//! Captured chunks queue on an unbounded channel until [`pump`] or [`stop`]
//! collects them, so a window that stops drawing frames loses no audio.
//!
//! [`pump`]: AudioCaptureController::pump
//! [`stop`]: AudioCaptureController::stop

use super::artifact::{AudioArtifact, PcmClip};
use super::host::{default_preferences, select_encoding, AudioHost, InputHandle};
use crate::{PolypalError, Result};
use crossbeam_channel::{unbounded, Receiver};
use std::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    /// Waiting for the host to grant microphone access
    Requesting,
    Recording,
}

/// What the mic button should show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MicAffordance {
    pub icon: &'static str,
    pub label: &'static str,
    pub recording: bool,
}

impl MicAffordance {
    pub const START: MicAffordance = MicAffordance {
        icon: "🎤",
        label: "Start voice recording",
        recording: false,
    };

    pub const STOP: MicAffordance = MicAffordance {
        icon: "⏹",
        label: "Stop recording",
        recording: true,
    };
}

/// Result of a controller transition
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    Started,
    /// Recording finished and was encoded
    Finished(AudioArtifact),
    /// Microphone missing, unsupported or denied; nothing was recorded
    Unavailable(PolypalError),
    /// Recording ran but could not be turned into an artifact
    EncodingFailed(PolypalError),
    /// Stop was requested while not recording
    Stopped,
}

pub struct AudioCaptureController {
    host: Box<dyn AudioHost>,
    state: CaptureState,
    input: Option<Box<dyn InputHandle>>,
    chunk_rx: Option<Receiver<Vec<f32>>>,
    chunks: Vec<Vec<f32>>,
    mime: Option<String>,
    preferences: Vec<String>,
    started_at: Option<Instant>,
}

impl AudioCaptureController {
    pub fn new(host: Box<dyn AudioHost>) -> Self {
        Self {
            host,
            state: CaptureState::Idle,
            input: None,
            chunk_rx: None,
            chunks: Vec::new(),
            mime: None,
            preferences: default_preferences(),
            started_at: None,
        }
    }

    pub fn with_preferences(mut self, preferences: Vec<String>) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == CaptureState::Recording
    }

    pub fn affordance(&self) -> MicAffordance {
        if self.is_recording() {
            MicAffordance::STOP
        } else {
            MicAffordance::START
        }
    }

    /// Encoding chosen for the current recording
    pub fn mime(&self) -> Option<&str> {
        self.mime.as_deref()
    }

    /// Seconds since recording started
    pub fn elapsed_secs(&self) -> f32 {
        self.started_at
            .map(|t| t.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    pub fn toggle(&mut self) -> CaptureOutcome {
        match self.state {
            CaptureState::Idle => self.start(),
            CaptureState::Recording => self.stop(),
            // A request is already in flight
            CaptureState::Requesting => {
                debug!("Toggle ignored while requesting microphone access");
                CaptureOutcome::Stopped
            }
        }
    }

    pub fn start(&mut self) -> CaptureOutcome {
        if self.state != CaptureState::Idle {
            warn!("Already recording, ignoring start request");
            return CaptureOutcome::Started;
        }

        if !self.host.is_capture_supported() {
            warn!("Audio capture not supported on this host");
            return CaptureOutcome::Unavailable(PolypalError::CaptureUnsupported(
                "no audio input on this host".into(),
            ));
        }

        self.state = CaptureState::Requesting;

        let mut input = match self.host.request_input() {
            Ok(input) => input,
            Err(e) => {
                error!("Could not start audio recording: {}", e);
                self.state = CaptureState::Idle;
                return CaptureOutcome::Unavailable(as_hardware_error(e));
            }
        };

        let mime = select_encoding(self.host.as_ref(), &self.preferences);
        let (chunk_tx, chunk_rx) = unbounded();

        if let Err(e) = input.start(chunk_tx) {
            error!("Could not start audio recording: {}", e);
            input.release();
            self.state = CaptureState::Idle;
            return CaptureOutcome::Unavailable(as_hardware_error(e));
        }

        info!(
            "Recording started: {}Hz, {} channel(s), {}",
            input.sample_rate(),
            input.channels(),
            mime
        );

        self.chunks.clear();
        self.input = Some(input);
        self.chunk_rx = Some(chunk_rx);
        self.mime = Some(mime);
        self.started_at = Some(Instant::now());
        self.state = CaptureState::Recording;

        CaptureOutcome::Started
    }

    /// Move pending chunks from the capture callback into the buffer
    pub fn pump(&mut self) -> usize {
        let Some(rx) = &self.chunk_rx else {
            return 0;
        };

        let mut received = 0;
        while let Ok(chunk) = rx.try_recv() {
            if !chunk.is_empty() {
                self.chunks.push(chunk);
                received += 1;
            }
        }
        received
    }

    pub fn stop(&mut self) -> CaptureOutcome {
        if self.state != CaptureState::Recording {
            // Nothing to finalize; still drop any handle left behind
            self.release_input();
            self.reset();
            return CaptureOutcome::Stopped;
        }

        let sample_rate = self.input.as_ref().map(|i| i.sample_rate()).unwrap_or(0);
        let channels = self.input.as_ref().map(|i| i.channels()).unwrap_or(0);

        // Stopping the tracks flushes the last chunks into the channel
        self.release_input();
        self.pump();

        let result = self.finalize(sample_rate, channels);
        self.reset();

        match result {
            Ok(artifact) => {
                info!(
                    "Recording finished: {} bytes, {:?}ms",
                    artifact.len(),
                    artifact.duration_ms
                );
                CaptureOutcome::Finished(artifact)
            }
            Err(e) => {
                error!("Error creating audio artifact: {}", e);
                CaptureOutcome::EncodingFailed(e)
            }
        }
    }

    fn finalize(&mut self, sample_rate: u32, channels: u16) -> Result<AudioArtifact> {
        let samples: Vec<f32> = self.chunks.drain(..).flatten().collect();
        let clip = PcmClip::new(samples, sample_rate, channels);

        if clip.is_empty() {
            return Err(PolypalError::EncodingFailure("No audio was captured".into()));
        }

        let mime = self
            .mime
            .clone()
            .unwrap_or_else(|| self.host.default_mime());
        let bytes = self.host.encode(&mime, &clip)?;
        if bytes.is_empty() {
            return Err(PolypalError::EncodingFailure("Encoder produced no data".into()));
        }

        Ok(AudioArtifact::new(mime, bytes, Some(clip.duration_ms())))
    }

    fn release_input(&mut self) {
        if let Some(mut input) = self.input.take() {
            input.release();
            debug!("Released audio input");
        }
    }

    fn reset(&mut self) {
        self.state = CaptureState::Idle;
        self.chunk_rx = None;
        self.chunks.clear();
        self.mime = None;
        self.started_at = None;
    }
}

impl Drop for AudioCaptureController {
    fn drop(&mut self) {
        self.release_input();
    }
}

fn as_hardware_error(e: PolypalError) -> PolypalError {
    match e {
        PolypalError::HardwareUnavailable(_) | PolypalError::CaptureUnsupported(_) => e,
        other => PolypalError::HardwareUnavailable(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::mock::MockAudioHost;

    #[test]
    fn test_initial_state_is_idle() {
        let controller = AudioCaptureController::new(Box::new(MockAudioHost::new()));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(controller.affordance(), MicAffordance::START);
    }

    #[test]
    fn test_toggle_starts_and_stops() {
        let host = MockAudioHost::new();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert_eq!(controller.toggle(), CaptureOutcome::Started);
        assert_eq!(controller.state(), CaptureState::Recording);
        assert_eq!(controller.affordance(), MicAffordance::STOP);
        assert_eq!(probe.active(), 1);

        match controller.toggle() {
            CaptureOutcome::Finished(artifact) => {
                assert_eq!(artifact.mime, "audio/wav");
                assert_eq!(artifact.duration_ms, Some(1000));
                assert!(!artifact.is_empty());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(controller.affordance(), MicAffordance::START);
        assert_eq!(probe.active(), 0);
    }

    #[test]
    fn test_prefers_webm_then_ogg() {
        let host = MockAudioHost::new()
            .with_supported_types(&["audio/ogg;codecs=opus", "audio/webm;codecs=opus"]);
        let mut controller = AudioCaptureController::new(Box::new(host));
        controller.start();
        assert_eq!(controller.mime(), Some("audio/webm;codecs=opus"));

        let host = MockAudioHost::new().with_supported_types(&["audio/ogg;codecs=opus"]);
        let mut controller = AudioCaptureController::new(Box::new(host));
        controller.start();
        assert_eq!(controller.mime(), Some("audio/ogg;codecs=opus"));

        let mut controller = AudioCaptureController::new(Box::new(MockAudioHost::new()));
        controller.start();
        assert_eq!(controller.mime(), Some("audio/wav"));
    }

    #[test]
    fn test_denied_access_returns_to_idle() {
        let host = MockAudioHost::denied();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        let outcome = controller.toggle();
        assert!(matches!(
            outcome,
            CaptureOutcome::Unavailable(PolypalError::HardwareUnavailable(_))
        ));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(probe.acquired(), 0);
    }

    #[test]
    fn test_unsupported_host_never_requests() {
        let host = MockAudioHost::unsupported();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert!(matches!(
            controller.toggle(),
            CaptureOutcome::Unavailable(PolypalError::CaptureUnsupported(_))
        ));
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(probe.acquired(), 0);
    }

    #[test]
    fn test_failed_start_releases_partial_handle() {
        let host = MockAudioHost::new().with_failing_stream();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert!(matches!(
            controller.start(),
            CaptureOutcome::Unavailable(PolypalError::HardwareUnavailable(_))
        ));
        assert_eq!(probe.acquired(), 1);
        assert_eq!(probe.active(), 0);
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[test]
    fn test_stop_without_recording_acquires_nothing() {
        let host = MockAudioHost::new();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert_eq!(controller.stop(), CaptureOutcome::Stopped);
        assert_eq!(controller.stop(), CaptureOutcome::Stopped);
        assert_eq!(probe.acquired(), 0);
        assert_eq!(probe.active(), 0);
        assert_eq!(controller.affordance(), MicAffordance::START);
    }

    #[test]
    fn test_encoding_failure_still_releases() {
        let host = MockAudioHost::new().with_failing_encoder();
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        controller.start();
        assert!(matches!(
            controller.stop(),
            CaptureOutcome::EncodingFailed(PolypalError::EncodingFailure(_))
        ));
        assert_eq!(probe.active(), 0);
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[test]
    fn test_silent_recording_is_an_encoding_failure() {
        let host = MockAudioHost::new().with_chunks(Vec::new());
        let probe = host.probe();
        let mut controller = AudioCaptureController::new(Box::new(host));

        controller.start();
        assert!(matches!(controller.stop(), CaptureOutcome::EncodingFailed(_)));
        assert_eq!(probe.active(), 0);
    }

    #[test]
    fn test_pump_buffers_chunks() {
        let host = MockAudioHost::new().with_chunks(vec![vec![0.5; 100], Vec::new(), vec![0.5; 50]]);
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert_eq!(controller.pump(), 0);
        controller.start();
        assert_eq!(controller.pump(), 2);
        assert_eq!(controller.pump(), 0);
    }

    #[test]
    fn test_long_recording_without_pump_keeps_every_chunk() {
        // 600 chunks of 100ms, far more than any frame-paced drain would see
        let host = MockAudioHost::new().with_chunks(vec![vec![0.25; 1600]; 600]);
        let mut controller = AudioCaptureController::new(Box::new(host));

        assert_eq!(controller.start(), CaptureOutcome::Started);
        match controller.stop() {
            CaptureOutcome::Finished(artifact) => {
                assert_eq!(artifact.duration_ms, Some(60_000));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_drop_releases_input() {
        let host = MockAudioHost::new();
        let probe = host.probe();
        {
            let mut controller = AudioCaptureController::new(Box::new(host));
            controller.start();
            assert_eq!(probe.active(), 1);
        }
        assert_eq!(probe.active(), 0);
    }
}
