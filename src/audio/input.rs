use super::artifact::PcmClip;
use super::host::{AudioHost, InputHandle};
use super::wav::{encode_wav, WAV_MIME};
use crate::{PolypalError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Microphone access through the platform's default cpal host
#[derive(Default)]
pub struct CpalAudioHost;

impl CpalAudioHost {
    pub fn new() -> Self {
        Self
    }
}

impl AudioHost for CpalAudioHost {
    fn is_capture_supported(&self) -> bool {
        cpal::default_host().default_input_device().is_some()
    }

    fn is_type_supported(&self, mime: &str) -> bool {
        mime == WAV_MIME
    }

    fn default_mime(&self) -> String {
        WAV_MIME.to_string()
    }

    fn request_input(&mut self) -> Result<Box<dyn InputHandle>> {
        Ok(Box::new(CpalInput::new()?))
    }

    fn encode(&self, mime: &str, clip: &PcmClip) -> Result<Vec<u8>> {
        if mime != WAV_MIME {
            return Err(PolypalError::EncodingFailure(format!(
                "Unsupported encoding: {}",
                mime
            )));
        }
        encode_wav(clip)
    }
}

pub struct CpalInput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_recording: Arc<AtomicBool>,
    /// Chunks the callback could not hand over
    dropped: Arc<AtomicUsize>,
}

impl CpalInput {
    /// Open the default input device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_input_device().ok_or_else(|| {
            PolypalError::HardwareUnavailable("No input device available".into())
        })?;

        info!(
            "Using input device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_input_config()
            .map_err(|e| {
                PolypalError::HardwareUnavailable(format!("Failed to get input config: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_recording: Arc::new(AtomicBool::new(false)),
            dropped: Arc::new(AtomicUsize::new(0)),
        })
    }
}

impl InputHandle for CpalInput {
    fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Always mono, input is mixed down in the capture callback
    fn channels(&self) -> u16 {
        1
    }

    fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<()> {
        if self.is_recording.load(Ordering::SeqCst) {
            warn!("Already recording");
            return Ok(());
        }

        let channels = self.config.channels as usize;
        let is_recording = Arc::clone(&self.is_recording);
        let dropped = Arc::clone(&self.dropped);
        dropped.store(0, Ordering::SeqCst);

        let err_fn = |err| {
            error!("Audio input stream error: {}", err);
        };

        let stream = self
            .device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if !is_recording.load(Ordering::SeqCst) {
                        return;
                    }

                    let samples = if channels == 1 {
                        data.to_vec()
                    } else {
                        data.chunks(channels)
                            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
                            .collect()
                    };

                    if chunk_tx.send(samples).is_err()
                        && dropped.fetch_add(1, Ordering::Relaxed) == 0
                    {
                        warn!("Audio chunk receiver is gone, dropping capture data");
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                PolypalError::HardwareUnavailable(format!("Failed to build input stream: {}", e))
            })?;

        stream.play().map_err(|e| {
            PolypalError::HardwareUnavailable(format!("Failed to start input stream: {}", e))
        })?;

        self.is_recording.store(true, Ordering::SeqCst);
        self.stream = Some(stream);

        info!("Started audio capture");
        Ok(())
    }

    fn release(&mut self) {
        self.is_recording.store(false, Ordering::SeqCst);

        if let Some(stream) = self.stream.take() {
            if let Err(e) = stream.pause() {
                debug!("Error pausing input stream: {}", e);
            }
            drop(stream);

            let dropped = self.dropped.swap(0, Ordering::SeqCst);
            if dropped > 0 {
                warn!("{} audio chunks were dropped during capture", dropped);
            }
            info!("Released audio input stream");
        }
    }

    fn is_active(&self) -> bool {
        self.stream.is_some()
    }
}

impl Drop for CpalInput {
    fn drop(&mut self) {
        self.release();
    }
}
