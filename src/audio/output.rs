use super::artifact::PcmClip;
use crate::{PolypalError, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

/// Plays one voice message at a time on the default output device
pub struct AudioPlayer {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    is_playing: Arc<AtomicBool>,
}

impl AudioPlayer {
    /// Create a new player with the default output device
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host.default_output_device().ok_or_else(|| {
            PolypalError::HardwareUnavailable("No output device available".into())
        })?;

        info!(
            "Using output device: {}",
            device.name().unwrap_or_else(|_| "Unknown".to_string())
        );

        let config = device
            .default_output_config()
            .map_err(|e| {
                PolypalError::HardwareUnavailable(format!("Failed to get output config: {}", e))
            })?
            .into();

        Ok(Self {
            device,
            config,
            stream: None,
            is_playing: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Replace whatever is playing with `clip`
    pub fn play(&mut self, clip: PcmClip) -> Result<()> {
        self.stop();

        let out_channels = self.config.channels as usize;
        let out_rate = self.config.sample_rate.0 as f64;
        let mono = mix_to_mono(&clip);
        // Source samples consumed per output frame
        let step = if out_rate > 0.0 {
            clip.sample_rate as f64 / out_rate
        } else {
            1.0
        };

        let position = Arc::new(Mutex::new(0.0f64));
        let is_playing = Arc::clone(&self.is_playing);

        let err_fn = |err| {
            error!("Audio output stream error: {}", err);
        };

        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let mut pos = position.lock();
                    for frame in data.chunks_mut(out_channels) {
                        let idx = *pos as usize;
                        let sample = if is_playing.load(Ordering::SeqCst) && idx < mono.len() {
                            *pos += step;
                            mono[idx]
                        } else {
                            is_playing.store(false, Ordering::SeqCst);
                            0.0
                        };
                        frame.fill(sample);
                    }
                },
                err_fn,
                None,
            )
            .map_err(|e| {
                PolypalError::HardwareUnavailable(format!("Failed to build output stream: {}", e))
            })?;

        self.is_playing.store(true, Ordering::SeqCst);

        stream.play().map_err(|e| {
            self.is_playing.store(false, Ordering::SeqCst);
            PolypalError::HardwareUnavailable(format!("Failed to start output stream: {}", e))
        })?;

        self.stream = Some(stream);
        info!("Started playback of {}ms clip", clip.duration_ms());
        Ok(())
    }

    pub fn stop(&mut self) {
        self.is_playing.store(false, Ordering::SeqCst);
        if self.stream.take().is_some() {
            info!("Stopped playback");
        }
    }

    pub fn is_playing(&self) -> bool {
        self.is_playing.load(Ordering::SeqCst)
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn mix_to_mono(clip: &PcmClip) -> Vec<f32> {
    let channels = clip.channels.max(1) as usize;
    if channels == 1 {
        return clip.samples.clone();
    }
    clip.samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}
