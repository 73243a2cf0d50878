//! Finished recordings and the session-local blob registry

use crate::messages::BlobHandle;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Raw interleaved f32 audio
#[derive(Debug, Clone, PartialEq)]
pub struct PcmClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl PcmClip {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let frames = self.samples.len() as u64 / self.channels as u64;
        frames * 1000 / self.sample_rate as u64
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// An encoded recording, ready to play or persist
#[derive(Debug, Clone, PartialEq)]
pub struct AudioArtifact {
    pub mime: String,
    pub bytes: Arc<[u8]>,
    pub duration_ms: Option<u64>,
}

impl AudioArtifact {
    pub fn new(mime: impl Into<String>, bytes: Vec<u8>, duration_ms: Option<u64>) -> Self {
        Self {
            mime: mime.into(),
            bytes: bytes.into(),
            duration_ms,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Maps ephemeral handles to in-memory recordings for the lifetime of a session
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: HashMap<BlobHandle, AudioArtifact>,
}

impl BlobRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, artifact: AudioArtifact) -> BlobHandle {
        let handle = BlobHandle::new();
        debug!("Registered {} byte blob as {}", artifact.len(), handle);
        self.blobs.insert(handle.clone(), artifact);
        handle
    }

    pub fn get(&self, handle: &BlobHandle) -> Option<&AudioArtifact> {
        self.blobs.get(handle)
    }

    pub fn clear(&mut self) {
        self.blobs.clear();
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duration_from_sample_count() {
        let clip = PcmClip::new(vec![0.0; 48_000], 16_000, 1);
        assert_eq!(clip.duration_ms(), 3000);

        let stereo = PcmClip::new(vec![0.0; 32_000], 16_000, 2);
        assert_eq!(stereo.duration_ms(), 1000);

        assert_eq!(PcmClip::new(vec![0.0; 10], 0, 1).duration_ms(), 0);
    }

    #[test]
    fn test_registry_lifecycle() {
        let mut registry = BlobRegistry::new();
        let handle = registry.register(AudioArtifact::new("audio/wav", vec![1, 2, 3], None));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&handle).map(|a| a.len()), Some(3));

        registry.clear();
        assert!(registry.get(&handle).is_none());
        assert!(registry.is_empty());
    }
}
