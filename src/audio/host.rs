//! Seams between the capture controller and the platform audio stack

use super::artifact::PcmClip;
use crate::Result;
use crossbeam_channel::Sender;

/// Encodings tried in order before falling back to the host default
pub const ENCODING_PREFERENCES: &[&str] = &["audio/webm;codecs=opus", "audio/ogg;codecs=opus"];

/// Platform audio subsystem: microphone access plus artifact encoding
pub trait AudioHost {
    /// Whether this environment can capture audio at all
    fn is_capture_supported(&self) -> bool;

    fn is_type_supported(&self, mime: &str) -> bool;

    /// Encoding used when none of the preferred ones is supported
    fn default_mime(&self) -> String;

    /// Acquire an audio-only input. Blocks until access is granted or denied.
    fn request_input(&mut self) -> Result<Box<dyn InputHandle>>;

    /// Turn buffered PCM into a single artifact body
    fn encode(&self, mime: &str, clip: &PcmClip) -> Result<Vec<u8>>;
}

/// An acquired microphone. Holding one reserves the hardware.
///
/// Not `Send`: some backends pin their streams to the creating thread.
pub trait InputHandle {
    fn sample_rate(&self) -> u32;

    fn channels(&self) -> u16;

    /// Begin delivering sample chunks through `chunk_tx`.
    ///
    /// The channel is unbounded, so a send only fails once the controller
    /// has gone away.
    fn start(&mut self, chunk_tx: Sender<Vec<f32>>) -> Result<()>;

    /// Stop every underlying track. Safe to call more than once.
    fn release(&mut self);

    fn is_active(&self) -> bool;
}

/// Pick the first preferred encoding the host supports, else its default
pub fn select_encoding(host: &dyn AudioHost, preferences: &[String]) -> String {
    preferences
        .iter()
        .find(|mime| host.is_type_supported(mime))
        .cloned()
        .unwrap_or_else(|| host.default_mime())
}

pub fn default_preferences() -> Vec<String> {
    ENCODING_PREFERENCES.iter().map(|s| s.to_string()).collect()
}
