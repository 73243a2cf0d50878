pub mod artifact;
pub mod capture;
pub mod host;
#[cfg(feature = "audio-io")]
pub mod input;
pub mod mock;
#[cfg(feature = "audio-io")]
pub mod output;
pub mod wav;

pub use artifact::{AudioArtifact, BlobRegistry, PcmClip};
pub use capture::{AudioCaptureController, CaptureOutcome, CaptureState, MicAffordance};
pub use host::{select_encoding, AudioHost, InputHandle, ENCODING_PREFERENCES};
#[cfg(feature = "audio-io")]
pub use input::CpalAudioHost;
pub use mock::{HostProbe, MockAudioHost};
#[cfg(feature = "audio-io")]
pub use output::AudioPlayer;
pub use wav::{decode_artifact, decode_wav, encode_wav, WAV_MIME};

/// The platform microphone, or an unsupported stand-in when built without audio I/O
pub fn default_host() -> Box<dyn AudioHost> {
    #[cfg(feature = "audio-io")]
    {
        Box::new(CpalAudioHost::new())
    }
    #[cfg(not(feature = "audio-io"))]
    {
        Box::new(MockAudioHost::unsupported())
    }
}
