use super::artifact::{AudioArtifact, PcmClip};
use crate::{PolypalError, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};
use std::io::Cursor;
use tracing::debug;

pub const WAV_MIME: &str = "audio/wav";

/// Encode a PCM clip as an in-memory 16-bit WAV file
pub fn encode_wav(clip: &PcmClip) -> Result<Vec<u8>> {
    let spec = WavSpec {
        channels: clip.channels,
        sample_rate: clip.sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = WavWriter::new(&mut cursor, spec).map_err(|e| {
            PolypalError::EncodingFailure(format!("Failed to create WAV writer: {}", e))
        })?;

        for &sample in &clip.samples {
            let sample_i16 = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
            writer.write_sample(sample_i16).map_err(|e| {
                PolypalError::EncodingFailure(format!("Failed to write sample: {}", e))
            })?;
        }

        writer.finalize().map_err(|e| {
            PolypalError::EncodingFailure(format!("Failed to finalize WAV data: {}", e))
        })?;
    }

    let bytes = cursor.into_inner();
    debug!("Encoded {} samples into {} WAV bytes", clip.samples.len(), bytes.len());
    Ok(bytes)
}

/// Decode WAV bytes back into f32 samples
pub fn decode_wav(bytes: &[u8]) -> Result<PcmClip> {
    let mut reader = WavReader::new(Cursor::new(bytes))
        .map_err(|e| PolypalError::CorruptRecord(format!("Failed to open WAV data: {}", e)))?;

    let spec = reader.spec();
    let read_err = |e: hound::Error| PolypalError::CorruptRecord(format!("Failed to read sample: {}", e));

    let samples: Result<Vec<f32>> = match (spec.sample_format, spec.bits_per_sample) {
        (SampleFormat::Float, _) => reader.samples::<f32>().map(|s| s.map_err(read_err)).collect(),
        (SampleFormat::Int, 16) => reader
            .samples::<i16>()
            .map(|s| s.map(|v| v as f32 / i16::MAX as f32).map_err(read_err))
            .collect(),
        (SampleFormat::Int, 24) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / 8388608.0).map_err(read_err))
            .collect(),
        (SampleFormat::Int, 32) => reader
            .samples::<i32>()
            .map(|s| s.map(|v| v as f32 / i32::MAX as f32).map_err(read_err))
            .collect(),
        (_, bits) => {
            return Err(PolypalError::CorruptRecord(format!(
                "Unsupported bit depth: {}",
                bits
            )))
        }
    };

    Ok(PcmClip::new(samples?, spec.sample_rate, spec.channels))
}

/// PCM for playback; only WAV recordings can be decoded locally
pub fn decode_artifact(artifact: &AudioArtifact) -> Result<PcmClip> {
    let essence = artifact.mime.split(';').next().unwrap_or_default().trim();
    if !matches!(essence, "audio/wav" | "audio/x-wav" | "audio/wave") {
        return Err(PolypalError::EncodingFailure(format!(
            "Cannot play {} audio",
            artifact.mime
        )));
    }
    decode_wav(&artifact.bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    #[test]
    fn test_encode_decode_wav() {
        let sample_rate = 16000;
        let samples: Vec<f32> = (0..sample_rate as usize)
            .map(|i| (2.0 * PI * 440.0 * i as f32 / sample_rate as f32).sin() * 0.5)
            .collect();
        let clip = PcmClip::new(samples.clone(), sample_rate, 1);

        let bytes = encode_wav(&clip).unwrap();
        assert_eq!(&bytes[0..4], b"RIFF");
        assert_eq!(&bytes[8..12], b"WAVE");

        let decoded = decode_wav(&bytes).unwrap();
        assert_eq!(decoded.sample_rate, sample_rate);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), samples.len());
        for (original, read) in samples.iter().zip(decoded.samples.iter()) {
            assert!((original - read).abs() < 0.001);
        }
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_wav(b"definitely not a wav file").is_err());
    }

    #[test]
    fn test_decode_artifact_checks_mime() {
        let bytes = encode_wav(&PcmClip::new(vec![0.1; 160], 16_000, 1)).unwrap();

        let wav = AudioArtifact::new("audio/wav", bytes.clone(), None);
        assert_eq!(decode_artifact(&wav).unwrap().samples.len(), 160);

        let webm = AudioArtifact::new("audio/webm;codecs=opus", bytes, None);
        assert!(matches!(
            decode_artifact(&webm),
            Err(PolypalError::EncodingFailure(_))
        ));
    }
}
