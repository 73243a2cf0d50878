//! `data:` URL codec for self-contained audio payloads

use crate::{PolypalError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

const PREFIX: &str = "data:";
const BASE64_MARKER: &str = ";base64,";

pub fn is_data_url(url: &str) -> bool {
    url.starts_with(PREFIX)
}

/// Encode raw bytes as `data:<mime>;base64,<payload>`
pub fn encode(mime: &str, bytes: &[u8]) -> String {
    format!("{}{}{}{}", PREFIX, mime, BASE64_MARKER, STANDARD.encode(bytes))
}

/// Split a base64 `data:` URL back into its mime type and bytes
pub fn decode(url: &str) -> Result<(String, Vec<u8>)> {
    let rest = url
        .strip_prefix(PREFIX)
        .ok_or_else(|| PolypalError::CorruptRecord("Not a data URL".into()))?;

    let (mime, payload) = rest
        .split_once(BASE64_MARKER)
        .ok_or_else(|| PolypalError::CorruptRecord("Data URL is not base64 encoded".into()))?;

    let bytes = STANDARD
        .decode(payload)
        .map_err(|e| PolypalError::CorruptRecord(format!("Invalid base64 payload: {}", e)))?;

    Ok((mime.to_string(), bytes))
}
