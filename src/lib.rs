pub mod audio;
pub mod chat;
pub mod integration;
pub mod messages;
pub mod ui;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolypalError {
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Corrupt record: {0}")]
    CorruptRecord(String),

    #[error("Hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("Capture unsupported: {0}")]
    CaptureUnsupported(String),

    #[error("Encoding failure: {0}")]
    EncodingFailure(String),

    #[error("IO error: {0}")]
    IOError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Channel error: {0}")]
    ChannelError(String),
}

impl From<std::io::Error> for PolypalError {
    fn from(e: std::io::Error) -> Self {
        PolypalError::IOError(e.to_string())
    }
}

impl From<serde_json::Error> for PolypalError {
    fn from(e: serde_json::Error) -> Self {
        PolypalError::CorruptRecord(e.to_string())
    }
}

impl PolypalError {
    /// Check if this error is recoverable
    pub fn is_recoverable(&self) -> bool {
        match self {
            // A full or broken store degrades to "no history", the chat keeps running
            PolypalError::StorageUnavailable(_) => true,
            PolypalError::CorruptRecord(_) => true,
            // The user has to grant access or plug in a microphone
            PolypalError::HardwareUnavailable(_) => false,
            PolypalError::CaptureUnsupported(_) => false,
            PolypalError::EncodingFailure(_) => true,
            PolypalError::IOError(_) => false,
            PolypalError::ConfigError(_) => false,
            PolypalError::ChannelError(_) => false,
        }
    }

    /// Get a user-friendly description
    pub fn user_message(&self) -> String {
        match self {
            PolypalError::StorageUnavailable(_) => {
                "Could not save the conversation on this device.".to_string()
            }
            PolypalError::CorruptRecord(_) => {
                "Saved conversation could not be read and was skipped.".to_string()
            }
            PolypalError::HardwareUnavailable(_) => {
                "Could not access microphone. Please allow microphone permissions.".to_string()
            }
            PolypalError::CaptureUnsupported(_) => {
                "Audio recording is not supported on this device.".to_string()
            }
            PolypalError::EncodingFailure(_) => {
                "Voice message failed to record properly.".to_string()
            }
            PolypalError::IOError(_) => "File system error occurred.".to_string(),
            PolypalError::ConfigError(_) => {
                "Configuration error. Please check settings.".to_string()
            }
            PolypalError::ChannelError(_) => {
                "Internal communication error. Please restart the application.".to_string()
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PolypalError>;
