//! Session Frame Codec
//!
//! JSON encoding and decoding for the upstream session protocol: one
//! [`Event`] or [`RequestFrame`] per WebSocket text frame.

use crate::domain::event::Event;

use super::messages::RequestFrame;

/// Codec errors.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// JSON encoding/decoding failed.
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    /// Invalid frame format.
    #[error("invalid frame format: {0}")]
    InvalidFormat(String),
}

/// JSON codec for the session protocol.
#[derive(Debug, Default, Clone)]
pub struct JsonCodec;

impl JsonCodec {
    /// Create a new JSON codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decode a server frame into an event.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame is not a JSON object or does not
    /// match the event schema.
    pub fn decode_event(&self, text: &str) -> Result<Event, CodecError> {
        let trimmed = text.trim();
        if !trimmed.starts_with('{') {
            return Err(CodecError::InvalidFormat(format!(
                "expected JSON object, got: {}...",
                &trimmed[..trimmed.len().min(50)]
            )));
        }
        Ok(serde_json::from_str(trimmed)?)
    }

    /// Encode an event for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode_event(&self, event: &Event) -> Result<String, CodecError> {
        Ok(serde_json::to_string(event)?)
    }

    /// Decode a client frame.
    ///
    /// # Errors
    ///
    /// Returns an error if the frame does not match the request schema.
    pub fn decode_frame(&self, text: &str) -> Result<RequestFrame, CodecError> {
        Ok(serde_json::from_str(text.trim())?)
    }

    /// Encode a client frame for the wire.
    ///
    /// # Errors
    ///
    /// Returns an error if JSON serialization fails.
    pub fn encode_frame(&self, frame: &RequestFrame) -> Result<String, CodecError> {
        Ok(serde_json::to_string(frame)?)
    }
}
