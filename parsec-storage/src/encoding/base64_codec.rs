use base64::{Engine as _, engine::general_purpose};
use crate::encoding::{DataCodec, EncodingError};

/// Base64 encoding/decoding implementation
pub struct Base64Codec;

impl Base64Codec {
    /// Create a new Base64 codec instance
    pub fn new() -> Self {
        Self
    }
}

impl Default for Base64Codec {
    fn default() -> Self {
        Self::new()
    }
}

impl DataCodec for Base64Codec {
    fn encode(&self, data: &[u8]) -> Result<String, EncodingError> {
        Ok(general_purpose::STANDARD.encode(data))
    }

    fn decode(&self, encoded: &str) -> Result<Vec<u8>, EncodingError> {
        general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| EncodingError::DecodingFailed(format!("Base64 decode error: {}", e)))
    }

    fn format_name(&self) -> &'static str {
        "base64"
    }
}
