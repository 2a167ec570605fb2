use std::fmt;

use crate::error::Error;

pub mod base64_codec;
pub mod canonical_json;

pub use base64_codec::Base64Codec;

/// Errors that can occur during encoding/decoding operations.
#[derive(Debug, Clone, PartialEq)]
pub enum EncodingError {
    InvalidData(String),
    EncodingFailed(String),
    DecodingFailed(String),
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EncodingError::InvalidData(msg) => write!(f, "Invalid encoded data: {}", msg),
            EncodingError::EncodingFailed(msg) => write!(f, "Encoding operation failed: {}", msg),
            EncodingError::DecodingFailed(msg) => write!(f, "Decoding operation failed: {}", msg),
        }
    }
}

impl std::error::Error for EncodingError {}

impl From<EncodingError> for Error {
    fn from(err: EncodingError) -> Self {
        Error::BadMsg(err.to_string())
    }
}

/// Trait for data encoding/decoding implementations.
pub trait DataCodec: Send + Sync {
    fn encode(&self, data: &[u8]) -> Result<String, EncodingError>;
    fn decode(&self, encoded: &str) -> Result<Vec<u8>, EncodingError>;
    fn format_name(&self) -> &'static str;
}
