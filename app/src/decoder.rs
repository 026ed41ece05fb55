// ==============================================================================
// decoder.rs - Upload Payload Decoding
// ==============================================================================
// Description: Turns transport-encoded uploads into text for format detection
// Author: Matt Barham
// Created: 2026-09-18
// Modified: 2026-09-30
// Version: 1.1.0
// ==============================================================================
// Pipeline: base64 (optional) -> gunzip when the gzip magic is present -> UTF-8
// ==============================================================================

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use flate2::read::GzDecoder;
use std::io::Read;
use thiserror::Error;
use tracing::debug;

/// Gzip magic number (first two bytes of any gzip member)
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Default ceiling for inflated payloads (500 MB)
pub const DEFAULT_MAX_DECODED_BYTES: u64 = 500 * 1024 * 1024;

/// Transport decoding failures
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("Failed to decompress gzip payload: {0}")]
    Gzip(#[source] std::io::Error),

    #[error("Decompressed payload exceeds {limit} bytes")]
    TooLarge { limit: u64 },

    #[error("Payload is not valid UTF-8 text: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// Decoded upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedPayload {
    /// UTF-8 text handed to format detection
    pub text: String,
    /// Size of the file as uploaded (after transport decoding, before inflation)
    pub file_size: usize,
    /// Whether the upload was gzip-compressed
    pub compressed: bool,
}

/// Decoder collaborator: opaque blob in, text out
pub trait Decoder: Send + Sync {
    fn decode(&self, encoded: &[u8]) -> Result<DecodedPayload, DecodeError>;
}

/// Standard base64 transport decoding
#[derive(Debug, Clone, Copy)]
pub struct Base64Decoder {
    max_decoded_bytes: u64,
}

impl Default for Base64Decoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODED_BYTES)
    }
}

impl Base64Decoder {
    pub fn new(max_decoded_bytes: u64) -> Self {
        Self { max_decoded_bytes }
    }
}

impl Decoder for Base64Decoder {
    fn decode(&self, encoded: &[u8]) -> Result<DecodedPayload, DecodeError> {
        // Line-wrapped base64 (MIME style) is accepted
        let compact: Vec<u8> = encoded
            .iter()
            .copied()
            .filter(|b| !b.is_ascii_whitespace())
            .collect();

        let bytes = STANDARD.decode(&compact)?;
        debug!("Base64 decoded {} bytes into {} bytes", encoded.len(), bytes.len());
        decode_bytes(bytes, self.max_decoded_bytes)
    }
}

/// Pass-through decoding for files read straight from disk
#[derive(Debug, Clone, Copy)]
pub struct RawDecoder {
    max_decoded_bytes: u64,
}

impl Default for RawDecoder {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_DECODED_BYTES)
    }
}

impl RawDecoder {
    pub fn new(max_decoded_bytes: u64) -> Self {
        Self { max_decoded_bytes }
    }
}

impl Decoder for RawDecoder {
    fn decode(&self, encoded: &[u8]) -> Result<DecodedPayload, DecodeError> {
        decode_bytes(encoded.to_vec(), self.max_decoded_bytes)
    }
}

fn decode_bytes(bytes: Vec<u8>, limit: u64) -> Result<DecodedPayload, DecodeError> {
    let file_size = bytes.len();
    let compressed = bytes.starts_with(&GZIP_MAGIC);

    let plain = if compressed {
        let mut inflated = Vec::new();
        // Read one byte past the limit to detect oversized members
        GzDecoder::new(bytes.as_slice())
            .take(limit.saturating_add(1))
            .read_to_end(&mut inflated)
            .map_err(DecodeError::Gzip)?;

        if inflated.len() as u64 > limit {
            return Err(DecodeError::TooLarge { limit });
        }
        debug!("Inflated gzip payload: {} -> {} bytes", file_size, inflated.len());
        inflated
    } else {
        if file_size as u64 > limit {
            return Err(DecodeError::TooLarge { limit });
        }
        bytes
    };

    let mut text = String::from_utf8(plain)?;
    if text.starts_with('\u{feff}') {
        text.replace_range(..'\u{feff}'.len_utf8(), "");
    }

    Ok(DecodedPayload {
        text,
        file_size,
        compressed,
    })
}
