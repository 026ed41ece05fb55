// ==============================================================================
// validator.rs - Upload Validation
// ==============================================================================
// Description: Size limit, filename sanitization and digest for decoded uploads
// Author: Matt Barham
// Created: 2026-09-18
// Modified: 2026-10-16
// Version: 1.2.0
// Security: Uploaded names are never trusted; only the sanitized name is logged
// ==============================================================================

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::debug;

/// Default maximum upload size (500 MB)
pub const MAX_UPLOAD_SIZE: usize = 500 * 1024 * 1024;

/// Name used when nothing survives sanitization
const FALLBACK_NAME: &str = "upload";
const MAX_FILENAME_LEN: usize = 255;
const MAX_EXTENSION_LEN: usize = 16;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("File too large: {size} bytes (max: {max} bytes)")]
    TooLarge { size: usize, max: usize },
}

#[derive(Debug, Clone)]
pub struct ValidatedUpload {
    pub original_name: String,
    pub safe_name: String,
    pub size: usize,
    pub hash_sha256: String,
    pub validated_at: chrono::DateTime<chrono::Utc>,
}

pub struct UploadValidator {
    max_upload_size: usize,
}

impl UploadValidator {
    pub fn new() -> Self {
        Self::with_max_size(MAX_UPLOAD_SIZE)
    }

    pub fn with_max_size(max_upload_size: usize) -> Self {
        Self { max_upload_size }
    }

    /// Validate a decoded upload
    ///
    /// Only the size limit is fatal. The filename is a detection hint, so an
    /// unusable name is replaced rather than rejected.
    pub fn validate(&self, filename: &str, payload: &[u8]) -> Result<ValidatedUpload, UploadError> {
        // 1. Size check
        if payload.len() > self.max_upload_size {
            return Err(UploadError::TooLarge {
                size: payload.len(),
                max: self.max_upload_size,
            });
        }
        debug!("Size check passed: {} bytes", payload.len());

        // 2. Filename sanitization
        let safe_name = sanitize_filename(filename);
        debug!("Sanitized filename: {}", safe_name);

        // 3. Digest
        let hash_sha256 = compute_sha256(payload);
        debug!("SHA-256: {}", hash_sha256);

        Ok(ValidatedUpload {
            original_name: filename.to_string(),
            safe_name,
            size: payload.len(),
            hash_sha256,
            validated_at: chrono::Utc::now(),
        })
    }
}

impl Default for UploadValidator {
    fn default() -> Self {
        Self::new()
    }
}

/// Strip path separators, control characters and anything outside
/// `[A-Za-z0-9_.-]`, then cap the length at 255 characters
///
/// The cap shortens the stem, so the extension (and a trailing `.gz`) still
/// reaches format detection.
pub fn sanitize_filename(name: &str) -> String {
    let safe: String = name
        .replace(['/', '\\', '\0'], "_")
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_' || *c == '.' || *c == '-')
        .collect();

    if safe.trim_matches('.').is_empty() {
        return FALLBACK_NAME.to_string();
    }
    if safe.len() <= MAX_FILENAME_LEN {
        return safe;
    }

    // ASCII only at this point, so byte slicing is safe
    let extension = extension_suffix(&safe);
    let stem_len = MAX_FILENAME_LEN - extension.len();
    format!("{}{}", &safe[..stem_len], extension)
}

/// Trailing extension including the dot, e.g. ".csv" or ".vcf.gz"
fn extension_suffix(name: &str) -> &str {
    let Some(dot) = name.rfind('.') else {
        return "";
    };

    let mut start = dot;
    if name[dot..].eq_ignore_ascii_case(".gz") {
        if let Some(inner) = name[..dot].rfind('.') {
            start = inner;
        }
    }

    let suffix = &name[start..];
    if suffix.len() > MAX_EXTENSION_LEN {
        ""
    } else {
        suffix
    }
}

fn compute_sha256(payload: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(payload);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::{dialect_from_filename, Dialect};

    #[test]
    fn test_sanitize_filename() {
        assert_eq!(sanitize_filename("genome_file.txt"), "genome_file.txt");
        assert_eq!(sanitize_filename("../../../etc/passwd"), ".._.._.._etc_passwd");
        // \n is filtered out, not replaced
        assert_eq!(sanitize_filename("file\0with\nnull.txt"), "file_withnull.txt");
        assert_eq!(sanitize_filename("my genome (v2).csv"), "mygenomev2.csv");
    }

    #[test]
    fn test_unusable_names_fall_back() {
        assert_eq!(sanitize_filename(""), FALLBACK_NAME);
        assert_eq!(sanitize_filename("***"), FALLBACK_NAME);
        assert_eq!(sanitize_filename(".."), FALLBACK_NAME);
    }

    #[test]
    fn test_sanitized_name_is_capped() {
        let long = "a".repeat(400) + ".txt";
        let safe = sanitize_filename(&long);
        assert_eq!(safe.len(), 255);
        assert!(safe.ends_with(".txt"));
        assert_eq!(dialect_from_filename(&safe), Some(Dialect::TabDelimited));

        let compressed = sanitize_filename(&("b".repeat(300) + ".vcf.gz"));
        assert_eq!(compressed.len(), 255);
        assert_eq!(dialect_from_filename(&compressed), Some(Dialect::VariantCallRecord));

        // No plausible extension: plain truncation
        let no_ext = sanitize_filename(&("c".repeat(250) + "." + &"d".repeat(50)));
        assert_eq!(no_ext.len(), 255);
    }

    #[test]
    fn test_size_limit() {
        let validator = UploadValidator::with_max_size(8);
        let err = validator.validate("genome.txt", b"rs1\t1\t1\tAA").unwrap_err();
        assert_eq!(err, UploadError::TooLarge { size: 10, max: 8 });
    }

    #[test]
    fn test_digest_of_known_payload() {
        let validated = UploadValidator::new().validate("genome.txt", b"abc").unwrap();
        assert_eq!(
            validated.hash_sha256,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(validated.size, 3);
        assert_eq!(validated.safe_name, "genome.txt");
    }
}
