//! Attachment validation, the only path by which photo bytes enter a report.

use crate::RawFile;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted attachment, in bytes (10 MiB).
pub const MAX_ATTACHMENT_SIZE: u64 = 10 * 1024 * 1024;

/// MIME types accepted for report attachments.
pub const ALLOWED_MIME_TYPES: [&str; 3] = ["image/jpeg", "image/png", "image/webp"];

/// A validated binary object (photo) embedded in a report.
///
/// `size_bytes` always equals `bytes.len()`; [`validate`] recomputes it from
/// the buffer and never copies the caller's declared size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source_name: String,
    pub captured_at: i64,
}

/// Why a raw file was refused by the codec.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RejectionReason {
    /// The declared MIME type is not in [`ALLOWED_MIME_TYPES`].
    #[error("Unsupported attachment type: {mime_type}")]
    UnsupportedType { mime_type: String },

    /// The buffer exceeds [`MAX_ATTACHMENT_SIZE`].
    #[error("Attachment too large: {size_bytes} bytes")]
    TooLarge { size_bytes: u64 },
}

/// One refused item from a validation batch, labelled with its source name
/// so the front-end can tell the user which file was skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rejection {
    pub source_name: String,
    pub reason: RejectionReason,
}

/// Outcome of [`validate_batch`]: the valid subset plus per-item rejections.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    pub accepted: Vec<Attachment>,
    pub rejected: Vec<Rejection>,
}

/// Validates a raw file into an [`Attachment`].
///
/// The declared MIME type is checked against the allow-list and the actual
/// buffer length against [`MAX_ATTACHMENT_SIZE`]. On success the returned
/// attachment's `size_bytes` is recomputed from the buffer; the declared
/// `size_bytes` on the [`RawFile`] is ignored, so a caller lying about the
/// size cannot smuggle a mismatched record into the store.
///
/// Validation is deterministic: the same buffer and declared type always
/// produce the same verdict.
///
/// # Errors
///
/// Returns a [`Rejection`] carrying [`RejectionReason::UnsupportedType`] or
/// [`RejectionReason::TooLarge`]. Rejections are per-item verdicts, not
/// store errors; the caller decides whether to proceed without the file.
pub fn validate(file: RawFile, captured_at: i64) -> Result<Attachment, Rejection> {
    if !ALLOWED_MIME_TYPES.contains(&file.mime_type.as_str()) {
        return Err(Rejection {
            source_name: file.source_name,
            reason: RejectionReason::UnsupportedType {
                mime_type: file.mime_type,
            },
        });
    }

    let actual_size = file.bytes.len() as u64;
    if actual_size > MAX_ATTACHMENT_SIZE {
        return Err(Rejection {
            source_name: file.source_name,
            reason: RejectionReason::TooLarge {
                size_bytes: actual_size,
            },
        });
    }

    Ok(Attachment {
        bytes: file.bytes,
        mime_type: file.mime_type,
        size_bytes: actual_size,
        source_name: file.source_name,
        captured_at,
    })
}

/// Validates each file independently; one bad file never aborts the batch.
///
/// Accepted attachments keep their input order. Rejected items are reported
/// alongside so the caller can proceed with the valid subset or abandon the
/// whole draft.
pub fn validate_batch(files: Vec<RawFile>, captured_at: i64) -> BatchOutcome {
    let mut outcome = BatchOutcome::default();
    for file in files {
        match validate(file, captured_at) {
            Ok(attachment) => outcome.accepted.push(attachment),
            Err(rejection) => outcome.rejected.push(rejection),
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jpeg(len: usize) -> RawFile {
        RawFile {
            bytes: vec![0xAB; len],
            mime_type: "image/jpeg".to_string(),
            size_bytes: len as u64,
            source_name: "IMG_0001.jpg".to_string(),
        }
    }

    #[test]
    fn test_valid_jpeg_is_accepted() {
        let attachment = validate(jpeg(2048), 1_700_000_000).unwrap();
        assert_eq!(attachment.mime_type, "image/jpeg");
        assert_eq!(attachment.size_bytes, 2048);
        assert_eq!(attachment.bytes.len(), 2048);
        assert_eq!(attachment.captured_at, 1_700_000_000);
    }

    #[test]
    fn test_size_is_recomputed_from_buffer() {
        // Declared size lies; the codec must trust only the buffer.
        let mut file = jpeg(100);
        file.size_bytes = 999_999;
        let attachment = validate(file, 0).unwrap();
        assert_eq!(attachment.size_bytes, 100);
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        let mut file = jpeg(10);
        file.mime_type = "application/pdf".to_string();
        let rejection = validate(file, 0).unwrap_err();
        assert_eq!(rejection.source_name, "IMG_0001.jpg");
        assert_eq!(
            rejection.reason,
            RejectionReason::UnsupportedType {
                mime_type: "application/pdf".to_string()
            }
        );
    }

    #[test]
    fn test_oversized_png_is_rejected() {
        let mut file = jpeg(11 * 1024 * 1024);
        file.mime_type = "image/png".to_string();
        let rejection = validate(file, 0).unwrap_err();
        assert_eq!(
            rejection.reason,
            RejectionReason::TooLarge {
                size_bytes: 11 * 1024 * 1024
            }
        );
    }

    #[test]
    fn test_exactly_max_size_is_accepted() {
        let attachment = validate(jpeg(MAX_ATTACHMENT_SIZE as usize), 0).unwrap();
        assert_eq!(attachment.size_bytes, MAX_ATTACHMENT_SIZE);
    }

    #[test]
    fn test_validation_is_deterministic() {
        let first = validate(jpeg(64), 5);
        let second = validate(jpeg(64), 5);
        assert_eq!(first, second);
    }

    #[test]
    fn test_batch_keeps_valid_subset() {
        let mut bad = jpeg(10);
        bad.mime_type = "video/mp4".to_string();
        bad.source_name = "clip.mp4".to_string();

        let outcome = validate_batch(vec![jpeg(10), bad, jpeg(20)], 0);
        assert_eq!(outcome.accepted.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].source_name, "clip.mp4");
        // Input order is preserved for the accepted subset.
        assert_eq!(outcome.accepted[0].size_bytes, 10);
        assert_eq!(outcome.accepted[1].size_bytes, 20);
    }

    #[test]
    fn test_rejection_serializes_with_type_tag() {
        let rejection = Rejection {
            source_name: "big.png".to_string(),
            reason: RejectionReason::TooLarge {
                size_bytes: 11_000_000,
            },
        };
        let json = serde_json::to_string(&rejection).unwrap();
        assert!(json.contains(r#""type":"TooLarge""#));
        assert!(json.contains("\"sourceName\""));
    }
}
