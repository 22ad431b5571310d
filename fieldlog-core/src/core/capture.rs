//! Boundary types for the location and file capture collaborators.
//!
//! The capture devices themselves (GPS hardware, camera roll, file pickers)
//! live outside this crate. The core only defines what a reading looks like
//! and how a capture attempt can fail, so the embedding application can hand
//! results across the boundary in a typed form.

use crate::Location;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// A failed attempt to capture a location reading or read a raw file.
///
/// Serialized with a `type` tag so the front-end can match on the failure
/// kind directly.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CaptureError {
    /// The user denied the capture permission prompt.
    #[error("Capture permission denied")]
    PermissionDenied,

    /// The capture device is absent or cannot be queried on this host.
    #[error("Capture device unavailable")]
    Unavailable,

    /// The caller-supplied timeout elapsed before a reading arrived.
    #[error("Capture timed out")]
    TimedOut,

    /// The raw file could not be read.
    #[error("Read failed: {message}")]
    ReadFailed { message: String },
}

/// A raw byte buffer handed over by the file-acquisition collaborator.
///
/// `size_bytes` is whatever the collaborator declared; the attachment codec
/// recomputes the real size from `bytes` and never trusts this value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFile {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub size_bytes: u64,
    pub source_name: String,
}

/// Source of location readings (GPS or equivalent).
///
/// `current_location` must return within `timeout`; an elapsed timeout is
/// reported as [`CaptureError::TimedOut`], not swallowed. This is one of the
/// two cancellable operations in the system (the other is the quota probe);
/// durable writes never take a timeout.
pub trait LocationSource {
    fn current_location(&self, timeout: Duration) -> Result<Location, CaptureError>;
}

/// Source of raw file buffers (camera roll, file picker).
pub trait FileSource {
    fn read(&self) -> Result<RawFile, CaptureError>;
}
