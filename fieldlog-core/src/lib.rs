//! Core library for Fieldlog, a local-first store for field observation
//! reports with embedded photo attachments.
//!
//! The primary entry point is [`ReportStore`], which represents an open
//! `.fieldlog` database file. All report mutations go through `ReportStore`
//! methods; attachments enter via the codec ([`validate`] /
//! [`validate_batch`]), quota feedback comes from [`QuotaMonitor`], and
//! outbound sharing payloads are produced by [`format_report`],
//! [`materialize_attachments`], and [`SharePayload`].
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    attachment::{
        validate, validate_batch, Attachment, BatchOutcome, Rejection, RejectionReason,
        ALLOWED_MIME_TYPES, MAX_ATTACHMENT_SIZE,
    },
    capture::{CaptureError, FileSource, LocationSource, RawFile},
    error::{FieldlogError, Result},
    export::{
        format_report, materialize_attachments, ExportAttachment, SharePayload, ShareTransport,
        TransportError,
    },
    quota::{
        CapacityEstimate, CapacityProbe, CapacityUsage, FileCapacityProbe, PersistenceGrant,
        QuotaMonitor,
    },
    report::{Location, Report, ReportDraft},
    storage::{Storage, SCHEMA_VERSION},
    store::{DeleteReceipt, ReportStore},
};
