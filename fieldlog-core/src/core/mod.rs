//! Internal domain modules for the Fieldlog core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod attachment;
pub mod capture;
pub mod error;
pub mod export;
pub mod quota;
pub mod report;
pub mod storage;
pub mod store;

#[doc(inline)]
pub use attachment::{
    validate, validate_batch, Attachment, BatchOutcome, Rejection, RejectionReason,
    ALLOWED_MIME_TYPES, MAX_ATTACHMENT_SIZE,
};
#[doc(inline)]
pub use capture::{CaptureError, FileSource, LocationSource, RawFile};
#[doc(inline)]
pub use error::{FieldlogError, Result};
#[doc(inline)]
pub use export::{
    format_report, materialize_attachments, ExportAttachment, SharePayload, ShareTransport,
    TransportError,
};
#[doc(inline)]
pub use quota::{
    CapacityEstimate, CapacityProbe, CapacityUsage, FileCapacityProbe, PersistenceGrant,
    QuotaMonitor,
};
#[doc(inline)]
pub use report::{Location, Report, ReportDraft};
#[doc(inline)]
pub use storage::{Storage, SCHEMA_VERSION};
#[doc(inline)]
pub use store::{DeleteReceipt, ReportStore};
