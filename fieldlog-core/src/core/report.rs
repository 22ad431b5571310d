//! Report data model: the persisted field-observation entry.

use crate::Attachment;
use serde::{Deserialize, Serialize};

/// A coordinate reading attached to a report at capture time.
///
/// Presence is modelled explicitly as `Option<Location>` on [`Report`];
/// there is no partially-filled location.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub latitude: f64,
    pub longitude: f64,
    pub accuracy_meters: f64,
}

/// One persisted field-observation entry with its attachments.
///
/// Reports are immutable once written: there is no update API, and edits are
/// modelled as delete plus re-create by the caller. The `id` is assigned
/// exactly once by the store and never reused after deletion. Listing order
/// is `created_at` descending, ties broken by `id` descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub id: i64,
    pub category: String,
    pub status: String,
    pub description: String,
    pub location: Option<Location>,
    pub attachments: Vec<Attachment>,
    pub created_at: i64,
}

/// Caller-assembled input to [`ReportStore::put`](crate::ReportStore::put).
///
/// Carries everything except the `id` and `created_at`, which the store
/// assigns at write time. Attachments must come out of the codec
/// ([`validate`](crate::validate) / [`validate_batch`](crate::validate_batch));
/// the store re-checks their invariants before committing.
#[derive(Debug, Clone, Default)]
pub struct ReportDraft {
    pub category: String,
    pub status: String,
    pub description: String,
    pub location: Option<Location>,
    pub attachments: Vec<Attachment>,
}
