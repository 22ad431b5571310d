//! High-level report store over a Fieldlog SQLite database.

use crate::core::attachment::{ALLOWED_MIME_TYPES, MAX_ATTACHMENT_SIZE};
use crate::{Attachment, FieldlogError, Location, Report, ReportDraft, Result, Storage};
use rusqlite::{Connection, Transaction};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The outcome of a delete operation performed on a [`ReportStore`].
///
/// Reports how much storage the deletion gave back, so the caller can
/// refresh its quota display without a separate probe.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteReceipt {
    /// Number of attachments removed along with the report.
    pub attachments_removed: usize,

    /// Total attachment bytes freed by the deletion.
    pub bytes_reclaimed: u64,
}

/// An open report store backed by a SQLite database.
///
/// `ReportStore` is the single source of truth for persisted reports and the
/// only interface for mutations. Mutating methods take `&mut self`, so `put`
/// and `delete` can never interleave within a process; the embedding
/// application wraps the store in a `Mutex` when it needs to share one
/// handle across threads. Reads take `&self` and always observe fully
/// committed reports, because a report row and its attachment rows land in
/// the same transaction.
///
/// Durable writes run to completion or fail explicitly; they accept no
/// timeout and are never silently retried.
pub struct ReportStore {
    storage: Storage,
}

impl ReportStore {
    /// Creates a new store database at `path` and initialises the schema.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::StoreUnavailable`] if the file cannot be
    /// created, or [`FieldlogError::Database`] for any other SQLite failure.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::create(path)?,
        })
    }

    /// Opens an existing store at `path`, migrating the schema if needed.
    ///
    /// Migration runs synchronously before this returns; see
    /// [`Storage::open`].
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::StoreUnavailable`] if the file cannot be
    /// opened or is not a Fieldlog store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self {
            storage: Storage::open(path)?,
        })
    }

    /// Returns the underlying SQLite connection.
    pub fn connection(&self) -> &Connection {
        self.storage.connection()
    }

    /// Writes a draft as a new report in one atomic unit.
    ///
    /// The store assigns the next monotonic id and the `created_at`
    /// timestamp, then inserts the report row and every attachment row in a
    /// single transaction: either the whole report becomes durably visible
    /// or none of it does. Attachment invariants are re-checked inside the
    /// transaction as a backstop against callers that bypass the codec; a
    /// failed check rolls the whole write back.
    ///
    /// Returns the stored [`Report`] carrying the assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::ValidationFailed`] if an attachment violates
    /// the codec invariants, [`FieldlogError::DuplicateId`] if the assigned
    /// id collides with an existing row (indicates a corrupted id counter),
    /// or [`FieldlogError::WriteFailed`] for any medium-level failure. On
    /// any error the on-disk state is unchanged.
    pub fn put(&mut self, draft: ReportDraft) -> Result<Report> {
        let created_at = chrono::Utc::now().timestamp();

        let tx = self
            .storage
            .connection_mut()
            .transaction()
            .map_err(FieldlogError::WriteFailed)?;

        let id = next_report_id(&tx)?;
        let (latitude, longitude, accuracy_meters) = match draft.location {
            Some(loc) => (Some(loc.latitude), Some(loc.longitude), Some(loc.accuracy_meters)),
            None => (None, None, None),
        };

        tx.execute(
            "INSERT INTO reports (id, category, status, description, latitude, longitude, accuracy_meters, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            rusqlite::params![
                id,
                draft.category,
                draft.status,
                draft.description,
                latitude,
                longitude,
                accuracy_meters,
                created_at,
            ],
        )
        .map_err(|e| map_report_insert_error(id, e))?;

        for (position, attachment) in draft.attachments.iter().enumerate() {
            // Backstop check runs per attachment inside the transaction, so
            // a bad item aborts and rolls back everything staged so far.
            ensure_attachment_valid(attachment)?;
            tx.execute(
                "INSERT INTO attachments (report_id, position, bytes, mime_type, size_bytes, source_name, captured_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                rusqlite::params![
                    id,
                    position as i64,
                    attachment.bytes,
                    attachment.mime_type,
                    attachment.size_bytes as i64,
                    attachment.source_name,
                    attachment.captured_at,
                ],
            )
            .map_err(FieldlogError::WriteFailed)?;
        }

        tx.commit().map_err(FieldlogError::WriteFailed)?;

        Ok(Report {
            id,
            category: draft.category,
            status: draft.status,
            description: draft.description,
            location: draft.location,
            attachments: draft.attachments,
            created_at,
        })
    }

    /// Fetches a single report by id, attachments included.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::ReportNotFound`] if no report with `id`
    /// exists, or [`FieldlogError::Database`] for any SQLite failure.
    pub fn get(&self, id: i64) -> Result<Report> {
        let row = self
            .connection()
            .query_row(
                "SELECT id, category, status, description, latitude, longitude, accuracy_meters, created_at
                 FROM reports WHERE id = ?1",
                rusqlite::params![id],
                map_report_row,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => FieldlogError::ReportNotFound(id),
                other => FieldlogError::Database(other),
            })?;

        let attachments = self.attachments_for(id)?;
        Ok(report_from_row(row, attachments))
    }

    /// Returns every report, newest first.
    ///
    /// Ordering is `created_at` descending with ties broken by `id`
    /// descending, served by the persistent ordering index rather than a
    /// sort pass. An empty store yields an empty vector, not an error.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::Database`] for any SQLite failure.
    pub fn get_all(&self) -> Result<Vec<Report>> {
        let rows: Vec<ReportRow> = {
            let mut stmt = self.connection().prepare(
                "SELECT id, category, status, description, latitude, longitude, accuracy_meters, created_at
                 FROM reports ORDER BY created_at DESC, id DESC",
            )?;
            let rows = stmt
                .query_map([], map_report_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            rows
        };

        let mut reports = Vec::with_capacity(rows.len());
        for row in rows {
            let attachments = self.attachments_for(row.0)?;
            reports.push(report_from_row(row, attachments));
        }
        Ok(reports)
    }

    /// Atomically removes a report and all of its attachments.
    ///
    /// The report row and its attachment rows are deleted in one
    /// transaction. Ids are never reused after deletion; the id counter
    /// only moves forward.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::ReportNotFound`] if no report with `id`
    /// exists (recoverable: the caller reports it and moves on), or
    /// [`FieldlogError::WriteFailed`] for any medium-level failure.
    pub fn delete(&mut self, id: i64) -> Result<DeleteReceipt> {
        let tx = self
            .storage
            .connection_mut()
            .transaction()
            .map_err(FieldlogError::WriteFailed)?;

        let (attachments_removed, bytes_reclaimed): (i64, i64) = tx
            .query_row(
                "SELECT COUNT(*), COALESCE(SUM(size_bytes), 0)
                 FROM attachments WHERE report_id = ?1",
                rusqlite::params![id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .map_err(FieldlogError::WriteFailed)?;

        tx.execute(
            "DELETE FROM attachments WHERE report_id = ?1",
            rusqlite::params![id],
        )
        .map_err(FieldlogError::WriteFailed)?;
        tx.execute("DELETE FROM reports WHERE id = ?1", rusqlite::params![id])
            .map_err(FieldlogError::WriteFailed)?;

        // SQLite DELETE silently affects zero rows when the id does not
        // exist. Surface this as ReportNotFound; dropping the uncommitted
        // transaction rolls back.
        if tx.changes() == 0 {
            return Err(FieldlogError::ReportNotFound(id));
        }

        tx.commit().map_err(FieldlogError::WriteFailed)?;

        Ok(DeleteReceipt {
            attachments_removed: attachments_removed as usize,
            bytes_reclaimed: bytes_reclaimed as u64,
        })
    }

    /// Returns the number of stored reports.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::Database`] for any SQLite failure.
    pub fn count(&self) -> Result<usize> {
        let count: i64 =
            self.connection()
                .query_row("SELECT COUNT(*) FROM reports", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Returns the total attachment bytes currently stored.
    ///
    /// This is the store-side usage figure the quota layer reports against;
    /// it excludes SQLite's own page overhead.
    ///
    /// # Errors
    ///
    /// Returns [`FieldlogError::Database`] for any SQLite failure.
    pub fn used_bytes(&self) -> Result<u64> {
        let total: i64 = self.connection().query_row(
            "SELECT COALESCE(SUM(size_bytes), 0) FROM attachments",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn attachments_for(&self, report_id: i64) -> Result<Vec<Attachment>> {
        let mut stmt = self.connection().prepare(
            "SELECT bytes, mime_type, size_bytes, source_name, captured_at
             FROM attachments WHERE report_id = ?1 ORDER BY position ASC",
        )?;
        let attachments = stmt
            .query_map(rusqlite::params![report_id], |row| {
                Ok(Attachment {
                    bytes: row.get(0)?,
                    mime_type: row.get(1)?,
                    size_bytes: row.get::<_, i64>(2)? as u64,
                    source_name: row.get(3)?,
                    captured_at: row.get(4)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(attachments)
    }
}

/// Assigns the next report id from the persisted counter, inside `tx`.
///
/// The counter lives in `store_meta` and only ever moves forward, so ids
/// stay unique across deletions, process restarts, and clock adjustments.
fn next_report_id(tx: &Transaction) -> Result<i64> {
    let last: String = tx
        .query_row(
            "SELECT value FROM store_meta WHERE key = 'last_report_id'",
            [],
            |row| row.get(0),
        )
        .map_err(FieldlogError::WriteFailed)?;
    let last: i64 = last.parse().map_err(|_| {
        FieldlogError::StoreUnavailable(format!("Corrupt report id counter: {last}"))
    })?;

    let id = last + 1;
    tx.execute(
        "UPDATE store_meta SET value = ?1 WHERE key = 'last_report_id'",
        rusqlite::params![id.to_string()],
    )
    .map_err(FieldlogError::WriteFailed)?;
    Ok(id)
}

/// Backstop for the codec invariants, run inside the `put` transaction.
fn ensure_attachment_valid(attachment: &Attachment) -> Result<()> {
    if !ALLOWED_MIME_TYPES.contains(&attachment.mime_type.as_str()) {
        return Err(FieldlogError::ValidationFailed(format!(
            "Unsupported attachment type: {}",
            attachment.mime_type
        )));
    }
    if attachment.size_bytes != attachment.bytes.len() as u64 {
        return Err(FieldlogError::ValidationFailed(format!(
            "Attachment size mismatch: declared {} bytes, buffer holds {}",
            attachment.size_bytes,
            attachment.bytes.len()
        )));
    }
    if attachment.size_bytes > MAX_ATTACHMENT_SIZE {
        return Err(FieldlogError::ValidationFailed(format!(
            "Attachment too large: {} bytes",
            attachment.size_bytes
        )));
    }
    Ok(())
}

fn map_report_insert_error(id: i64, e: rusqlite::Error) -> FieldlogError {
    match e {
        rusqlite::Error::SqliteFailure(err, _)
            if err.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            FieldlogError::DuplicateId(id)
        }
        other => FieldlogError::WriteFailed(other),
    }
}

/// Raw 8-column tuple extracted from a `reports` SQLite row.
type ReportRow = (
    i64,
    String,
    String,
    String,
    Option<f64>,
    Option<f64>,
    Option<f64>,
    i64,
);

fn map_report_row(row: &rusqlite::Row) -> rusqlite::Result<ReportRow> {
    Ok((
        row.get::<_, i64>(0)?,
        row.get::<_, String>(1)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get::<_, Option<f64>>(4)?,
        row.get::<_, Option<f64>>(5)?,
        row.get::<_, Option<f64>>(6)?,
        row.get::<_, i64>(7)?,
    ))
}

/// Converts a raw tuple plus its attachments into a [`Report`].
fn report_from_row(
    (id, category, status, description, latitude, longitude, accuracy_meters, created_at): ReportRow,
    attachments: Vec<Attachment>,
) -> Report {
    let location = match (latitude, longitude, accuracy_meters) {
        (Some(latitude), Some(longitude), Some(accuracy_meters)) => Some(Location {
            latitude,
            longitude,
            accuracy_meters,
        }),
        _ => None,
    };
    Report {
        id,
        category,
        status,
        description,
        location,
        attachments,
        created_at,
    }
}
