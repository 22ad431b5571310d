//! Report formatting and attachment materialization for outbound sharing.
//!
//! Everything here is a pure projection of a stored [`Report`]: formatting
//! and materialization never touch the store. Transport selection (rich
//! share, text-only retry, clipboard fallback) belongs to the embedding
//! application; the core only produces the payloads and defines the
//! transport boundary.

use crate::{Attachment, Report};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Renders a report into a fixed-section, transport-agnostic text block.
///
/// Sections, in order: header with the report id, category and status lines,
/// description body, location line (coordinates to 6 decimal places,
/// accuracy rounded to the nearest meter, or an explicit "not recorded"),
/// attachment summary, and the creation timestamp in a locale-stable UTC
/// format.
///
/// Free-text fields are sanitized before embedding: ASCII control characters
/// are stripped (newlines survive only inside the description body) and the
/// markup-significant characters `&`, `<`, `>` are entity-escaped, since the
/// receiving context may interpret markup.
///
/// Pure function: the same report always formats to the same string.
#[must_use]
pub fn format_report(report: &Report) -> String {
    let mut out = String::new();

    out.push_str(&format!("Field Report #{}\n", report.id));
    out.push_str(&format!("Category: {}\n", sanitize_line(&report.category)));
    out.push_str(&format!("Status: {}\n", sanitize_line(&report.status)));
    out.push('\n');

    if report.description.is_empty() {
        out.push_str("(no description)\n");
    } else {
        out.push_str(&sanitize_block(&report.description));
        out.push('\n');
    }
    out.push('\n');

    match report.location {
        Some(location) => out.push_str(&format!(
            "Location: {:.6}, {:.6} (accuracy {} m)\n",
            location.latitude,
            location.longitude,
            location.accuracy_meters.round() as i64,
        )),
        None => out.push_str("Location: not recorded\n"),
    }

    let total_bytes: u64 = report.attachments.iter().map(|a| a.size_bytes).sum();
    if report.attachments.is_empty() {
        out.push_str("Attachments: none\n");
    } else {
        out.push_str(&format!(
            "Attachments: {} ({})\n",
            report.attachments.len(),
            format_bytes(total_bytes),
        ));
    }

    let recorded = chrono::DateTime::from_timestamp(report.created_at, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| format!("epoch second {}", report.created_at));
    out.push_str(&format!("Recorded: {recorded}\n"));

    out
}

/// A transportable byte object reconstructed from a stored attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportAttachment {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub mime_type: String,
}

/// Reconstructs transportable byte objects for every attachment on `report`.
///
/// Filenames are slugified from each attachment's source name with a
/// positional suffix, so two photos named "Site photo.jpg" do not collide.
/// Pure projection; the store is never mutated.
#[must_use]
pub fn materialize_attachments(report: &Report) -> Vec<ExportAttachment> {
    report
        .attachments
        .iter()
        .enumerate()
        .map(|(index, attachment)| ExportAttachment {
            bytes: attachment.bytes.clone(),
            filename: attachment_filename(attachment, index),
            mime_type: attachment.mime_type.clone(),
        })
        .collect()
}

/// What the external transport receives: a title, the formatted text block,
/// and optionally the materialized attachments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharePayload {
    pub title: String,
    pub text: String,
    pub attachments: Vec<ExportAttachment>,
}

impl SharePayload {
    /// Builds the full rich payload for a report: formatted text plus
    /// materialized attachments.
    #[must_use]
    pub fn for_report(report: &Report) -> Self {
        Self {
            title: format!("Field Report #{}: {}", report.id, sanitize_line(&report.category)),
            text: format_report(report),
            attachments: materialize_attachments(report),
        }
    }

    /// The same payload with attachments dropped, for transports that
    /// reject file payloads.
    #[must_use]
    pub fn text_only(&self) -> Self {
        Self {
            title: self.title.clone(),
            text: self.text.clone(),
            attachments: vec![],
        }
    }
}

/// Why the external transport refused a payload.
#[derive(Debug, Clone, PartialEq, Error, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TransportError {
    /// The user dismissed the share flow. Not a failure; nothing to retry.
    #[error("Share cancelled by the user")]
    Cancelled,

    /// The transport cannot carry this payload. Callers retry text-only.
    #[error("Transport does not support this payload")]
    Unsupported,
}

/// Outbound sharing boundary. Implemented by the embedding application over
/// whatever share mechanism the host offers.
pub trait ShareTransport {
    fn share(&self, payload: &SharePayload) -> Result<(), TransportError>;
}

/// Converts an attachment source name into a safe filename stem.
fn slugify_source_name(name: &str) -> String {
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    let slug: String = stem
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect();
    let slug: String = slug
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-");
    if slug.is_empty() { "photo".to_string() } else { slug }
}

fn attachment_filename(attachment: &Attachment, index: usize) -> String {
    format!(
        "{}-{}.{}",
        slugify_source_name(&attachment.source_name),
        index + 1,
        extension_for(&attachment.mime_type),
    )
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/webp" => "webp",
        _ => "bin",
    }
}

/// Renders a byte count in binary units with one decimal place.
fn format_bytes(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * 1024;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Sanitizes a single-line field: control characters dropped, `&`, `<`, `>`
/// entity-escaped.
fn sanitize_line(input: &str) -> String {
    sanitize(input, false)
}

/// Sanitizes the description body; newlines are preserved.
fn sanitize_block(input: &str) -> String {
    sanitize(input, true)
}

fn sanitize(input: &str, preserve_newlines: bool) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\n' if preserve_newlines => out.push('\n'),
            c if c.is_control() => {}
            c => out.push(c),
        }
    }
    out
}
