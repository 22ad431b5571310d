//! Storage capacity introspection and persistence requests.
//!
//! Capacity reporting is a host capability the core cannot assume: some
//! environments expose nothing. The [`CapacityProbe`] trait is the boundary;
//! an unsupported host yields [`CapacityEstimate::Unavailable`], which
//! callers must treat as "unknown", never as zero usage.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// A measured usage report from the capacity probe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CapacityUsage {
    pub used_bytes: u64,
    pub quota_bytes: u64,
}

impl CapacityUsage {
    /// Fraction of the quota consumed, clamped to `[0, 1]`.
    ///
    /// Host reports can be momentarily inconsistent (used above quota during
    /// a write burst); the clamp keeps UI meters sane. A zero quota reads as
    /// full unless nothing is stored at all.
    #[must_use]
    pub fn utilization_ratio(&self) -> f64 {
        if self.quota_bytes == 0 {
            return if self.used_bytes == 0 { 0.0 } else { 1.0 };
        }
        (self.used_bytes as f64 / self.quota_bytes as f64).clamp(0.0, 1.0)
    }
}

/// Outcome of a capacity query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum CapacityEstimate {
    /// The host reported usage against a known ceiling.
    Measured(CapacityUsage),

    /// The host exposes no capacity introspection. Unknown, not zero.
    Unavailable,
}

/// Whether the host agreed to shield this store from storage-pressure
/// eviction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum PersistenceGrant {
    Granted,
    Denied,
}

/// Capacity introspection boundary.
///
/// Both operations may be unsupported by a host; unsupported answers are
/// [`CapacityEstimate::Unavailable`] and [`PersistenceGrant::Denied`], never
/// errors. `estimate` is one of the two operations in the system that honor
/// a caller-supplied timeout (the other is location capture); implementations
/// whose answer comes from fast local state may ignore it.
pub trait CapacityProbe {
    fn estimate(&self, timeout: Duration) -> CapacityEstimate;
    fn request_persistence(&self) -> PersistenceGrant;
}

/// Polls a [`CapacityProbe`] and reports usage for UI feedback.
///
/// The monitor never fails hard: an unsupported probe answer passes through
/// as `Unavailable`, and a persistence denial is logged and absorbed. The
/// store keeps operating under standard evictable retention either way.
pub struct QuotaMonitor {
    probe: Box<dyn CapacityProbe>,
}

impl QuotaMonitor {
    pub fn new(probe: Box<dyn CapacityProbe>) -> Self {
        Self { probe }
    }

    /// Returns the current usage estimate, or `Unavailable` when the host
    /// cannot answer within `timeout`.
    pub fn estimate(&self, timeout: Duration) -> CapacityEstimate {
        self.probe.estimate(timeout)
    }

    /// Asks the host to avoid evicting this store under storage pressure.
    ///
    /// Denial is logged at warn level and returned; it is not an error and
    /// must not stop the caller from writing.
    pub fn request_persistence(&self) -> PersistenceGrant {
        let grant = self.probe.request_persistence();
        if grant == PersistenceGrant::Denied {
            log::warn!("persistence request denied; store remains evictable under storage pressure");
        }
        grant
    }
}

/// Built-in probe measuring the store's on-disk footprint.
///
/// Usage is the size of the database file plus SQLite side files (WAL,
/// rollback journal, shared memory) when present. The quota ceiling is
/// caller-configured; without one the probe reports `Unavailable`, because
/// a footprint with no ceiling is not a utilization figure.
pub struct FileCapacityProbe {
    db_path: PathBuf,
    quota_bytes: Option<u64>,
}

impl FileCapacityProbe {
    pub fn new<P: AsRef<Path>>(db_path: P, quota_bytes: Option<u64>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
            quota_bytes,
        }
    }

    fn on_disk_bytes(&self) -> u64 {
        let mut total = 0;
        for suffix in ["", "-wal", "-journal", "-shm"] {
            let mut path = self.db_path.as_os_str().to_os_string();
            path.push(suffix);
            if let Ok(metadata) = std::fs::metadata(&path) {
                total += metadata.len();
            }
        }
        total
    }
}

impl CapacityProbe for FileCapacityProbe {
    /// Local metadata reads do not block meaningfully, so the timeout is
    /// not consulted.
    fn estimate(&self, _timeout: Duration) -> CapacityEstimate {
        let Some(quota_bytes) = self.quota_bytes else {
            return CapacityEstimate::Unavailable;
        };
        CapacityEstimate::Measured(CapacityUsage {
            used_bytes: self.on_disk_bytes(),
            quota_bytes,
        })
    }

    /// Plain files are not subject to host-driven eviction.
    fn request_persistence(&self) -> PersistenceGrant {
        PersistenceGrant::Granted
    }
}
