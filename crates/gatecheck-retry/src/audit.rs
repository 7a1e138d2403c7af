//! Audit log
//!
//! One entry per status transition, best-effort. Entries are hash-chained
//! so tampering or reordering is detectable after the fact; detail
//! payloads are truncated so a pathological judge reply cannot bloat the
//! log.

use chrono::{DateTime, Utc};
use gatecheck_types::{BuildId, BuildStatus};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use ulid::Ulid;

/// Detail payloads are cut at this many bytes
const MAX_DETAIL_LEN: usize = 512;

/// One audit record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    /// Entry id
    pub entry_id: Ulid,
    /// Wall-clock time of the transition
    pub timestamp: DateTime<Utc>,
    /// Subject attempt
    pub build_id: BuildId,
    /// Who drove the transition (component name)
    pub actor: String,
    /// Status the attempt moved to
    pub status: BuildStatus,
    /// Why the transition happened
    pub reason: String,
    /// Truncated detail payload
    pub detail: String,
    /// Hash of the previous entry
    pub prev_hash: [u8; 32],
    /// Hash over this entry's fields and `prev_hash`
    pub hash: [u8; 32],
}

impl AuditEntry {
    /// Hex rendering of this entry's hash
    #[must_use]
    pub fn hash_hex(&self) -> String {
        hex::encode(self.hash)
    }
}

/// Audit log integrity violation
#[derive(Debug, thiserror::Error)]
pub enum AuditError {
    /// The hash chain does not verify
    #[error("audit chain integrity violation")]
    IntegrityViolation,
}

/// Hash-chained, in-process audit log
#[derive(Debug, Default)]
pub struct AuditLog {
    inner: Mutex<Vec<AuditEntry>>,
}

impl AuditLog {
    /// Create an empty log
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transition record, chaining it to the previous entry
    pub fn record(
        &self,
        build_id: &BuildId,
        actor: &str,
        status: BuildStatus,
        reason: &str,
        detail: &str,
    ) -> Ulid {
        let mut guard = self.inner.lock();
        let prev_hash = guard.last().map_or([0u8; 32], |e| e.hash);

        let mut entry = AuditEntry {
            entry_id: Ulid::new(),
            timestamp: Utc::now(),
            build_id: build_id.clone(),
            actor: actor.to_string(),
            status,
            reason: reason.to_string(),
            detail: truncate(detail),
            prev_hash,
            hash: [0u8; 32],
        };
        entry.hash = compute_hash(&entry);

        let id = entry.entry_id;
        guard.push(entry);
        id
    }

    /// Snapshot of all entries
    #[must_use]
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.inner.lock().clone()
    }

    /// Verify the hash chain end to end
    ///
    /// # Errors
    /// `AuditError::IntegrityViolation` when any link fails.
    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        let guard = self.inner.lock();
        let mut prev = [0u8; 32];
        for entry in guard.iter() {
            if entry.prev_hash != prev {
                return Err(AuditError::IntegrityViolation);
            }
            if entry.hash != compute_hash(entry) {
                return Err(AuditError::IntegrityViolation);
            }
            prev = entry.hash;
        }
        Ok(())
    }
}

/// Cut detail at a char boundary near the byte budget
fn truncate(detail: &str) -> String {
    if detail.len() <= MAX_DETAIL_LEN {
        return detail.to_string();
    }
    let mut end = MAX_DETAIL_LEN;
    while !detail.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &detail[..end])
}

fn compute_hash(entry: &AuditEntry) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(entry.entry_id.to_string().as_bytes());
    hasher.update(entry.timestamp.timestamp_millis().to_le_bytes());
    hasher.update(entry.build_id.as_str().as_bytes());
    hasher.update(entry.actor.as_bytes());
    hasher.update([0]);
    hasher.update(entry.status.to_string().as_bytes());
    hasher.update([0]);
    hasher.update(entry.reason.as_bytes());
    hasher.update([0]);
    hasher.update(entry.detail.as_bytes());
    hasher.update(entry.prev_hash);
    hasher.finalize().into()
}
