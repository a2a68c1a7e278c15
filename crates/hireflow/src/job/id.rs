use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};

use crate::job::status::JobKind;

/// Hands out job identifiers of the form `<prefix>_<YYYYmmdd_HHMMSS>_<seq>`.
///
/// The sequence is shared by all kinds, so two ids are never equal even when
/// minted within the same second.
#[derive(Debug, Default)]
pub struct JobIdGenerator {
    counter: AtomicU64,
}

/// A freshly minted id plus the parts it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintedId {
    pub job_id: String,
    pub timestamp: String,
    pub sequence: u64,
}

impl MintedId {
    /// Batch label derived from the same timestamp and sequence.
    pub fn batch_number(&self) -> String {
        format!("BATCH_{}_{}", self.timestamp, self.sequence)
    }
}

impl JobIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next(&self, kind: JobKind, now: DateTime<Utc>) -> MintedId {
        let sequence = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp = now.format("%Y%m%d_%H%M%S").to_string();
        MintedId {
            job_id: format!("{}_{}_{}", kind.id_prefix(), timestamp, sequence),
            timestamp,
            sequence,
        }
    }
}
