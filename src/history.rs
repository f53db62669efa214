use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::report::DetectionReport;

pub const DEFAULT_HISTORY_CAPACITY: usize = 50;

/// One past detection request. The image itself is never retained.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub id: u64,
    pub received_at: u64,
    pub image_sha256: String,
    pub backend: String,
    #[serde(flatten)]
    pub report: DetectionReport,
}

/// Bounded in-memory session history, newest first.
#[derive(Debug)]
pub struct DetectionHistory {
    entries: VecDeque<HistoryEntry>,
    capacity: usize,
    next_id: u64,
}

impl DetectionHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            next_id: 1,
        }
    }

    /// Record a finished detection and return the stored entry.
    pub fn record(&mut self, image: &[u8], backend: &str, report: DetectionReport) -> &HistoryEntry {
        let entry = HistoryEntry {
            id: self.next_id,
            received_at: unix_now(),
            image_sha256: image_digest(image),
            backend: backend.to_string(),
            report,
        };
        self.next_id += 1;
        self.entries.push_front(entry);
        self.entries.truncate(self.capacity.max(1));
        &self.entries[0]
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.front()
    }

    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for DetectionHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_CAPACITY)
    }
}

/// Hex SHA-256 of an uploaded image; safe to log.
pub fn image_digest(image: &[u8]) -> String {
    hex::encode(Sha256::digest(image))
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
