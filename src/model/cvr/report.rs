use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::{BatchId, FileMode, ScannerId};

/// Report-level metadata of one export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportMetadata {
    pub generated_timestamp: DateTime<Utc>,
    pub is_test_mode: bool,
    /// Hash of the election definition the scanner was configured with.
    pub election_hash: String,
    pub batches: Vec<BatchMetadata>,
    /// Commits to the content of every individual record in the export; see
    /// [`RecordRootHasher`].
    pub record_root_hash: String,
}

/// A scanner batch declared by an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMetadata {
    pub id: BatchId,
    pub label: String,
    pub scanner_id: ScannerId,
    pub sheet_count: u64,
}

impl ReportMetadata {
    /// The mode this export claims.
    pub fn file_mode(&self) -> FileMode {
        FileMode::from_test_flag(self.is_test_mode)
    }

    /// Fingerprint of the whole export.
    ///
    /// The metadata includes the record root hash, so two exports share a
    /// hash iff their contents are identical.
    pub fn export_hash(&self) -> String {
        let canonical = serde_json::to_vec(self).expect("Serialisation is infallible");
        HEXLOWER.encode(&Sha256::digest(canonical))
    }

    /// Number of sheets the export declares, summed over its batches.
    pub fn declared_sheet_count(&self) -> u64 {
        self.batches
            .iter()
            .fold(0, |total: u64, batch| total.saturating_add(batch.sheet_count))
    }

    pub fn scanner_ids(&self) -> BTreeSet<ScannerId> {
        self.batches
            .iter()
            .map(|batch| batch.scanner_id.clone())
            .collect()
    }

    pub fn has_batch(&self, batch_id: &str) -> bool {
        self.batches.iter().any(|batch| batch.id == batch_id)
    }
}

/// Computes a record root hash: the lowercase hex SHA-256 of every encoded
/// record, in order, each followed by a newline.
#[derive(Clone, Default)]
pub struct RecordRootHasher(Sha256);

impl RecordRootHasher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the next encoded record, without its line terminator.
    pub fn update(&mut self, encoded_record: &str) {
        self.0.update(encoded_record.as_bytes());
        self.0.update(b"\n");
    }

    pub fn finish(self) -> String {
        HEXLOWER.encode(&self.0.finalize())
    }

    /// Hash a whole sequence of encoded records.
    pub fn hash_all<'a>(encoded_records: impl IntoIterator<Item = &'a str>) -> String {
        let mut hasher = Self::new();
        for record in encoded_records {
            hasher.update(record);
        }
        hasher.finish()
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_hash_commits_to_records() {
        let a = ReportMetadata::example(10);
        let mut b = a.clone();
        assert_eq!(a.export_hash(), b.export_hash());
        b.record_root_hash = "something else".to_string();
        assert_ne!(a.export_hash(), b.export_hash());
        assert_eq!(a.export_hash().len(), 64);
    }

    #[test]
    fn record_root_hash_is_order_sensitive() {
        let forwards = RecordRootHasher::hash_all(["{\"a\":1}", "{\"b\":2}"]);
        let backwards = RecordRootHasher::hash_all(["{\"b\":2}", "{\"a\":1}"]);
        assert_ne!(forwards, backwards);
        assert_eq!(forwards, RecordRootHasher::hash_all(["{\"a\":1}", "{\"b\":2}"]));
        // Line boundaries are part of the hash.
        assert_ne!(
            RecordRootHasher::hash_all(["ab", "c"]),
            RecordRootHasher::hash_all(["a", "bc"])
        );
    }

    #[test]
    fn declared_sheet_count_saturates() {
        let mut metadata = ReportMetadata::example(u64::MAX);
        metadata.batches.push(metadata.batches[0].clone());
        assert_eq!(metadata.declared_sheet_count(), u64::MAX);
        assert_eq!(ReportMetadata::example(7).declared_sheet_count(), 7);
    }

    #[test]
    fn sheet_count_sums_batches() {
        let mut metadata = ReportMetadata::example(10);
        metadata.batches.push(BatchMetadata {
            id: "batch-2".to_string(),
            label: "Batch 2".to_string(),
            scanner_id: "scanner-2".to_string(),
            sheet_count: 5,
        });
        assert_eq!(metadata.declared_sheet_count(), 15);
        assert_eq!(metadata.scanner_ids().len(), 2);
        assert!(metadata.has_batch("batch-2"));
        assert!(!metadata.has_batch("batch-3"));
        assert_eq!(metadata.file_mode(), FileMode::Test);
    }
}
