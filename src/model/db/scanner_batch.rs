use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BatchId, ScannerId},
    cvr::BatchMetadata,
    mongodb::Id,
};

/// A scanner batch, as stored in the database. Unique per election by
/// `batch_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerBatchCore {
    pub election_id: Id,
    pub batch_id: BatchId,
    pub scanner_id: ScannerId,
    pub label: String,
}

impl ScannerBatchCore {
    pub fn new(election_id: Id, batch: &BatchMetadata) -> Self {
        Self {
            election_id,
            batch_id: batch.id.clone(),
            scanner_id: batch.scanner_id.clone(),
            label: batch.label.clone(),
        }
    }
}

/// A scanner batch without an ID.
pub type NewScannerBatch = ScannerBatchCore;

/// A scanner batch from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScannerBatch {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub batch: ScannerBatchCore,
}

impl Deref for ScannerBatch {
    type Target = ScannerBatchCore;

    fn deref(&self) -> &Self::Target {
        &self.batch
    }
}

impl DerefMut for ScannerBatch {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.batch
    }
}
