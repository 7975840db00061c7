use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{FileMode, PrecinctId, ScannerId},
    db::CvrFile,
    mongodb::Id,
};

use super::import::id_as_hex;

/// An accepted export, as shown to administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvrFileSummary {
    #[serde(with = "id_as_hex")]
    pub id: Id,
    pub filename: String,
    pub exported_timestamp: DateTime<Utc>,
    pub is_test_mode: bool,
    pub scanner_ids: BTreeSet<ScannerId>,
    pub precinct_ids: BTreeSet<PrecinctId>,
    /// Number of records linked to this export, including duplicates.
    pub num_cvrs_imported: u64,
}

impl CvrFileSummary {
    pub fn new(file: CvrFile, num_cvrs_imported: u64) -> Self {
        Self {
            id: file.id,
            filename: file.file.filename,
            exported_timestamp: file.file.exported_timestamp,
            is_test_mode: file.file.is_test_mode,
            scanner_ids: file.file.scanner_ids,
            precinct_ids: file.file.precinct_ids,
            num_cvrs_imported,
        }
    }
}

/// The current state of the mode ratchet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileModeSummary {
    pub file_mode: FileMode,
}
