use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{FileMode, PrecinctId, ScannerId},
    mongodb::Id,
};

/// An accepted export, as stored in the database.
///
/// Created once per unique export hash; only removed when all cast vote
/// record data of the election is cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvrFileCore {
    pub election_id: Id,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub exported_timestamp: DateTime<Utc>,
    pub filename: String,
    pub is_test_mode: bool,
    pub scanner_ids: BTreeSet<ScannerId>,
    /// Filled in once every record of the export has been read.
    pub precinct_ids: BTreeSet<PrecinctId>,
    pub sha256_hash: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl CvrFileCore {
    pub fn file_mode(&self) -> FileMode {
        FileMode::from_test_flag(self.is_test_mode)
    }
}

/// An export record without an ID.
pub type NewCvrFile = CvrFileCore;

/// An export record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CvrFile {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub file: CvrFileCore,
}

impl Deref for CvrFile {
    type Target = CvrFileCore;

    fn deref(&self) -> &Self::Target {
        &self.file
    }
}

impl DerefMut for CvrFile {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.file
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use chrono::TimeZone;

    use super::*;

    impl CvrFileCore {
        pub fn example(election_id: Id, sha256_hash: &str) -> Self {
            Self {
                election_id,
                exported_timestamp: Utc.with_ymd_and_hms(2023, 11, 7, 20, 15, 0).unwrap(),
                filename: "TEST__machine_0001__2023-11-07_20-15-00".to_string(),
                is_test_mode: true,
                scanner_ids: BTreeSet::from(["scanner-1".to_string()]),
                precinct_ids: BTreeSet::new(),
                sha256_hash: sha256_hash.to_string(),
                created_at: Utc::now(),
            }
        }
    }
}
