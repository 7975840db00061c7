use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{common::FileMode, mongodb::Id};

/// A request to import the export at the given path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportRequest {
    pub path: PathBuf,
}

/// The outcome of a successful import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportSummary {
    /// ID of the stored export record.
    #[serde(with = "id_as_hex")]
    pub id: Id,
    pub file_name: String,
    pub exported_timestamp: DateTime<Utc>,
    pub file_mode: FileMode,
    pub already_present: u64,
    pub newly_added: u64,
    pub was_existing_file: bool,
}

/// Serialise an ID as a plain hex string.
pub(super) mod id_as_hex {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    use crate::model::mongodb::Id;

    pub fn serialize<S: Serializer>(id: &Id, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(id)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Id, D::Error> {
        let hex = String::deserialize(deserializer)?;
        hex.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_serialisation() {
        let id = Id::new();
        let summary = ImportSummary {
            id,
            file_name: "machine_0001__2023-11-07_20-15-00".to_string(),
            exported_timestamp: Utc::now(),
            file_mode: FileMode::Official,
            already_present: 3,
            newly_added: 7,
            was_existing_file: false,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["id"], serde_json::json!(id.to_string()));
        assert_eq!(json["fileMode"], "official");
        assert_eq!(json["newlyAdded"], 7);
        assert_eq!(json["wasExistingFile"], false);
        let back: ImportSummary = serde_json::from_value(json).unwrap();
        assert_eq!(back, summary);
    }
}
