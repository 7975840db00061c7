use std::{collections::BTreeSet, fmt::Display, path::PathBuf, str::FromStr};

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::common::ScannerId;

const TEST_MODE_PREFIX: &str = "TEST__";
const MACHINE_PREFIX: &str = "machine_";
const SEPARATOR: &str = "__";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Summary of an export found on removable media.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CvrExportMetadata {
    pub export_hash: String,
    /// When the export was written, from its directory name.
    pub export_timestamp: DateTime<Utc>,
    /// When the report was generated, from its metadata.
    pub generated_timestamp: DateTime<Utc>,
    pub is_test_mode: bool,
    pub machine_id: String,
    pub scanner_ids: BTreeSet<ScannerId>,
    /// Declared sheet count; not verified against the records.
    pub cvr_count: u64,
    pub name: String,
    pub path: PathBuf,
}

/// The parsed name of an export directory:
/// `[TEST__]machine_<machine id>__<YYYY-MM-DD_HH-MM-SS>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDirectoryName {
    pub machine_id: String,
    pub in_test_mode: bool,
    pub timestamp: DateTime<Utc>,
}

impl FromStr for ExportDirectoryName {
    type Err = ();

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let (in_test_mode, rest) = match name.strip_prefix(TEST_MODE_PREFIX) {
            Some(rest) => (true, rest),
            None => (false, name),
        };
        let rest = rest.strip_prefix(MACHINE_PREFIX).ok_or(())?;
        let (machine_id, timestamp) = rest.split_once(SEPARATOR).ok_or(())?;
        if machine_id.is_empty() {
            return Err(());
        }
        let timestamp = NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
            .map_err(|_| ())?
            .and_utc();
        Ok(Self {
            machine_id: machine_id.to_string(),
            in_test_mode,
            timestamp,
        })
    }
}

impl Display for ExportDirectoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.in_test_mode {
            f.write_str(TEST_MODE_PREFIX)?;
        }
        write!(
            f,
            "{MACHINE_PREFIX}{}{SEPARATOR}{}",
            self.machine_id,
            self.timestamp.format(TIMESTAMP_FORMAT)
        )
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn parse_directory_names() {
        let name: ExportDirectoryName = "TEST__machine_0001__2023-11-07_20-15-00".parse().unwrap();
        assert_eq!(name.machine_id, "0001");
        assert!(name.in_test_mode);
        assert_eq!(
            name.timestamp,
            Utc.with_ymd_and_hms(2023, 11, 7, 20, 15, 0).unwrap()
        );
        assert_eq!(name.to_string(), "TEST__machine_0001__2023-11-07_20-15-00");

        let name: ExportDirectoryName = "machine_scan-2__2024-01-02_03-04-05".parse().unwrap();
        assert!(!name.in_test_mode);
        assert_eq!(name.machine_id, "scan-2");
    }

    #[test]
    fn reject_unrelated_directories() {
        for name in [
            "",
            "photos",
            "machine___2023-11-07_20-15-00",
            "machine_0001",
            "machine_0001__yesterday",
            "TEST__0001__2023-11-07_20-15-00",
            "test__machine_0001__2023-11-07_20-15-00",
        ] {
            assert!(name.parse::<ExportDirectoryName>().is_err(), "{name}");
        }
    }
}
