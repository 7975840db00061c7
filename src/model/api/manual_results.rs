use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{BallotStyleId, ContestId, PrecinctId, VotingMethod},
    db::ManualResultsRecord,
};

use super::ContestResult;

/// The precinct, ballot style and voting method that a set of manual results
/// covers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualResultsIdentifier {
    pub precinct_id: PrecinctId,
    pub ballot_style_id: BallotStyleId,
    pub voting_method: VotingMethod,
}

/// Hand-counted results, as entered by an administrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualResults {
    pub ballot_count: u64,
    #[serde(default)]
    pub contest_results: BTreeMap<ContestId, ContestResult>,
}

/// Stored manual results, with their identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManualResultsSummary {
    #[serde(flatten)]
    pub identifier: ManualResultsIdentifier,
    #[serde(flatten)]
    pub results: ManualResults,
    pub created_at: DateTime<Utc>,
}

impl From<ManualResultsRecord> for ManualResultsSummary {
    fn from(record: ManualResultsRecord) -> Self {
        let identifier = record.identifier();
        let record = record.results;
        Self {
            identifier,
            results: ManualResults {
                ballot_count: record.ballot_count,
                contest_results: record.contest_results,
            },
            created_at: record.created_at,
        }
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_body_parses() {
        let results: ManualResults = serde_json::from_value(serde_json::json!({
            "ballotCount": 3,
            "contestResults": {
                "measure-1": {
                    "ballots": 3,
                    "overvotes": 0,
                    "undervotes": 1,
                    "tallies": { "yes": 2, "no": 0 }
                }
            }
        }))
        .unwrap();
        assert_eq!(results.ballot_count, 3);
        assert_eq!(results.contest_results["measure-1"].tallies["yes"], 2);

        let empty: ManualResults = serde_json::from_str(r#"{"ballotCount": 0}"#).unwrap();
        assert!(empty.contest_results.is_empty());
    }
}
