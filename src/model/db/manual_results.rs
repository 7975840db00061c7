use std::collections::BTreeMap;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::{ContestResult, ManualResults, ManualResultsIdentifier},
    common::{BallotStyleId, ContestId, PrecinctId, VotingMethod},
    mongodb::Id,
};

/// Hand-counted results for one precinct, ballot style and voting method,
/// as stored in the database. Unique per election by that triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualResultsCore {
    pub election_id: Id,
    pub precinct_id: PrecinctId,
    pub ballot_style_id: BallotStyleId,
    pub voting_method: VotingMethod,
    pub ballot_count: u64,
    pub contest_results: BTreeMap<ContestId, ContestResult>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl ManualResultsCore {
    pub fn new(
        election_id: Id,
        identifier: ManualResultsIdentifier,
        results: ManualResults,
    ) -> Self {
        Self {
            election_id,
            precinct_id: identifier.precinct_id,
            ballot_style_id: identifier.ballot_style_id,
            voting_method: identifier.voting_method,
            ballot_count: results.ballot_count,
            contest_results: results.contest_results,
            created_at: Utc::now(),
        }
    }

    pub fn identifier(&self) -> ManualResultsIdentifier {
        ManualResultsIdentifier {
            precinct_id: self.precinct_id.clone(),
            ballot_style_id: self.ballot_style_id.clone(),
            voting_method: self.voting_method,
        }
    }

    pub fn is_for(&self, identifier: &ManualResultsIdentifier) -> bool {
        self.precinct_id == identifier.precinct_id
            && self.ballot_style_id == identifier.ballot_style_id
            && self.voting_method == identifier.voting_method
    }
}

/// Manual results without an ID.
pub type NewManualResults = ManualResultsCore;

/// Manual results from the database, with their unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualResultsRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub results: ManualResultsCore,
}

impl Deref for ManualResultsRecord {
    type Target = ManualResultsCore;

    fn deref(&self) -> &Self::Target {
        &self.results
    }
}

impl DerefMut for ManualResultsRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.results
    }
}
