use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::common::{
    BallotStyleId, BatchId, ContestId, OptionId, PrecinctId, ScannerId, VotingMethod,
};

/// Key of the single group when no grouping is requested, and the prefix of
/// every other group key.
pub const GROUP_KEY_ROOT: &str = "root";

/// Tabulation results by group key.
pub type AggregateResult = BTreeMap<String, GroupResult>;

/// Results for one group of records.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_style_id: Option<BallotStyleId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<BatchId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct_id: Option<PrecinctId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_id: Option<ScannerId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_method: Option<VotingMethod>,
    pub card_counts: CardCounts,
    pub contest_results: BTreeMap<ContestId, ContestResult>,
}

/// Number of cards counted, by card type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CardCounts {
    pub bmd: u64,
    /// Indexed by sheet number minus one.
    pub hmpb: Vec<u64>,
    /// Ballots counted by hand.
    #[serde(default)]
    pub manual: u64,
}

impl CardCounts {
    pub fn total(&self) -> u64 {
        self.bmd + self.hmpb.iter().sum::<u64>() + self.manual
    }
}

/// Results for one contest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContestResult {
    /// Cards on which the contest appeared.
    pub ballots: u64,
    pub overvotes: u64,
    pub undervotes: u64,
    pub tallies: BTreeMap<OptionId, u64>,
}
