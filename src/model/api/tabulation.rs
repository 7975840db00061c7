use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::model::common::{
    AdjudicationFlag, BallotStyleId, BatchId, DistrictId, PrecinctId, ScannerId, VotingMethod,
};

/// A tabulation filter as requested by a user. Absent dimensions do not
/// constrain; an empty set matches nothing.
///
/// Sets make equivalent filters equal regardless of the order their values
/// were given in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_style_ids: Option<BTreeSet<BallotStyleId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct_ids: Option<BTreeSet<PrecinctId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_ids: Option<BTreeSet<BatchId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_ids: Option<BTreeSet<ScannerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_methods: Option<BTreeSet<VotingMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjudication_flags: Option<BTreeSet<AdjudicationFlag>>,
    /// Geographic constraint, expanded into ballot styles before tabulation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub district_ids: Option<BTreeSet<DistrictId>>,
}

/// A filter with its geographic constraint resolved into ballot styles.
///
/// This type has no district dimension, so nothing downstream of the
/// normaliser can see one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ballot_style_ids: Option<BTreeSet<BallotStyleId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precinct_ids: Option<BTreeSet<PrecinctId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_ids: Option<BTreeSet<BatchId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scanner_ids: Option<BTreeSet<ScannerId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voting_methods: Option<BTreeSet<VotingMethod>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adjudication_flags: Option<BTreeSet<AdjudicationFlag>>,
}

/// Dimensions to split results by.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupBy {
    #[serde(default)]
    pub group_by_ballot_style: bool,
    #[serde(default)]
    pub group_by_batch: bool,
    #[serde(default)]
    pub group_by_precinct: bool,
    #[serde(default)]
    pub group_by_scanner: bool,
    #[serde(default)]
    pub group_by_voting_method: bool,
}

/// Body of a tabulation request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TabulationRequest {
    #[serde(default)]
    pub filter: Filter,
    #[serde(default)]
    pub group_by: GroupBy,
}
