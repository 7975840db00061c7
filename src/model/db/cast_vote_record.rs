use std::collections::BTreeSet;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::{
    common::{
        AdjudicationFlags, BallotId, BallotStyleId, BatchId, Card, PrecinctId, ScannerId, Votes,
        VotingMethod,
    },
    mongodb::Id,
};

/// A cast vote record, as stored in the database.
///
/// `ballot_id` is unique per election. The same record may arrive in several
/// exports; each one is linked through `cvr_file_ids`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRecordCore {
    pub election_id: Id,
    pub ballot_id: BallotId,
    pub ballot_style_id: BallotStyleId,
    pub precinct_id: PrecinctId,
    pub batch_id: BatchId,
    pub scanner_id: ScannerId,
    pub voting_method: VotingMethod,
    pub card: Card,
    /// Canonical votes.
    pub votes: Votes,
    pub flags: AdjudicationFlags,
    pub cvr_file_ids: BTreeSet<Id>,
}

impl CastVoteRecordCore {
    /// Do both records describe the same ballot?
    ///
    /// Only tabulation-relevant fields take part; file links and derived
    /// flags do not.
    pub fn same_content(&self, other: &Self) -> bool {
        self.ballot_style_id == other.ballot_style_id
            && self.voting_method == other.voting_method
            && self.batch_id == other.batch_id
            && self.precinct_id == other.precinct_id
            && self.card == other.card
            && self.votes == other.votes
    }
}

/// A cast vote record without an ID.
pub type NewCastVoteRecord = CastVoteRecordCore;

/// A cast vote record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastVoteRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub record: CastVoteRecordCore,
}

impl Deref for CastVoteRecord {
    type Target = CastVoteRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.record
    }
}

impl DerefMut for CastVoteRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.record
    }
}
