use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ContestId, OptionId, Side, WriteInAdjudication},
    db::WriteIn,
    mongodb::Id,
};

use super::import::id_as_hex;

/// A write-in, as shown to adjudicators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteInSummary {
    #[serde(with = "id_as_hex")]
    pub id: Id,
    #[serde(with = "id_as_hex")]
    pub cast_vote_record_id: Id,
    pub contest_id: ContestId,
    pub option_id: OptionId,
    pub side: Side,
    pub is_unmarked: bool,
    pub adjudication: Option<WriteInAdjudication>,
}

impl From<WriteIn> for WriteInSummary {
    fn from(write_in: WriteIn) -> Self {
        Self {
            id: write_in.id,
            cast_vote_record_id: write_in.write_in.cast_vote_record_id,
            contest_id: write_in.write_in.contest_id,
            option_id: write_in.write_in.option_id,
            side: write_in.write_in.side,
            is_unmarked: write_in.write_in.is_unmarked,
            adjudication: write_in.write_in.adjudication,
        }
    }
}
