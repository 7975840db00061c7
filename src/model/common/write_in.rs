use mongodb::bson::{to_bson, Bson};
use serde::{Deserialize, Serialize};

use super::OptionId;

/// The outcome of manually adjudicating a write-in mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum WriteInAdjudication {
    /// The voter wrote in a candidate already on the ballot.
    OfficialCandidate {
        #[serde(rename = "candidateId")]
        candidate_id: OptionId,
    },
    /// A genuine write-in candidate.
    WriteInCandidate { name: String },
    /// Not a vote, e.g. a stray mark.
    Invalid,
}

impl From<WriteInAdjudication> for Bson {
    fn from(adjudication: WriteInAdjudication) -> Self {
        to_bson(&adjudication).expect("Serialisation is infallible")
    }
}
