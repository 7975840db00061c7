use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{
    common::{ContestId, OptionId, Side, WriteInAdjudication},
    mongodb::Id,
};

/// A hand-marked write-in awaiting (or having received) adjudication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInCore {
    pub election_id: Id,
    pub cast_vote_record_id: Id,
    pub contest_id: ContestId,
    pub option_id: OptionId,
    pub side: Side,
    pub is_unmarked: bool,
    #[serde(default)]
    pub adjudication: Option<WriteInAdjudication>,
    #[serde(default, with = "optional_datetime")]
    pub adjudicated_at: Option<DateTime<Utc>>,
}

impl WriteInCore {
    pub fn new(
        election_id: Id,
        cast_vote_record_id: Id,
        contest_id: ContestId,
        option_id: OptionId,
        side: Side,
        is_unmarked: bool,
    ) -> Self {
        Self {
            election_id,
            cast_vote_record_id,
            contest_id,
            option_id,
            side,
            is_unmarked,
            adjudication: None,
            adjudicated_at: None,
        }
    }
}

/// A write-in without an ID.
pub type NewWriteIn = WriteInCore;

/// A write-in from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteIn {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub write_in: WriteInCore,
}

impl Deref for WriteIn {
    type Target = WriteInCore;

    fn deref(&self) -> &Self::Target {
        &self.write_in
    }
}

impl DerefMut for WriteIn {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.write_in
    }
}

/// Serialise an optional datetime in MongoDB's own format.
mod optional_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson::DateTime as BsonDateTime;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<DateTime<Utc>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        value.map(BsonDateTime::from_chrono).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<DateTime<Utc>>, D::Error> {
        Ok(Option::<BsonDateTime>::deserialize(deserializer)?.map(BsonDateTime::to_chrono))
    }
}
