use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{election::ElectionDefinition, mongodb::Id};

/// An election known to the store, identified by its definition hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionRecordCore {
    pub election_hash: String,
    pub title: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub registered_at: DateTime<Utc>,
}

impl ElectionRecordCore {
    pub fn new(definition: &ElectionDefinition) -> Self {
        Self {
            election_hash: definition.election_hash.clone(),
            title: definition.election.title.clone(),
            registered_at: Utc::now(),
        }
    }
}

/// An election record without an ID.
pub type NewElectionRecord = ElectionRecordCore;

/// An election record from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionRecord {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub election: ElectionRecordCore,
}

impl Deref for ElectionRecord {
    type Target = ElectionRecordCore;

    fn deref(&self) -> &Self::Target {
        &self.election
    }
}

impl DerefMut for ElectionRecord {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.election
    }
}
