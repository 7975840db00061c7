use std::ops::{Deref, DerefMut};

use mongodb::bson::{spec::BinarySubtype, Binary};
use serde::{Deserialize, Serialize};

use crate::model::{common::Side, cvr::PageImage, mongodb::Id};

/// One page image of a hand-marked ballot, kept for write-in adjudication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotImageCore {
    pub election_id: Id,
    pub cast_vote_record_id: Id,
    pub side: Side,
    pub image: Binary,
    pub layout: serde_json::Value,
}

impl BallotImageCore {
    pub fn new(election_id: Id, cast_vote_record_id: Id, page: PageImage) -> Self {
        Self {
            election_id,
            cast_vote_record_id,
            side: page.side,
            image: Binary {
                subtype: BinarySubtype::Generic,
                bytes: page.image,
            },
            layout: page.layout,
        }
    }
}

/// A ballot image without an ID.
pub type NewBallotImage = BallotImageCore;

/// A ballot image from the database, with its unique ID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallotImage {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub image: BallotImageCore,
}

impl Deref for BallotImage {
    type Target = BallotImageCore;

    fn deref(&self) -> &Self::Target {
        &self.image
    }
}

impl DerefMut for BallotImage {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.image
    }
}
