use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::model::common::{
    BallotId, BallotStyleId, BatchId, Card, ContestId, OptionId, PrecinctId, ScannerId, Side,
    VotingMethod,
};

/// One cast vote record as read from an export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedRecord {
    pub election_hash: String,
    pub ballot_id: BallotId,
    pub ballot_style_id: BallotStyleId,
    pub precinct_id: PrecinctId,
    pub batch_id: BatchId,
    pub scanner_id: ScannerId,
    pub voting_method: VotingMethod,
    /// Present for hand-marked paper ballots only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sheet_number: Option<u32>,
    /// Selections per contest on the card, in scanner order.
    pub votes: BTreeMap<ContestId, Vec<OptionId>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub write_ins: Vec<WriteInMark>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<PageImageRef>,
}

impl ParsedRecord {
    pub fn card(&self) -> Card {
        match self.sheet_number {
            Some(sheet_number) => Card::Hmpb { sheet_number },
            None => Card::Bmd,
        }
    }

    /// Write-in marks located on a page image, which need adjudication.
    pub fn marked_write_ins(&self) -> impl Iterator<Item = &WriteInMark> {
        self.write_ins.iter().filter(|mark| mark.side.is_some())
    }

    pub fn image(&self, side: Side) -> Option<&PageImageRef> {
        self.images.iter().find(|image| image.side == side)
    }
}

/// A write-in selection on a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteInMark {
    pub contest_id: ContestId,
    pub option_id: OptionId,
    /// Side of the sheet bearing the mark; absent for machine-marked write-ins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub side: Option<Side>,
    /// Name area filled in without the bubble being marked.
    #[serde(default)]
    pub is_unmarked: bool,
}

/// Location of one page's image and layout, relative to the export directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageImageRef {
    pub side: Side,
    pub image_path: String,
    pub layout_path: String,
}

/// A page image and its layout, loaded from an export.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub side: Side,
    pub image: Vec<u8>,
    pub layout: serde_json::Value,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;
    use crate::model::common::OptionId;

    impl ParsedRecord {
        /// A machine-marked ballot of style `1` voting for `alice` and `yes`.
        pub fn example(ballot_id: impl Into<BallotId>, election_hash: &str) -> Self {
            let mut votes: BTreeMap<ContestId, Vec<OptionId>> = BTreeMap::new();
            votes.insert("mayor".to_string(), vec!["alice".to_string()]);
            votes.insert("measure-1".to_string(), vec!["yes".to_string()]);
            Self {
                election_hash: election_hash.to_string(),
                ballot_id: ballot_id.into(),
                ballot_style_id: "1".to_string(),
                precinct_id: "p1".to_string(),
                batch_id: "batch-1".to_string(),
                scanner_id: "scanner-1".to_string(),
                voting_method: VotingMethod::Precinct,
                sheet_number: None,
                votes,
                write_ins: vec![],
                images: vec![],
            }
        }

        /// A hand-marked ballot of style `2` with a write-in for mayor on
        /// the front of the sheet.
        pub fn example_with_write_in(ballot_id: impl Into<BallotId>, election_hash: &str) -> Self {
            let mut votes: BTreeMap<ContestId, Vec<OptionId>> = BTreeMap::new();
            votes.insert("mayor".to_string(), vec!["write-in-0".to_string()]);
            votes.insert("council".to_string(), vec!["carol".to_string()]);
            votes.insert("measure-1".to_string(), vec![]);
            Self {
                election_hash: election_hash.to_string(),
                ballot_id: ballot_id.into(),
                ballot_style_id: "2".to_string(),
                precinct_id: "p2".to_string(),
                batch_id: "batch-1".to_string(),
                scanner_id: "scanner-1".to_string(),
                voting_method: VotingMethod::Absentee,
                sheet_number: Some(1),
                votes,
                write_ins: vec![WriteInMark {
                    contest_id: "mayor".to_string(),
                    option_id: "write-in-0".to_string(),
                    side: Some(Side::Front),
                    is_unmarked: false,
                }],
                images: vec![
                    PageImageRef {
                        side: Side::Front,
                        image_path: "images/front.jpg".to_string(),
                        layout_path: "images/front.layout.json".to_string(),
                    },
                    PageImageRef {
                        side: Side::Back,
                        image_path: "images/back.jpg".to_string(),
                        layout_path: "images/back.layout.json".to_string(),
                    },
                ],
            }
        }
    }
}
