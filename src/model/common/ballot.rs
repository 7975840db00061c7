use std::collections::BTreeMap;

use mongodb::bson::{to_bson, Bson};
use rocket::request::FromParam;
use serde::{Deserialize, Serialize};

use super::{ContestId, OptionId};

/// Votes keyed by contest, in canonical form: contests ordered by ID and
/// each contest's selections sorted, without repeats.
///
/// A contest present with no selections was on the card but left blank.
pub type Votes = BTreeMap<ContestId, Vec<OptionId>>;

/// Bring votes into canonical form, so that two records with the same
/// selections compare (and serialise) identically.
pub fn canonical_votes<I>(votes: I) -> Votes
where
    I: IntoIterator<Item = (ContestId, Vec<OptionId>)>,
{
    votes
        .into_iter()
        .map(|(contest_id, mut selections)| {
            selections.sort();
            selections.dedup();
            (contest_id, selections)
        })
        .collect()
}

/// The physical card a record was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Card {
    /// A machine-marked summary ballot.
    Bmd,
    /// One sheet of a hand-marked paper ballot.
    Hmpb { sheet_number: u32 },
}

impl Card {
    pub fn is_hand_marked(&self) -> bool {
        matches!(self, Self::Hmpb { .. })
    }
}

/// Side of a sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Front,
    Back,
}

impl From<Side> for Bson {
    fn from(side: Side) -> Self {
        to_bson(&side).expect("Serialisation is infallible")
    }
}

/// How the ballot was cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VotingMethod {
    Precinct,
    Absentee,
    Provisional,
}

impl VotingMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Precinct => "precinct",
            Self::Absentee => "absentee",
            Self::Provisional => "provisional",
        }
    }
}

impl From<VotingMethod> for Bson {
    fn from(voting_method: VotingMethod) -> Self {
        Bson::String(voting_method.as_str().to_string())
    }
}

/// A voting method path segment wasn't one of the known methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVotingMethod(pub String);

impl<'a> FromParam<'a> for VotingMethod {
    type Error = UnknownVotingMethod;

    fn from_param(param: &'a str) -> Result<Self, Self::Error> {
        match param {
            "precinct" => Ok(Self::Precinct),
            "absentee" => Ok(Self::Absentee),
            "provisional" => Ok(Self::Provisional),
            _ => Err(UnknownVotingMethod(param.to_string())),
        }
    }
}

/// Adjudication-relevant properties of a record, computed once at import.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjudicationFlags {
    pub is_blank: bool,
    pub has_overvote: bool,
    pub has_undervote: bool,
    pub has_write_in: bool,
}

impl AdjudicationFlags {
    /// Does the record carry the given flag?
    pub fn has(&self, flag: AdjudicationFlag) -> bool {
        match flag {
            AdjudicationFlag::IsBlank => self.is_blank,
            AdjudicationFlag::HasOvervote => self.has_overvote,
            AdjudicationFlag::HasUndervote => self.has_undervote,
            AdjudicationFlag::HasWriteIn => self.has_write_in,
        }
    }
}

/// A single adjudication flag, as used in tabulation filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AdjudicationFlag {
    IsBlank,
    HasOvervote,
    HasUndervote,
    HasWriteIn,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_votes_ignore_selection_order() {
        let a = canonical_votes(vec![
            ("council".to_string(), vec!["zed".to_string(), "amy".to_string()]),
            ("mayor".to_string(), vec![]),
        ]);
        let b = canonical_votes(vec![
            ("mayor".to_string(), vec![]),
            ("council".to_string(), vec!["amy".to_string(), "zed".to_string()]),
        ]);
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }

    #[test]
    fn repeated_selection_counts_once() {
        let votes = canonical_votes(vec![(
            "mayor".to_string(),
            vec!["alice".to_string(), "bob".to_string(), "alice".to_string()],
        )]);
        assert_eq!(votes["mayor"], vec!["alice".to_string(), "bob".to_string()]);
    }

    #[test]
    fn card_serialisation() {
        let hmpb = serde_json::to_value(Card::Hmpb { sheet_number: 2 }).unwrap();
        assert_eq!(hmpb, serde_json::json!({"type": "hmpb", "sheet_number": 2}));
        let bmd = serde_json::to_value(Card::Bmd).unwrap();
        assert_eq!(bmd, serde_json::json!({"type": "bmd"}));
    }

    #[test]
    fn voting_method_path_segments() {
        assert_eq!(VotingMethod::from_param("absentee"), Ok(VotingMethod::Absentee));
        assert_eq!(
            VotingMethod::from_param("Absentee"),
            Err(UnknownVotingMethod("Absentee".to_string()))
        );
        assert_eq!(Bson::from(VotingMethod::Precinct), Bson::String("precinct".to_string()));
    }
}
