use serde::{Deserialize, Serialize};

use crate::model::common::{ContestId, DistrictId, OptionId, PartyId};

/// Write-in options of a candidate contest are `write-in-0`, `write-in-1`, ...
pub const WRITE_IN_OPTION_PREFIX: &str = "write-in-";

/// A candidate on the ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: OptionId,
    pub name: String,
}

/// A single contest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contest {
    pub id: ContestId,
    /// Voters in this district see the contest.
    pub district_id: DistrictId,
    pub title: String,
    #[serde(flatten)]
    pub kind: ContestKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContestKind {
    Candidate {
        seats: u32,
        candidates: Vec<Candidate>,
        allow_write_ins: bool,
        /// Set for partisan primary contests.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        party_id: Option<PartyId>,
    },
    YesNo {
        yes_option_id: OptionId,
        no_option_id: OptionId,
    },
}

impl Contest {
    /// Maximum number of selections a voter may make.
    pub fn seats(&self) -> u32 {
        match &self.kind {
            ContestKind::Candidate { seats, .. } => *seats,
            ContestKind::YesNo { .. } => 1,
        }
    }

    /// Party of a partisan contest, if any.
    pub fn party_id(&self) -> Option<&PartyId> {
        match &self.kind {
            ContestKind::Candidate { party_id, .. } => party_id.as_ref(),
            ContestKind::YesNo { .. } => None,
        }
    }

    /// Every option a record may select in this contest.
    pub fn valid_options(&self) -> Vec<OptionId> {
        match &self.kind {
            ContestKind::Candidate {
                seats,
                candidates,
                allow_write_ins,
                ..
            } => {
                let mut options: Vec<OptionId> = candidates.iter().map(|c| c.id.clone()).collect();
                if *allow_write_ins {
                    options.extend((0..*seats).map(|n| format!("{WRITE_IN_OPTION_PREFIX}{n}")));
                }
                options
            }
            ContestKind::YesNo {
                yes_option_id,
                no_option_id,
            } => vec![yes_option_id.clone(), no_option_id.clone()],
        }
    }

    pub fn is_valid_option(&self, option_id: &str) -> bool {
        self.valid_options().iter().any(|option| option == option_id)
    }

    /// Is this one of the contest's write-in options?
    pub fn is_write_in_option(option_id: &str) -> bool {
        option_id.starts_with(WRITE_IN_OPTION_PREFIX)
    }

    pub fn has_candidate(&self, candidate_id: &str) -> bool {
        match &self.kind {
            ContestKind::Candidate { candidates, .. } => {
                candidates.iter().any(|c| c.id == candidate_id)
            }
            ContestKind::YesNo { .. } => false,
        }
    }
}
