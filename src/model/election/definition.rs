use data_encoding::HEXLOWER;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::model::common::{BallotStyleId, DistrictId, PartyId, PrecinctId};

use super::contest::Contest;

/// Top-level folder on removable media holding scanner exports.
pub const RESULTS_ROOT_FOLDER: &str = "cast-vote-records";

/// Number of election hash characters used in the results folder name.
const FOLDER_HASH_LENGTH: usize = 10;

/// An election together with the hash that identifies it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElectionDefinition {
    /// Lowercase hex SHA-256 of the raw definition data.
    pub election_hash: String,
    pub election: Election,
}

impl ElectionDefinition {
    /// Parse a definition from its raw JSON bytes, hashing the exact bytes.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        let election: Election = serde_json::from_slice(data)?;
        let election_hash = HEXLOWER.encode(&Sha256::digest(data));
        Ok(Self {
            election_hash,
            election,
        })
    }

    /// Folder under [`RESULTS_ROOT_FOLDER`] that holds this election's exports,
    /// e.g. `franklin-county_general-election_3a5f0c91d2`.
    pub fn results_folder_name(&self) -> String {
        let hash_prefix: String = self.election_hash.chars().take(FOLDER_HASH_LENGTH).collect();
        format!(
            "{}_{}_{}",
            slugify(&self.election.county.name),
            slugify(&self.election.title),
            hash_prefix
        )
    }
}

/// Lowercase, collapse every run of non-alphanumeric characters into a
/// single `-`, and trim dashes from both ends.
fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// The election itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Election {
    pub title: String,
    pub county: County,
    pub precincts: Vec<Precinct>,
    pub districts: Vec<District>,
    #[serde(default)]
    pub parties: Vec<Party>,
    pub ballot_styles: Vec<BallotStyle>,
    pub contests: Vec<Contest>,
}

impl Election {
    pub fn precinct(&self, precinct_id: &str) -> Option<&Precinct> {
        self.precincts.iter().find(|p| p.id == precinct_id)
    }

    pub fn ballot_style(&self, ballot_style_id: &str) -> Option<&BallotStyle> {
        self.ballot_styles.iter().find(|b| b.id == ballot_style_id)
    }

    pub fn contest(&self, contest_id: &str) -> Option<&Contest> {
        self.contests.iter().find(|c| c.id == contest_id)
    }

    /// Contests that appear on the given ballot style: those in one of its
    /// districts and, for partisan contests, of its party.
    pub fn contests_for_ballot_style<'a>(
        &'a self,
        ballot_style: &'a BallotStyle,
    ) -> impl Iterator<Item = &'a Contest> + 'a {
        self.contests.iter().filter(move |contest| {
            ballot_style.districts.contains(&contest.district_id)
                && contest
                    .party_id()
                    .map_or(true, |party| ballot_style.party_id.as_ref() == Some(party))
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct County {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Precinct {
    pub id: PrecinctId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct District {
    pub id: DistrictId,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    pub id: PartyId,
    pub name: String,
}

/// The contest set assigned to voters of some precincts (and party).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotStyle {
    pub id: BallotStyleId,
    pub precincts: Vec<PrecinctId>,
    pub districts: Vec<DistrictId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub party_id: Option<PartyId>,
}
