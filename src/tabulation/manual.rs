//! Checks hand-counted results against the election definition.

use thiserror::Error;

use crate::{
    model::{
        api::{ManualResults, ManualResultsIdentifier},
        common::{BallotStyleId, ContestId, OptionId, PrecinctId, VotingMethod},
        election::Election,
    },
    store::StoreError,
};

/// Why manual results could not be stored or found.
#[derive(Debug, Error)]
pub enum ManualResultsError {
    #[error("Unknown precinct {0}")]
    UnknownPrecinct(PrecinctId),
    #[error("Unknown ballot style {0}")]
    UnknownBallotStyle(BallotStyleId),
    #[error("Ballot style {ballot_style_id} is not used in precinct {precinct_id}")]
    PrecinctNotOnBallotStyle {
        precinct_id: PrecinctId,
        ballot_style_id: BallotStyleId,
    },
    #[error("Manual results cannot be entered for {} ballots", .0.as_str())]
    UnsupportedVotingMethod(VotingMethod),
    #[error("Contest {contest_id} is not on ballot style {ballot_style_id}")]
    ContestNotOnBallotStyle {
        contest_id: ContestId,
        ballot_style_id: BallotStyleId,
    },
    #[error("Option {option_id} is not valid for contest {contest_id}")]
    InvalidContestOption {
        contest_id: ContestId,
        option_id: OptionId,
    },
    #[error("Contest {contest_id} has {ballots} ballots but only {ballot_count} were counted")]
    TooManyBallots {
        contest_id: ContestId,
        ballots: u64,
        ballot_count: u64,
    },
    #[error(
        "No manual results for precinct {}, ballot style {}, {} ballots",
        .0.precinct_id,
        .0.ballot_style_id,
        .0.voting_method.as_str()
    )]
    NotFound(ManualResultsIdentifier),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ManualResultsError {
    /// Stable, machine-readable name of the failure.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::UnknownPrecinct(_) => "invalid-precinct",
            Self::UnknownBallotStyle(_) => "invalid-ballot-style",
            Self::PrecinctNotOnBallotStyle { .. } => "invalid-precinct-ballot-style",
            Self::UnsupportedVotingMethod(_) => "invalid-voting-method",
            Self::ContestNotOnBallotStyle { .. } => "invalid-contest",
            Self::InvalidContestOption { .. } => "invalid-contest-option",
            Self::TooManyBallots { .. } => "invalid-ballot-count",
            Self::NotFound(_) => "manual-results-not-found",
            Self::Store(_) => "store-error",
        }
    }
}

/// Check that manual results describe ballots that could exist: the precinct
/// uses the ballot style, every contest is on it, every tallied option
/// belongs to its contest, and no contest appeared on more ballots than were
/// counted. Provisional ballots are never counted by hand.
///
/// Contests left out are taken to have no hand-counted ballots.
pub fn validate_manual_results(
    election: &Election,
    identifier: &ManualResultsIdentifier,
    results: &ManualResults,
) -> Result<(), ManualResultsError> {
    if election.precinct(&identifier.precinct_id).is_none() {
        return Err(ManualResultsError::UnknownPrecinct(
            identifier.precinct_id.clone(),
        ));
    }
    let ballot_style = election
        .ballot_style(&identifier.ballot_style_id)
        .ok_or_else(|| ManualResultsError::UnknownBallotStyle(identifier.ballot_style_id.clone()))?;
    if !ballot_style.precincts.contains(&identifier.precinct_id) {
        return Err(ManualResultsError::PrecinctNotOnBallotStyle {
            precinct_id: identifier.precinct_id.clone(),
            ballot_style_id: ballot_style.id.clone(),
        });
    }
    if identifier.voting_method == VotingMethod::Provisional {
        return Err(ManualResultsError::UnsupportedVotingMethod(
            identifier.voting_method,
        ));
    }

    let applicable: Vec<_> = election.contests_for_ballot_style(ballot_style).collect();
    for (contest_id, result) in &results.contest_results {
        let contest = applicable
            .iter()
            .find(|contest| &contest.id == contest_id)
            .ok_or_else(|| ManualResultsError::ContestNotOnBallotStyle {
                contest_id: contest_id.clone(),
                ballot_style_id: ballot_style.id.clone(),
            })?;
        if let Some(option_id) = result
            .tallies
            .keys()
            .find(|option_id| !contest.is_valid_option(option_id))
        {
            return Err(ManualResultsError::InvalidContestOption {
                contest_id: contest_id.clone(),
                option_id: option_id.clone(),
            });
        }
        if result.ballots > results.ballot_count {
            return Err(ManualResultsError::TooManyBallots {
                contest_id: contest_id.clone(),
                ballots: result.ballots,
                ballot_count: results.ballot_count,
            });
        }
    }
    Ok(())
}
