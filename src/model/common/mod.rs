mod ballot;
mod file_mode;
mod write_in;

pub use ballot::{
    canonical_votes, AdjudicationFlag, AdjudicationFlags, Card, Side, UnknownVotingMethod, Votes,
    VotingMethod,
};
pub use file_mode::FileMode;
pub use write_in::WriteInAdjudication;

/// Ballot IDs are assigned by the scanner and unique within an election.
pub type BallotId = String;
/// Ballot style IDs come from the election definition.
pub type BallotStyleId = String;
/// Precinct IDs come from the election definition.
pub type PrecinctId = String;
/// District IDs come from the election definition.
pub type DistrictId = String;
/// Party IDs come from the election definition.
pub type PartyId = String;
/// Contest IDs come from the election definition.
pub type ContestId = String;
/// Contest option IDs are candidate IDs, yes/no option IDs, or `write-in-<n>`.
pub type OptionId = String;
/// Scanner batch IDs are assigned by the scanner.
pub type BatchId = String;
/// Scanner IDs are the machine IDs of scanning devices.
pub type ScannerId = String;
