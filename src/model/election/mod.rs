//! The canonical election definition that imported records are checked against.
//!
//! Definitions are immutable once loaded; the election hash commits to the
//! exact bytes they were parsed from.

mod contest;
mod definition;

pub use contest::{Candidate, Contest, ContestKind, WRITE_IN_OPTION_PREFIX};
pub use definition::{
    BallotStyle, County, District, Election, ElectionDefinition, Party, Precinct,
    RESULTS_ROOT_FOLDER,
};
