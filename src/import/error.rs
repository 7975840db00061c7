use std::path::PathBuf;

use thiserror::Error;

use crate::{
    external::{AuthenticationError, ReadError, RecordParseError},
    model::common::{BallotStyleId, BatchId, ContestId, FileMode, OptionId, PrecinctId, Side},
    store::StoreError,
};

/// Why a record does not fit the election definition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Record is for election {found}, expected {expected}")]
    ElectionMismatch { expected: String, found: String },
    #[error("Unknown precinct {0}")]
    UnknownPrecinct(PrecinctId),
    #[error("Unknown ballot style {0}")]
    UnknownBallotStyle(BallotStyleId),
    #[error("Contest {contest_id} is not on ballot style {ballot_style_id}")]
    ContestNotOnBallotStyle {
        contest_id: ContestId,
        ballot_style_id: BallotStyleId,
    },
    #[error("Batch {0} is not declared by the export")]
    UnknownBatch(BatchId),
    #[error("Invalid sheet number {0}")]
    InvalidSheetNumber(u32),
    #[error("Option {option_id} is not valid for contest {contest_id}")]
    InvalidContestOption {
        contest_id: ContestId,
        option_id: OptionId,
    },
    #[error("Write-in for contest {contest_id} is on the {side:?} page, which has no image")]
    InvalidWriteInImageLocation { contest_id: ContestId, side: Side },
}

impl ValidationError {
    /// Stable, machine-readable name of the failure.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::ElectionMismatch { .. } => "invalid-election",
            Self::UnknownPrecinct(_) => "invalid-precinct",
            Self::UnknownBallotStyle(_) => "invalid-ballot-style",
            Self::ContestNotOnBallotStyle { .. } => "invalid-contest",
            Self::UnknownBatch(_) => "invalid-batch",
            Self::InvalidSheetNumber(_) => "invalid-sheet-number",
            Self::InvalidContestOption { .. } => "invalid-contest-option",
            Self::InvalidWriteInImageLocation { .. } => "invalid-write-in-image-location",
        }
    }
}

/// Why an export was not imported.
///
/// Everything except [`ImportError::Store`] is an expected rejection that
/// left the store untouched.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Export failed authentication: {0}")]
    Authentication(#[from] AuthenticationError),
    #[error("Failed to read export: {0}")]
    Read(#[from] ReadError),
    #[error("Export is in {claimed} mode but the election is locked to {current} mode")]
    InvalidMode { current: FileMode, claimed: FileMode },
    #[error("Record {index} could not be parsed: {error}")]
    MalformedRecord {
        index: usize,
        error: RecordParseError,
    },
    #[error("Record {index} is invalid: {error}")]
    InvalidRecord {
        index: usize,
        error: ValidationError,
    },
    #[error("Record {index} reuses an existing ballot ID with different data")]
    BallotIdConflict { index: usize },
    #[error("Failed to read the ballot images of record {index}: {error}")]
    ImageRead { index: usize, error: ReadError },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ImportError {
    /// Stable, machine-readable name of the failure.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::Authentication(_) => "authentication-error",
            Self::Read(e) => e.subtype(),
            Self::InvalidMode { .. } => "invalid-mode",
            Self::MalformedRecord { .. } => "malformed-cast-vote-record",
            Self::InvalidRecord { .. } => "invalid-cast-vote-record",
            Self::BallotIdConflict { .. } => "ballot-id-already-exists-with-different-data",
            Self::ImageRead { .. } => "invalid-ballot-image",
            Self::Store(_) => "store-error",
        }
    }

    /// Position of the offending record, for per-record failures.
    pub fn index(&self) -> Option<usize> {
        match self {
            Self::MalformedRecord { index, .. }
            | Self::InvalidRecord { index, .. }
            | Self::BallotIdConflict { index }
            | Self::ImageRead { index, .. } => Some(*index),
            _ => None,
        }
    }

    /// Finer-grained reason, where there is one.
    pub fn detail(&self) -> Option<&'static str> {
        match self {
            Self::InvalidRecord { error, .. } => Some(error.subtype()),
            Self::ImageRead { error, .. } => Some(error.subtype()),
            _ => None,
        }
    }
}

/// Why exports could not be listed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ListExportsError {
    #[error("No removable media present")]
    NoMedia,
    #[error("{0} is not a directory")]
    NotDirectory(PathBuf),
    #[error("Permission denied reading {0}")]
    PermissionDenied(PathBuf),
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

impl ListExportsError {
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::NoMedia => "no-media",
            Self::NotDirectory(_) => "not-directory",
            Self::PermissionDenied(_) => "permission-denied",
            Self::Io { .. } => "io-error",
        }
    }
}
