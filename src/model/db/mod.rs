//! DB-compatible (e.g. de/serialisable) types.
//!
//! The types in this module are serialised in an DB-friendly way, e.g.:
//!
//! - IDs and datetimes are serialised in MongoDB's own format.

mod ballot_image;
pub use ballot_image::{BallotImage, BallotImageCore, NewBallotImage};

mod cast_vote_record;
pub use cast_vote_record::{CastVoteRecord, CastVoteRecordCore, NewCastVoteRecord};

mod cvr_file;
pub use cvr_file::{CvrFile, CvrFileCore, NewCvrFile};

mod election;
pub use election::{ElectionRecord, ElectionRecordCore, NewElectionRecord};

mod manual_results;
pub use manual_results::{ManualResultsCore, ManualResultsRecord, NewManualResults};

mod scanner_batch;
pub use scanner_batch::{NewScannerBatch, ScannerBatch, ScannerBatchCore};

mod write_in;
pub use write_in::{NewWriteIn, WriteIn, WriteInCore};
