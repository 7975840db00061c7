//! Persistent cast vote record state, behind a trait so that the import and
//! tabulation logic does not depend on a particular database.

use std::collections::BTreeSet;

use mongodb::error::Error as DbError;
use thiserror::Error;

use crate::model::{
    api::ManualResultsIdentifier,
    common::{FileMode, PrecinctId, ScannerId, WriteInAdjudication},
    db::{
        CastVoteRecord, CvrFile, ManualResultsRecord, NewBallotImage, NewCastVoteRecord,
        NewCvrFile, NewManualResults, NewScannerBatch, NewWriteIn, ScannerBatch, WriteIn,
    },
    election::ElectionDefinition,
    mongodb::Id,
};

mod memory;
mod mongo;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

/// Storage failures. These are never expected during normal operation.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Election {0} is not registered")]
    UnknownElection(Id),
    #[error("Export {0} does not exist")]
    UnknownFile(Id),
    #[error("Election {0} was modified during the transaction")]
    Conflict(Id),
}

/// What happened when a record was added within a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddRecordOutcome {
    /// The ballot ID was unseen; the record was stored under the given ID.
    Inserted(Id),
    /// An identical record already exists; it is now also linked to the
    /// new export.
    Duplicate(Id),
    /// A record with the same ballot ID but different content exists.
    Conflict,
}

/// Cast vote record storage, partitioned by election.
#[rocket::async_trait]
pub trait CvrStore: Send + Sync {
    /// Register an election, returning the existing ID if its definition
    /// hash is already known.
    async fn register_election(&self, definition: &ElectionDefinition) -> Result<Id, StoreError>;

    /// The state of the election's mode ratchet.
    async fn current_file_mode(&self, election_id: Id) -> Result<FileMode, StoreError>;

    async fn find_cvr_file_by_hash(
        &self,
        election_id: Id,
        sha256_hash: &str,
    ) -> Result<Option<CvrFile>, StoreError>;

    /// Number of records linked to the given export.
    async fn count_records_for_file(&self, file_id: Id) -> Result<u64, StoreError>;

    /// All accepted exports, newest export first.
    async fn list_cvr_files(&self, election_id: Id) -> Result<Vec<CvrFile>, StoreError>;

    async fn cast_vote_records(&self, election_id: Id) -> Result<Vec<CastVoteRecord>, StoreError>;

    async fn scanner_batches(&self, election_id: Id) -> Result<Vec<ScannerBatch>, StoreError>;

    async fn write_ins(&self, election_id: Id) -> Result<Vec<WriteIn>, StoreError>;

    /// Record the adjudication of a write-in. Returns `false` if the
    /// election has no such write-in.
    async fn adjudicate_write_in(
        &self,
        election_id: Id,
        write_in_id: Id,
        adjudication: WriteInAdjudication,
    ) -> Result<bool, StoreError>;

    /// Store manual results, replacing any with the same identifier.
    async fn set_manual_results(&self, results: NewManualResults) -> Result<(), StoreError>;

    /// Returns `false` if there were no such results.
    async fn delete_manual_results(
        &self,
        election_id: Id,
        identifier: &ManualResultsIdentifier,
    ) -> Result<bool, StoreError>;

    /// Returns the number of results deleted.
    async fn delete_all_manual_results(&self, election_id: Id) -> Result<u64, StoreError>;

    async fn manual_results(&self, election_id: Id) -> Result<Vec<ManualResultsRecord>, StoreError>;

    /// Delete all cast vote record data of the election, unlocking its mode.
    /// Manual results are kept.
    async fn clear_cvr_data(&self, election_id: Id) -> Result<(), StoreError>;

    /// Start an atomic transaction over the election's data.
    async fn begin(&self, election_id: Id) -> Result<Box<dyn CvrTransaction>, StoreError>;
}

/// An open transaction. Nothing done through it is visible to readers until
/// [`CvrTransaction::commit`]; dropping it without committing discards it.
#[rocket::async_trait]
pub trait CvrTransaction: Send {
    /// Insert the batch unless one with the same batch ID already exists.
    async fn upsert_scanner_batch(&mut self, batch: NewScannerBatch) -> Result<(), StoreError>;

    async fn insert_cvr_file(&mut self, file: NewCvrFile) -> Result<Id, StoreError>;

    /// Add a record read from the given export, resolving it by ballot ID.
    async fn add_cast_vote_record(
        &mut self,
        file_id: Id,
        record: NewCastVoteRecord,
    ) -> Result<AddRecordOutcome, StoreError>;

    async fn add_ballot_image(&mut self, image: NewBallotImage) -> Result<(), StoreError>;

    async fn add_write_in(&mut self, write_in: NewWriteIn) -> Result<Id, StoreError>;

    /// Store what was learned about the export by reading all its records.
    async fn finish_cvr_file(
        &mut self,
        file_id: Id,
        precinct_ids: BTreeSet<PrecinctId>,
        scanner_ids: BTreeSet<ScannerId>,
    ) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;

    async fn rollback(self: Box<Self>) -> Result<(), StoreError>;
}
