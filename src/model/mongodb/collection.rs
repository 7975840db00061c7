use std::ops::Deref;

use log::debug;
use mongodb::{
    bson::doc, error::Error as DbError, options::IndexOptions, Collection, Database, IndexModel,
};

use crate::model::db::{
    BallotImage, CastVoteRecord, CvrFile, ElectionRecord, ManualResultsRecord, NewBallotImage,
    NewCastVoteRecord, NewCvrFile, NewElectionRecord, NewManualResults, NewScannerBatch,
    NewWriteIn, ScannerBatch, WriteIn,
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `Derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// Election collections
const ELECTIONS: &str = "elections";
impl MongoCollection for ElectionRecord {
    const NAME: &'static str = ELECTIONS;
}
impl MongoCollection for NewElectionRecord {
    const NAME: &'static str = ELECTIONS;
}

// Export file collections
const CVR_FILES: &str = "cvr_files";
impl MongoCollection for CvrFile {
    const NAME: &'static str = CVR_FILES;
}
impl MongoCollection for NewCvrFile {
    const NAME: &'static str = CVR_FILES;
}

// Cast vote record collections
const CAST_VOTE_RECORDS: &str = "cast_vote_records";
impl MongoCollection for CastVoteRecord {
    const NAME: &'static str = CAST_VOTE_RECORDS;
}
impl MongoCollection for NewCastVoteRecord {
    const NAME: &'static str = CAST_VOTE_RECORDS;
}

// Scanner batch collections
const SCANNER_BATCHES: &str = "scanner_batches";
impl MongoCollection for ScannerBatch {
    const NAME: &'static str = SCANNER_BATCHES;
}
impl MongoCollection for NewScannerBatch {
    const NAME: &'static str = SCANNER_BATCHES;
}

// Write-in collections
const WRITE_INS: &str = "write_ins";
impl MongoCollection for WriteIn {
    const NAME: &'static str = WRITE_INS;
}
impl MongoCollection for NewWriteIn {
    const NAME: &'static str = WRITE_INS;
}

// Ballot image collections
const BALLOT_IMAGES: &str = "ballot_images";
impl MongoCollection for BallotImage {
    const NAME: &'static str = BALLOT_IMAGES;
}
impl MongoCollection for NewBallotImage {
    const NAME: &'static str = BALLOT_IMAGES;
}

// Manual results collections
const MANUAL_RESULTS: &str = "manual_results";
impl MongoCollection for ManualResultsRecord {
    const NAME: &'static str = MANUAL_RESULTS;
}
impl MongoCollection for NewManualResults {
    const NAME: &'static str = MANUAL_RESULTS;
}

/// Ensure that all the required indexes exist on the given database.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Election collection.
    let election_index = IndexModel::builder()
        .keys(doc! {"election_hash": 1})
        .options(unique.clone())
        .build();
    Coll::<ElectionRecord>::from_db(db)
        .create_index(election_index, None)
        .await?;

    // Export file collection.
    let file_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "sha256_hash": 1})
        .options(unique.clone())
        .build();
    Coll::<CvrFile>::from_db(db)
        .create_index(file_index, None)
        .await?;

    // Cast vote record collection.
    let record_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "ballot_id": 1})
        .options(unique.clone())
        .build();
    let file_link_index = IndexModel::builder()
        .keys(doc! {"cvr_file_ids": 1})
        .build();
    Coll::<CastVoteRecord>::from_db(db)
        .create_indexes([record_index, file_link_index], None)
        .await?;

    // Scanner batch collection.
    let batch_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "batch_id": 1})
        .options(unique.clone())
        .build();
    Coll::<ScannerBatch>::from_db(db)
        .create_index(batch_index, None)
        .await?;

    // Write-in collection.
    let write_in_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "cast_vote_record_id": 1})
        .build();
    Coll::<WriteIn>::from_db(db)
        .create_index(write_in_index, None)
        .await?;

    // Manual results collection.
    let manual_results_index = IndexModel::builder()
        .keys(doc! {"election_id": 1, "precinct_id": 1, "ballot_style_id": 1, "voting_method": 1})
        .options(unique.clone())
        .build();
    Coll::<ManualResultsRecord>::from_db(db)
        .create_index(manual_results_index, None)
        .await?;

    Ok(())
}
