use std::collections::BTreeSet;

use chrono::Utc;
use log::{debug, warn};
use mongodb::{
    bson::{doc, DateTime as BsonDateTime, Document},
    options::{FindOptions, ReplaceOptions, UpdateOptions},
    Client, ClientSession, Database,
};
use rocket::futures::TryStreamExt;

use crate::model::{
    api::ManualResultsIdentifier,
    common::{FileMode, PrecinctId, ScannerId, WriteInAdjudication},
    db::{
        BallotImage, CastVoteRecord, CvrFile, ElectionRecord, ManualResultsRecord, NewBallotImage,
        NewCastVoteRecord, NewCvrFile, NewElectionRecord, NewManualResults, NewScannerBatch,
        NewWriteIn, ScannerBatch, WriteIn,
    },
    election::ElectionDefinition,
    mongodb::{is_duplicate_key_error, Coll, Id},
};

use super::{AddRecordOutcome, CvrStore, CvrTransaction, StoreError};

/// A [`CvrStore`] backed by MongoDB.
///
/// Import transactions need a deployment that supports multi-document
/// transactions, i.e. a replica set.
#[derive(Clone)]
pub struct MongoStore {
    client: Client,
    elections: Coll<ElectionRecord>,
    new_elections: Coll<NewElectionRecord>,
    cvr_files: Coll<CvrFile>,
    records: Coll<CastVoteRecord>,
    scanner_batches: Coll<ScannerBatch>,
    write_ins: Coll<WriteIn>,
    ballot_images: Coll<BallotImage>,
    manual_results: Coll<ManualResultsRecord>,
    new_manual_results: Coll<NewManualResults>,
}

impl MongoStore {
    pub fn new(client: Client, db: &Database) -> Self {
        Self {
            client,
            elections: Coll::from_db(db),
            new_elections: Coll::from_db(db),
            cvr_files: Coll::from_db(db),
            records: Coll::from_db(db),
            scanner_batches: Coll::from_db(db),
            write_ins: Coll::from_db(db),
            ballot_images: Coll::from_db(db),
            manual_results: Coll::from_db(db),
            new_manual_results: Coll::from_db(db),
        }
    }

    async fn find_election(&self, election_hash: &str) -> Result<Option<Id>, StoreError> {
        let filter = doc! { "election_hash": election_hash };
        Ok(self
            .elections
            .find_one(filter, None)
            .await?
            .map(|election| election.id))
    }
}

fn manual_results_filter(election_id: Id, identifier: &ManualResultsIdentifier) -> Document {
    doc! {
        "election_id": election_id,
        "precinct_id": identifier.precinct_id.as_str(),
        "ballot_style_id": identifier.ballot_style_id.as_str(),
        "voting_method": identifier.voting_method,
    }
}

#[rocket::async_trait]
impl CvrStore for MongoStore {
    async fn register_election(&self, definition: &ElectionDefinition) -> Result<Id, StoreError> {
        if let Some(id) = self.find_election(&definition.election_hash).await? {
            return Ok(id);
        }
        let election = NewElectionRecord::new(definition);
        match self.new_elections.insert_one(&election, None).await {
            Ok(result) => {
                let id = result
                    .inserted_id
                    .as_object_id()
                    .unwrap() // Valid because the ID comes directly from the DB
                    .into();
                debug!("Registered election {id} ({})", definition.election_hash);
                Ok(id)
            }
            // Lost a race with another registration of the same election.
            Err(err) if is_duplicate_key_error(&err) => self
                .find_election(&definition.election_hash)
                .await?
                .ok_or_else(|| StoreError::Db(err)),
            Err(err) => Err(err.into()),
        }
    }

    async fn current_file_mode(&self, election_id: Id) -> Result<FileMode, StoreError> {
        let filter = doc! { "election_id": election_id };
        Ok(self
            .cvr_files
            .find_one(filter, None)
            .await?
            .map_or(FileMode::Unlocked, |file| file.file_mode()))
    }

    async fn find_cvr_file_by_hash(
        &self,
        election_id: Id,
        sha256_hash: &str,
    ) -> Result<Option<CvrFile>, StoreError> {
        let filter = doc! {
            "election_id": election_id,
            "sha256_hash": sha256_hash,
        };
        Ok(self.cvr_files.find_one(filter, None).await?)
    }

    async fn count_records_for_file(&self, file_id: Id) -> Result<u64, StoreError> {
        let filter = doc! { "cvr_file_ids": file_id };
        Ok(self.records.count_documents(filter, None).await?)
    }

    async fn list_cvr_files(&self, election_id: Id) -> Result<Vec<CvrFile>, StoreError> {
        let filter = doc! { "election_id": election_id };
        let options = FindOptions::builder()
            .sort(doc! { "exported_timestamp": -1 })
            .build();
        Ok(self
            .cvr_files
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn cast_vote_records(&self, election_id: Id) -> Result<Vec<CastVoteRecord>, StoreError> {
        let filter = doc! { "election_id": election_id };
        Ok(self.records.find(filter, None).await?.try_collect().await?)
    }

    async fn scanner_batches(&self, election_id: Id) -> Result<Vec<ScannerBatch>, StoreError> {
        let filter = doc! { "election_id": election_id };
        Ok(self
            .scanner_batches
            .find(filter, None)
            .await?
            .try_collect()
            .await?)
    }

    async fn write_ins(&self, election_id: Id) -> Result<Vec<WriteIn>, StoreError> {
        let filter = doc! { "election_id": election_id };
        Ok(self.write_ins.find(filter, None).await?.try_collect().await?)
    }

    async fn adjudicate_write_in(
        &self,
        election_id: Id,
        write_in_id: Id,
        adjudication: WriteInAdjudication,
    ) -> Result<bool, StoreError> {
        let filter = doc! {
            "_id": write_in_id,
            "election_id": election_id,
        };
        let update = doc! {
            "$set": {
                "adjudication": adjudication,
                "adjudicated_at": BsonDateTime::from_chrono(Utc::now()),
            }
        };
        let result = self.write_ins.update_one(filter, update, None).await?;
        Ok(result.matched_count == 1)
    }

    async fn set_manual_results(&self, results: NewManualResults) -> Result<(), StoreError> {
        let filter = manual_results_filter(results.election_id, &results.identifier());
        let options = ReplaceOptions::builder().upsert(true).build();
        self.new_manual_results
            .replace_one(filter, &results, options)
            .await?;
        Ok(())
    }

    async fn delete_manual_results(
        &self,
        election_id: Id,
        identifier: &ManualResultsIdentifier,
    ) -> Result<bool, StoreError> {
        let filter = manual_results_filter(election_id, identifier);
        let result = self.manual_results.delete_one(filter, None).await?;
        Ok(result.deleted_count == 1)
    }

    async fn delete_all_manual_results(&self, election_id: Id) -> Result<u64, StoreError> {
        let filter = doc! { "election_id": election_id };
        let result = self.manual_results.delete_many(filter, None).await?;
        Ok(result.deleted_count)
    }

    async fn manual_results(&self, election_id: Id) -> Result<Vec<ManualResultsRecord>, StoreError> {
        let filter = doc! { "election_id": election_id };
        let options = FindOptions::builder()
            .sort(doc! { "precinct_id": 1, "ballot_style_id": 1, "voting_method": 1 })
            .build();
        Ok(self
            .manual_results
            .find(filter, options)
            .await?
            .try_collect()
            .await?)
    }

    async fn clear_cvr_data(&self, election_id: Id) -> Result<(), StoreError> {
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;

        let filter = doc! { "election_id": election_id };
        self.ballot_images
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.write_ins
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.records
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.scanner_batches
            .delete_many_with_session(filter.clone(), None, &mut session)
            .await?;
        self.cvr_files
            .delete_many_with_session(filter, None, &mut session)
            .await?;

        session.commit_transaction().await?;
        Ok(())
    }

    async fn begin(&self, election_id: Id) -> Result<Box<dyn CvrTransaction>, StoreError> {
        if self
            .elections
            .find_one(election_id.as_doc(), None)
            .await?
            .is_none()
        {
            return Err(StoreError::UnknownElection(election_id));
        }
        let mut session = self.client.start_session(None).await?;
        session.start_transaction(None).await?;
        Ok(Box::new(MongoTransaction {
            session,
            election_id,
            store: self.clone(),
        }))
    }
}

/// A transaction on a MongoDB client session.
struct MongoTransaction {
    session: ClientSession,
    election_id: Id,
    store: MongoStore,
}

#[rocket::async_trait]
impl CvrTransaction for MongoTransaction {
    async fn upsert_scanner_batch(&mut self, batch: NewScannerBatch) -> Result<(), StoreError> {
        let filter = doc! {
            "election_id": batch.election_id,
            "batch_id": batch.batch_id.as_str(),
        };
        let update = doc! {
            "$setOnInsert": {
                "scanner_id": batch.scanner_id.as_str(),
                "label": batch.label.as_str(),
            }
        };
        let options = UpdateOptions::builder().upsert(true).build();
        self.store
            .scanner_batches
            .update_one_with_session(filter, update, options, &mut self.session)
            .await?;
        Ok(())
    }

    async fn insert_cvr_file(&mut self, file: NewCvrFile) -> Result<Id, StoreError> {
        let file = CvrFile {
            id: Id::new(),
            file,
        };
        self.store
            .cvr_files
            .insert_one_with_session(&file, None, &mut self.session)
            .await?;
        Ok(file.id)
    }

    async fn add_cast_vote_record(
        &mut self,
        file_id: Id,
        mut record: NewCastVoteRecord,
    ) -> Result<AddRecordOutcome, StoreError> {
        let filter = doc! {
            "election_id": self.election_id,
            "ballot_id": record.ballot_id.as_str(),
        };
        let existing = self
            .store
            .records
            .find_one_with_session(filter, None, &mut self.session)
            .await?;

        if let Some(existing) = existing {
            if !existing.same_content(&record) {
                return Ok(AddRecordOutcome::Conflict);
            }
            let update = doc! { "$addToSet": { "cvr_file_ids": file_id } };
            self.store
                .records
                .update_one_with_session(existing.id.as_doc(), update, None, &mut self.session)
                .await?;
            return Ok(AddRecordOutcome::Duplicate(existing.id));
        }

        record.cvr_file_ids = BTreeSet::from([file_id]);
        let record = CastVoteRecord {
            id: Id::new(),
            record,
        };
        self.store
            .records
            .insert_one_with_session(&record, None, &mut self.session)
            .await?;
        Ok(AddRecordOutcome::Inserted(record.id))
    }

    async fn add_ballot_image(&mut self, image: NewBallotImage) -> Result<(), StoreError> {
        let image = BallotImage {
            id: Id::new(),
            image,
        };
        self.store
            .ballot_images
            .insert_one_with_session(&image, None, &mut self.session)
            .await?;
        Ok(())
    }

    async fn add_write_in(&mut self, write_in: NewWriteIn) -> Result<Id, StoreError> {
        let write_in = WriteIn {
            id: Id::new(),
            write_in,
        };
        self.store
            .write_ins
            .insert_one_with_session(&write_in, None, &mut self.session)
            .await?;
        Ok(write_in.id)
    }

    async fn finish_cvr_file(
        &mut self,
        file_id: Id,
        precinct_ids: BTreeSet<PrecinctId>,
        scanner_ids: BTreeSet<ScannerId>,
    ) -> Result<(), StoreError> {
        let update = doc! {
            "$set": { "precinct_ids": precinct_ids.into_iter().collect::<Vec<_>>() },
            "$addToSet": { "scanner_ids": { "$each": scanner_ids.into_iter().collect::<Vec<_>>() } },
        };
        let result = self
            .store
            .cvr_files
            .update_one_with_session(file_id.as_doc(), update, None, &mut self.session)
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::UnknownFile(file_id));
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let mut session = self.session;
        session.commit_transaction().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            mut session,
            election_id,
            ..
        } = *self;
        if let Err(err) = session.abort_transaction().await {
            warn!("Failed to abort transaction on election {election_id}: {err}");
            return Err(err.into());
        }
        Ok(())
    }
}
