use std::{
    collections::{BTreeMap, BTreeSet, HashMap},
    sync::Arc,
};

use chrono::Utc;
use rocket::tokio::sync::Mutex;

use crate::model::{
    api::ManualResultsIdentifier,
    common::{BallotId, BatchId, FileMode, PrecinctId, ScannerId, WriteInAdjudication},
    db::{
        BallotImage, CastVoteRecord, CvrFile, ElectionRecord, ManualResultsRecord, NewBallotImage,
        NewCastVoteRecord, NewCvrFile, NewElectionRecord, NewManualResults, NewScannerBatch,
        NewWriteIn, ScannerBatch, WriteIn,
    },
    election::ElectionDefinition,
    mongodb::Id,
};

use super::{AddRecordOutcome, CvrStore, CvrTransaction, StoreError};

/// Everything stored for one election.
#[derive(Debug, Clone, Default)]
struct ElectionData {
    /// Bumped by every committed mutation.
    version: u64,
    files: Vec<CvrFile>,
    records: BTreeMap<BallotId, CastVoteRecord>,
    batches: BTreeMap<BatchId, ScannerBatch>,
    write_ins: Vec<WriteIn>,
    images: Vec<BallotImage>,
    manual_results: Vec<ManualResultsRecord>,
}

#[derive(Debug, Default)]
struct State {
    elections: HashMap<String, ElectionRecord>,
    data: HashMap<Id, ElectionData>,
}

impl State {
    fn data(&self, election_id: Id) -> Result<&ElectionData, StoreError> {
        self.data
            .get(&election_id)
            .ok_or(StoreError::UnknownElection(election_id))
    }

    fn data_mut(&mut self, election_id: Id) -> Result<&mut ElectionData, StoreError> {
        self.data
            .get_mut(&election_id)
            .ok_or(StoreError::UnknownElection(election_id))
    }
}

/// A [`CvrStore`] held entirely in memory.
///
/// Transactions work on a private copy of the election's data which replaces
/// the shared copy on commit. A commit fails with [`StoreError::Conflict`] if
/// anything else was committed for the election in the meantime.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[rocket::async_trait]
impl CvrStore for MemoryStore {
    async fn register_election(&self, definition: &ElectionDefinition) -> Result<Id, StoreError> {
        let mut state = self.state.lock().await;
        if let Some(existing) = state.elections.get(&definition.election_hash) {
            return Ok(existing.id);
        }
        let election = ElectionRecord {
            id: Id::new(),
            election: NewElectionRecord::new(definition),
        };
        let id = election.id;
        state
            .elections
            .insert(definition.election_hash.clone(), election);
        state.data.insert(id, ElectionData::default());
        Ok(id)
    }

    async fn current_file_mode(&self, election_id: Id) -> Result<FileMode, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .data(election_id)?
            .files
            .first()
            .map_or(FileMode::Unlocked, |file| file.file_mode()))
    }

    async fn find_cvr_file_by_hash(
        &self,
        election_id: Id,
        sha256_hash: &str,
    ) -> Result<Option<CvrFile>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .data(election_id)?
            .files
            .iter()
            .find(|file| file.sha256_hash == sha256_hash)
            .cloned())
    }

    async fn count_records_for_file(&self, file_id: Id) -> Result<u64, StoreError> {
        let state = self.state.lock().await;
        let count = state
            .data
            .values()
            .flat_map(|data| data.records.values())
            .filter(|record| record.cvr_file_ids.contains(&file_id))
            .count();
        Ok(count as u64)
    }

    async fn list_cvr_files(&self, election_id: Id) -> Result<Vec<CvrFile>, StoreError> {
        let state = self.state.lock().await;
        let mut files = state.data(election_id)?.files.clone();
        files.sort_by(|a, b| b.exported_timestamp.cmp(&a.exported_timestamp));
        Ok(files)
    }

    async fn cast_vote_records(&self, election_id: Id) -> Result<Vec<CastVoteRecord>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.data(election_id)?.records.values().cloned().collect())
    }

    async fn scanner_batches(&self, election_id: Id) -> Result<Vec<ScannerBatch>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.data(election_id)?.batches.values().cloned().collect())
    }

    async fn write_ins(&self, election_id: Id) -> Result<Vec<WriteIn>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.data(election_id)?.write_ins.clone())
    }

    async fn adjudicate_write_in(
        &self,
        election_id: Id,
        write_in_id: Id,
        adjudication: WriteInAdjudication,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let data = state.data_mut(election_id)?;
        match data.write_ins.iter_mut().find(|w| w.id == write_in_id) {
            Some(write_in) => {
                write_in.adjudication = Some(adjudication);
                write_in.adjudicated_at = Some(Utc::now());
                data.version += 1;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn set_manual_results(&self, results: NewManualResults) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let data = state.data_mut(results.election_id)?;
        let identifier = results.identifier();
        match data
            .manual_results
            .iter_mut()
            .find(|existing| existing.is_for(&identifier))
        {
            Some(existing) => existing.results = results,
            None => data.manual_results.push(ManualResultsRecord {
                id: Id::new(),
                results,
            }),
        }
        data.version += 1;
        Ok(())
    }

    async fn delete_manual_results(
        &self,
        election_id: Id,
        identifier: &ManualResultsIdentifier,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        let data = state.data_mut(election_id)?;
        let before = data.manual_results.len();
        data.manual_results.retain(|results| !results.is_for(identifier));
        if data.manual_results.len() == before {
            return Ok(false);
        }
        data.version += 1;
        Ok(true)
    }

    async fn delete_all_manual_results(&self, election_id: Id) -> Result<u64, StoreError> {
        let mut state = self.state.lock().await;
        let data = state.data_mut(election_id)?;
        let deleted = data.manual_results.len() as u64;
        data.manual_results.clear();
        data.version += 1;
        Ok(deleted)
    }

    async fn manual_results(&self, election_id: Id) -> Result<Vec<ManualResultsRecord>, StoreError> {
        let state = self.state.lock().await;
        let mut results = state.data(election_id)?.manual_results.clone();
        results.sort_by_key(|results| results.identifier());
        Ok(results)
    }

    async fn clear_cvr_data(&self, election_id: Id) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let data = state.data_mut(election_id)?;
        let manual_results = std::mem::take(&mut data.manual_results);
        *data = ElectionData {
            version: data.version + 1,
            manual_results,
            ..ElectionData::default()
        };
        Ok(())
    }

    async fn begin(&self, election_id: Id) -> Result<Box<dyn CvrTransaction>, StoreError> {
        let state = self.state.lock().await;
        let staged = state.data(election_id)?.clone();
        Ok(Box::new(MemoryTransaction {
            state: self.state.clone(),
            election_id,
            base_version: staged.version,
            staged,
        }))
    }
}

/// A transaction over a private copy of one election's data.
struct MemoryTransaction {
    state: Arc<Mutex<State>>,
    election_id: Id,
    base_version: u64,
    staged: ElectionData,
}

#[rocket::async_trait]
impl CvrTransaction for MemoryTransaction {
    async fn upsert_scanner_batch(&mut self, batch: NewScannerBatch) -> Result<(), StoreError> {
        self.staged
            .batches
            .entry(batch.batch_id.clone())
            .or_insert_with(|| ScannerBatch {
                id: Id::new(),
                batch,
            });
        Ok(())
    }

    async fn insert_cvr_file(&mut self, file: NewCvrFile) -> Result<Id, StoreError> {
        let id = Id::new();
        self.staged.files.push(CvrFile { id, file });
        Ok(id)
    }

    async fn add_cast_vote_record(
        &mut self,
        file_id: Id,
        mut record: NewCastVoteRecord,
    ) -> Result<AddRecordOutcome, StoreError> {
        if let Some(existing) = self.staged.records.get_mut(&record.ballot_id) {
            if !existing.same_content(&record) {
                return Ok(AddRecordOutcome::Conflict);
            }
            existing.cvr_file_ids.insert(file_id);
            return Ok(AddRecordOutcome::Duplicate(existing.id));
        }
        let id = Id::new();
        record.cvr_file_ids = BTreeSet::from([file_id]);
        self.staged
            .records
            .insert(record.ballot_id.clone(), CastVoteRecord { id, record });
        Ok(AddRecordOutcome::Inserted(id))
    }

    async fn add_ballot_image(&mut self, image: NewBallotImage) -> Result<(), StoreError> {
        self.staged.images.push(BallotImage {
            id: Id::new(),
            image,
        });
        Ok(())
    }

    async fn add_write_in(&mut self, write_in: NewWriteIn) -> Result<Id, StoreError> {
        let id = Id::new();
        self.staged.write_ins.push(WriteIn { id, write_in });
        Ok(id)
    }

    async fn finish_cvr_file(
        &mut self,
        file_id: Id,
        precinct_ids: BTreeSet<PrecinctId>,
        scanner_ids: BTreeSet<ScannerId>,
    ) -> Result<(), StoreError> {
        let file = self
            .staged
            .files
            .iter_mut()
            .find(|file| file.id == file_id)
            .ok_or(StoreError::UnknownFile(file_id))?;
        file.precinct_ids = precinct_ids;
        file.scanner_ids.extend(scanner_ids);
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self {
            state,
            election_id,
            base_version,
            staged,
        } = *self;
        let mut state = state.lock().await;
        let data = state.data_mut(election_id)?;
        if data.version != base_version {
            return Err(StoreError::Conflict(election_id));
        }
        *data = ElectionData {
            version: base_version + 1,
            ..staged
        };
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), StoreError> {
        // The staged copy is simply dropped.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::model::cvr::BatchMetadata;

    async fn store_with_election() -> (MemoryStore, Id) {
        let store = MemoryStore::new();
        let election_id = store
            .register_election(&ElectionDefinition::example())
            .await
            .unwrap();
        (store, election_id)
    }

    #[rocket::async_test]
    async fn register_is_idempotent() {
        let (store, election_id) = store_with_election().await;
        let again = store
            .register_election(&ElectionDefinition::example())
            .await
            .unwrap();
        assert_eq!(election_id, again);
        assert!(matches!(
            store.current_file_mode(Id::new()).await,
            Err(StoreError::UnknownElection(_))
        ));
    }

    #[rocket::async_test]
    async fn uncommitted_changes_are_invisible() {
        let (store, election_id) = store_with_election().await;
        let mut tx = store.begin(election_id).await.unwrap();
        let file_id = tx
            .insert_cvr_file(NewCvrFile::example(election_id, "hash"))
            .await
            .unwrap();
        tx.add_cast_vote_record(file_id, NewCastVoteRecord::example(election_id, "b-1"))
            .await
            .unwrap();
        assert!(store.cast_vote_records(election_id).await.unwrap().is_empty());
        assert_eq!(
            store.current_file_mode(election_id).await.unwrap(),
            FileMode::Unlocked
        );

        tx.rollback().await.unwrap();
        assert!(store.cast_vote_records(election_id).await.unwrap().is_empty());
        assert!(store.list_cvr_files(election_id).await.unwrap().is_empty());
    }

    #[rocket::async_test]
    async fn commit_publishes_and_links_duplicates() {
        let (store, election_id) = store_with_election().await;

        let mut tx = store.begin(election_id).await.unwrap();
        let first = tx
            .insert_cvr_file(NewCvrFile::example(election_id, "first"))
            .await
            .unwrap();
        let outcome = tx
            .add_cast_vote_record(first, NewCastVoteRecord::example(election_id, "b-1"))
            .await
            .unwrap();
        assert!(matches!(outcome, AddRecordOutcome::Inserted(_)));
        let batch = BatchMetadata {
            id: "batch-1".to_string(),
            label: "Batch 1".to_string(),
            scanner_id: "scanner-1".to_string(),
            sheet_count: 1,
        };
        tx.upsert_scanner_batch(NewScannerBatch::new(election_id, &batch))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let mut tx = store.begin(election_id).await.unwrap();
        let second = tx
            .insert_cvr_file(NewCvrFile::example(election_id, "second"))
            .await
            .unwrap();
        let outcome = tx
            .add_cast_vote_record(second, NewCastVoteRecord::example(election_id, "b-1"))
            .await
            .unwrap();
        assert!(matches!(outcome, AddRecordOutcome::Duplicate(_)));
        let mut different = NewCastVoteRecord::example(election_id, "b-1");
        different.precinct_id = "p2".to_string();
        let outcome = tx.add_cast_vote_record(second, different).await.unwrap();
        assert_eq!(outcome, AddRecordOutcome::Conflict);
        tx.upsert_scanner_batch(NewScannerBatch::new(election_id, &batch))
            .await
            .unwrap();
        tx.commit().await.unwrap();

        assert_eq!(store.cast_vote_records(election_id).await.unwrap().len(), 1);
        assert_eq!(store.scanner_batches(election_id).await.unwrap().len(), 1);
        assert_eq!(store.count_records_for_file(first).await.unwrap(), 1);
        assert_eq!(store.count_records_for_file(second).await.unwrap(), 1);
        assert_eq!(
            store.current_file_mode(election_id).await.unwrap(),
            FileMode::Test
        );
    }

    #[rocket::async_test]
    async fn concurrent_commit_conflicts() {
        let (store, election_id) = store_with_election().await;
        let mut tx = store.begin(election_id).await.unwrap();
        tx.insert_cvr_file(NewCvrFile::example(election_id, "hash"))
            .await
            .unwrap();
        store.clear_cvr_data(election_id).await.unwrap();
        assert!(matches!(
            tx.commit().await,
            Err(StoreError::Conflict(id)) if id == election_id
        ));
    }

    #[rocket::async_test]
    async fn clear_unlocks_mode() {
        let (store, election_id) = store_with_election().await;
        let mut tx = store.begin(election_id).await.unwrap();
        tx.insert_cvr_file(NewCvrFile::example(election_id, "hash"))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(
            store.current_file_mode(election_id).await.unwrap(),
            FileMode::Test
        );

        store.clear_cvr_data(election_id).await.unwrap();
        assert_eq!(
            store.current_file_mode(election_id).await.unwrap(),
            FileMode::Unlocked
        );
        assert!(store
            .find_cvr_file_by_hash(election_id, "hash")
            .await
            .unwrap()
            .is_none());
    }

    #[rocket::async_test]
    async fn manual_results_upsert_by_identifier() {
        let (store, election_id) = store_with_election().await;
        store
            .set_manual_results(NewManualResults::example(election_id))
            .await
            .unwrap();
        let mut updated = NewManualResults::example(election_id);
        updated.ballot_count = 12;
        store.set_manual_results(updated).await.unwrap();
        let mut other = NewManualResults::example(election_id);
        other.voting_method = crate::model::common::VotingMethod::Precinct;
        store.set_manual_results(other).await.unwrap();

        let stored = store.manual_results(election_id).await.unwrap();
        assert_eq!(stored.len(), 2);
        let absentee = ManualResultsIdentifier::example();
        let ballot_count = stored
            .iter()
            .find(|results| results.is_for(&absentee))
            .map(|results| results.ballot_count);
        assert_eq!(ballot_count, Some(12));

        // Clearing cast vote records leaves manual results alone.
        store.clear_cvr_data(election_id).await.unwrap();
        assert!(store.delete_manual_results(election_id, &absentee).await.unwrap());
        assert!(!store.delete_manual_results(election_id, &absentee).await.unwrap());
        assert_eq!(store.delete_all_manual_results(election_id).await.unwrap(), 1);
        assert!(store.manual_results(election_id).await.unwrap().is_empty());
    }
}
