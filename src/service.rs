//! The operations offered to callers, bound to the current election.

use std::{path::Path, sync::Arc};

use log::info;
use thiserror::Error;

use crate::{
    external::{ArtifactAuthenticator, CvrReader, MediaLister},
    import::{
        ElectionLocks, ExportLocator, ImportCoordinator, ImportError, ImportOptions,
        ListExportsError,
    },
    model::{
        api::{
            AggregateResult, CvrFileSummary, Filter, GroupBy, ImportSummary, ManualResults,
            ManualResultsIdentifier, ManualResultsSummary, WriteInSummary,
        },
        common::{ContestId, FileMode, OptionId, WriteInAdjudication},
        cvr::CvrExportMetadata,
        db::NewManualResults,
        election::ElectionDefinition,
        mongodb::Id,
    },
    store::{CvrStore, StoreError},
    tabulation::{validate_manual_results, ManualResultsError, TabulationCache, Tabulator},
};

/// Why a write-in could not be adjudicated.
#[derive(Debug, Error)]
pub enum AdjudicationError {
    #[error("No write-in with ID {0}")]
    NotFound(Id),
    #[error("{candidate_id} is not a candidate in contest {contest_id}")]
    InvalidCandidate {
        contest_id: ContestId,
        candidate_id: OptionId,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Everything needed to serve one election.
pub struct CvrService {
    election_id: Id,
    definition: Arc<ElectionDefinition>,
    store: Arc<dyn CvrStore>,
    cache: Arc<TabulationCache>,
    locks: Arc<ElectionLocks>,
    locator: ExportLocator,
    coordinator: ImportCoordinator,
    tabulator: Tabulator,
}

impl CvrService {
    pub fn new(
        election_id: Id,
        definition: ElectionDefinition,
        store: Arc<dyn CvrStore>,
        media: Arc<dyn MediaLister>,
        reader: Arc<dyn CvrReader>,
        authenticator: Arc<dyn ArtifactAuthenticator>,
        options: ImportOptions,
    ) -> Self {
        let cache = Arc::new(TabulationCache::new());
        let locks = Arc::new(ElectionLocks::new());
        Self {
            election_id,
            definition: Arc::new(definition),
            locator: ExportLocator::new(media, reader.clone()),
            coordinator: ImportCoordinator::new(
                store.clone(),
                reader,
                authenticator,
                cache.clone(),
                locks.clone(),
                options,
            ),
            tabulator: Tabulator::new(store.clone(), cache.clone()),
            store,
            cache,
            locks,
        }
    }

    pub fn election_id(&self) -> Id {
        self.election_id
    }

    pub fn definition(&self) -> &ElectionDefinition {
        &self.definition
    }

    pub async fn list_exports(&self) -> Result<Vec<CvrExportMetadata>, ListExportsError> {
        self.locator.list(&self.definition).await
    }

    pub async fn import_export(&self, path: &Path) -> Result<ImportSummary, ImportError> {
        self.coordinator
            .import(self.election_id, &self.definition, path)
            .await
    }

    pub async fn current_mode(&self) -> Result<FileMode, StoreError> {
        self.store.current_file_mode(self.election_id).await
    }

    /// Delete every export and record of the election, unlocking its mode.
    pub async fn clear_all(&self) -> Result<(), StoreError> {
        let _guard = self.locks.lock(self.election_id).await;
        self.store.clear_cvr_data(self.election_id).await?;
        self.cache.clear().await;
        info!("Cleared all cast vote record data");
        Ok(())
    }

    pub async fn tabulate(
        &self,
        filter: Filter,
        group_by: GroupBy,
    ) -> Result<Arc<AggregateResult>, StoreError> {
        self.tabulator
            .tabulate(self.election_id, &self.definition, filter, group_by)
            .await
    }

    /// Accepted exports, newest first.
    pub async fn list_cvr_files(&self) -> Result<Vec<CvrFileSummary>, StoreError> {
        let files = self.store.list_cvr_files(self.election_id).await?;
        let mut summaries = Vec::with_capacity(files.len());
        for file in files {
            let count = self.store.count_records_for_file(file.id).await?;
            summaries.push(CvrFileSummary::new(file, count));
        }
        Ok(summaries)
    }

    pub async fn list_write_ins(&self) -> Result<Vec<WriteInSummary>, StoreError> {
        let write_ins = self.store.write_ins(self.election_id).await?;
        Ok(write_ins.into_iter().map(WriteInSummary::from).collect())
    }

    /// Record how a write-in should be counted.
    pub async fn adjudicate_write_in(
        &self,
        write_in_id: Id,
        adjudication: WriteInAdjudication,
    ) -> Result<(), AdjudicationError> {
        let _guard = self.locks.lock(self.election_id).await;

        let write_in = self
            .store
            .write_ins(self.election_id)
            .await?
            .into_iter()
            .find(|write_in| write_in.id == write_in_id)
            .ok_or(AdjudicationError::NotFound(write_in_id))?;
        if let WriteInAdjudication::OfficialCandidate { candidate_id } = &adjudication {
            let is_candidate = self
                .definition
                .election
                .contest(&write_in.contest_id)
                .map_or(false, |contest| contest.has_candidate(candidate_id));
            if !is_candidate {
                return Err(AdjudicationError::InvalidCandidate {
                    contest_id: write_in.contest_id.clone(),
                    candidate_id: candidate_id.clone(),
                });
            }
        }

        if !self
            .store
            .adjudicate_write_in(self.election_id, write_in_id, adjudication)
            .await?
        {
            return Err(AdjudicationError::NotFound(write_in_id));
        }
        self.cache.clear().await;
        info!("Adjudicated write-in {write_in_id}");
        Ok(())
    }

    /// Stored manual results, ordered by identifier.
    pub async fn list_manual_results(&self) -> Result<Vec<ManualResultsSummary>, StoreError> {
        let results = self.store.manual_results(self.election_id).await?;
        Ok(results.into_iter().map(ManualResultsSummary::from).collect())
    }

    pub async fn get_manual_results(
        &self,
        identifier: ManualResultsIdentifier,
    ) -> Result<ManualResultsSummary, ManualResultsError> {
        self.store
            .manual_results(self.election_id)
            .await?
            .into_iter()
            .find(|results| results.is_for(&identifier))
            .map(ManualResultsSummary::from)
            .ok_or(ManualResultsError::NotFound(identifier))
    }

    /// Store hand-counted results, replacing any already entered for the same
    /// precinct, ballot style and voting method.
    pub async fn set_manual_results(
        &self,
        identifier: ManualResultsIdentifier,
        results: ManualResults,
    ) -> Result<(), ManualResultsError> {
        validate_manual_results(&self.definition.election, &identifier, &results)?;

        let _guard = self.locks.lock(self.election_id).await;
        let ballot_count = results.ballot_count;
        self.store
            .set_manual_results(NewManualResults::new(
                self.election_id,
                identifier.clone(),
                results,
            ))
            .await?;
        self.cache.clear().await;
        info!(
            "Set manual results for precinct {}, ballot style {}, {} ballots: {ballot_count} ballots counted",
            identifier.precinct_id,
            identifier.ballot_style_id,
            identifier.voting_method.as_str(),
        );
        Ok(())
    }

    pub async fn delete_manual_results(
        &self,
        identifier: ManualResultsIdentifier,
    ) -> Result<(), ManualResultsError> {
        let _guard = self.locks.lock(self.election_id).await;
        if !self
            .store
            .delete_manual_results(self.election_id, &identifier)
            .await?
        {
            return Err(ManualResultsError::NotFound(identifier));
        }
        self.cache.clear().await;
        info!(
            "Deleted manual results for precinct {}, ballot style {}, {} ballots",
            identifier.precinct_id,
            identifier.ballot_style_id,
            identifier.voting_method.as_str(),
        );
        Ok(())
    }

    pub async fn delete_all_manual_results(&self) -> Result<(), StoreError> {
        let _guard = self.locks.lock(self.election_id).await;
        let deleted = self
            .store
            .delete_all_manual_results(self.election_id)
            .await?;
        self.cache.clear().await;
        info!("Deleted {deleted} sets of manual results");
        Ok(())
    }
}
