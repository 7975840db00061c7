use std::{
    collections::{BTreeSet, HashMap},
    path::Path,
    sync::Arc,
};

use log::{debug, error, info, warn};
use rocket::{
    futures::StreamExt,
    tokio::sync::{Mutex, OwnedMutexGuard},
};

use crate::{
    external::{ArtifactAuthenticator, CvrReader, OpenedExport, RecordStream},
    model::{
        api::ImportSummary,
        common::canonical_votes,
        cvr::{ExportDirectoryName, ParsedRecord, ReportMetadata},
        db::{NewBallotImage, NewCastVoteRecord, NewCvrFile, NewScannerBatch, NewWriteIn},
        election::ElectionDefinition,
        mongodb::Id,
    },
    store::{AddRecordOutcome, CvrStore, CvrTransaction},
    tabulation::TabulationCache,
};

use super::{error::ImportError, flags::adjudication_flags, validation::validate};

/// Safety checks that controlled test environments may turn off.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOptions {
    pub skip_authentication: bool,
    pub skip_election_hash_check: bool,
}

/// One lock per election, serialising everything that mutates its records.
#[derive(Debug, Default)]
pub struct ElectionLocks {
    locks: Mutex<HashMap<Id, Arc<Mutex<()>>>>,
}

impl ElectionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the election's data.
    pub async fn lock(&self, election_id: Id) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .lock()
            .await
            .entry(election_id)
            .or_default()
            .clone();
        lock.lock_owned().await
    }
}

/// Running totals of one import.
#[derive(Debug, Default)]
struct ImportProgress {
    newly_added: u64,
    already_present: u64,
    precinct_ids: BTreeSet<String>,
    scanner_ids: BTreeSet<String>,
}

/// Ingests exports into the store.
#[derive(Clone)]
pub struct ImportCoordinator {
    store: Arc<dyn CvrStore>,
    reader: Arc<dyn CvrReader>,
    authenticator: Arc<dyn ArtifactAuthenticator>,
    cache: Arc<TabulationCache>,
    locks: Arc<ElectionLocks>,
    options: ImportOptions,
}

impl ImportCoordinator {
    pub fn new(
        store: Arc<dyn CvrStore>,
        reader: Arc<dyn CvrReader>,
        authenticator: Arc<dyn ArtifactAuthenticator>,
        cache: Arc<TabulationCache>,
        locks: Arc<ElectionLocks>,
        options: ImportOptions,
    ) -> Self {
        Self {
            store,
            reader,
            authenticator,
            cache,
            locks,
            options,
        }
    }

    /// Import the export at `export_path` into the election.
    ///
    /// Either every record of the export is stored (or found to be stored
    /// already) or the store is left exactly as it was.
    pub async fn import(
        &self,
        election_id: Id,
        definition: &ElectionDefinition,
        export_path: &Path,
    ) -> Result<ImportSummary, ImportError> {
        let result = self.try_import(election_id, definition, export_path).await;
        if let Err(err) = &result {
            match err {
                ImportError::Store(_) => error!("Import of {} failed: {err}", export_path.display()),
                _ => warn!("Rejected export {}: {err}", export_path.display()),
            }
        }
        result
    }

    async fn try_import(
        &self,
        election_id: Id,
        definition: &ElectionDefinition,
        export_path: &Path,
    ) -> Result<ImportSummary, ImportError> {
        if self.options.skip_authentication {
            warn!("Skipping authentication of {}", export_path.display());
        } else {
            self.authenticator.verify(export_path).await?;
        }

        let OpenedExport { metadata, records } = self.reader.read_export(export_path).await?;
        let export_hash = metadata.export_hash();
        let claimed = metadata.file_mode();
        let file_name = export_path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        // Held until the cache has been cleared.
        let _guard = self.locks.lock(election_id).await;

        let current = self.store.current_file_mode(election_id).await?;
        if !current.admits(claimed) {
            return Err(ImportError::InvalidMode { current, claimed });
        }

        if let Some(existing) = self
            .store
            .find_cvr_file_by_hash(election_id, &export_hash)
            .await?
        {
            let already_present = self.store.count_records_for_file(existing.id).await?;
            info!("Export {file_name} was already imported as {}", existing.id);
            return Ok(ImportSummary {
                id: existing.id,
                file_name,
                exported_timestamp: existing.exported_timestamp,
                file_mode: current,
                already_present,
                newly_added: 0,
                was_existing_file: true,
            });
        }

        let exported_timestamp = file_name
            .parse::<ExportDirectoryName>()
            .map(|name| name.timestamp)
            .unwrap_or(metadata.generated_timestamp);
        let file = NewCvrFile {
            election_id,
            exported_timestamp,
            filename: file_name.clone(),
            is_test_mode: metadata.is_test_mode,
            scanner_ids: metadata.scanner_ids(),
            precinct_ids: BTreeSet::new(),
            sha256_hash: export_hash,
            created_at: chrono::Utc::now(),
        };

        let mut transaction = self.store.begin(election_id).await?;
        let ingested = self
            .ingest(
                transaction.as_mut(),
                election_id,
                definition,
                export_path,
                &metadata,
                file,
                records,
            )
            .await;
        let (file_id, progress) = match ingested {
            Ok(ingested) => ingested,
            Err(err) => {
                if let Err(rollback_err) = transaction.rollback().await {
                    error!("Failed to roll back import of {file_name}: {rollback_err}");
                }
                return Err(err);
            }
        };
        transaction.commit().await?;
        self.cache.clear().await;

        info!(
            "Imported {file_name}: {} new, {} already present",
            progress.newly_added, progress.already_present
        );
        Ok(ImportSummary {
            id: file_id,
            file_name,
            exported_timestamp,
            file_mode: claimed,
            already_present: progress.already_present,
            newly_added: progress.newly_added,
            was_existing_file: false,
        })
    }

    /// Stage the whole export in the transaction.
    #[allow(clippy::too_many_arguments)]
    async fn ingest(
        &self,
        transaction: &mut dyn CvrTransaction,
        election_id: Id,
        definition: &ElectionDefinition,
        export_path: &Path,
        metadata: &ReportMetadata,
        file: NewCvrFile,
        mut records: RecordStream,
    ) -> Result<(Id, ImportProgress), ImportError> {
        for batch in &metadata.batches {
            transaction
                .upsert_scanner_batch(NewScannerBatch::new(election_id, batch))
                .await?;
        }
        let file_id = transaction.insert_cvr_file(file).await?;

        let mut progress = ImportProgress::default();
        let mut index = 0;
        while let Some(parsed) = records.next().await {
            let record = parsed.map_err(|error| ImportError::MalformedRecord { index, error })?;
            validate(
                &record,
                definition,
                metadata,
                self.options.skip_election_hash_check,
            )
            .map_err(|error| ImportError::InvalidRecord { index, error })?;

            progress.precinct_ids.insert(record.precinct_id.clone());
            progress.scanner_ids.insert(record.scanner_id.clone());

            let votes = canonical_votes(record.votes.clone());
            let new_record = NewCastVoteRecord {
                election_id,
                ballot_id: record.ballot_id.clone(),
                ballot_style_id: record.ballot_style_id.clone(),
                precinct_id: record.precinct_id.clone(),
                batch_id: record.batch_id.clone(),
                scanner_id: record.scanner_id.clone(),
                voting_method: record.voting_method,
                card: record.card(),
                flags: adjudication_flags(&votes, &definition.election),
                votes,
                cvr_file_ids: BTreeSet::new(),
            };

            match transaction.add_cast_vote_record(file_id, new_record).await? {
                AddRecordOutcome::Inserted(record_id) => {
                    progress.newly_added += 1;
                    self.store_write_ins(transaction, election_id, export_path, index, record_id, &record)
                        .await?;
                }
                AddRecordOutcome::Duplicate(record_id) => {
                    debug!("Record {} is already stored as {record_id}", record.ballot_id);
                    progress.already_present += 1;
                }
                AddRecordOutcome::Conflict => {
                    return Err(ImportError::BallotIdConflict { index });
                }
            }
            index += 1;
        }

        transaction
            .finish_cvr_file(
                file_id,
                progress.precinct_ids.clone(),
                progress.scanner_ids.clone(),
            )
            .await?;
        Ok((file_id, progress))
    }

    /// Store the page images and write-ins of a hand-marked record with
    /// located write-in marks. Other records have nothing to store.
    async fn store_write_ins(
        &self,
        transaction: &mut dyn CvrTransaction,
        election_id: Id,
        export_path: &Path,
        index: usize,
        record_id: Id,
        record: &ParsedRecord,
    ) -> Result<(), ImportError> {
        if !record.card().is_hand_marked() || record.marked_write_ins().next().is_none() {
            return Ok(());
        }

        for image in &record.images {
            let page = self
                .reader
                .read_page_image(export_path, image)
                .await
                .map_err(|error| ImportError::ImageRead { index, error })?;
            transaction
                .add_ballot_image(NewBallotImage::new(election_id, record_id, page))
                .await?;
        }
        for mark in record.marked_write_ins() {
            let Some(side) = mark.side else {
                continue;
            };
            transaction
                .add_write_in(NewWriteIn::new(
                    election_id,
                    record_id,
                    mark.contest_id.clone(),
                    mark.option_id.clone(),
                    side,
                    mark.is_unmarked,
                ))
                .await?;
        }
        Ok(())
    }
}
