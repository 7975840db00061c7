//! In-memory collaborators for tests.

use std::{
    collections::{HashMap, HashSet},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
};

use rocket::futures::{stream, StreamExt};

use crate::model::{
    cvr::{PageImage, PageImageRef, ParsedRecord, ReportMetadata},
    election::{ElectionDefinition, RESULTS_ROOT_FOLDER},
};

use super::{
    ArtifactAuthenticator, AuthenticationError, CvrReader, MediaEntry, MediaError, MediaLister,
    OpenedExport, ReadError, RecordParseError,
};

/// An export served by [`FakeReader`].
#[derive(Debug, Clone)]
pub struct FakeExport {
    pub metadata: ReportMetadata,
    pub records: Vec<Result<ParsedRecord, RecordParseError>>,
    /// Image paths that fail to read.
    pub missing_images: HashSet<String>,
}

impl FakeExport {
    pub fn new(metadata: ReportMetadata, records: Vec<ParsedRecord>) -> Self {
        Self {
            metadata,
            records: records.into_iter().map(Ok).collect(),
            missing_images: HashSet::new(),
        }
    }
}

/// Serves exports from memory and counts how many records were consumed.
#[derive(Debug, Clone, Default)]
pub struct FakeReader {
    exports: Arc<Mutex<HashMap<PathBuf, FakeExport>>>,
    records_read: Arc<AtomicUsize>,
}

impl FakeReader {
    pub fn add_export(&self, path: impl Into<PathBuf>, export: FakeExport) {
        self.exports.lock().unwrap().insert(path.into(), export);
    }

    /// Total records pulled from any record stream so far.
    pub fn records_read(&self) -> usize {
        self.records_read.load(Ordering::SeqCst)
    }

    fn export(&self, path: &Path) -> Result<FakeExport, ReadError> {
        self.exports
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| ReadError::MetadataNotFound(path.to_path_buf()))
    }
}

#[rocket::async_trait]
impl CvrReader for FakeReader {
    async fn read_export_metadata(&self, export_path: &Path) -> Result<ReportMetadata, ReadError> {
        Ok(self.export(export_path)?.metadata)
    }

    async fn read_export(&self, export_path: &Path) -> Result<OpenedExport, ReadError> {
        let export = self.export(export_path)?;
        let counter = self.records_read.clone();
        let records = stream::iter(export.records)
            .inspect(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .boxed();
        Ok(OpenedExport {
            metadata: export.metadata,
            records,
        })
    }

    async fn read_page_image(
        &self,
        export_path: &Path,
        image: &PageImageRef,
    ) -> Result<PageImage, ReadError> {
        let export = self.export(export_path)?;
        if export.missing_images.contains(&image.image_path) {
            return Err(ReadError::FileNotFound(export_path.join(&image.image_path)));
        }
        Ok(PageImage {
            side: image.side,
            image: image.image_path.as_bytes().to_vec(),
            layout: serde_json::json!({ "source": image.layout_path }),
        })
    }
}

/// Accepts every export except those explicitly rejected.
#[derive(Debug, Clone, Default)]
pub struct FakeAuthenticator {
    rejected: Arc<Mutex<HashSet<PathBuf>>>,
}

impl FakeAuthenticator {
    pub fn reject(&self, path: impl Into<PathBuf>) {
        self.rejected.lock().unwrap().insert(path.into());
    }
}

#[rocket::async_trait]
impl ArtifactAuthenticator for FakeAuthenticator {
    async fn verify(&self, export_path: &Path) -> Result<(), AuthenticationError> {
        if self.rejected.lock().unwrap().contains(export_path) {
            Err(AuthenticationError("Signature does not match".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Returns a fixed listing for every path.
#[derive(Debug, Clone)]
pub struct FakeMedia {
    pub listing: Result<Vec<MediaEntry>, MediaError>,
}

impl FakeMedia {
    /// Media holding directories with the given names under `root`.
    pub fn with_directories(root: &Path, names: &[&str]) -> Self {
        let entries = names
            .iter()
            .map(|name| MediaEntry {
                name: name.to_string(),
                path: root.join(name),
                is_dir: true,
            })
            .collect();
        Self {
            listing: Ok(entries),
        }
    }
}

#[rocket::async_trait]
impl MediaLister for FakeMedia {
    async fn list(&self, _relative_path: &Path) -> Result<Vec<MediaEntry>, MediaError> {
        self.listing.clone()
    }
}

/// Media holding one test-mode export for the given election, and a reader
/// serving it. The export has three records: `ballot-1` and `ballot-3` are
/// machine-marked votes for `alice` and `bob`, `ballot-2` a hand-marked
/// write-in for mayor.
pub fn example_media(definition: &ElectionDefinition) -> (FakeMedia, FakeReader) {
    const NAME: &str = "TEST__machine_0001__2023-11-07_20-15-00";
    let root = Path::new("/media")
        .join(RESULTS_ROOT_FOLDER)
        .join(definition.results_folder_name());

    let hash = &definition.election_hash;
    let mut bob = ParsedRecord::example("ballot-3", hash);
    bob.votes.insert("mayor".to_string(), vec!["bob".to_string()]);
    let records = vec![
        ParsedRecord::example("ballot-1", hash),
        ParsedRecord::example_with_write_in("ballot-2", hash),
        bob,
    ];
    let mut metadata = ReportMetadata::example(records.len() as u64);
    metadata.election_hash = hash.clone();

    let reader = FakeReader::default();
    reader.add_export(root.join(NAME), FakeExport::new(metadata, records));
    (FakeMedia::with_directories(&root, &[NAME]), reader)
}
