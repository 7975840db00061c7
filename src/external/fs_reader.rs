use std::{
    io::ErrorKind,
    path::{Component, Path, PathBuf},
};

use rocket::{
    futures::{stream, StreamExt},
    tokio::{
        fs::{self, File},
        io::{AsyncBufReadExt, BufReader, Lines},
    },
};

use log::warn;

use crate::model::cvr::{PageImage, PageImageRef, ParsedRecord, RecordRootHasher, ReportMetadata};

use super::{CvrReader, OpenedExport, ReadError, RecordParseError, RecordStream};

/// Report metadata file within an export directory.
pub const METADATA_FILE_NAME: &str = "metadata.json";
/// One JSON-encoded record per line.
pub const RECORDS_FILE_NAME: &str = "cast-vote-records.jsonl";

/// Reads exports laid out as plain files in a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsCvrReader;

/// Progress through the records file.
enum LineState {
    Unopened {
        path: PathBuf,
        expected_root_hash: String,
    },
    Open {
        lines: Lines<BufReader<File>>,
        hasher: RecordRootHasher,
        expected_root_hash: String,
    },
    Done,
}

impl FsCvrReader {
    /// A lazily-read stream over the records file. The file is not opened
    /// until the first record is requested.
    ///
    /// Once every line has been read, the records are checked against the
    /// metadata's record root hash; a mismatch is the stream's last item.
    fn record_stream(path: PathBuf, expected_root_hash: String) -> RecordStream {
        stream::unfold(
            LineState::Unopened {
                path,
                expected_root_hash,
            },
            |state| async move {
                let (mut lines, mut hasher, expected_root_hash) = match state {
                    LineState::Unopened {
                        path,
                        expected_root_hash,
                    } => match File::open(&path).await {
                        Ok(file) => (
                            BufReader::new(file).lines(),
                            RecordRootHasher::new(),
                            expected_root_hash,
                        ),
                        Err(e) => {
                            let error = RecordParseError(format!(
                                "Failed to open {}: {e}",
                                path.display()
                            ));
                            return Some((Err(error), LineState::Done));
                        }
                    },
                    LineState::Open {
                        lines,
                        hasher,
                        expected_root_hash,
                    } => (lines, hasher, expected_root_hash),
                    LineState::Done => return None,
                };
                loop {
                    match lines.next_line().await {
                        Ok(Some(line)) if line.trim().is_empty() => continue,
                        Ok(Some(line)) => {
                            hasher.update(&line);
                            let record = serde_json::from_str::<ParsedRecord>(&line)
                                .map_err(|e| RecordParseError(e.to_string()));
                            let state = LineState::Open {
                                lines,
                                hasher,
                                expected_root_hash,
                            };
                            return Some((record, state));
                        }
                        Ok(None) => {
                            let actual = hasher.finish();
                            if actual == expected_root_hash {
                                return None;
                            }
                            warn!(
                                "Record root hash mismatch: expected {expected_root_hash}, read {actual}"
                            );
                            let error = RecordParseError(
                                "Records do not match the export's record root hash".to_string(),
                            );
                            return Some((Err(error), LineState::Done));
                        }
                        Err(e) => {
                            let error = RecordParseError(format!("Failed to read record: {e}"));
                            return Some((Err(error), LineState::Done));
                        }
                    }
                }
            },
        )
        .boxed()
    }
}

/// Resolve a path found inside an export, refusing anything that could
/// point outside of it.
fn resolve_within(export_path: &Path, relative: &str) -> Result<PathBuf, ReadError> {
    let relative_path = Path::new(relative);
    let contained = !relative.is_empty()
        && relative_path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if !contained {
        return Err(ReadError::PathOutsideExport(relative.to_string()));
    }
    Ok(export_path.join(relative_path))
}

/// Read a whole file, distinguishing a missing file from other failures.
async fn read_file(path: &Path) -> Result<Vec<u8>, ReadError> {
    fs::read(path).await.map_err(|e| match e.kind() {
        ErrorKind::NotFound => ReadError::FileNotFound(path.to_path_buf()),
        _ => ReadError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    })
}

#[rocket::async_trait]
impl CvrReader for FsCvrReader {
    async fn read_export_metadata(&self, export_path: &Path) -> Result<ReportMetadata, ReadError> {
        let path = export_path.join(METADATA_FILE_NAME);
        let data = read_file(&path).await.map_err(|e| match e {
            ReadError::FileNotFound(path) => ReadError::MetadataNotFound(path),
            other => other,
        })?;
        serde_json::from_slice(&data).map_err(|e| ReadError::MetadataParse(e.to_string()))
    }

    async fn read_export(&self, export_path: &Path) -> Result<OpenedExport, ReadError> {
        let metadata = self.read_export_metadata(export_path).await?;
        let records = Self::record_stream(
            export_path.join(RECORDS_FILE_NAME),
            metadata.record_root_hash.clone(),
        );
        Ok(OpenedExport { metadata, records })
    }

    async fn read_page_image(
        &self,
        export_path: &Path,
        image: &PageImageRef,
    ) -> Result<PageImage, ReadError> {
        let image_path = resolve_within(export_path, &image.image_path)?;
        let layout_path = resolve_within(export_path, &image.layout_path)?;

        let image_data = read_file(&image_path).await?;
        let layout_data = read_file(&layout_path).await?;
        let layout: serde_json::Value =
            serde_json::from_slice(&layout_data).map_err(|e| ReadError::InvalidLayout {
                path: layout_path.clone(),
                reason: e.to_string(),
            })?;
        if !layout.is_object() {
            return Err(ReadError::InvalidLayout {
                path: layout_path,
                reason: "expected a JSON object".to_string(),
            });
        }

        Ok(PageImage {
            side: image.side,
            image: image_data,
            layout,
        })
    }
}
