use std::{path::Path, sync::Arc};

use log::{debug, info, warn};

use crate::{
    external::{CvrReader, MediaError, MediaLister},
    model::{
        cvr::{CvrExportMetadata, ExportDirectoryName},
        election::{ElectionDefinition, RESULTS_ROOT_FOLDER},
    },
};

use super::error::ListExportsError;

/// Finds the exports for an election on removable media.
#[derive(Clone)]
pub struct ExportLocator {
    media: Arc<dyn MediaLister>,
    reader: Arc<dyn CvrReader>,
}

impl ExportLocator {
    pub fn new(media: Arc<dyn MediaLister>, reader: Arc<dyn CvrReader>) -> Self {
        Self { media, reader }
    }

    /// Summarise every export in the election's results folder, newest first.
    ///
    /// A missing results folder is an empty listing. Directories that are not
    /// named like exports, and exports whose metadata cannot be read, are
    /// skipped.
    pub async fn list(
        &self,
        definition: &ElectionDefinition,
    ) -> Result<Vec<CvrExportMetadata>, ListExportsError> {
        let folder = Path::new(RESULTS_ROOT_FOLDER).join(definition.results_folder_name());
        let listing = match self.media.list(&folder).await {
            Ok(entries) => Ok(entries),
            Err(MediaError::NotFound(path)) => {
                info!("No exports folder at {}", path.display());
                return Ok(Vec::new());
            }
            Err(MediaError::NoMedia) => Err(ListExportsError::NoMedia),
            Err(MediaError::NotDirectory(path)) => Err(ListExportsError::NotDirectory(path)),
            Err(MediaError::PermissionDenied(path)) => Err(ListExportsError::PermissionDenied(path)),
            Err(MediaError::Io { path, reason }) => Err(ListExportsError::Io { path, reason }),
        };
        let entries = listing.map_err(|err| {
            warn!("Failed to list exports: {err}");
            err
        })?;

        let mut exports = Vec::new();
        for entry in entries.into_iter().filter(|entry| entry.is_dir) {
            let Ok(name) = entry.name.parse::<ExportDirectoryName>() else {
                debug!("Skipping unrelated directory {}", entry.name);
                continue;
            };
            let metadata = match self.reader.read_export_metadata(&entry.path).await {
                Ok(metadata) => metadata,
                Err(err) => {
                    warn!("Skipping export {}: {err}", entry.name);
                    continue;
                }
            };
            exports.push(CvrExportMetadata {
                export_hash: metadata.export_hash(),
                export_timestamp: name.timestamp,
                generated_timestamp: metadata.generated_timestamp,
                is_test_mode: metadata.is_test_mode,
                machine_id: name.machine_id,
                scanner_ids: metadata.scanner_ids(),
                cvr_count: metadata.declared_sheet_count(),
                name: entry.name,
                path: entry.path,
            });
        }

        exports.sort_by(|a, b| b.export_timestamp.cmp(&a.export_timestamp));
        Ok(exports)
    }
}
