use std::{
    io::{Error as IoError, ErrorKind},
    path::{Path, PathBuf},
};

use rocket::tokio::fs;

use super::{MediaEntry, MediaError, MediaLister};

/// Lists removable media mounted at a fixed directory.
#[derive(Debug, Clone)]
pub struct FsMediaLister {
    mount_point: PathBuf,
}

impl FsMediaLister {
    pub fn new(mount_point: impl Into<PathBuf>) -> Self {
        Self {
            mount_point: mount_point.into(),
        }
    }
}

fn media_error(path: &Path, e: IoError) -> MediaError {
    match e.kind() {
        ErrorKind::NotFound => MediaError::NotFound(path.to_path_buf()),
        ErrorKind::PermissionDenied => MediaError::PermissionDenied(path.to_path_buf()),
        _ => MediaError::Io {
            path: path.to_path_buf(),
            reason: e.to_string(),
        },
    }
}

#[rocket::async_trait]
impl MediaLister for FsMediaLister {
    async fn list(&self, relative_path: &Path) -> Result<Vec<MediaEntry>, MediaError> {
        if fs::metadata(&self.mount_point).await.is_err() {
            return Err(MediaError::NoMedia);
        }

        let path = self.mount_point.join(relative_path);
        let metadata = fs::metadata(&path)
            .await
            .map_err(|e| media_error(&path, e))?;
        if !metadata.is_dir() {
            return Err(MediaError::NotDirectory(path));
        }

        let mut entries = Vec::new();
        let mut dir = fs::read_dir(&path)
            .await
            .map_err(|e| media_error(&path, e))?;
        while let Some(entry) = dir.next_entry().await.map_err(|e| media_error(&path, e))? {
            let is_dir = entry
                .file_type()
                .await
                .map(|file_type| file_type.is_dir())
                .unwrap_or(false);
            entries.push(MediaEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                path: entry.path(),
                is_dir,
            });
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[rocket::async_test]
    async fn list_outcomes() {
        let media = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(media.path().join("exports/one")).unwrap();
        std::fs::write(media.path().join("exports/file.txt"), "").unwrap();
        let lister = FsMediaLister::new(media.path());

        let mut entries = lister.list(Path::new("exports")).await.unwrap();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, "file.txt");
        assert!(!entries[0].is_dir);
        assert_eq!(entries[1].name, "one");
        assert!(entries[1].is_dir);

        assert!(matches!(
            lister.list(Path::new("missing")).await,
            Err(MediaError::NotFound(_))
        ));
        assert!(matches!(
            lister.list(Path::new("exports/file.txt")).await,
            Err(MediaError::NotDirectory(_))
        ));

        let unmounted = FsMediaLister::new(media.path().join("nothing-here"));
        assert_eq!(
            unmounted.list(Path::new("exports")).await,
            Err(MediaError::NoMedia)
        );
    }
}
