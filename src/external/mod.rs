//! Collaborators the import pipeline consumes but does not own: export
//! decoding, artifact authentication and removable media enumeration.
//!
//! Each has a filesystem implementation used by the server binary.

use std::path::{Path, PathBuf};

use rocket::futures::stream::BoxStream;
use thiserror::Error;

use crate::model::cvr::{PageImage, PageImageRef, ParsedRecord, ReportMetadata};

mod fs_media;
mod fs_reader;
mod hmac_auth;

#[cfg(test)]
pub(crate) mod fakes;

pub use fs_media::FsMediaLister;
pub use fs_reader::{FsCvrReader, METADATA_FILE_NAME, RECORDS_FILE_NAME};
#[cfg(test)]
pub(crate) use fs_reader::testing;
pub use hmac_auth::{sign_metadata, HmacAuthenticator, SIGNATURE_FILE_NAME};

/// The records of an export, in the order they were written.
///
/// Single-pass: once exhausted (or failed) it cannot be restarted; open the
/// export again instead.
pub type RecordStream = BoxStream<'static, Result<ParsedRecord, RecordParseError>>;

/// An export opened for import.
pub struct OpenedExport {
    pub metadata: ReportMetadata,
    pub records: RecordStream,
}

/// Failure to read part of an export.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("No metadata file at {0}")]
    MetadataNotFound(PathBuf),
    #[error("Failed to parse metadata file: {0}")]
    MetadataParse(String),
    #[error("No such file: {0}")]
    FileNotFound(PathBuf),
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },
    #[error("Invalid layout file {path}: {reason}")]
    InvalidLayout { path: PathBuf, reason: String },
    #[error("Path {0} points outside the export")]
    PathOutsideExport(String),
}

impl ReadError {
    /// Stable, machine-readable name of the failure.
    pub fn subtype(&self) -> &'static str {
        match self {
            Self::MetadataNotFound(_) => "metadata-file-not-found",
            Self::MetadataParse(_) => "metadata-file-parse-error",
            Self::FileNotFound(_) => "file-not-found",
            Self::Io { .. } => "file-read-error",
            Self::InvalidLayout { .. } => "invalid-layout",
            Self::PathOutsideExport(_) => "invalid-file-location",
        }
    }
}

/// A record that could not be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct RecordParseError(pub String);

/// Decodes exports.
#[rocket::async_trait]
pub trait CvrReader: Send + Sync {
    async fn read_export_metadata(&self, export_path: &Path) -> Result<ReportMetadata, ReadError>;

    /// Read the metadata and prepare, without reading, the record stream.
    async fn read_export(&self, export_path: &Path) -> Result<OpenedExport, ReadError>;

    async fn read_page_image(
        &self,
        export_path: &Path,
        image: &PageImageRef,
    ) -> Result<PageImage, ReadError>;
}

/// Signature verification failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct AuthenticationError(pub String);

/// Checks that an export was produced by a trusted machine.
#[rocket::async_trait]
pub trait ArtifactAuthenticator: Send + Sync {
    async fn verify(&self, export_path: &Path) -> Result<(), AuthenticationError>;
}

/// A directory entry on removable media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub name: String,
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Failure to list a path on removable media.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MediaError {
    #[error("No removable media present")]
    NoMedia,
    #[error("{0} does not exist")]
    NotFound(PathBuf),
    #[error("{0} is not a directory")]
    NotDirectory(PathBuf),
    #[error("Permission denied reading {0}")]
    PermissionDenied(PathBuf),
    #[error("Failed to read {path}: {reason}")]
    Io { path: PathBuf, reason: String },
}

/// Enumerates removable media.
#[rocket::async_trait]
pub trait MediaLister: Send + Sync {
    /// List the entries under a path relative to the media root.
    async fn list(&self, relative_path: &Path) -> Result<Vec<MediaEntry>, MediaError>;
}
