use log::{error, warn};
use rocket::{
    http::Status,
    response::{self, Responder},
    serde::json::Json,
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::{
    external::ReadError,
    import::{ImportError, ListExportsError},
    logging::RequestId,
    service::AdjudicationError,
    store::StoreError,
    tabulation::ManualResultsError,
};

pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned by request handlers.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    ListExports(#[from] ListExportsError),
    #[error(transparent)]
    Adjudication(#[from] AdjudicationError),
    #[error(transparent)]
    ManualResults(#[from] ManualResultsError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("{1}")]
    Status(Status, String),
}

impl Error {
    pub fn not_found(what: String) -> Self {
        Self::Status(Status::NotFound, format!("{what} not found"))
    }

    fn status(&self) -> Status {
        match self {
            Self::Import(err) => match err {
                ImportError::Store(_) => Status::InternalServerError,
                ImportError::InvalidMode { .. } | ImportError::BallotIdConflict { .. } => {
                    Status::Conflict
                }
                ImportError::Read(ReadError::MetadataNotFound(_)) => Status::NotFound,
                _ => Status::UnprocessableEntity,
            },
            Self::ListExports(err) => match err {
                ListExportsError::NoMedia => Status::NotFound,
                ListExportsError::NotDirectory(_) => Status::UnprocessableEntity,
                ListExportsError::PermissionDenied(_) => Status::Forbidden,
                ListExportsError::Io { .. } => Status::InternalServerError,
            },
            Self::Adjudication(err) => match err {
                AdjudicationError::NotFound(_) => Status::NotFound,
                AdjudicationError::InvalidCandidate { .. } => Status::UnprocessableEntity,
                AdjudicationError::Store(_) => Status::InternalServerError,
            },
            Self::ManualResults(err) => match err {
                ManualResultsError::NotFound(_) => Status::NotFound,
                ManualResultsError::Store(_) => Status::InternalServerError,
                _ => Status::UnprocessableEntity,
            },
            Self::Store(_) => Status::InternalServerError,
            Self::Status(status, _) => *status,
        }
    }

    fn body(&self) -> ErrorBody {
        let (kind, index, detail) = match self {
            Self::Import(err) => (err.subtype(), err.index(), err.detail()),
            Self::ListExports(err) => (err.subtype(), None, None),
            Self::Adjudication(AdjudicationError::NotFound(_)) => ("write-in-not-found", None, None),
            Self::Adjudication(AdjudicationError::InvalidCandidate { .. }) => {
                ("invalid-candidate", None, None)
            }
            Self::ManualResults(err) => (err.subtype(), None, None),
            Self::Adjudication(AdjudicationError::Store(_)) | Self::Store(_) => {
                ("store-error", None, None)
            }
            Self::Status(..) => ("request-error", None, None),
        };
        ErrorBody {
            kind,
            message: self.to_string(),
            index,
            detail,
        }
    }
}

/// JSON body of an error response.
#[derive(Debug, Serialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    index: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<&'static str>,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, request: &'r Request<'_>) -> response::Result<'o> {
        let status = self.status();
        let id = RequestId::of(request);
        if status.class().is_server_error() {
            error!("req{id} failed: {self}");
        } else {
            warn!("req{id} rejected: {self}");
        }
        (status, Json(self.body())).respond_to(request)
    }
}
