use mongodb::bson::oid::Error as OidError;
use rocket::{
    http::Status,
    response::{self, status::Custom, Responder},
    serde::json::{Error as JsonError, Json},
    Request,
};
use serde::Serialize;
use thiserror::Error;

use crate::model::{
    common::{IdempotencyKey, VoterIdError},
    mongodb::Id,
};
use crate::store::StoreError;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed voter ID or candidate reference; storage was not touched.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Voter ID unknown or flagged ineligible.
    #[error("Voter is not eligible to vote")]
    NotEligible,
    #[error("Candidate with ID '{0}' not found")]
    CandidateNotFound(Id),
    /// The status transition did not happen, either because of an earlier
    /// vote or because a concurrent request won. The two are deliberately
    /// indistinguishable.
    #[error("Voter has already voted")]
    AlreadyVoted,
    #[error("Storage temporarily unavailable, try again: {0}")]
    TransientStore(StoreError),
    /// The voter is marked as voted but their ballot could not be stored.
    #[error(
        "Vote status recorded but ballot for candidate '{candidate_id}' \
         (key {key}) could not be stored; flagged for reconciliation"
    )]
    InternalInconsistency {
        candidate_id: Id,
        key: IdempotencyKey,
    },
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn invalid_input(what: impl ToString) -> Self {
        Self::InvalidInput(what.to_string())
    }

    /// Short machine-readable name of the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::NotEligible => "not_eligible",
            Self::CandidateNotFound(_) => "candidate_not_found",
            Self::AlreadyVoted => "already_voted",
            Self::TransientStore(_) => "transient_store_error",
            Self::InternalInconsistency { .. } => "internal_inconsistency",
            Self::Internal(_) => "internal",
        }
    }

    /// Whether the caller may reasonably try the same request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransientStore(_))
    }

    pub fn status(&self) -> Status {
        match self {
            Self::InvalidInput(_) => Status::BadRequest,
            Self::NotEligible => Status::Forbidden,
            Self::CandidateNotFound(_) => Status::NotFound,
            Self::AlreadyVoted => Status::Conflict,
            Self::TransientStore(_) => Status::ServiceUnavailable,
            Self::InternalInconsistency { .. } | Self::Internal(_) => Status::InternalServerError,
        }
    }
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        if err.is_transient() {
            Self::TransientStore(err)
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<VoterIdError> for Error {
    fn from(err: VoterIdError) -> Self {
        Self::invalid_input(err)
    }
}

impl From<OidError> for Error {
    fn from(err: OidError) -> Self {
        Self::invalid_input(format!("candidate ID: {err}"))
    }
}

impl From<JsonError<'_>> for Error {
    fn from(err: JsonError<'_>) -> Self {
        Self::invalid_input(format!("malformed request body: {err}"))
    }
}

/// JSON body sent alongside an error status.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: &'static str,
    detail: String,
    retryable: bool,
}

impl<'r, 'o: 'r> Responder<'r, 'o> for Error {
    fn respond_to(self, req: &'r Request<'_>) -> response::Result<'o> {
        let body = ErrorBody {
            error: self.kind(),
            detail: self.to_string(),
            retryable: self.is_retryable(),
        };
        Custom(self.status(), Json(body)).respond_to(req)
    }
}
