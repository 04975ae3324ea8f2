use chrono::NaiveDate;
use serde::Serialize;

use super::domain::{CheckInId, CheckInState, CheckInSubject, Dimension, TeammateId, TenureId};
use super::repository::RepositoryError;

/// Every failure the check-in workflow can report.
#[derive(Debug, thiserror::Error)]
pub enum CheckInError {
    #[error("check-in {check_in_id} is {state} and cannot be finalized")]
    NotReady {
        check_in_id: CheckInId,
        state: CheckInState,
    },
    #[error("an official rating is required to finalize a {dimension} check-in")]
    RatingRequired { dimension: Dimension },
    #[error("`{value}` is not a valid {dimension} rating")]
    InvalidRating { dimension: Dimension, value: String },
    #[error("anticipated energy must be between 0 and 100 (found {value})")]
    InvalidEnergy { value: u8 },
    #[error("check-in {check_in_id} is already finalized")]
    AlreadyFinalized { check_in_id: CheckInId },
    #[error("cannot close tenure {tenure_id} on {rated_on}; it started on {started_on}")]
    RatedBeforeTenureStart {
        tenure_id: TenureId,
        started_on: NaiveDate,
        rated_on: NaiveDate,
    },
    #[error("teammate {teammate_id} does not hold {subject}")]
    SubjectNotHeld {
        teammate_id: TeammateId,
        subject: CheckInSubject,
    },
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    #[error("no active {dimension} tenure for teammate {teammate_id}")]
    NoActiveTenure {
        dimension: Dimension,
        teammate_id: TeammateId,
    },
    #[error("check-in {0} not found")]
    CheckInNotFound(CheckInId),
    #[error("teammate {0} not found")]
    TeammateNotFound(TeammateId),
    #[error("check-in {check_in_id} reviews a {found} but was routed to the {expected} finalizer")]
    SubjectMismatch {
        check_in_id: CheckInId,
        expected: Dimension,
        found: Dimension,
    },
    #[error("check-in transaction aborted: {0}")]
    Repository(#[from] RepositoryError),
}

/// Coarse classification used by callers to pick a response or log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotReady,
    RatingRequired,
    InvalidRating,
    InvalidInput,
    NoActiveTenure,
    NotFound,
    Conflict,
    Internal,
}

impl ErrorKind {
    pub const fn label(self) -> &'static str {
        match self {
            ErrorKind::NotReady => "not_ready",
            ErrorKind::RatingRequired => "rating_required",
            ErrorKind::InvalidRating => "invalid_rating",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::NoActiveTenure => "no_active_tenure",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        }
    }

    /// User-input failures: nothing was mutated and the caller should re-prompt.
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            ErrorKind::NotReady
                | ErrorKind::RatingRequired
                | ErrorKind::InvalidRating
                | ErrorKind::InvalidInput
        )
    }
}

impl CheckInError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CheckInError::NotReady { .. } => ErrorKind::NotReady,
            CheckInError::RatingRequired { .. } => ErrorKind::RatingRequired,
            CheckInError::InvalidRating { .. } => ErrorKind::InvalidRating,
            CheckInError::InvalidEnergy { .. }
            | CheckInError::AlreadyFinalized { .. }
            | CheckInError::RatedBeforeTenureStart { .. }
            | CheckInError::SubjectNotHeld { .. }
            | CheckInError::MalformedRequest(_) => ErrorKind::InvalidInput,
            CheckInError::NoActiveTenure { .. } => ErrorKind::NoActiveTenure,
            CheckInError::CheckInNotFound(_) | CheckInError::TeammateNotFound(_) => {
                ErrorKind::NotFound
            }
            CheckInError::Repository(RepositoryError::Conflict(_)) => ErrorKind::Conflict,
            CheckInError::Repository(RepositoryError::NotFound) => ErrorKind::NotFound,
            CheckInError::SubjectMismatch { .. } | CheckInError::Repository(_) => {
                ErrorKind::Internal
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    pub kind: ErrorKind,
    pub message: String,
}

/// Wire form of an operation result: `{"ok": true, "data": ..}` or
/// `{"ok": false, "error": {"kind": .., "message": ..}}`.
#[derive(Debug, Clone, Serialize)]
pub struct ResultEnvelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl<T> ResultEnvelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            ok: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: &CheckInError) -> Self {
        Self {
            ok: false,
            data: None,
            error: Some(ErrorBody {
                kind: error.kind(),
                message: error.to_string(),
            }),
        }
    }
}

impl<T> From<Result<T, CheckInError>> for ResultEnvelope<T> {
    fn from(result: Result<T, CheckInError>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(error) => Self::failure(&error),
        }
    }
}
