use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use super::domain::{CheckInId, CheckInSubject, CompanyId, PersonId, TeammateId};
use super::finalizer::{AssignmentOptions, FinalizeRequest};
use super::repository::{ObservableMomentHook, OrganizationReader, PerformanceStore, SnapshotSink};
use super::result::{CheckInError, ErrorKind, ResultEnvelope};
use super::service::{CheckInService, Reviewer, StartCheckIn, SubmissionRequest};
use super::snapshot::SnapshotParams;

type SharedService<S, M, K> = Arc<CheckInService<S, M, K>>;

/// Router builder exposing the check-in lifecycle and snapshot endpoints.
pub fn check_in_router<S, M, K>(service: SharedService<S, M, K>) -> Router
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    Router::new()
        .route("/api/v1/check-ins", post(start_handler::<S, M, K>))
        .route(
            "/api/v1/check-ins/:check_in_id",
            get(check_in_handler::<S, M, K>),
        )
        .route(
            "/api/v1/check-ins/:check_in_id/employee",
            post(employee_handler::<S, M, K>),
        )
        .route(
            "/api/v1/check-ins/:check_in_id/manager",
            post(manager_handler::<S, M, K>),
        )
        .route(
            "/api/v1/check-ins/:check_in_id/finalize",
            post(finalize_handler::<S, M, K>),
        )
        .route(
            "/api/v1/people/:person_id/companies/:company_id/snapshot",
            post(snapshot_handler::<S, M, K>),
        )
        .with_state(service)
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartCheckInPayload {
    pub teammate_id: TeammateId,
    pub subject: CheckInSubject,
    #[serde(default)]
    pub started_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionPayload {
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub rating: Option<String>,
    #[serde(default)]
    pub private_notes: Option<String>,
    #[serde(default)]
    pub actual_energy_percentage: Option<u8>,
    pub completed_by: PersonId,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FinalizePayload {
    #[serde(default, deserialize_with = "deserialize_rating")]
    pub official_rating: Option<String>,
    #[serde(default)]
    pub shared_notes: Option<String>,
    #[serde(default)]
    pub anticipated_energy_percentage: Option<u8>,
    pub finalized_by: PersonId,
    /// Clamped to the current time; a later timestamp is treated as now.
    #[serde(default)]
    pub finalized_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawRating {
    Text(String),
    Score(i64),
}

/// Ratings arrive as `"meeting"`, `"-1"` or a bare number such as `2`.
fn deserialize_rating<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<RawRating>::deserialize(deserializer)?;
    Ok(raw.map(|raw| match raw {
        RawRating::Text(text) => text,
        RawRating::Score(score) => score.to_string(),
    }))
}

pub(crate) fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::NotReady
        | ErrorKind::RatingRequired
        | ErrorKind::InvalidRating
        | ErrorKind::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::NoActiveTenure | ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn respond<T: Serialize>(result: Result<T, CheckInError>) -> Response {
    let status = match &result {
        Ok(_) => StatusCode::OK,
        Err(err) => status_for(err.kind()),
    };
    (status, axum::Json(ResultEnvelope::from(result))).into_response()
}

fn reject(rejection: JsonRejection) -> Response {
    let error = CheckInError::MalformedRequest(rejection.body_text());
    (
        rejection.status(),
        axum::Json(ResultEnvelope::<()>::failure(&error)),
    )
        .into_response()
}

pub(crate) async fn start_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    payload: Result<axum::Json<StartCheckInPayload>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    let axum::Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let request = StartCheckIn {
        teammate_id: payload.teammate_id,
        subject: payload.subject,
        started_on: payload
            .started_on
            .unwrap_or_else(|| Utc::now().date_naive()),
    };
    respond(service.start_check_in(request))
}

pub(crate) async fn check_in_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    Path(check_in_id): Path<String>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    respond(service.check_in(&CheckInId(check_in_id)))
}

pub(crate) async fn employee_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    Path(check_in_id): Path<String>,
    payload: Result<axum::Json<SubmissionPayload>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    submit(&service, check_in_id, Reviewer::Employee, payload)
}

pub(crate) async fn manager_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    Path(check_in_id): Path<String>,
    payload: Result<axum::Json<SubmissionPayload>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    submit(&service, check_in_id, Reviewer::Manager, payload)
}

fn submit<S, M, K>(
    service: &CheckInService<S, M, K>,
    check_in_id: String,
    reviewer: Reviewer,
    payload: Result<axum::Json<SubmissionPayload>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    let axum::Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let submission = SubmissionRequest {
        rating: payload.rating,
        private_notes: payload.private_notes,
        actual_energy_percentage: payload.actual_energy_percentage,
        completed_by: payload.completed_by,
        completed_at: payload.completed_at.unwrap_or_else(Utc::now),
    };
    respond(service.record_submission(&CheckInId(check_in_id), reviewer, submission))
}

pub(crate) async fn finalize_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    Path(check_in_id): Path<String>,
    payload: Result<axum::Json<FinalizePayload>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    let axum::Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => return reject(rejection),
    };
    let now = Utc::now();
    let request = FinalizeRequest {
        official_rating: payload.official_rating,
        shared_notes: payload.shared_notes,
        finalized_by: payload.finalized_by,
        finalized_at: payload.finalized_at.map_or(now, |at| at.min(now)),
    };
    let options = AssignmentOptions {
        anticipated_energy_percentage: payload.anticipated_energy_percentage,
    };
    respond(service.finalize(&CheckInId(check_in_id), &request, options))
}

pub(crate) async fn snapshot_handler<S, M, K>(
    State(service): State<SharedService<S, M, K>>,
    Path((person_id, company_id)): Path<(String, String)>,
    params: Result<axum::Json<SnapshotParams>, JsonRejection>,
) -> Response
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    let axum::Json(params) = match params {
        Ok(params) => params,
        Err(rejection) => return reject(rejection),
    };
    let data = service.build_snapshot(&PersonId(person_id), &CompanyId(company_id), &params);
    (StatusCode::OK, axum::Json(ResultEnvelope::success(data))).into_response()
}
