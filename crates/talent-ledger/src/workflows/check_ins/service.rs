use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use super::domain::{
    AspirationId, CheckIn, CheckInId, CheckInSubject, CompanyId, Dimension, PersonId, Rating,
    Teammate, TeammateId,
};
use super::finalizer::{
    AspirationCheckInFinalizer, AspirationFinalization, AssignmentCheckInFinalizer,
    AssignmentFinalization, AssignmentOptions, FinalizeRequest, PositionCheckInFinalizer,
    PositionFinalization,
};
use super::repository::{
    ObservableMomentHook, OrganizationReader, PerformanceStore, SnapshotSink,
};
use super::result::{CheckInError, ErrorKind};
use super::snapshot::{SnapshotBuilder, SnapshotData, SnapshotParams, SnapshotRecord};
use crate::config::FinalizationConfig;

/// Request to open (or fetch the already open) check-in for a teammate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StartCheckIn {
    pub teammate_id: TeammateId,
    pub subject: CheckInSubject,
    pub started_on: NaiveDate,
}

/// One reviewer's half of a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionRequest {
    pub rating: Option<String>,
    pub private_notes: Option<String>,
    /// Employee-reported energy; kept only on assignment check-ins.
    pub actual_energy_percentage: Option<u8>,
    pub completed_by: PersonId,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reviewer {
    Employee,
    Manager,
}

/// Outcome of [`CheckInService::finalize`], tagged by dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum FinalizedCheckIn {
    Assignment(AssignmentFinalization),
    Position(PositionFinalization),
    Aspiration(AspirationFinalization),
}

impl FinalizedCheckIn {
    pub fn check_in(&self) -> &CheckIn {
        match self {
            FinalizedCheckIn::Assignment(outcome) => &outcome.check_in,
            FinalizedCheckIn::Position(outcome) => &outcome.check_in,
            FinalizedCheckIn::Aspiration(outcome) => &outcome.check_in,
        }
    }
}

/// Facade the HTTP layer and jobs call into: check-in lifecycle, the three
/// finalizers, and snapshot hand-off to the audit sink.
pub struct CheckInService<S, M, K> {
    store: Arc<S>,
    sink: Arc<K>,
    assignment: AssignmentCheckInFinalizer,
    position: PositionCheckInFinalizer,
    aspiration: AspirationCheckInFinalizer<M>,
    snapshots: SnapshotBuilder<S>,
    settings: FinalizationConfig,
}

static CHECK_IN_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_check_in_id() -> CheckInId {
    let id = CHECK_IN_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    CheckInId(format!("check-in-{id:06}"))
}

impl<S, M, K> CheckInService<S, M, K>
where
    S: PerformanceStore + OrganizationReader + 'static,
    M: ObservableMomentHook + 'static,
    K: SnapshotSink + 'static,
{
    pub fn new(store: Arc<S>, moments: Arc<M>, sink: Arc<K>, settings: FinalizationConfig) -> Self {
        Self {
            snapshots: SnapshotBuilder::new(store.clone()),
            store,
            sink,
            assignment: AssignmentCheckInFinalizer,
            position: PositionCheckInFinalizer,
            aspiration: AspirationCheckInFinalizer::new(moments),
            settings,
        }
    }

    /// Return the open check-in for the pair, creating one if none exists.
    ///
    /// The teammate must currently hold the subject: an open tenure for an
    /// assignment or position, or an aspiration defined by their company.
    pub fn start_check_in(&self, request: StartCheckIn) -> Result<CheckIn, CheckInError> {
        let teammate = self
            .store
            .teammate(&request.teammate_id)?
            .ok_or_else(|| CheckInError::TeammateNotFound(request.teammate_id.clone()))?;
        self.ensure_subject_held(&teammate, &request.subject)?;

        self.store.transaction(|tx| {
            if let Some(open) = tx.open_check_in(&request.teammate_id, &request.subject)? {
                return Ok(open);
            }

            let check_in = tx.insert_check_in(CheckIn::open(
                next_check_in_id(),
                request.teammate_id.clone(),
                request.subject.clone(),
                request.started_on,
            ))?;
            info!(
                check_in_id = %check_in.id,
                teammate_id = %check_in.teammate_id,
                dimension = %check_in.dimension(),
                "check-in opened"
            );
            Ok(check_in)
        })
    }

    fn ensure_subject_held(
        &self,
        teammate: &Teammate,
        subject: &CheckInSubject,
    ) -> Result<(), CheckInError> {
        let held = match subject {
            CheckInSubject::Assignment { assignment_id } => self
                .store
                .active_assignment_tenures(&teammate.id)?
                .iter()
                .any(|tenure| &tenure.assignment_id == assignment_id),
            CheckInSubject::Position => self
                .store
                .active_employment_tenure(&teammate.id)?
                .is_some(),
            CheckInSubject::Aspiration { aspiration_id } => self
                .store
                .aspirations(&teammate.company_id)?
                .iter()
                .any(|aspiration| &aspiration.id == aspiration_id),
        };

        if held {
            Ok(())
        } else {
            Err(CheckInError::SubjectNotHeld {
                teammate_id: teammate.id.clone(),
                subject: subject.clone(),
            })
        }
    }

    pub fn record_employee_submission(
        &self,
        check_in_id: &CheckInId,
        submission: SubmissionRequest,
    ) -> Result<CheckIn, CheckInError> {
        self.record_submission(check_in_id, Reviewer::Employee, submission)
    }

    pub fn record_manager_submission(
        &self,
        check_in_id: &CheckInId,
        submission: SubmissionRequest,
    ) -> Result<CheckIn, CheckInError> {
        self.record_submission(check_in_id, Reviewer::Manager, submission)
    }

    pub fn record_submission(
        &self,
        check_in_id: &CheckInId,
        reviewer: Reviewer,
        submission: SubmissionRequest,
    ) -> Result<CheckIn, CheckInError> {
        if let Some(value) = submission.actual_energy_percentage {
            if value > 100 {
                return Err(CheckInError::InvalidEnergy { value });
            }
        }

        self.store.transaction(|tx| {
            let mut check_in = tx
                .check_in(check_in_id)?
                .ok_or_else(|| CheckInError::CheckInNotFound(check_in_id.clone()))?;
            if check_in.is_finalized() {
                return Err(CheckInError::AlreadyFinalized {
                    check_in_id: check_in.id.clone(),
                });
            }

            let dimension = check_in.dimension();
            let rating = match submission
                .rating
                .as_deref()
                .map(str::trim)
                .filter(|raw| !raw.is_empty())
            {
                Some(raw) => Some(Rating::parse(dimension, raw).ok_or_else(|| {
                    CheckInError::InvalidRating {
                        dimension,
                        value: raw.to_string(),
                    }
                })?),
                None => None,
            };

            let side = match reviewer {
                Reviewer::Employee => &mut check_in.employee,
                Reviewer::Manager => &mut check_in.manager,
            };
            side.rating = rating;
            side.private_notes = submission.private_notes.clone();
            side.completed_at = Some(submission.completed_at);
            side.completed_by_id = Some(submission.completed_by.clone());

            if reviewer == Reviewer::Employee && dimension == Dimension::Assignment {
                check_in.actual_energy_percentage = submission
                    .actual_energy_percentage
                    .or(check_in.actual_energy_percentage);
            }

            tx.update_check_in(check_in.clone())?;
            Ok(check_in)
        })
    }

    pub fn check_in(&self, check_in_id: &CheckInId) -> Result<CheckIn, CheckInError> {
        self.store
            .check_in(check_in_id)?
            .ok_or_else(|| CheckInError::CheckInNotFound(check_in_id.clone()))
    }

    /// Load the check-in and route it to the finalizer for its dimension.
    pub fn finalize(
        &self,
        check_in_id: &CheckInId,
        request: &FinalizeRequest,
        options: AssignmentOptions,
    ) -> Result<FinalizedCheckIn, CheckInError> {
        let check_in = self.check_in(check_in_id)?;
        match check_in.dimension() {
            Dimension::Assignment => self
                .finalize_assignment_check_in(
                    &check_in,
                    request,
                    options.anticipated_energy_percentage,
                )
                .map(FinalizedCheckIn::Assignment),
            Dimension::Position => self
                .finalize_position_check_in(&check_in, request)
                .map(FinalizedCheckIn::Position),
            Dimension::Aspiration => self
                .finalize_aspiration_check_in(&check_in, request)
                .map(FinalizedCheckIn::Aspiration),
        }
    }

    pub fn finalize_assignment_check_in(
        &self,
        check_in: &CheckIn,
        request: &FinalizeRequest,
        anticipated_energy_percentage: Option<u8>,
    ) -> Result<AssignmentFinalization, CheckInError> {
        let result = self.assignment.finalize(
            self.store.as_ref(),
            check_in,
            request,
            anticipated_energy_percentage,
        );
        self.settle(check_in, request, result, |outcome| {
            SnapshotParams::default().with_assignment_rating(
                outcome.new_tenure.assignment_id.clone(),
                outcome.rating_data.rating,
            )
        })
    }

    pub fn finalize_position_check_in(
        &self,
        check_in: &CheckIn,
        request: &FinalizeRequest,
    ) -> Result<PositionFinalization, CheckInError> {
        let result = self.position.finalize(self.store.as_ref(), check_in, request);
        self.settle(check_in, request, result, |outcome| {
            SnapshotParams::default().with_position_rating(outcome.rating_data.rating)
        })
    }

    pub fn finalize_aspiration_check_in(
        &self,
        check_in: &CheckIn,
        request: &FinalizeRequest,
    ) -> Result<AspirationFinalization, CheckInError> {
        let result = self
            .aspiration
            .finalize(self.store.as_ref(), check_in, request);
        self.settle(check_in, request, result, |outcome| {
            SnapshotParams::default().with_aspiration_rating(
                AspirationId(outcome.rating_data.subject_id.clone()),
                outcome.rating_data.rating,
            )
        })
    }

    pub fn build_snapshot(
        &self,
        person_id: &PersonId,
        company_id: &CompanyId,
        params: &SnapshotParams,
    ) -> SnapshotData {
        self.snapshots.build(person_id, company_id, params)
    }

    fn settle<T, P>(
        &self,
        check_in: &CheckIn,
        request: &FinalizeRequest,
        result: Result<T, CheckInError>,
        overlay: P,
    ) -> Result<T, CheckInError>
    where
        P: FnOnce(&T) -> SnapshotParams,
    {
        match result {
            Ok(outcome) => {
                info!(
                    check_in_id = %check_in.id,
                    teammate_id = %check_in.teammate_id,
                    dimension = %check_in.dimension(),
                    finalized_by = %request.finalized_by,
                    "check-in finalized"
                );
                self.record_snapshot(&check_in.teammate_id, request, overlay(&outcome));
                Ok(outcome)
            }
            Err(err) => {
                let kind = err.kind();
                match kind {
                    ErrorKind::NoActiveTenure | ErrorKind::Internal => error!(
                        check_in_id = %check_in.id,
                        teammate_id = %check_in.teammate_id,
                        kind = kind.label(),
                        error = %err,
                        "check-in finalization failed"
                    ),
                    kind if kind.is_recoverable() => info!(
                        check_in_id = %check_in.id,
                        kind = kind.label(),
                        error = %err,
                        "check-in finalization rejected"
                    ),
                    _ => warn!(
                        check_in_id = %check_in.id,
                        kind = kind.label(),
                        error = %err,
                        "check-in finalization failed"
                    ),
                }
                Err(err)
            }
        }
    }

    fn record_snapshot(
        &self,
        teammate_id: &TeammateId,
        request: &FinalizeRequest,
        params: SnapshotParams,
    ) {
        if !self.settings.record_snapshots {
            return;
        }

        let teammate = match self.store.teammate(teammate_id) {
            Ok(Some(teammate)) => teammate,
            Ok(None) => {
                warn!(teammate_id = %teammate_id, "no teammate record; snapshot skipped");
                return;
            }
            Err(err) => {
                warn!(
                    teammate_id = %teammate_id,
                    error = %err,
                    "teammate lookup failed; snapshot skipped"
                );
                return;
            }
        };

        let data = self
            .snapshots
            .build(&teammate.person_id, &teammate.company_id, &params);
        let record = SnapshotRecord {
            person_id: teammate.person_id,
            company_id: teammate.company_id,
            created_by: request.finalized_by.clone(),
            reason: self.settings.snapshot_reason.clone(),
            effective_date: request.finalized_at.date_naive(),
            data,
        };

        if let Err(err) = self.sink.record(record) {
            warn!(teammate_id = %teammate_id, error = %err, "snapshot sink rejected record");
        }
    }
}
