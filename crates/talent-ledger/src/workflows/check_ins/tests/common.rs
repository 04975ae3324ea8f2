use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde_json::Value;

use crate::config::FinalizationConfig;
use crate::workflows::check_ins::domain::{
    AbilityId, AbilityMilestone, Aspiration, AspirationId, AspirationRatingChange, AssignmentId,
    AssignmentTenure, CheckIn, CheckInId, CheckInSubject, CompanyId, EmploymentTenure,
    EmploymentType, PersonId, PositionId, Rating, ReviewerSubmission, SeatId, Teammate,
    TeammateId, TenureId,
};
use crate::workflows::check_ins::finalizer::FinalizeRequest;
use crate::workflows::check_ins::repository::{
    HookError, ObservableMomentHook, PerformanceStore, RepositoryError, SnapshotSink,
    StoreTransaction,
};
use crate::workflows::check_ins::snapshot::SnapshotRecord;
use crate::workflows::check_ins::{CheckInService, InMemoryPerformanceStore};

pub(super) const COMPANY: &str = "acme";
pub(super) const PERSON: &str = "person-ada";
pub(super) const TEAMMATE: &str = "tm-ada";
pub(super) const MANAGER_PERSON: &str = "person-grace";
pub(super) const MANAGER_TEAMMATE: &str = "tm-grace";
pub(super) const ONBOARDING: &str = "asg-onboarding";
pub(super) const BILLING: &str = "asg-billing";
pub(super) const POSITION: &str = "pos-engineer";
pub(super) const MENTORING: &str = "asp-mentoring";
pub(super) const SPEAKING: &str = "asp-speaking";
pub(super) const OPEN_SOURCE: &str = "asp-open-source";

pub(super) fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub(super) fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 15, 30, 0)
        .single()
        .expect("valid timestamp")
}

pub(super) fn teammate_id() -> TeammateId {
    TeammateId(TEAMMATE.to_string())
}

pub(super) fn person_id() -> PersonId {
    PersonId(PERSON.to_string())
}

pub(super) fn company_id() -> CompanyId {
    CompanyId(COMPANY.to_string())
}

pub(super) fn manager_id() -> PersonId {
    PersonId(MANAGER_PERSON.to_string())
}

pub(super) fn assignment_subject(assignment: &str) -> CheckInSubject {
    CheckInSubject::Assignment {
        assignment_id: AssignmentId(assignment.to_string()),
    }
}

pub(super) fn aspiration_subject(aspiration: &str) -> CheckInSubject {
    CheckInSubject::Aspiration {
        aspiration_id: AspirationId(aspiration.to_string()),
    }
}

pub(super) fn assignment_tenure(
    id: &str,
    assignment: &str,
    energy: Option<u8>,
) -> AssignmentTenure {
    AssignmentTenure {
        id: TenureId(id.to_string()),
        teammate_id: teammate_id(),
        assignment_id: AssignmentId(assignment.to_string()),
        started_on: date(2025, 1, 6),
        ended_on: None,
        anticipated_energy_percentage: energy,
        official_rating: None,
    }
}

pub(super) fn employment_tenure() -> EmploymentTenure {
    EmploymentTenure {
        id: TenureId("emp-ada-1".to_string()),
        teammate_id: teammate_id(),
        company_id: company_id(),
        position_id: PositionId(POSITION.to_string()),
        manager_id: Some(TeammateId(MANAGER_TEAMMATE.to_string())),
        seat_id: Some(SeatId("seat-7".to_string())),
        employment_type: EmploymentType::FullTime,
        started_on: date(2024, 3, 1),
        ended_on: None,
        official_position_rating: None,
    }
}

/// Ada at Acme: two assignments, one employment, one ability milestone, and
/// three company aspirations.
pub(super) fn seeded_store() -> Arc<InMemoryPerformanceStore> {
    let store = Arc::new(InMemoryPerformanceStore::default());
    store
        .add_teammate(Teammate {
            id: teammate_id(),
            person_id: person_id(),
            company_id: company_id(),
        })
        .expect("seed teammate");
    store
        .add_teammate(Teammate {
            id: TeammateId(MANAGER_TEAMMATE.to_string()),
            person_id: manager_id(),
            company_id: company_id(),
        })
        .expect("seed manager");
    store
        .add_assignment_tenure(assignment_tenure("asg-ada-1", ONBOARDING, Some(40)))
        .expect("seed onboarding tenure");
    store
        .add_assignment_tenure(assignment_tenure("asg-ada-2", BILLING, Some(30)))
        .expect("seed billing tenure");
    store
        .add_employment_tenure(employment_tenure())
        .expect("seed employment");
    store
        .add_milestone(AbilityMilestone {
            teammate_id: teammate_id(),
            ability_id: AbilityId("abl-rust".to_string()),
            milestone_level: 2,
            certified_by_id: Some(manager_id()),
            attained_at: date(2024, 11, 20),
        })
        .expect("seed milestone");
    for (id, name) in [
        (MENTORING, "Mentor a new hire"),
        (SPEAKING, "Speak at a meetup"),
        (OPEN_SOURCE, "Ship an open source patch"),
    ] {
        store
            .add_aspiration(Aspiration {
                id: AspirationId(id.to_string()),
                company_id: company_id(),
                name: name.to_string(),
            })
            .expect("seed aspiration");
    }
    store
}

fn completed(rating: Option<Rating>, by: PersonId) -> ReviewerSubmission {
    ReviewerSubmission {
        rating,
        private_notes: Some("see shared doc".to_string()),
        completed_at: Some(at(2025, 6, 20)),
        completed_by_id: Some(by),
    }
}

/// Insert a check-in both sides have completed.
pub(super) fn ready_check_in(
    store: &InMemoryPerformanceStore,
    id: &str,
    subject: CheckInSubject,
) -> CheckIn {
    let mut check_in = CheckIn::open(
        CheckInId(id.to_string()),
        teammate_id(),
        subject,
        date(2025, 6, 1),
    );
    check_in.employee = completed(None, person_id());
    check_in.manager = completed(None, manager_id());
    store.add_check_in(check_in).expect("seed check-in")
}

/// Insert a check-in only the employee has completed.
pub(super) fn half_done_check_in(
    store: &InMemoryPerformanceStore,
    id: &str,
    subject: CheckInSubject,
) -> CheckIn {
    let mut check_in = CheckIn::open(
        CheckInId(id.to_string()),
        teammate_id(),
        subject,
        date(2025, 6, 1),
    );
    check_in.employee = completed(None, person_id());
    store.add_check_in(check_in).expect("seed check-in")
}

pub(super) fn finalize_request(rating: Option<&str>) -> FinalizeRequest {
    FinalizeRequest {
        official_rating: rating.map(str::to_string),
        shared_notes: Some("Strong quarter".to_string()),
        finalized_by: manager_id(),
        finalized_at: at(2025, 6, 30),
    }
}

pub(super) fn finalize_request_at(rating: &str, finalized_at: DateTime<Utc>) -> FinalizeRequest {
    FinalizeRequest {
        finalized_at,
        ..finalize_request(Some(rating))
    }
}

pub(super) fn settings() -> FinalizationConfig {
    FinalizationConfig::default()
}

pub(super) type TestService =
    CheckInService<InMemoryPerformanceStore, MemoryMoments, MemorySnapshots>;

pub(super) fn build_service() -> (
    TestService,
    Arc<InMemoryPerformanceStore>,
    Arc<MemoryMoments>,
    Arc<MemorySnapshots>,
) {
    build_service_with(settings())
}

pub(super) fn build_service_with(
    settings: FinalizationConfig,
) -> (
    TestService,
    Arc<InMemoryPerformanceStore>,
    Arc<MemoryMoments>,
    Arc<MemorySnapshots>,
) {
    let store = seeded_store();
    let moments = Arc::new(MemoryMoments::default());
    let snapshots = Arc::new(MemorySnapshots::default());
    let service = CheckInService::new(store.clone(), moments.clone(), snapshots.clone(), settings);
    (service, store, moments, snapshots)
}

#[derive(Default)]
pub(super) struct MemoryMoments {
    changes: Mutex<Vec<AspirationRatingChange>>,
}

impl MemoryMoments {
    pub(super) fn changes(&self) -> Vec<AspirationRatingChange> {
        self.changes.lock().expect("moments mutex poisoned").clone()
    }
}

impl ObservableMomentHook for MemoryMoments {
    fn aspiration_rated(&self, change: AspirationRatingChange) -> Result<(), HookError> {
        self.changes
            .lock()
            .expect("moments mutex poisoned")
            .push(change);
        Ok(())
    }
}

pub(super) struct OfflineMoments;

impl ObservableMomentHook for OfflineMoments {
    fn aspiration_rated(&self, _change: AspirationRatingChange) -> Result<(), HookError> {
        Err(HookError::Unavailable("feed service offline".to_string()))
    }
}

#[derive(Default)]
pub(super) struct MemorySnapshots {
    records: Mutex<Vec<SnapshotRecord>>,
}

impl MemorySnapshots {
    pub(super) fn records(&self) -> Vec<SnapshotRecord> {
        self.records.lock().expect("snapshot mutex poisoned").clone()
    }
}

impl SnapshotSink for MemorySnapshots {
    fn record(&self, record: SnapshotRecord) -> Result<(), HookError> {
        self.records
            .lock()
            .expect("snapshot mutex poisoned")
            .push(record);
        Ok(())
    }
}

pub(super) struct RejectingSnapshots;

impl SnapshotSink for RejectingSnapshots {
    fn record(&self, _record: SnapshotRecord) -> Result<(), HookError> {
        Err(HookError::Rejected("audit table locked".to_string()))
    }
}

/// Store whose transactions fail on the final check-in write, after the
/// tenure rotation has already happened inside the transaction.
pub(super) struct FailingStore {
    pub(super) inner: Arc<InMemoryPerformanceStore>,
}

impl PerformanceStore for FailingStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        self.inner.transaction(|tx| {
            let mut failing = FailingTransaction { inner: tx };
            work(&mut failing)
        })
    }
}

struct FailingTransaction<'a> {
    inner: &'a mut dyn StoreTransaction,
}

impl StoreTransaction for FailingTransaction<'_> {
    fn check_in(&self, id: &CheckInId) -> Result<Option<CheckIn>, RepositoryError> {
        self.inner.check_in(id)
    }

    fn open_check_in(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<CheckIn>, RepositoryError> {
        self.inner.open_check_in(teammate_id, subject)
    }

    fn insert_check_in(&mut self, check_in: CheckIn) -> Result<CheckIn, RepositoryError> {
        self.inner.insert_check_in(check_in)
    }

    fn update_check_in(&mut self, _check_in: CheckIn) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("disk full".to_string()))
    }

    fn latest_finalized_rating(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<Rating>, RepositoryError> {
        self.inner.latest_finalized_rating(teammate_id, subject)
    }

    fn active_assignment_tenure(
        &self,
        teammate_id: &TeammateId,
        assignment_id: &AssignmentId,
    ) -> Result<Option<AssignmentTenure>, RepositoryError> {
        self.inner.active_assignment_tenure(teammate_id, assignment_id)
    }

    fn insert_assignment_tenure(
        &mut self,
        tenure: AssignmentTenure,
    ) -> Result<AssignmentTenure, RepositoryError> {
        self.inner.insert_assignment_tenure(tenure)
    }

    fn update_assignment_tenure(
        &mut self,
        tenure: AssignmentTenure,
    ) -> Result<(), RepositoryError> {
        self.inner.update_assignment_tenure(tenure)
    }

    fn active_employment_tenure(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Option<EmploymentTenure>, RepositoryError> {
        self.inner.active_employment_tenure(teammate_id)
    }

    fn insert_employment_tenure(
        &mut self,
        tenure: EmploymentTenure,
    ) -> Result<EmploymentTenure, RepositoryError> {
        self.inner.insert_employment_tenure(tenure)
    }

    fn update_employment_tenure(
        &mut self,
        tenure: EmploymentTenure,
    ) -> Result<(), RepositoryError> {
        self.inner.update_employment_tenure(tenure)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
