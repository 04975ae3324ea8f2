use chrono::{DateTime, Duration, NaiveDate, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Serialize;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};
use talent_ledger::workflows::check_ins::{
    AbilityId, AbilityMilestone, Aspiration, AspirationId, AspirationRating,
    AspirationRatingChange, AssignmentId, AssignmentTenure, CheckInId, CompanyId,
    EmploymentTenure, EmploymentType, HookError, InMemoryPerformanceStore, ObservableMomentHook,
    PersonId, PositionId, RepositoryError, SeatId, SnapshotRecord, SnapshotSink, Teammate,
    TeammateId, TenureId,
};
use tracing::{debug, info};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Celebration-worthy change picked up by the team feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct ObservableMoment {
    pub(crate) check_in_id: CheckInId,
    pub(crate) teammate_id: TeammateId,
    pub(crate) aspiration_id: AspirationId,
    pub(crate) previous: Option<AspirationRating>,
    pub(crate) current: AspirationRating,
    pub(crate) created_by: PersonId,
    pub(crate) occurred_at: DateTime<Utc>,
}

/// A first rating counts as progress; afterwards only a higher rating does.
pub(crate) fn is_improvement(
    previous: Option<AspirationRating>,
    current: AspirationRating,
) -> bool {
    previous.map_or(true, |previous| current > previous)
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryMomentLog {
    moments: Arc<Mutex<Vec<ObservableMoment>>>,
}

impl InMemoryMomentLog {
    pub(crate) fn moments(&self) -> Vec<ObservableMoment> {
        self.moments
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl ObservableMomentHook for InMemoryMomentLog {
    fn aspiration_rated(&self, change: AspirationRatingChange) -> Result<(), HookError> {
        if !is_improvement(change.previous, change.current) {
            debug!(
                check_in_id = %change.check_in_id,
                aspiration_id = %change.aspiration_id,
                "aspiration rating did not improve; no moment recorded"
            );
            return Ok(());
        }

        let mut guard = self
            .moments
            .lock()
            .map_err(|_| HookError::Unavailable("moment log mutex poisoned".to_string()))?;
        info!(
            teammate_id = %change.teammate_id,
            aspiration_id = %change.aspiration_id,
            "observable moment recorded"
        );
        guard.push(ObservableMoment {
            check_in_id: change.check_in_id,
            teammate_id: change.teammate_id,
            aspiration_id: change.aspiration_id,
            previous: change.previous,
            current: change.current,
            created_by: change.finalized_by,
            occurred_at: change.occurred_at,
        });
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySnapshotLog {
    records: Arc<Mutex<Vec<SnapshotRecord>>>,
}

impl InMemorySnapshotLog {
    pub(crate) fn records(&self) -> Vec<SnapshotRecord> {
        self.records
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl SnapshotSink for InMemorySnapshotLog {
    fn record(&self, record: SnapshotRecord) -> Result<(), HookError> {
        let mut guard = self
            .records
            .lock()
            .map_err(|_| HookError::Unavailable("snapshot log mutex poisoned".to_string()))?;
        info!(
            person_id = %record.person_id,
            company_id = %record.company_id,
            reason = %record.reason,
            "snapshot recorded"
        );
        guard.push(record);
        Ok(())
    }
}

pub(crate) const DEMO_COMPANY: &str = "acme";
pub(crate) const DEMO_PERSON: &str = "person-ada";
pub(crate) const DEMO_TEAMMATE: &str = "tm-ada";
pub(crate) const DEMO_MANAGER: &str = "person-grace";
pub(crate) const DEMO_ASSIGNMENT: &str = "asg-incident-response";
pub(crate) const DEMO_ASPIRATION: &str = "asp-mentoring";

/// Ada works at Acme under Grace: two assignments, one employment, one
/// certified ability, and the company's two aspirations.
pub(crate) fn seed_organization(
    store: &InMemoryPerformanceStore,
    as_of: NaiveDate,
) -> Result<(), RepositoryError> {
    let company = CompanyId(DEMO_COMPANY.to_string());
    let ada = TeammateId(DEMO_TEAMMATE.to_string());
    let grace = TeammateId("tm-grace".to_string());
    let period_start = as_of - Duration::days(90);

    store.add_teammate(Teammate {
        id: ada.clone(),
        person_id: PersonId(DEMO_PERSON.to_string()),
        company_id: company.clone(),
    })?;
    store.add_teammate(Teammate {
        id: grace.clone(),
        person_id: PersonId(DEMO_MANAGER.to_string()),
        company_id: company.clone(),
    })?;

    for (id, assignment, energy) in [
        ("tenure-ada-ir", DEMO_ASSIGNMENT, 60),
        ("tenure-ada-docs", "asg-developer-docs", 20),
    ] {
        store.add_assignment_tenure(AssignmentTenure {
            id: TenureId(id.to_string()),
            teammate_id: ada.clone(),
            assignment_id: AssignmentId(assignment.to_string()),
            started_on: period_start,
            ended_on: None,
            anticipated_energy_percentage: Some(energy),
            official_rating: None,
        })?;
    }

    store.add_employment_tenure(EmploymentTenure {
        id: TenureId("tenure-ada-employment".to_string()),
        teammate_id: ada.clone(),
        company_id: company.clone(),
        position_id: PositionId("pos-site-reliability-engineer".to_string()),
        manager_id: Some(grace),
        seat_id: Some(SeatId("seat-sre-2".to_string())),
        employment_type: EmploymentType::FullTime,
        started_on: period_start,
        ended_on: None,
        official_position_rating: None,
    })?;

    store.add_milestone(AbilityMilestone {
        teammate_id: ada,
        ability_id: AbilityId("abl-observability".to_string()),
        milestone_level: 2,
        certified_by_id: Some(PersonId(DEMO_MANAGER.to_string())),
        attained_at: period_start + Duration::days(30),
    })?;

    for (id, name) in [
        (DEMO_ASPIRATION, "Mentor a new hire through their first on-call"),
        ("asp-conference-talk", "Give a conference talk"),
    ] {
        store.add_aspiration(Aspiration {
            id: AspirationId(id.to_string()),
            company_id: company.clone(),
            name: name.to_string(),
        })?;
    }

    Ok(())
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}
