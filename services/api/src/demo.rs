use crate::infra::{
    seed_organization, InMemoryMomentLog, InMemorySnapshotLog, DEMO_ASPIRATION, DEMO_ASSIGNMENT,
    DEMO_COMPANY, DEMO_MANAGER, DEMO_PERSON, DEMO_TEAMMATE,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use clap::Args;
use std::sync::Arc;
use talent_ledger::config::FinalizationConfig;
use talent_ledger::error::AppError;
use talent_ledger::workflows::check_ins::{
    AspirationId, AssignmentId, AssignmentOptions, CheckInError, CheckInId, CheckInService,
    CheckInSubject, CompanyId, FinalizeRequest, FinalizedCheckIn, InMemoryPerformanceStore,
    PersonId, SnapshotParams, StartCheckIn, SubmissionRequest, TeammateId,
};

type DemoService = CheckInService<InMemoryPerformanceStore, InMemoryMomentLog, InMemorySnapshotLog>;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Date the review cycle closes (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) as_of: Option<NaiveDate>,
    /// Print the final snapshot as single-line JSON.
    #[arg(long)]
    pub(crate) compact: bool,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { as_of, compact } = args;
    let as_of = as_of.unwrap_or_else(|| Utc::now().date_naive());
    let previous_cycle = as_of - Duration::days(90);

    let store = Arc::new(InMemoryPerformanceStore::default());
    seed_organization(&store, as_of).map_err(CheckInError::from)?;

    let moments = Arc::new(InMemoryMomentLog::default());
    let snapshots = Arc::new(InMemorySnapshotLog::default());
    let service = CheckInService::new(
        store,
        moments.clone(),
        snapshots.clone(),
        FinalizationConfig::default(),
    );

    println!("Check-in finalization demo (cycle closing {as_of})");

    let assignment = CheckInSubject::Assignment {
        assignment_id: AssignmentId(DEMO_ASSIGNMENT.to_string()),
    };
    let id = ready_check_in(&service, assignment, as_of, ("meeting", "exceeding"), Some(70))?;
    let outcome = service.finalize(
        &id,
        &finalize_request("exceeding", as_of),
        AssignmentOptions {
            anticipated_energy_percentage: Some(55),
        },
    )?;
    describe(&outcome);

    let id = ready_check_in(&service, CheckInSubject::Position, as_of, ("0", "1"), None)?;
    let outcome = service.finalize(
        &id,
        &finalize_request("1", as_of),
        AssignmentOptions::default(),
    )?;
    describe(&outcome);

    let aspiration = CheckInSubject::Aspiration {
        aspiration_id: AspirationId(DEMO_ASPIRATION.to_string()),
    };
    for (closes_on, rating) in [(previous_cycle, "working_to_meet"), (as_of, "meeting")] {
        let id = ready_check_in(
            &service,
            aspiration.clone(),
            closes_on,
            (rating, rating),
            None,
        )?;
        let outcome = service.finalize(
            &id,
            &finalize_request(rating, closes_on),
            AssignmentOptions::default(),
        )?;
        describe(&outcome);
    }

    let moments = moments.moments();
    println!("\nObservable moments: {}", moments.len());
    for moment in &moments {
        println!(
            "  - {} on {}: {:?} -> {:?}",
            moment.teammate_id, moment.aspiration_id, moment.previous, moment.current
        );
    }
    println!("Snapshots recorded: {}", snapshots.records().len());

    let data = service.build_snapshot(
        &PersonId(DEMO_PERSON.to_string()),
        &CompanyId(DEMO_COMPANY.to_string()),
        &SnapshotParams::default(),
    );
    let rendered = if compact {
        serde_json::to_string(&data)
    } else {
        serde_json::to_string_pretty(&data)
    };
    match rendered {
        Ok(json) => println!("\nOrganizational snapshot:\n{json}"),
        Err(err) => println!("\nOrganizational snapshot unavailable: {err}"),
    }

    Ok(())
}

fn closing_time(day: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&day.and_time(NaiveTime::default()))
}

fn finalize_request(rating: &str, day: NaiveDate) -> FinalizeRequest {
    FinalizeRequest {
        official_rating: Some(rating.to_string()),
        shared_notes: Some("Reviewed together in the cycle close meeting".to_string()),
        finalized_by: PersonId(DEMO_MANAGER.to_string()),
        finalized_at: closing_time(day),
    }
}

fn ready_check_in(
    service: &DemoService,
    subject: CheckInSubject,
    closes_on: NaiveDate,
    (employee_rating, manager_rating): (&str, &str),
    energy: Option<u8>,
) -> Result<CheckInId, CheckInError> {
    let check_in = service.start_check_in(StartCheckIn {
        teammate_id: TeammateId(DEMO_TEAMMATE.to_string()),
        subject,
        started_on: closes_on - Duration::days(14),
    })?;
    service.record_employee_submission(
        &check_in.id,
        SubmissionRequest {
            rating: Some(employee_rating.to_string()),
            private_notes: None,
            actual_energy_percentage: energy,
            completed_by: PersonId(DEMO_PERSON.to_string()),
            completed_at: closing_time(closes_on - Duration::days(3)),
        },
    )?;
    service.record_manager_submission(
        &check_in.id,
        SubmissionRequest {
            rating: Some(manager_rating.to_string()),
            private_notes: Some("Calibrated with the staff group".to_string()),
            actual_energy_percentage: None,
            completed_by: PersonId(DEMO_MANAGER.to_string()),
            completed_at: closing_time(closes_on - Duration::days(2)),
        },
    )?;
    Ok(check_in.id)
}

fn describe(outcome: &FinalizedCheckIn) {
    match outcome {
        FinalizedCheckIn::Assignment(result) => println!(
            "Assignment {}: closed {} as {:?}, next period energy {:?}%",
            result.rating_data.subject_id,
            result.closed_tenure.id,
            result.rating_data.rating,
            result.new_tenure.anticipated_energy_percentage
        ),
        FinalizedCheckIn::Position(result) => println!(
            "Position {}: closed {} as {:?} (score {})",
            result.rating_data.subject_id,
            result.closed_tenure.id,
            result.rating_data.rating,
            result.rating_data.rating.score()
        ),
        FinalizedCheckIn::Aspiration(result) => println!(
            "Aspiration {}: {:?} -> {:?}",
            result.rating_data.subject_id, result.previous_rating, result.rating_data.rating
        ),
    }
}
