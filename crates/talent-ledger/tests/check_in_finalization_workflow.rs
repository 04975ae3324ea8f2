//! End-to-end scenarios for a review cycle driven through the public service facade and the
//! HTTP router: open check-ins, collect both halves, finalize each dimension, and inspect the
//! tenures and snapshots left behind.

mod common {
    use std::sync::{Arc, Mutex};

    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    use talent_ledger::config::FinalizationConfig;
    use talent_ledger::workflows::check_ins::{
        AbilityId, AbilityMilestone, Aspiration, AspirationId, AspirationRatingChange,
        AssignmentId, AssignmentTenure, CheckInService, CompanyId, EmploymentTenure,
        EmploymentType, HookError, InMemoryPerformanceStore, ObservableMomentHook, PersonId,
        PositionId, SnapshotRecord, SnapshotSink, Teammate, TeammateId, TenureId,
    };

    pub type Service = CheckInService<InMemoryPerformanceStore, RecordingMoments, RecordingSink>;

    pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
    }

    pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 9, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    pub fn teammate() -> TeammateId {
        TeammateId("tm-lin".to_string())
    }

    pub fn person() -> PersonId {
        PersonId("person-lin".to_string())
    }

    pub fn manager() -> PersonId {
        PersonId("person-omar".to_string())
    }

    pub fn company() -> CompanyId {
        CompanyId("northwind".to_string())
    }

    #[derive(Default)]
    pub struct RecordingMoments {
        pub changes: Mutex<Vec<AspirationRatingChange>>,
    }

    impl ObservableMomentHook for RecordingMoments {
        fn aspiration_rated(&self, change: AspirationRatingChange) -> Result<(), HookError> {
            self.changes.lock().expect("moments mutex").push(change);
            Ok(())
        }
    }

    #[derive(Default)]
    pub struct RecordingSink {
        pub records: Mutex<Vec<SnapshotRecord>>,
    }

    impl SnapshotSink for RecordingSink {
        fn record(&self, record: SnapshotRecord) -> Result<(), HookError> {
            self.records.lock().expect("sink mutex").push(record);
            Ok(())
        }
    }

    pub fn organisation() -> Arc<InMemoryPerformanceStore> {
        let store = Arc::new(InMemoryPerformanceStore::default());
        store
            .add_teammate(Teammate {
                id: teammate(),
                person_id: person(),
                company_id: company(),
            })
            .expect("teammate");
        store
            .add_assignment_tenure(AssignmentTenure {
                id: TenureId("lin-support".to_string()),
                teammate_id: teammate(),
                assignment_id: AssignmentId("asg-support-rotation".to_string()),
                started_on: date(2025, 1, 1),
                ended_on: None,
                anticipated_energy_percentage: Some(25),
                official_rating: None,
            })
            .expect("assignment tenure");
        store
            .add_employment_tenure(EmploymentTenure {
                id: TenureId("lin-employment".to_string()),
                teammate_id: teammate(),
                company_id: company(),
                position_id: PositionId("pos-analyst".to_string()),
                manager_id: Some(TeammateId("tm-omar".to_string())),
                seat_id: None,
                employment_type: EmploymentType::PartTime,
                started_on: date(2023, 9, 1),
                ended_on: None,
                official_position_rating: None,
            })
            .expect("employment tenure");
        store
            .add_milestone(AbilityMilestone {
                teammate_id: teammate(),
                ability_id: AbilityId("abl-sql".to_string()),
                milestone_level: 3,
                certified_by_id: None,
                attained_at: date(2024, 5, 2),
            })
            .expect("milestone");
        store
            .add_aspiration(Aspiration {
                id: AspirationId("asp-lead-retro".to_string()),
                company_id: company(),
                name: "Lead a team retro".to_string(),
            })
            .expect("aspiration");
        store
    }

    pub fn service() -> (
        Arc<Service>,
        Arc<InMemoryPerformanceStore>,
        Arc<RecordingMoments>,
        Arc<RecordingSink>,
    ) {
        let store = organisation();
        let moments = Arc::new(RecordingMoments::default());
        let sink = Arc::new(RecordingSink::default());
        let service = Arc::new(CheckInService::new(
            store.clone(),
            moments.clone(),
            sink.clone(),
            FinalizationConfig::default(),
        ));
        (service, store, moments, sink)
    }
}

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use talent_ledger::workflows::check_ins::{
    check_in_router, AspirationId, AspirationRating, AssignmentId, AssignmentOptions,
    AssignmentRating, CheckInError, CheckInId, CheckInSubject, FinalizeRequest,
    FinalizedCheckIn, PersonId, PositionRating, StartCheckIn, SubmissionRequest,
};

fn submission(by: PersonId, rating: &str) -> SubmissionRequest {
    SubmissionRequest {
        rating: Some(rating.to_string()),
        private_notes: None,
        actual_energy_percentage: None,
        completed_by: by,
        completed_at: common::at(2025, 9, 20),
    }
}

fn ready(service: &common::Service, subject: CheckInSubject, rating: &str) -> CheckInId {
    let check_in = service
        .start_check_in(StartCheckIn {
            teammate_id: common::teammate(),
            subject,
            started_on: common::date(2025, 9, 1),
        })
        .expect("check-in opened");
    service
        .record_employee_submission(&check_in.id, submission(common::person(), rating))
        .expect("employee half");
    service
        .record_manager_submission(&check_in.id, submission(common::manager(), rating))
        .expect("manager half");
    check_in.id
}

fn finalize_request(rating: &str) -> FinalizeRequest {
    FinalizeRequest {
        official_rating: Some(rating.to_string()),
        shared_notes: Some("Discussed in 1:1".to_string()),
        finalized_by: common::manager(),
        finalized_at: common::at(2025, 9, 30),
    }
}

#[test]
fn review_cycle_rotates_each_dimension_once() {
    let (service, store, moments, sink) = common::service();

    let assignment = ready(
        &service,
        CheckInSubject::Assignment {
            assignment_id: AssignmentId("asg-support-rotation".to_string()),
        },
        "meeting",
    );
    let position = ready(&service, CheckInSubject::Position, "0");
    let aspiration = ready(
        &service,
        CheckInSubject::Aspiration {
            aspiration_id: AspirationId("asp-lead-retro".to_string()),
        },
        "working_to_meet",
    );

    let outcome = service
        .finalize(&assignment, &finalize_request("meeting"), AssignmentOptions::default())
        .expect("assignment finalized");
    let FinalizedCheckIn::Assignment(assignment_outcome) = outcome else {
        panic!("expected assignment outcome");
    };
    assert_eq!(
        assignment_outcome.closed_tenure.official_rating,
        Some(AssignmentRating::Meeting)
    );
    assert_eq!(
        assignment_outcome.new_tenure.anticipated_energy_percentage,
        Some(25)
    );

    service
        .finalize(&position, &finalize_request("-1"), AssignmentOptions::default())
        .expect("position finalized");
    service
        .finalize(&aspiration, &finalize_request("working_to_meet"), AssignmentOptions::default())
        .expect("aspiration finalized");

    let history = store
        .assignment_tenures(
            &common::teammate(),
            &AssignmentId("asg-support-rotation".to_string()),
        )
        .expect("history");
    assert_eq!(history.len(), 2);
    let employment = store
        .employment_tenures(&common::teammate())
        .expect("employment history");
    assert_eq!(employment.len(), 2);
    assert_eq!(
        employment
            .iter()
            .find(|tenure| tenure.ended_on.is_some())
            .and_then(|tenure| tenure.official_position_rating),
        Some(PositionRating::Below)
    );

    let changes = moments.changes.lock().expect("moments mutex");
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0].previous, None);
    assert_eq!(changes[0].current, AspirationRating::WorkingToMeet);

    let records = sink.records.lock().expect("sink mutex");
    assert_eq!(records.len(), 3);
    let last = &records[2].data;
    assert_eq!(
        last.position
            .as_ref()
            .and_then(|position| position.official_position_rating),
        None,
        "a fresh employment period starts unrated"
    );
    assert_eq!(
        last.aspirations[0].official_rating,
        Some(AspirationRating::WorkingToMeet)
    );

    let err = service
        .finalize(&assignment, &finalize_request("exceeding"), AssignmentOptions::default())
        .expect_err("already finalized");
    assert!(matches!(err, CheckInError::NotReady { .. }));
}

#[tokio::test]
async fn http_surface_reports_validation_failures() {
    let (service, _, _, _) = common::service();
    let id = ready(&service, CheckInSubject::Position, "1");
    let router = check_in_router(service);

    let response = router
        .clone()
        .oneshot(
            Request::post(format!("/api/v1/check-ins/{id}/finalize"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "official_rating": "5", "finalized_by": "person-omar" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = axum::body::to_bytes(response.into_body(), 16 * 1024)
        .await
        .unwrap();
    let payload: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(payload["error"]["kind"], "invalid_rating");

    let response = router
        .oneshot(
            Request::post(format!("/api/v1/check-ins/{id}/finalize"))
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "official_rating": "2", "finalized_by": "person-omar" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
