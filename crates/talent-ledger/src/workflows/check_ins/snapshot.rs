//! Read-side projection of a person's organizational state.
//!
//! The builder never fails: a missing teammate or an unreadable section
//! degrades to `null`/empty so it can run for anyone, including people who are
//! mid-offboarding.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::domain::{
    AbilityId, AspirationId, AspirationRating, AssignmentId, AssignmentRating, CheckInSubject,
    CompanyId, EmploymentType, PersonId, PositionId, PositionRating, RatingScale, SeatId,
    Teammate, TeammateId,
};
use super::repository::{OrganizationReader, RepositoryError};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotData {
    pub position: Option<PositionSnapshot>,
    pub assignments: Vec<AssignmentSnapshot>,
    pub abilities: Vec<AbilitySnapshot>,
    pub aspirations: Vec<AspirationSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionSnapshot {
    pub position_id: PositionId,
    pub manager_id: Option<TeammateId>,
    pub seat_id: Option<SeatId>,
    pub employment_type: EmploymentType,
    pub official_position_rating: Option<PositionRating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentSnapshot {
    pub assignment_id: AssignmentId,
    pub anticipated_energy_percentage: Option<u8>,
    pub official_rating: Option<AssignmentRating>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilitySnapshot {
    pub ability_id: AbilityId,
    pub milestone_level: u8,
    pub certified_by_id: Option<PersonId>,
    pub attained_at: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationSnapshot {
    pub aspiration_id: AspirationId,
    pub official_rating: Option<AspirationRating>,
}

/// Proposed values layered over the current state, as submitted by a bulk form.
///
/// Overrides only touch rows the projection already contains; an override for
/// an assignment the person does not hold is ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SnapshotParams {
    pub assignments: BTreeMap<AssignmentId, AssignmentOverride>,
    pub position_rating: Option<PositionRating>,
    pub aspirations: BTreeMap<AspirationId, AspirationRating>,
}

impl SnapshotParams {
    pub fn with_assignment_rating(
        mut self,
        assignment_id: AssignmentId,
        rating: AssignmentRating,
    ) -> Self {
        self.assignments.entry(assignment_id).or_default().official_rating = Some(rating);
        self
    }

    pub fn with_position_rating(mut self, rating: PositionRating) -> Self {
        self.position_rating = Some(rating);
        self
    }

    pub fn with_aspiration_rating(
        mut self,
        aspiration_id: AspirationId,
        rating: AspirationRating,
    ) -> Self {
        self.aspirations.insert(aspiration_id, rating);
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssignmentOverride {
    pub anticipated_energy_percentage: Option<u8>,
    pub official_rating: Option<AssignmentRating>,
}

/// Snapshot plus the metadata the audit sink persists alongside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub person_id: PersonId,
    pub company_id: CompanyId,
    pub created_by: PersonId,
    pub reason: String,
    pub effective_date: NaiveDate,
    pub data: SnapshotData,
}

pub struct SnapshotBuilder<R> {
    reader: Arc<R>,
}

impl<R> SnapshotBuilder<R>
where
    R: OrganizationReader,
{
    pub fn new(reader: Arc<R>) -> Self {
        Self { reader }
    }

    pub fn build(
        &self,
        person_id: &PersonId,
        company_id: &CompanyId,
        params: &SnapshotParams,
    ) -> SnapshotData {
        let teammate = match self.reader.teammate_for(person_id, company_id) {
            Ok(Some(teammate)) => teammate,
            Ok(None) => return SnapshotData::default(),
            Err(err) => {
                warn!(
                    person_id = %person_id,
                    company_id = %company_id,
                    error = %err,
                    "teammate lookup failed; returning empty snapshot"
                );
                return SnapshotData::default();
            }
        };

        SnapshotData {
            position: self.position(&teammate, params),
            assignments: self.assignments(&teammate, params),
            abilities: self.abilities(&teammate),
            aspirations: self.aspirations(&teammate, company_id, params),
        }
    }

    fn position(&self, teammate: &Teammate, params: &SnapshotParams) -> Option<PositionSnapshot> {
        let tenure = degrade(
            "position",
            self.reader.active_employment_tenure(&teammate.id),
        )?;

        Some(PositionSnapshot {
            position_id: tenure.position_id,
            manager_id: tenure.manager_id,
            seat_id: tenure.seat_id,
            employment_type: tenure.employment_type,
            official_position_rating: params
                .position_rating
                .or(tenure.official_position_rating),
        })
    }

    fn assignments(&self, teammate: &Teammate, params: &SnapshotParams) -> Vec<AssignmentSnapshot> {
        let mut assignments: Vec<AssignmentSnapshot> = degrade(
            "assignments",
            self.reader.active_assignment_tenures(&teammate.id),
        )
        .into_iter()
        .map(|tenure| {
            let proposed = params
                .assignments
                .get(&tenure.assignment_id)
                .copied()
                .unwrap_or_default();
            AssignmentSnapshot {
                anticipated_energy_percentage: proposed
                    .anticipated_energy_percentage
                    .or(tenure.anticipated_energy_percentage),
                official_rating: proposed.official_rating.or(tenure.official_rating),
                assignment_id: tenure.assignment_id,
            }
        })
        .collect();

        assignments.sort_by(|a, b| a.assignment_id.cmp(&b.assignment_id));
        assignments
    }

    fn abilities(&self, teammate: &Teammate) -> Vec<AbilitySnapshot> {
        let mut abilities: Vec<AbilitySnapshot> =
            degrade("abilities", self.reader.ability_milestones(&teammate.id))
                .into_iter()
                .map(|milestone| AbilitySnapshot {
                    ability_id: milestone.ability_id,
                    milestone_level: milestone.milestone_level,
                    certified_by_id: milestone.certified_by_id,
                    attained_at: milestone.attained_at,
                })
                .collect();

        abilities.sort_by(|a, b| {
            a.ability_id
                .cmp(&b.ability_id)
                .then(a.milestone_level.cmp(&b.milestone_level))
        });
        abilities
    }

    /// One entry per company aspiration, rated or not.
    fn aspirations(
        &self,
        teammate: &Teammate,
        company_id: &CompanyId,
        params: &SnapshotParams,
    ) -> Vec<AspirationSnapshot> {
        degrade("aspirations", self.reader.aspirations(company_id))
            .into_iter()
            .map(|aspiration| {
                let subject = CheckInSubject::Aspiration {
                    aspiration_id: aspiration.id.clone(),
                };
                let recorded = degrade(
                    "aspiration rating",
                    self.reader.latest_finalized_rating(&teammate.id, &subject),
                )
                .and_then(|rating| AspirationRating::from_rating(&rating));

                AspirationSnapshot {
                    official_rating: params
                        .aspirations
                        .get(&aspiration.id)
                        .copied()
                        .or(recorded),
                    aspiration_id: aspiration.id,
                }
            })
            .collect()
    }
}

fn degrade<T: Default>(section: &'static str, result: Result<T, RepositoryError>) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            warn!(section, error = %err, "snapshot section unavailable; leaving it empty");
            T::default()
        }
    }
}
