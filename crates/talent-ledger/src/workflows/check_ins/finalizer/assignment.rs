use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{
    ensure_within_tenure, finalize_with, next_tenure_id, CheckInFinalizer, FinalizeRequest,
};
use crate::workflows::check_ins::domain::{
    AssignmentRating, AssignmentTenure, CheckIn, CheckInSubject, Dimension, RatingData,
};
use crate::workflows::check_ins::repository::{PerformanceStore, StoreTransaction};
use crate::workflows::check_ins::result::CheckInError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentOptions {
    /// Energy for the next period. Falls back to the closed tenure's value.
    pub anticipated_energy_percentage: Option<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssignmentFinalization {
    pub check_in: CheckIn,
    pub closed_tenure: AssignmentTenure,
    pub new_tenure: AssignmentTenure,
    pub rating_data: RatingData<AssignmentRating>,
}

#[derive(Debug)]
pub struct AssignmentRotation {
    closed: AssignmentTenure,
    opened: AssignmentTenure,
}

/// Closes the open assignment tenure with the official rating and opens the next period.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssignmentCheckInFinalizer;

impl AssignmentCheckInFinalizer {
    pub fn finalize<S: PerformanceStore>(
        &self,
        store: &S,
        check_in: &CheckIn,
        request: &FinalizeRequest,
        anticipated_energy_percentage: Option<u8>,
    ) -> Result<AssignmentFinalization, CheckInError> {
        let options = AssignmentOptions {
            anticipated_energy_percentage,
        };
        finalize_with(self, store, check_in, request, &options)
    }
}

impl CheckInFinalizer for AssignmentCheckInFinalizer {
    type Rating = AssignmentRating;
    type Options = AssignmentOptions;
    type Rotation = AssignmentRotation;
    type Outcome = AssignmentFinalization;

    fn validate_options(&self, options: &AssignmentOptions) -> Result<(), CheckInError> {
        match options.anticipated_energy_percentage {
            Some(value) if value > 100 => Err(CheckInError::InvalidEnergy { value }),
            _ => Ok(()),
        }
    }

    fn rotate(
        &self,
        tx: &mut dyn StoreTransaction,
        check_in: &CheckIn,
        rating: AssignmentRating,
        options: &AssignmentOptions,
        rated_on: NaiveDate,
    ) -> Result<AssignmentRotation, CheckInError> {
        let assignment_id = match &check_in.subject {
            CheckInSubject::Assignment { assignment_id } => assignment_id,
            other => {
                return Err(CheckInError::SubjectMismatch {
                    check_in_id: check_in.id.clone(),
                    expected: Dimension::Assignment,
                    found: other.dimension(),
                })
            }
        };

        let mut closed = tx
            .active_assignment_tenure(&check_in.teammate_id, assignment_id)?
            .ok_or_else(|| CheckInError::NoActiveTenure {
                dimension: Dimension::Assignment,
                teammate_id: check_in.teammate_id.clone(),
            })?;

        ensure_within_tenure(&closed.id, closed.started_on, rated_on)?;

        let anticipated_energy_percentage = options
            .anticipated_energy_percentage
            .or(closed.anticipated_energy_percentage);

        closed.ended_on = Some(rated_on);
        closed.official_rating = Some(rating);
        tx.update_assignment_tenure(closed.clone())?;

        let opened = tx.insert_assignment_tenure(AssignmentTenure {
            id: next_tenure_id(),
            teammate_id: closed.teammate_id.clone(),
            assignment_id: closed.assignment_id.clone(),
            started_on: rated_on,
            ended_on: None,
            anticipated_energy_percentage,
            official_rating: None,
        })?;

        Ok(AssignmentRotation { closed, opened })
    }

    fn rating_subject(&self, _check_in: &CheckIn, rotation: &AssignmentRotation) -> String {
        rotation.closed.assignment_id.0.clone()
    }

    fn outcome(
        &self,
        check_in: CheckIn,
        rotation: AssignmentRotation,
        rating_data: RatingData<AssignmentRating>,
    ) -> AssignmentFinalization {
        AssignmentFinalization {
            check_in,
            closed_tenure: rotation.closed,
            new_tenure: rotation.opened,
            rating_data,
        }
    }
}
