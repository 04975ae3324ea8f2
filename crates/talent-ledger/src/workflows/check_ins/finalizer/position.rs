use chrono::NaiveDate;
use serde::Serialize;

use super::{
    ensure_within_tenure, finalize_with, next_tenure_id, CheckInFinalizer, FinalizeRequest,
};
use crate::workflows::check_ins::domain::{
    CheckIn, Dimension, EmploymentTenure, PositionRating, RatingData,
};
use crate::workflows::check_ins::repository::{PerformanceStore, StoreTransaction};
use crate::workflows::check_ins::result::CheckInError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PositionFinalization {
    pub check_in: CheckIn,
    pub closed_tenure: EmploymentTenure,
    pub new_tenure: EmploymentTenure,
    pub rating_data: RatingData<PositionRating>,
}

#[derive(Debug)]
pub struct PositionRotation {
    closed: EmploymentTenure,
    opened: EmploymentTenure,
}

/// Rotates the rating period of the teammate's current employment.
///
/// The new tenure holds exactly what the closed one held (position, manager,
/// seat, employment type, company); only the window and rating change.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionCheckInFinalizer;

impl PositionCheckInFinalizer {
    pub fn finalize<S: PerformanceStore>(
        &self,
        store: &S,
        check_in: &CheckIn,
        request: &FinalizeRequest,
    ) -> Result<PositionFinalization, CheckInError> {
        finalize_with(self, store, check_in, request, &())
    }
}

impl CheckInFinalizer for PositionCheckInFinalizer {
    type Rating = PositionRating;
    type Options = ();
    type Rotation = PositionRotation;
    type Outcome = PositionFinalization;

    fn rotate(
        &self,
        tx: &mut dyn StoreTransaction,
        check_in: &CheckIn,
        rating: PositionRating,
        _options: &(),
        rated_on: NaiveDate,
    ) -> Result<PositionRotation, CheckInError> {
        let mut closed = tx
            .active_employment_tenure(&check_in.teammate_id)?
            .ok_or_else(|| CheckInError::NoActiveTenure {
                dimension: Dimension::Position,
                teammate_id: check_in.teammate_id.clone(),
            })?;
        ensure_within_tenure(&closed.id, closed.started_on, rated_on)?;

        closed.ended_on = Some(rated_on);
        closed.official_position_rating = Some(rating);
        tx.update_employment_tenure(closed.clone())?;

        let opened = tx.insert_employment_tenure(EmploymentTenure {
            id: next_tenure_id(),
            started_on: rated_on,
            ended_on: None,
            official_position_rating: None,
            ..closed.clone()
        })?;

        Ok(PositionRotation { closed, opened })
    }

    fn rating_subject(&self, _check_in: &CheckIn, rotation: &PositionRotation) -> String {
        rotation.closed.position_id.0.clone()
    }

    fn outcome(
        &self,
        check_in: CheckIn,
        rotation: PositionRotation,
        rating_data: RatingData<PositionRating>,
    ) -> PositionFinalization {
        PositionFinalization {
            check_in,
            closed_tenure: rotation.closed,
            new_tenure: rotation.opened,
            rating_data,
        }
    }
}
