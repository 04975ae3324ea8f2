use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::warn;

use super::{finalize_with, CheckInFinalizer, FinalizeRequest};
use crate::workflows::check_ins::domain::{
    AspirationId, AspirationRating, AspirationRatingChange, CheckIn, CheckInSubject, Dimension,
    RatingData, RatingScale,
};
use crate::workflows::check_ins::repository::{
    ObservableMomentHook, PerformanceStore, StoreTransaction,
};
use crate::workflows::check_ins::result::CheckInError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AspirationFinalization {
    pub check_in: CheckIn,
    pub previous_rating: Option<AspirationRating>,
    pub rating_data: RatingData<AspirationRating>,
}

#[derive(Debug)]
pub struct AspirationRotation {
    aspiration_id: AspirationId,
    previous: Option<AspirationRating>,
}

/// Aspirations have no tenure: finalization only stamps the check-in, then
/// offers the rating change to the observable-moment hook.
pub struct AspirationCheckInFinalizer<M> {
    moments: Arc<M>,
}

impl<M> AspirationCheckInFinalizer<M>
where
    M: ObservableMomentHook,
{
    pub fn new(moments: Arc<M>) -> Self {
        Self { moments }
    }

    pub fn finalize<S: PerformanceStore>(
        &self,
        store: &S,
        check_in: &CheckIn,
        request: &FinalizeRequest,
    ) -> Result<AspirationFinalization, CheckInError> {
        let outcome = finalize_with(self, store, check_in, request, &())?;

        let aspiration_id = AspirationId(outcome.rating_data.subject_id.clone());
        let change = AspirationRatingChange {
            check_in_id: outcome.check_in.id.clone(),
            teammate_id: outcome.check_in.teammate_id.clone(),
            aspiration_id,
            previous: outcome.previous_rating,
            current: outcome.rating_data.rating,
            finalized_by: request.finalized_by.clone(),
            occurred_at: request.finalized_at,
        };

        if let Err(err) = self.moments.aspiration_rated(change) {
            warn!(
                check_in_id = %outcome.check_in.id,
                error = %err,
                "observable moment hook failed"
            );
        }

        Ok(outcome)
    }
}

impl<M> CheckInFinalizer for AspirationCheckInFinalizer<M>
where
    M: ObservableMomentHook,
{
    type Rating = AspirationRating;
    type Options = ();
    type Rotation = AspirationRotation;
    type Outcome = AspirationFinalization;

    fn rotate(
        &self,
        tx: &mut dyn StoreTransaction,
        check_in: &CheckIn,
        _rating: AspirationRating,
        _options: &(),
        _rated_on: NaiveDate,
    ) -> Result<AspirationRotation, CheckInError> {
        let aspiration_id = match &check_in.subject {
            CheckInSubject::Aspiration { aspiration_id } => aspiration_id.clone(),
            other => {
                return Err(CheckInError::SubjectMismatch {
                    check_in_id: check_in.id.clone(),
                    expected: Dimension::Aspiration,
                    found: other.dimension(),
                })
            }
        };

        // Read before the check-in is stamped, otherwise it would find itself.
        let previous = tx
            .latest_finalized_rating(&check_in.teammate_id, &check_in.subject)?
            .and_then(|rating| AspirationRating::from_rating(&rating));

        Ok(AspirationRotation {
            aspiration_id,
            previous,
        })
    }

    fn rating_subject(&self, _check_in: &CheckIn, rotation: &AspirationRotation) -> String {
        rotation.aspiration_id.0.clone()
    }

    fn outcome(
        &self,
        check_in: CheckIn,
        rotation: AspirationRotation,
        rating_data: RatingData<AspirationRating>,
    ) -> AspirationFinalization {
        AspirationFinalization {
            check_in,
            previous_rating: rotation.previous,
            rating_data,
        }
    }
}
