//! Check-in finalization.
//!
//! All three dimensions follow the same template: confirm the check-in is
//! ready, require and parse the official rating, then inside one store
//! transaction re-read the check-in, rotate whatever record backs the
//! dimension, and stamp the check-in. The dimension-specific part is the
//! `CheckInFinalizer` strategy.

mod aspiration;
mod assignment;
mod position;

pub use aspiration::{AspirationCheckInFinalizer, AspirationFinalization};
pub use assignment::{AssignmentCheckInFinalizer, AssignmentFinalization, AssignmentOptions};
pub use position::{PositionCheckInFinalizer, PositionFinalization};

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::domain::{CheckIn, CheckInState, PersonId, RatingData, RatingScale, TenureId};
use super::repository::{PerformanceStore, StoreTransaction};
use super::result::CheckInError;

/// Caller-supplied finalization input shared by every dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalizeRequest {
    pub official_rating: Option<String>,
    pub shared_notes: Option<String>,
    pub finalized_by: PersonId,
    pub finalized_at: DateTime<Utc>,
}

/// Per-dimension strategy plugged into [`finalize_with`].
pub trait CheckInFinalizer {
    type Rating: RatingScale;
    /// Extra caller input this dimension understands.
    type Options;
    /// What `rotate` produced inside the transaction.
    type Rotation;
    type Outcome;

    fn validate_options(&self, _options: &Self::Options) -> Result<(), CheckInError> {
        Ok(())
    }

    /// Runs inside the transaction after the check-in has been re-read.
    fn rotate(
        &self,
        tx: &mut dyn StoreTransaction,
        check_in: &CheckIn,
        rating: Self::Rating,
        options: &Self::Options,
        rated_on: NaiveDate,
    ) -> Result<Self::Rotation, CheckInError>;

    /// Identifier reported in the rating summary.
    fn rating_subject(&self, check_in: &CheckIn, rotation: &Self::Rotation) -> String;

    fn outcome(
        &self,
        check_in: CheckIn,
        rotation: Self::Rotation,
        rating_data: RatingData<Self::Rating>,
    ) -> Self::Outcome;
}

static TENURE_SEQUENCE: AtomicU64 = AtomicU64::new(1);

pub(crate) fn next_tenure_id() -> TenureId {
    let id = TENURE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    TenureId(format!("tenure-{id:06}"))
}

/// Shared finalization template. Nothing is written unless every step succeeds.
pub fn finalize_with<F, S>(
    finalizer: &F,
    store: &S,
    check_in: &CheckIn,
    request: &FinalizeRequest,
    options: &F::Options,
) -> Result<F::Outcome, CheckInError>
where
    F: CheckInFinalizer,
    S: PerformanceStore,
{
    ensure_subject::<F::Rating>(check_in)?;
    ensure_ready(check_in)?;
    let rating = parse_rating::<F::Rating>(request.official_rating.as_deref())?;
    finalizer.validate_options(options)?;

    let rated_on = request.finalized_at.date_naive();

    store.transaction(|tx| {
        // Re-read under the transaction so a concurrent finalization of the
        // same check-in loses with NotReady instead of rotating twice.
        let mut current = tx
            .check_in(&check_in.id)?
            .ok_or_else(|| CheckInError::CheckInNotFound(check_in.id.clone()))?;
        ensure_ready(&current)?;

        let rotation = finalizer.rotate(tx, &current, rating, options, rated_on)?;

        current.official_rating = Some(rating.into_rating());
        current.shared_notes = request.shared_notes.clone();
        current.official_check_in_completed_at = Some(request.finalized_at);
        current.finalized_by_id = Some(request.finalized_by.clone());
        tx.update_check_in(current.clone())?;

        let rating_data = RatingData {
            dimension: F::Rating::DIMENSION,
            subject_id: finalizer.rating_subject(&current, &rotation),
            rating,
            rated_on,
        };

        debug!(
            check_in_id = %current.id,
            teammate_id = %current.teammate_id,
            dimension = %F::Rating::DIMENSION,
            rating = rating.key(),
            "check-in stamped"
        );

        Ok(finalizer.outcome(current, rotation, rating_data))
    })
}

fn ensure_subject<R: RatingScale>(check_in: &CheckIn) -> Result<(), CheckInError> {
    let found = check_in.dimension();
    if found == R::DIMENSION {
        Ok(())
    } else {
        Err(CheckInError::SubjectMismatch {
            check_in_id: check_in.id.clone(),
            expected: R::DIMENSION,
            found,
        })
    }
}

fn ensure_ready(check_in: &CheckIn) -> Result<(), CheckInError> {
    match check_in.state() {
        CheckInState::ReadyForFinalization => Ok(()),
        state => Err(CheckInError::NotReady {
            check_in_id: check_in.id.clone(),
            state,
        }),
    }
}

/// A tenure can only be closed on or after the day it started.
pub(crate) fn ensure_within_tenure(
    tenure_id: &TenureId,
    started_on: NaiveDate,
    rated_on: NaiveDate,
) -> Result<(), CheckInError> {
    if rated_on < started_on {
        return Err(CheckInError::RatedBeforeTenureStart {
            tenure_id: tenure_id.clone(),
            started_on,
            rated_on,
        });
    }
    Ok(())
}

pub(crate) fn parse_rating<R: RatingScale>(raw: Option<&str>) -> Result<R, CheckInError> {
    let raw = raw
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(CheckInError::RatingRequired {
            dimension: R::DIMENSION,
        })?;

    R::parse(raw).ok_or_else(|| CheckInError::InvalidRating {
        dimension: R::DIMENSION,
        value: raw.to_string(),
    })
}
