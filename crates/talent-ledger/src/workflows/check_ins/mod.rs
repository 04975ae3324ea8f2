//! Performance check-ins: the employee and manager halves, finalization of the
//! official rating, tenure rotation, and the organizational snapshot recorded
//! afterwards.

pub mod domain;
pub mod finalizer;
pub mod memory;
pub mod repository;
pub mod result;
pub mod router;
pub mod service;
pub mod snapshot;

#[cfg(test)]
mod tests;

pub use domain::{
    AbilityId, AbilityMilestone, Aspiration, AspirationId, AspirationRating,
    AspirationRatingChange, AssignmentId, AssignmentRating, AssignmentTenure, CheckIn, CheckInId,
    CheckInState, CheckInSubject, CompanyId, Dimension, EmploymentTenure, EmploymentType,
    PersonId, PositionId, PositionRating, Rating, RatingData, RatingScale, ReviewerSubmission,
    SeatId, Teammate, TeammateId, TenureId,
};
pub use finalizer::{
    finalize_with, AspirationCheckInFinalizer, AspirationFinalization,
    AssignmentCheckInFinalizer, AssignmentFinalization, AssignmentOptions, CheckInFinalizer,
    FinalizeRequest, PositionCheckInFinalizer, PositionFinalization,
};
pub use memory::InMemoryPerformanceStore;
pub use repository::{
    HookError, ObservableMomentHook, OrganizationReader, PerformanceStore, RepositoryError,
    SnapshotSink, StoreTransaction,
};
pub use result::{CheckInError, ErrorBody, ErrorKind, ResultEnvelope};
pub use router::check_in_router;
pub use service::{CheckInService, FinalizedCheckIn, Reviewer, StartCheckIn, SubmissionRequest};
pub use snapshot::{
    AbilitySnapshot, AspirationSnapshot, AssignmentOverride, AssignmentSnapshot,
    PositionSnapshot, SnapshotBuilder, SnapshotData, SnapshotParams, SnapshotRecord,
};
