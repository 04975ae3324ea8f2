use super::domain::{
    AbilityMilestone, Aspiration, AspirationRatingChange, AssignmentId, AssignmentTenure, CheckIn,
    CheckInId, CheckInSubject, CompanyId, EmploymentTenure, PersonId, Rating, Teammate,
    TeammateId,
};
use super::snapshot::SnapshotRecord;

/// Mutations available inside a store transaction.
///
/// Reads observe the transaction's own writes. Implementations must serialise
/// transactions that touch the same teammate so two finalizations cannot both
/// rotate the same open tenure.
pub trait StoreTransaction {
    fn check_in(&self, id: &CheckInId) -> Result<Option<CheckIn>, RepositoryError>;

    /// The unfinalized check-in for `(teammate, subject)`, if any.
    fn open_check_in(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<CheckIn>, RepositoryError>;

    /// Fails with `Conflict` when an unfinalized check-in already exists for the pair.
    fn insert_check_in(&mut self, check_in: CheckIn) -> Result<CheckIn, RepositoryError>;

    fn update_check_in(&mut self, check_in: CheckIn) -> Result<(), RepositoryError>;

    /// Official rating of the most recently finalized check-in for the pair.
    fn latest_finalized_rating(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<Rating>, RepositoryError>;

    fn active_assignment_tenure(
        &self,
        teammate_id: &TeammateId,
        assignment_id: &AssignmentId,
    ) -> Result<Option<AssignmentTenure>, RepositoryError>;

    /// Fails with `Conflict` when inserting an open tenure while another is open.
    fn insert_assignment_tenure(
        &mut self,
        tenure: AssignmentTenure,
    ) -> Result<AssignmentTenure, RepositoryError>;

    fn update_assignment_tenure(&mut self, tenure: AssignmentTenure)
        -> Result<(), RepositoryError>;

    fn active_employment_tenure(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Option<EmploymentTenure>, RepositoryError>;

    /// Fails with `Conflict` when inserting an open tenure while another is open.
    fn insert_employment_tenure(
        &mut self,
        tenure: EmploymentTenure,
    ) -> Result<EmploymentTenure, RepositoryError>;

    fn update_employment_tenure(&mut self, tenure: EmploymentTenure)
        -> Result<(), RepositoryError>;
}

/// Write side of the tenure and check-in stores.
pub trait PerformanceStore: Send + Sync {
    /// Run `work` atomically. Every mutation it made is discarded when it
    /// returns `Err`.
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Read side used by the snapshot builder and the service facade.
pub trait OrganizationReader: Send + Sync {
    fn teammate(&self, id: &TeammateId) -> Result<Option<Teammate>, RepositoryError>;

    fn teammate_for(
        &self,
        person_id: &PersonId,
        company_id: &CompanyId,
    ) -> Result<Option<Teammate>, RepositoryError>;

    fn check_in(&self, id: &CheckInId) -> Result<Option<CheckIn>, RepositoryError>;

    fn active_employment_tenure(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Option<EmploymentTenure>, RepositoryError>;

    fn active_assignment_tenures(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Vec<AssignmentTenure>, RepositoryError>;

    fn ability_milestones(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Vec<AbilityMilestone>, RepositoryError>;

    fn aspirations(&self, company_id: &CompanyId) -> Result<Vec<Aspiration>, RepositoryError>;

    fn latest_finalized_rating(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<Rating>, RepositoryError>;
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("conflicting record: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Outbound hook for "observable moment" records (celebrations, feed posts).
///
/// The collaborator decides whether a rating change is worth a moment.
pub trait ObservableMomentHook: Send + Sync {
    fn aspiration_rated(&self, change: AspirationRatingChange) -> Result<(), HookError>;
}

/// Audit sink persisting organizational snapshots built after finalization.
pub trait SnapshotSink: Send + Sync {
    fn record(&self, record: SnapshotRecord) -> Result<(), HookError>;
}

/// Collaborator failure. Always logged, never propagated to the caller.
#[derive(Debug, thiserror::Error)]
pub enum HookError {
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
    #[error("collaborator rejected payload: {0}")]
    Rejected(String),
}
