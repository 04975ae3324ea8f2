use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    AbilityMilestone, Aspiration, AssignmentId, AssignmentTenure, CheckIn, CheckInId,
    CheckInSubject, CompanyId, EmploymentTenure, PersonId, Rating, Teammate, TeammateId,
};
use super::repository::{
    OrganizationReader, PerformanceStore, RepositoryError, StoreTransaction,
};

/// Process-local store backing the service binary, the demo, and the tests.
///
/// A transaction holds the store lock for its whole duration and works on a
/// copy of the state, which replaces the committed state only on success.
#[derive(Default, Clone)]
pub struct InMemoryPerformanceStore {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    teammates: BTreeMap<TeammateId, Teammate>,
    check_ins: BTreeMap<CheckInId, CheckIn>,
    assignment_tenures: Vec<AssignmentTenure>,
    employment_tenures: Vec<EmploymentTenure>,
    milestones: Vec<AbilityMilestone>,
    aspirations: Vec<Aspiration>,
}

impl InMemoryPerformanceStore {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }

    pub fn add_teammate(&self, teammate: Teammate) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.teammates.contains_key(&teammate.id) {
            return Err(RepositoryError::Conflict(format!(
                "teammate {} already exists",
                teammate.id
            )));
        }
        guard.teammates.insert(teammate.id.clone(), teammate);
        Ok(())
    }

    pub fn add_aspiration(&self, aspiration: Aspiration) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.aspirations.push(aspiration);
        Ok(())
    }

    pub fn add_milestone(&self, milestone: AbilityMilestone) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        guard.milestones.push(milestone);
        Ok(())
    }

    pub fn add_assignment_tenure(
        &self,
        tenure: AssignmentTenure,
    ) -> Result<AssignmentTenure, RepositoryError> {
        self.transaction(|tx| tx.insert_assignment_tenure(tenure))
    }

    pub fn add_employment_tenure(
        &self,
        tenure: EmploymentTenure,
    ) -> Result<EmploymentTenure, RepositoryError> {
        self.transaction(|tx| tx.insert_employment_tenure(tenure))
    }

    pub fn add_check_in(&self, check_in: CheckIn) -> Result<CheckIn, RepositoryError> {
        self.transaction(|tx| tx.insert_check_in(check_in))
    }

    /// Full history, open and closed, for one teammate and assignment.
    pub fn assignment_tenures(
        &self,
        teammate_id: &TeammateId,
        assignment_id: &AssignmentId,
    ) -> Result<Vec<AssignmentTenure>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .assignment_tenures
            .iter()
            .filter(|tenure| {
                &tenure.teammate_id == teammate_id && &tenure.assignment_id == assignment_id
            })
            .cloned()
            .collect())
    }

    pub fn employment_tenures(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Vec<EmploymentTenure>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .employment_tenures
            .iter()
            .filter(|tenure| &tenure.teammate_id == teammate_id)
            .cloned()
            .collect())
    }
}

impl PerformanceStore for InMemoryPerformanceStore {
    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let outcome = work(&mut working)?;
        *guard = working;
        Ok(outcome)
    }
}

impl StoreTransaction for StoreState {
    fn check_in(&self, id: &CheckInId) -> Result<Option<CheckIn>, RepositoryError> {
        Ok(self.check_ins.get(id).cloned())
    }

    fn open_check_in(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<CheckIn>, RepositoryError> {
        Ok(self
            .check_ins
            .values()
            .find(|check_in| {
                &check_in.teammate_id == teammate_id
                    && &check_in.subject == subject
                    && !check_in.is_finalized()
            })
            .cloned())
    }

    fn insert_check_in(&mut self, check_in: CheckIn) -> Result<CheckIn, RepositoryError> {
        if self.check_ins.contains_key(&check_in.id) {
            return Err(RepositoryError::Conflict(format!(
                "check-in {} already exists",
                check_in.id
            )));
        }
        if !check_in.is_finalized()
            && self
                .open_check_in(&check_in.teammate_id, &check_in.subject)?
                .is_some()
        {
            return Err(RepositoryError::Conflict(format!(
                "teammate {} already has an open {} check-in",
                check_in.teammate_id,
                check_in.dimension()
            )));
        }
        self.check_ins.insert(check_in.id.clone(), check_in.clone());
        Ok(check_in)
    }

    fn update_check_in(&mut self, check_in: CheckIn) -> Result<(), RepositoryError> {
        match self.check_ins.get_mut(&check_in.id) {
            Some(existing) => {
                *existing = check_in;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn latest_finalized_rating(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<Rating>, RepositoryError> {
        Ok(latest_finalized(&self.check_ins, teammate_id, subject))
    }

    fn active_assignment_tenure(
        &self,
        teammate_id: &TeammateId,
        assignment_id: &AssignmentId,
    ) -> Result<Option<AssignmentTenure>, RepositoryError> {
        Ok(self
            .assignment_tenures
            .iter()
            .find(|tenure| {
                tenure.is_active()
                    && &tenure.teammate_id == teammate_id
                    && &tenure.assignment_id == assignment_id
            })
            .cloned())
    }

    fn insert_assignment_tenure(
        &mut self,
        tenure: AssignmentTenure,
    ) -> Result<AssignmentTenure, RepositoryError> {
        if self
            .assignment_tenures
            .iter()
            .any(|existing| existing.id == tenure.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "tenure {} already exists",
                tenure.id
            )));
        }
        if tenure.is_active()
            && self
                .active_assignment_tenure(&tenure.teammate_id, &tenure.assignment_id)?
                .is_some()
        {
            return Err(RepositoryError::Conflict(format!(
                "teammate {} already holds an open tenure on assignment {}",
                tenure.teammate_id, tenure.assignment_id
            )));
        }
        self.assignment_tenures.push(tenure.clone());
        Ok(tenure)
    }

    fn update_assignment_tenure(
        &mut self,
        tenure: AssignmentTenure,
    ) -> Result<(), RepositoryError> {
        match self
            .assignment_tenures
            .iter_mut()
            .find(|existing| existing.id == tenure.id)
        {
            Some(existing) => {
                *existing = tenure;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn active_employment_tenure(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Option<EmploymentTenure>, RepositoryError> {
        Ok(self
            .employment_tenures
            .iter()
            .find(|tenure| tenure.is_active() && &tenure.teammate_id == teammate_id)
            .cloned())
    }

    fn insert_employment_tenure(
        &mut self,
        tenure: EmploymentTenure,
    ) -> Result<EmploymentTenure, RepositoryError> {
        if self
            .employment_tenures
            .iter()
            .any(|existing| existing.id == tenure.id)
        {
            return Err(RepositoryError::Conflict(format!(
                "tenure {} already exists",
                tenure.id
            )));
        }
        if tenure.is_active() && self.active_employment_tenure(&tenure.teammate_id)?.is_some() {
            return Err(RepositoryError::Conflict(format!(
                "teammate {} already holds an open employment tenure",
                tenure.teammate_id
            )));
        }
        self.employment_tenures.push(tenure.clone());
        Ok(tenure)
    }

    fn update_employment_tenure(
        &mut self,
        tenure: EmploymentTenure,
    ) -> Result<(), RepositoryError> {
        match self
            .employment_tenures
            .iter_mut()
            .find(|existing| existing.id == tenure.id)
        {
            Some(existing) => {
                *existing = tenure;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

impl OrganizationReader for InMemoryPerformanceStore {
    fn teammate(&self, id: &TeammateId) -> Result<Option<Teammate>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.teammates.get(id).cloned())
    }

    fn teammate_for(
        &self,
        person_id: &PersonId,
        company_id: &CompanyId,
    ) -> Result<Option<Teammate>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .teammates
            .values()
            .find(|teammate| {
                &teammate.person_id == person_id && &teammate.company_id == company_id
            })
            .cloned())
    }

    fn check_in(&self, id: &CheckInId) -> Result<Option<CheckIn>, RepositoryError> {
        let guard = self.lock()?;
        guard.check_in(id)
    }

    fn active_employment_tenure(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Option<EmploymentTenure>, RepositoryError> {
        let guard = self.lock()?;
        guard.active_employment_tenure(teammate_id)
    }

    fn active_assignment_tenures(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Vec<AssignmentTenure>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .assignment_tenures
            .iter()
            .filter(|tenure| tenure.is_active() && &tenure.teammate_id == teammate_id)
            .cloned()
            .collect())
    }

    fn ability_milestones(
        &self,
        teammate_id: &TeammateId,
    ) -> Result<Vec<AbilityMilestone>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .milestones
            .iter()
            .filter(|milestone| &milestone.teammate_id == teammate_id)
            .cloned()
            .collect())
    }

    fn aspirations(&self, company_id: &CompanyId) -> Result<Vec<Aspiration>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard
            .aspirations
            .iter()
            .filter(|aspiration| &aspiration.company_id == company_id)
            .cloned()
            .collect())
    }

    fn latest_finalized_rating(
        &self,
        teammate_id: &TeammateId,
        subject: &CheckInSubject,
    ) -> Result<Option<Rating>, RepositoryError> {
        let guard = self.lock()?;
        Ok(latest_finalized(&guard.check_ins, teammate_id, subject))
    }
}

fn latest_finalized(
    check_ins: &BTreeMap<CheckInId, CheckIn>,
    teammate_id: &TeammateId,
    subject: &CheckInSubject,
) -> Option<Rating> {
    check_ins
        .values()
        .filter(|check_in| &check_in.teammate_id == teammate_id && &check_in.subject == subject)
        .filter_map(|check_in| {
            let completed_at = check_in.official_check_in_completed_at?;
            let rating = check_in.official_rating?;
            Some((completed_at, rating))
        })
        .max_by_key(|(completed_at, _)| *completed_at)
        .map(|(_, rating)| rating)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflows::check_ins::domain::TenureId;
    use chrono::NaiveDate;

    fn tenure(id: &str) -> AssignmentTenure {
        AssignmentTenure {
            id: TenureId(id.to_string()),
            teammate_id: TeammateId("tm-1".to_string()),
            assignment_id: AssignmentId("asg-1".to_string()),
            started_on: NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            ended_on: None,
            anticipated_energy_percentage: Some(50),
            official_rating: None,
        }
    }

    #[test]
    fn second_open_tenure_is_a_conflict() {
        let store = InMemoryPerformanceStore::default();
        store.add_assignment_tenure(tenure("t-1")).expect("first tenure");

        let err = store
            .add_assignment_tenure(tenure("t-2"))
            .expect_err("only one open tenure");
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }

    #[test]
    fn failed_transaction_discards_its_writes() {
        let store = InMemoryPerformanceStore::default();

        let result: Result<(), RepositoryError> = store.transaction(|tx| {
            tx.insert_assignment_tenure(tenure("t-1"))?;
            Err(RepositoryError::Unavailable("abort".to_string()))
        });

        assert!(result.is_err());
        let history = store
            .assignment_tenures(
                &TeammateId("tm-1".to_string()),
                &AssignmentId("asg-1".to_string()),
            )
            .expect("readable");
        assert!(history.is_empty());
    }

    #[test]
    fn second_open_check_in_for_same_subject_is_a_conflict() {
        let store = InMemoryPerformanceStore::default();
        let open = |id: &str| {
            CheckIn::open(
                CheckInId(id.to_string()),
                TeammateId("tm-1".to_string()),
                CheckInSubject::Position,
                NaiveDate::from_ymd_opt(2025, 1, 1).expect("valid date"),
            )
        };

        store.add_check_in(open("ci-1")).expect("first check-in");
        let err = store.add_check_in(open("ci-2")).expect_err("pair already open");
        assert!(matches!(err, RepositoryError::Conflict(_)));
    }
}
