use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for a person, independent of any company.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PersonId(pub String);

impl fmt::Display for PersonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CompanyId(pub String);

impl fmt::Display for CompanyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A person's membership in one company. Tenures and check-ins hang off this record.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeammateId(pub String);

impl fmt::Display for TeammateId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CheckInId(pub String);

impl fmt::Display for CheckInId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TenureId(pub String);

impl fmt::Display for TenureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AssignmentId(pub String);

impl fmt::Display for AssignmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PositionId(pub String);

impl fmt::Display for PositionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AspirationId(pub String);

impl fmt::Display for AspirationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AbilityId(pub String);

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SeatId(pub String);

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The thing being reviewed by a check-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Assignment,
    Position,
    Aspiration,
}

impl Dimension {
    pub const fn label(self) -> &'static str {
        match self {
            Dimension::Assignment => "assignment",
            Dimension::Position => "position",
            Dimension::Aspiration => "aspiration",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// What a check-in is about. Position check-ins review whatever employment the
/// teammate currently holds, so they carry no extra reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "dimension", rename_all = "snake_case")]
pub enum CheckInSubject {
    Assignment { assignment_id: AssignmentId },
    Position,
    Aspiration { aspiration_id: AspirationId },
}

impl CheckInSubject {
    pub fn dimension(&self) -> Dimension {
        match self {
            CheckInSubject::Assignment { .. } => Dimension::Assignment,
            CheckInSubject::Position => Dimension::Position,
            CheckInSubject::Aspiration { .. } => Dimension::Aspiration,
        }
    }
}

impl fmt::Display for CheckInSubject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckInSubject::Assignment { assignment_id } => write!(f, "assignment {assignment_id}"),
            CheckInSubject::Position => f.write_str("an active position"),
            CheckInSubject::Aspiration { aspiration_id } => write!(f, "aspiration {aspiration_id}"),
        }
    }
}

/// Closed, ordered rating scale for one dimension.
pub trait RatingScale: Copy + Ord + fmt::Debug + Send + Sync + 'static {
    const DIMENSION: Dimension;

    /// Parse a raw rating as submitted by a form or API client.
    fn parse(raw: &str) -> Option<Self>;

    fn key(self) -> &'static str;

    fn into_rating(self) -> Rating;

    fn from_rating(rating: &Rating) -> Option<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentRating {
    WorkingToMeet,
    Meeting,
    Exceeding,
}

impl RatingScale for AssignmentRating {
    const DIMENSION: Dimension = Dimension::Assignment;

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "working_to_meet" => Some(Self::WorkingToMeet),
            "meeting" => Some(Self::Meeting),
            "exceeding" => Some(Self::Exceeding),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::WorkingToMeet => "working_to_meet",
            Self::Meeting => "meeting",
            Self::Exceeding => "exceeding",
        }
    }

    fn into_rating(self) -> Rating {
        Rating::Assignment(self)
    }

    fn from_rating(rating: &Rating) -> Option<Self> {
        match rating {
            Rating::Assignment(value) => Some(*value),
            _ => None,
        }
    }
}

/// Five-point position scale. Clients may submit either the score (`-2..=2`)
/// or the snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PositionRating {
    FarBelow,
    Below,
    Meeting,
    Exceeding,
    FarExceeding,
}

impl PositionRating {
    pub const fn ordered() -> [Self; 5] {
        [
            Self::FarBelow,
            Self::Below,
            Self::Meeting,
            Self::Exceeding,
            Self::FarExceeding,
        ]
    }

    pub const fn score(self) -> i8 {
        match self {
            Self::FarBelow => -2,
            Self::Below => -1,
            Self::Meeting => 0,
            Self::Exceeding => 1,
            Self::FarExceeding => 2,
        }
    }

    pub fn from_score(score: i8) -> Option<Self> {
        Self::ordered()
            .into_iter()
            .find(|rating| rating.score() == score)
    }
}

impl RatingScale for PositionRating {
    const DIMENSION: Dimension = Dimension::Position;

    fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if let Ok(score) = raw.parse::<i8>() {
            return Self::from_score(score);
        }

        Self::ordered()
            .into_iter()
            .find(|rating| rating.key().eq_ignore_ascii_case(raw))
    }

    fn key(self) -> &'static str {
        match self {
            Self::FarBelow => "far_below",
            Self::Below => "below",
            Self::Meeting => "meeting",
            Self::Exceeding => "exceeding",
            Self::FarExceeding => "far_exceeding",
        }
    }

    fn into_rating(self) -> Rating {
        Rating::Position(self)
    }

    fn from_rating(rating: &Rating) -> Option<Self> {
        match rating {
            Rating::Position(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AspirationRating {
    WorkingToMeet,
    Meeting,
    Exceeding,
}

impl RatingScale for AspirationRating {
    const DIMENSION: Dimension = Dimension::Aspiration;

    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "working_to_meet" => Some(Self::WorkingToMeet),
            "meeting" => Some(Self::Meeting),
            "exceeding" => Some(Self::Exceeding),
            _ => None,
        }
    }

    fn key(self) -> &'static str {
        match self {
            Self::WorkingToMeet => "working_to_meet",
            Self::Meeting => "meeting",
            Self::Exceeding => "exceeding",
        }
    }

    fn into_rating(self) -> Rating {
        Rating::Aspiration(self)
    }

    fn from_rating(rating: &Rating) -> Option<Self> {
        match rating {
            Rating::Aspiration(value) => Some(*value),
            _ => None,
        }
    }
}

/// A rating tagged with the scale it was drawn from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "scale", content = "value", rename_all = "snake_case")]
pub enum Rating {
    Assignment(AssignmentRating),
    Position(PositionRating),
    Aspiration(AspirationRating),
}

impl Rating {
    /// Parse a raw value against the scale for `dimension`.
    pub fn parse(dimension: Dimension, raw: &str) -> Option<Self> {
        match dimension {
            Dimension::Assignment => AssignmentRating::parse(raw).map(Rating::Assignment),
            Dimension::Position => PositionRating::parse(raw).map(Rating::Position),
            Dimension::Aspiration => AspirationRating::parse(raw).map(Rating::Aspiration),
        }
    }

    pub fn dimension(&self) -> Dimension {
        match self {
            Rating::Assignment(_) => Dimension::Assignment,
            Rating::Position(_) => Dimension::Position,
            Rating::Aspiration(_) => Dimension::Aspiration,
        }
    }
}

/// Lifecycle of a check-in, derived from its completion timestamps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckInState {
    Open,
    ReadyForFinalization,
    Finalized,
}

impl CheckInState {
    pub const fn label(self) -> &'static str {
        match self {
            CheckInState::Open => "open",
            CheckInState::ReadyForFinalization => "ready_for_finalization",
            CheckInState::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CheckInState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One side (employee or manager) of a check-in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewerSubmission {
    pub rating: Option<Rating>,
    pub private_notes: Option<String>,
    pub completed_at: Option<DateTime<Utc>>,
    pub completed_by_id: Option<PersonId>,
}

impl ReviewerSubmission {
    pub fn is_complete(&self) -> bool {
        self.completed_at.is_some()
    }
}

/// Periodic review of one teammate against one dimension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub id: CheckInId,
    pub teammate_id: TeammateId,
    pub subject: CheckInSubject,
    pub check_in_started_on: NaiveDate,
    pub employee: ReviewerSubmission,
    pub manager: ReviewerSubmission,
    /// Energy the employee reports actually spending; assignment check-ins only.
    pub actual_energy_percentage: Option<u8>,
    pub official_rating: Option<Rating>,
    pub shared_notes: Option<String>,
    pub official_check_in_completed_at: Option<DateTime<Utc>>,
    pub finalized_by_id: Option<PersonId>,
}

impl CheckIn {
    pub fn open(
        id: CheckInId,
        teammate_id: TeammateId,
        subject: CheckInSubject,
        started_on: NaiveDate,
    ) -> Self {
        Self {
            id,
            teammate_id,
            subject,
            check_in_started_on: started_on,
            employee: ReviewerSubmission::default(),
            manager: ReviewerSubmission::default(),
            actual_energy_percentage: None,
            official_rating: None,
            shared_notes: None,
            official_check_in_completed_at: None,
            finalized_by_id: None,
        }
    }

    pub fn state(&self) -> CheckInState {
        if self.official_check_in_completed_at.is_some() {
            CheckInState::Finalized
        } else if self.employee.is_complete() && self.manager.is_complete() {
            CheckInState::ReadyForFinalization
        } else {
            CheckInState::Open
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.state() == CheckInState::Finalized
    }

    pub fn dimension(&self) -> Dimension {
        self.subject.dimension()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentTenure {
    pub id: TenureId,
    pub teammate_id: TeammateId,
    pub assignment_id: AssignmentId,
    pub started_on: NaiveDate,
    pub ended_on: Option<NaiveDate>,
    pub anticipated_energy_percentage: Option<u8>,
    pub official_rating: Option<AssignmentRating>,
}

impl AssignmentTenure {
    pub fn is_active(&self) -> bool {
        self.ended_on.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmploymentType {
    FullTime,
    PartTime,
    Contract,
    Intern,
}

/// Employment in a position, i.e. the position-dimension tenure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmploymentTenure {
    pub id: TenureId,
    pub teammate_id: TeammateId,
    pub company_id: CompanyId,
    pub position_id: PositionId,
    pub manager_id: Option<TeammateId>,
    pub seat_id: Option<SeatId>,
    pub employment_type: EmploymentType,
    pub started_on: NaiveDate,
    pub ended_on: Option<NaiveDate>,
    pub official_position_rating: Option<PositionRating>,
}

impl EmploymentTenure {
    pub fn is_active(&self) -> bool {
        self.ended_on.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teammate {
    pub id: TeammateId,
    pub person_id: PersonId,
    pub company_id: CompanyId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Aspiration {
    pub id: AspirationId,
    pub company_id: CompanyId,
    pub name: String,
}

/// A milestone a teammate has attained on an ability.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbilityMilestone {
    pub teammate_id: TeammateId,
    pub ability_id: AbilityId,
    pub milestone_level: u8,
    pub certified_by_id: Option<PersonId>,
    pub attained_at: NaiveDate,
}

/// Summary of an official rating, handed to the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingData<R> {
    pub dimension: Dimension,
    pub subject_id: String,
    pub rating: R,
    pub rated_on: NaiveDate,
}

/// Handed to the observable-moment collaborator after an aspiration is rated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspirationRatingChange {
    pub check_in_id: CheckInId,
    pub teammate_id: TeammateId,
    pub aspiration_id: AspirationId,
    pub previous: Option<AspirationRating>,
    pub current: AspirationRating,
    pub finalized_by: PersonId,
    pub occurred_at: DateTime<Utc>,
}
