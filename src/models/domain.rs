use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Store-assigned user identifier
pub type UserId = i64;

/// Store-assigned match identifier
pub type MatchId = i64;

/// Geographic point in degrees
///
/// The zero point `(0, 0)` is the default and is treated as "no origin" by
/// the candidate query.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Point {
    lat: f64,
    lng: f64,
}

impl Point {
    /// Build a point, rejecting NaN and out-of-range coordinates
    pub fn new(lat: f64, lng: f64) -> Option<Self> {
        if lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng)
        {
            Some(Self { lat, lng })
        } else {
            None
        }
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Both coordinates non-zero
    pub fn is_set(&self) -> bool {
        self.lat != 0.0 && self.lng != 0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(type_name = "user_gender", rename_all = "UPPERCASE")]
pub enum Gender {
    Male,
    Female,
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MALE" => Ok(Gender::Male),
            "FEMALE" => Ok(Gender::Female),
            other => Err(format!("unknown gender: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SwipeDirection {
    Right,
    Left,
}

impl SwipeDirection {
    pub fn is_right(self) -> bool {
        matches!(self, SwipeDirection::Right)
    }
}

/// A single directional swipe. Events are append-only and not unique.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwipeEvent {
    pub actor_id: UserId,
    pub target_id: UserId,
    pub direction: SwipeDirection,
}

/// Raw persisted user as returned by the candidate query
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct CandidateRecord {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    /// EWKB point geometry
    pub location: Vec<u8>,
}

/// User to insert into the directory
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub date_of_birth: NaiveDate,
    pub location: Point,
}

/// Response-ready projection of a candidate
///
/// `UserDto::default()` is the zero-valued slot left behind when a
/// candidate's location cannot be decoded.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UserDto {
    pub id: UserId,
    pub name: String,
    pub gender: Option<Gender>,
    pub age: i32,
    #[serde(rename = "distanceFromMe")]
    pub distance_km: i64,
}

/// Canonical key for an unordered pair of users
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PairKey {
    low: UserId,
    high: UserId,
}

impl PairKey {
    pub fn new(a: UserId, b: UserId) -> Self {
        Self {
            low: a.min(b),
            high: a.max(b),
        }
    }

    pub fn low(&self) -> UserId {
        self.low
    }

    pub fn high(&self) -> UserId {
        self.high
    }
}

/// Mutual match between two users
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct MatchRecord {
    pub id: MatchId,
    pub user_a: UserId,
    pub user_b: UserId,
    pub matched: bool,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl MatchRecord {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.user_a, self.user_b)
    }
}

/// Outcome of processing a swipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SwipeOutcome {
    pub matched: bool,
    pub match_id: Option<MatchId>,
}

impl SwipeOutcome {
    pub fn unmatched() -> Self {
        Self::default()
    }

    pub fn matched(match_id: MatchId) -> Self {
        Self {
            matched: true,
            match_id: Some(match_id),
        }
    }
}

/// Inclusive date-of-birth interval derived from an age range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DobRange {
    pub min_dob: NaiveDate,
    pub max_dob: NaiveDate,
}

impl DobRange {
    #[inline]
    pub fn contains(&self, dob: NaiveDate) -> bool {
        dob >= self.min_dob && dob <= self.max_dob
    }
}

/// Candidate search criteria
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryFilter {
    pub origin: Point,
    /// Search radius in the unit the store's geodesic predicate takes (meters)
    pub radius: f64,
    pub gender: Option<Gender>,
    pub min_age: i32,
    pub max_age: i32,
    pub dob_range: DobRange,
}

impl DiscoveryFilter {
    /// Whether the radius predicate applies
    pub fn has_radius(&self) -> bool {
        self.radius > 0.0 && self.origin.is_set()
    }
}
