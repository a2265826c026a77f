use serde::{Deserialize, Serialize};

use crate::models::domain::{Gender, MatchId, SwipeOutcome, UserDto, UserId};

/// Response for the discover endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoverResponse {
    pub results: Vec<UserDto>,
}

/// Response for the swipe endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResponse {
    pub results: SwipeResults,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeResults {
    pub matched: bool,
    #[serde(rename = "matchID", skip_serializing_if = "Option::is_none")]
    pub match_id: Option<MatchId>,
}

impl From<SwipeOutcome> for SwipeResponse {
    fn from(outcome: SwipeOutcome) -> Self {
        Self {
            results: SwipeResults {
                matched: outcome.matched,
                match_id: outcome.match_id.filter(|_| outcome.matched),
            },
        }
    }
}

/// Response for the user creation endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserResponse {
    pub result: CreatedUser,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatedUser {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub gender: Gender,
    pub age: i32,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
