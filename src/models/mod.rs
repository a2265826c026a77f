// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    CandidateRecord, DiscoveryFilter, DobRange, Gender, MatchId, MatchRecord, NewUser, PairKey,
    Point, SwipeDirection, SwipeEvent, SwipeOutcome, UserDto, UserId,
};
pub use requests::{CreateUserRequest, DiscoverRequest, SwipeRequest};
pub use responses::{
    CreateUserResponse, CreatedUser, DiscoverResponse, ErrorResponse, HealthResponse, SwipeResponse,
    SwipeResults,
};
