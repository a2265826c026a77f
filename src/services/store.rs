//! Storage contracts consumed by the engine.

use async_trait::async_trait;

use crate::error::StorageError;
use crate::models::{CandidateRecord, DiscoveryFilter, MatchRecord, NewUser, PairKey, SwipeEvent, UserId};

/// Candidate query over the user directory
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Every user matching `filter`, other than `requester` and anyone
    /// `requester` has already swiped on in either direction.
    ///
    /// The date of birth must fall within `filter.dob_range`, the gender must
    /// equal `filter.gender` when set, and when [`DiscoveryFilter::has_radius`]
    /// holds the location must lie within `filter.radius` meters of the
    /// origin. No rows is an empty vector, not an error.
    async fn query_candidates(
        &self,
        requester: UserId,
        filter: &DiscoveryFilter,
    ) -> Result<Vec<CandidateRecord>, StorageError>;
}

/// Append-only log of swipes
#[async_trait]
pub trait SwipeLedger: Send + Sync {
    async fn record_swipe(&self, event: &SwipeEvent) -> Result<(), StorageError>;

    /// Whether any recorded event has `from` swiping right on `to`
    async fn has_right_swipe(&self, from: UserId, to: UserId) -> Result<bool, StorageError>;
}

/// Match records keyed by unordered pair
#[async_trait]
pub trait MatchStore: Send + Sync {
    /// Atomically fetch the pair's match, creating it if absent.
    ///
    /// Concurrent callers for the same pair must all observe the same record;
    /// losing a creation race is not an error.
    async fn resolve_match(&self, pair: PairKey) -> Result<MatchRecord, StorageError>;
}

/// User seeding
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, StorageError>;
}

/// Everything the service needs from a store
#[async_trait]
pub trait Store: CandidateSource + SwipeLedger + MatchStore + UserDirectory {
    async fn health_check(&self) -> Result<bool, StorageError>;
}
