use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::core::projector::Projector;
use crate::error::EngineError;
use crate::models::{DiscoveryFilter, UserDto, UserId};
use crate::services::CandidateSource;

/// Read path: candidate query followed by projection
#[derive(Clone)]
pub struct Discovery {
    candidates: Arc<dyn CandidateSource>,
    projector: Projector,
}

impl Discovery {
    pub fn new(candidates: Arc<dyn CandidateSource>, projector: Projector) -> Self {
        Self {
            candidates,
            projector,
        }
    }

    /// Find candidates for `requester` and project them relative to the
    /// filter's origin
    ///
    /// The output has one entry per candidate, in store order. Candidates
    /// whose location cannot be decoded appear as `UserDto::default()`.
    pub async fn discover(
        &self,
        requester: UserId,
        filter: &DiscoveryFilter,
    ) -> Result<Vec<UserDto>, EngineError> {
        self.discover_at(requester, filter, Utc::now().date_naive()).await
    }

    /// [`Discovery::discover`] with ages computed as of `today`
    pub async fn discover_at(
        &self,
        requester: UserId,
        filter: &DiscoveryFilter,
        today: NaiveDate,
    ) -> Result<Vec<UserDto>, EngineError> {
        let candidates = self
            .candidates
            .query_candidates(requester, filter)
            .await
            .map_err(|e| {
                tracing::error!("Failed to find potential matches for {}: {}", requester, e);
                EngineError::from(e)
            })?;

        let total = candidates.len();
        let batch = self.projector.project(candidates, filter.origin, today).await;

        let skipped = batch.skipped();
        if skipped > 0 {
            tracing::warn!(
                "{} of {} candidates for user {} left empty after projection",
                skipped,
                total,
                requester
            );
        }

        tracing::debug!("Projected {} candidates for user {}", total, requester);

        Ok(batch.into_users())
    }
}
