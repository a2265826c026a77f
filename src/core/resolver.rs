use std::sync::Arc;

use crate::error::EngineError;
use crate::models::{PairKey, SwipeDirection, SwipeEvent, SwipeOutcome, UserId};
use crate::services::{MatchStore, SwipeLedger};

/// Write path: record a swipe and resolve reciprocity
///
/// Steps run sequentially. The only cross-request coordination is the
/// store's atomic create-or-fetch of the pair's match record.
#[derive(Clone)]
pub struct MatchResolver {
    ledger: Arc<dyn SwipeLedger>,
    matches: Arc<dyn MatchStore>,
}

impl MatchResolver {
    pub fn new(ledger: Arc<dyn SwipeLedger>, matches: Arc<dyn MatchStore>) -> Self {
        Self { ledger, matches }
    }

    /// Record `actor`'s swipe on `target` and report whether it completes a match
    ///
    /// Left swipes never check reciprocity. A right swipe matches when any
    /// recorded event has `target` swiping right on `actor`; repeated
    /// matching swipes return the same match id.
    pub async fn process_swipe(
        &self,
        actor: UserId,
        target: UserId,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome, EngineError> {
        if actor == target {
            return Err(EngineError::Validation(format!(
                "user {} cannot swipe on themselves",
                actor
            )));
        }

        let event = SwipeEvent {
            actor_id: actor,
            target_id: target,
            direction,
        };
        self.ledger.record_swipe(&event).await.map_err(|e| {
            tracing::error!("Failed to add swipe {} -> {}: {}", actor, target, e);
            EngineError::from(e)
        })?;

        if !direction.is_right() {
            return Ok(SwipeOutcome::unmatched());
        }

        let reciprocal = self.ledger.has_right_swipe(target, actor).await.map_err(|e| {
            tracing::error!("Error checking for match between {} and {}: {}", actor, target, e);
            EngineError::from(e)
        })?;

        if !reciprocal {
            return Ok(SwipeOutcome::unmatched());
        }

        let record = self
            .matches
            .resolve_match(PairKey::new(actor, target))
            .await
            .map_err(|e| {
                tracing::error!("Error resolving match between {} and {}: {}", actor, target, e);
                EngineError::from(e)
            })?;

        tracing::info!("Users {} and {} matched (match {})", actor, target, record.id);

        Ok(SwipeOutcome::matched(record.id))
    }
}
