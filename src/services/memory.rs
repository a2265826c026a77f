use async_trait::async_trait;
use geo::GeodesicDistance;
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

use crate::core::geo::{decode, encode};
use crate::error::StorageError;
use crate::models::{
    CandidateRecord, DiscoveryFilter, MatchId, MatchRecord, NewUser, PairKey, Point, SwipeEvent,
    UserId,
};
use crate::services::store::{CandidateSource, MatchStore, Store, SwipeLedger, UserDirectory};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<CandidateRecord>,
    swipes: Vec<SwipeEvent>,
    matches: HashMap<PairKey, MatchRecord>,
    next_user_id: UserId,
    next_match_id: MatchId,
}

/// In-process store
///
/// All tables live behind one mutex, which makes `resolve_match` a single
/// atomic create-or-fetch. Used for tests and for running the service
/// without PostgreSQL.
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a user row verbatim, including arbitrary location bytes
    pub async fn insert_record(&self, mut record: CandidateRecord) -> UserId {
        let mut tables = self.tables.lock().await;
        tables.next_user_id += 1;
        record.id = tables.next_user_id;
        tables.users.push(record);
        tables.next_user_id
    }

    pub async fn swipe_count(&self) -> usize {
        self.tables.lock().await.swipes.len()
    }

    pub async fn match_count(&self) -> usize {
        self.tables.lock().await.matches.len()
    }
}

/// Geodesic containment on the WGS84 ellipsoid
fn within_radius(origin: &Point, radius_m: f64, location: &Point) -> bool {
    let from = geo::Point::new(origin.lng(), origin.lat());
    let to = geo::Point::new(location.lng(), location.lat());
    from.geodesic_distance(&to) <= radius_m
}

#[async_trait]
impl CandidateSource for MemoryStore {
    async fn query_candidates(
        &self,
        requester: UserId,
        filter: &DiscoveryFilter,
    ) -> Result<Vec<CandidateRecord>, StorageError> {
        let tables = self.tables.lock().await;

        let swiped: HashSet<UserId> = tables
            .swipes
            .iter()
            .filter(|swipe| swipe.actor_id == requester)
            .map(|swipe| swipe.target_id)
            .collect();

        let candidates = tables
            .users
            .iter()
            .filter(|user| user.id != requester && !swiped.contains(&user.id))
            .filter(|user| filter.dob_range.contains(user.date_of_birth))
            .filter(|user| filter.gender.map_or(true, |gender| gender == user.gender))
            .filter(|user| {
                if !filter.has_radius() {
                    return true;
                }
                match decode(&user.location) {
                    Ok(location) => within_radius(&filter.origin, filter.radius, &location),
                    Err(err) => {
                        tracing::debug!("User {} has no usable location: {}", user.id, err);
                        false
                    }
                }
            })
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(
            "Memory store found {} candidates for user {}",
            candidates.len(),
            requester
        );

        Ok(candidates)
    }
}

#[async_trait]
impl SwipeLedger for MemoryStore {
    async fn record_swipe(&self, event: &SwipeEvent) -> Result<(), StorageError> {
        self.tables.lock().await.swipes.push(*event);
        Ok(())
    }

    async fn has_right_swipe(&self, from: UserId, to: UserId) -> Result<bool, StorageError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .swipes
            .iter()
            .any(|s| s.actor_id == from && s.target_id == to && s.direction.is_right()))
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn resolve_match(&self, pair: PairKey) -> Result<MatchRecord, StorageError> {
        let mut tables = self.tables.lock().await;
        if let Some(existing) = tables.matches.get(&pair) {
            return Ok(existing.clone());
        }

        tables.next_match_id += 1;
        let record = MatchRecord {
            id: tables.next_match_id,
            user_a: pair.low(),
            user_b: pair.high(),
            matched: true,
            created_at: chrono::Utc::now(),
        };
        tables.matches.insert(pair, record.clone());
        Ok(record)
    }
}

#[async_trait]
impl UserDirectory for MemoryStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, StorageError> {
        let location = encode(&user.location)?;
        Ok(self
            .insert_record(CandidateRecord {
                id: 0,
                email: user.email.clone(),
                name: user.name.clone(),
                gender: user.gender,
                date_of_birth: user.date_of_birth,
                location,
            })
            .await)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filters::{DiscoveryPreferences, FilterBuilder};
    use crate::models::{Gender, SwipeDirection};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 15).unwrap()
    }

    fn new_user(name: &str, gender: Gender, born: i32, lat: f64, lng: f64) -> NewUser {
        NewUser {
            email: format!("{}@example.com", name.to_lowercase()),
            name: name.to_string(),
            gender,
            date_of_birth: NaiveDate::from_ymd_opt(born, 3, 10).unwrap(),
            location: Point::new(lat, lng).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_query_applies_every_predicate() {
        let store = MemoryStore::new();
        let me = store.insert_user(&new_user("Me", Gender::Male, 1992, 40.7128, -74.0060)).await.unwrap();
        let near = store.insert_user(&new_user("Near", Gender::Female, 1995, 40.7150, -74.0100)).await.unwrap();
        let far = store.insert_user(&new_user("Far", Gender::Female, 1995, 40.9000, -74.0060)).await.unwrap();
        let male = store.insert_user(&new_user("Male", Gender::Male, 1995, 40.7150, -74.0100)).await.unwrap();
        let old = store.insert_user(&new_user("Old", Gender::Female, 1960, 40.7150, -74.0100)).await.unwrap();
        let swiped = store.insert_user(&new_user("Swiped", Gender::Female, 1995, 40.7150, -74.0100)).await.unwrap();

        store
            .record_swipe(&SwipeEvent { actor_id: me, target_id: swiped, direction: SwipeDirection::Left })
            .await
            .unwrap();

        let prefs = DiscoveryPreferences::new()
            .with_location(40.7128, -74.0060)
            .with_distance(5000.0)
            .with_gender(Gender::Female)
            .with_age_range(18, 40);
        let filter = FilterBuilder::default().build_at(&prefs, today()).unwrap();

        let ids: Vec<UserId> = store
            .query_candidates(me, &filter)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();

        assert_eq!(ids, vec![near]);
        assert!(!ids.contains(&far) && !ids.contains(&male) && !ids.contains(&old));
    }

    #[tokio::test]
    async fn test_zero_origin_skips_radius() {
        let store = MemoryStore::new();
        let me = store.insert_user(&new_user("Me", Gender::Male, 1992, 1.0, 1.0)).await.unwrap();
        store.insert_user(&new_user("Tokyo", Gender::Female, 1995, 35.6762, 139.6503)).await.unwrap();

        let prefs = DiscoveryPreferences::new().with_age_range(18, 40);
        let filter = FilterBuilder::default().build_at(&prefs, today()).unwrap();

        assert_eq!(store.query_candidates(me, &filter).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_radius_edge_is_inside() {
        let store = MemoryStore::new();
        let edge = store.insert_user(&new_user("Edge", Gender::Female, 1995, 1.0451, 1.0)).await.unwrap();
        store.insert_user(&new_user("Beyond", Gender::Female, 1995, 1.0460, 1.0)).await.unwrap();

        let prefs = DiscoveryPreferences::new()
            .with_location(1.0, 1.0)
            .with_distance(5000.0)
            .with_age_range(18, 40);
        let filter = FilterBuilder::default().build_at(&prefs, today()).unwrap();

        let ids: Vec<UserId> = store
            .query_candidates(-1, &filter)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![edge]);
    }

    #[tokio::test]
    async fn test_radius_at_high_latitude() {
        let store = MemoryStore::new();
        // ~4.8 km east of the origin at 70N
        let east = store.insert_user(&new_user("East", Gender::Female, 1995, 70.0, 20.126)).await.unwrap();

        let prefs = DiscoveryPreferences::new()
            .with_location(70.0, 20.0)
            .with_distance(5000.0)
            .with_age_range(18, 40);
        let filter = FilterBuilder::default().build_at(&prefs, today()).unwrap();

        let ids: Vec<UserId> = store
            .query_candidates(-1, &filter)
            .await
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![east]);
    }

    #[tokio::test]
    async fn test_empty_result_is_not_an_error() {
        let store = MemoryStore::new();
        let filter = FilterBuilder::default()
            .build_at(&DiscoveryPreferences::new(), today())
            .unwrap();
        assert!(store.query_candidates(1, &filter).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_has_right_swipe_considers_every_event() {
        let store = MemoryStore::new();
        for direction in [SwipeDirection::Right, SwipeDirection::Left] {
            store
                .record_swipe(&SwipeEvent { actor_id: 2, target_id: 1, direction })
                .await
                .unwrap();
        }

        assert!(store.has_right_swipe(2, 1).await.unwrap());
        assert!(!store.has_right_swipe(1, 2).await.unwrap());
        assert_eq!(store.swipe_count().await, 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_resolve_match_is_create_or_fetch() {
        let store = Arc::new(MemoryStore::new());

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let store = store.clone();
                let pair = if i % 2 == 0 { PairKey::new(4, 9) } else { PairKey::new(9, 4) };
                tokio::spawn(async move { store.resolve_match(pair).await.unwrap().id })
            })
            .collect();

        let mut ids = HashSet::new();
        for handle in handles {
            ids.insert(handle.await.unwrap());
        }

        assert_eq!(ids.len(), 1);
        assert_eq!(store.match_count().await, 1);
    }
}
