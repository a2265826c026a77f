use chrono::{Datelike, NaiveDate};
use std::future::Future;
use tokio::task::JoinSet;

use crate::core::geo;
use crate::models::{CandidateRecord, Point, UserDto, UserId};

/// Result of projecting a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionSlot {
    Ready(UserDto),
    /// The candidate could not be projected; it still occupies its slot.
    Skipped { id: UserId, reason: String },
}

impl ProjectionSlot {
    pub fn is_skipped(&self) -> bool {
        matches!(self, ProjectionSlot::Skipped { .. })
    }
}

/// Order-preserving projection output, one slot per input candidate
#[derive(Debug, Clone, Default)]
pub struct ProjectionBatch {
    slots: Vec<ProjectionSlot>,
}

impl ProjectionBatch {
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn slots(&self) -> &[ProjectionSlot] {
        &self.slots
    }

    /// Number of candidates left as zero-valued slots
    pub fn skipped(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_skipped()).count()
    }

    /// Flatten to DTOs; skipped slots become `UserDto::default()`
    pub fn into_users(self) -> Vec<UserDto> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                ProjectionSlot::Ready(dto) => dto,
                ProjectionSlot::Skipped { .. } => UserDto::default(),
            })
            .collect()
    }
}

/// Projects candidate records into DTOs with a bounded number of concurrent units
///
/// Each candidate is transformed by its own tokio task; at most
/// `concurrency` tasks are in flight at once. Dropping the future returned
/// by [`Projector::project`] aborts every outstanding task.
#[derive(Debug, Clone, Copy)]
pub struct Projector {
    concurrency: usize,
}

impl Projector {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
        }
    }

    /// One unit in flight per available core
    pub fn with_available_parallelism() -> Self {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self::new(cores)
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Project `candidates` relative to `origin`, evaluated on `today`
    ///
    /// Must be called from within a tokio runtime. A candidate whose stored
    /// location cannot be decoded is logged and left as a skipped slot; it
    /// never fails the batch.
    pub async fn project(
        &self,
        candidates: Vec<CandidateRecord>,
        origin: Point,
        today: NaiveDate,
    ) -> ProjectionBatch {
        let ids: Vec<UserId> = candidates.iter().map(|c| c.id).collect();

        let results = self
            .run_window(candidates, move |record| async move {
                project_candidate(&record, &origin, today)
            })
            .await;

        let slots = results
            .into_iter()
            .zip(ids)
            .map(|(slot, id)| {
                slot.unwrap_or_else(|| ProjectionSlot::Skipped {
                    id,
                    reason: "projection unit cancelled".to_string(),
                })
            })
            .collect();

        ProjectionBatch { slots }
    }

    /// Run `unit` over `items` with at most `concurrency` tasks in flight
    ///
    /// Results are indexed by input position; a cancelled unit leaves `None`.
    async fn run_window<T, R, F, Fut>(&self, items: Vec<T>, unit: F) -> Vec<Option<R>>
    where
        T: Send + 'static,
        R: Send + 'static,
        F: Fn(T) -> Fut,
        Fut: Future<Output = R> + Send + 'static,
    {
        let mut results: Vec<Option<R>> = (0..items.len()).map(|_| None).collect();
        let mut pending = items.into_iter().enumerate();
        let mut units = JoinSet::new();

        loop {
            while units.len() < self.concurrency {
                match pending.next() {
                    Some((index, item)) => {
                        let work = unit(item);
                        units.spawn(async move { (index, work.await) });
                    }
                    None => break,
                }
            }

            match units.join_next().await {
                Some(Ok((index, result))) => results[index] = Some(result),
                Some(Err(err)) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Some(Err(err)) => tracing::warn!("Projection unit cancelled: {}", err),
                None => break,
            }
        }

        results
    }
}

impl Default for Projector {
    fn default() -> Self {
        Self::with_available_parallelism()
    }
}

/// Transform one candidate, attaching its age and distance from `origin`
pub fn project_candidate(record: &CandidateRecord, origin: &Point, today: NaiveDate) -> ProjectionSlot {
    match geo::decode(&record.location) {
        Ok(location) => ProjectionSlot::Ready(UserDto {
            id: record.id,
            name: record.name.clone(),
            gender: Some(record.gender),
            age: calculate_age(record.date_of_birth, today),
            distance_km: geo::distance_km(origin, &location),
        }),
        Err(err) => {
            tracing::warn!(
                "Failed to decode location of candidate {} ({}): {}",
                record.id,
                hex::encode_upper(&record.location),
                err
            );
            ProjectionSlot::Skipped {
                id: record.id,
                reason: err.to_string(),
            }
        }
    }
}

/// Whole years between `dob` and `today`
///
/// One year less while today's month/day is still before the birthday.
#[inline]
pub fn calculate_age(dob: NaiveDate, today: NaiveDate) -> i32 {
    let age = today.year() - dob.year();
    if (today.month(), today.day()) < (dob.month(), dob.day()) {
        age - 1
    } else {
        age
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Gender;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn candidate(id: UserId, location: Vec<u8>) -> CandidateRecord {
        CandidateRecord {
            id,
            email: format!("user{}@example.com", id),
            name: format!("User {}", id),
            gender: Gender::Female,
            date_of_birth: ymd(1990, 6, 15),
            location,
        }
    }

    fn nyc() -> Vec<u8> {
        geo::encode_coords(40.7128, -74.0060).unwrap()
    }

    fn la() -> Point {
        Point::new(34.0522, -118.2437).unwrap()
    }

    #[test]
    fn test_age_before_and_after_birthday() {
        let dob = ymd(1990, 6, 15);
        assert_eq!(calculate_age(dob, ymd(2024, 1, 1)), 33);
        assert_eq!(calculate_age(dob, ymd(2024, 6, 14)), 33);
        assert_eq!(calculate_age(dob, ymd(2024, 6, 15)), 34);
        assert_eq!(calculate_age(dob, ymd(2024, 12, 31)), 34);
    }

    #[test]
    fn test_age_new_years_birthday() {
        let dob = ymd(1990, 1, 1);
        assert_eq!(calculate_age(dob, ymd(2024, 1, 1)), 34);
        assert_eq!(calculate_age(dob, ymd(2023, 12, 31)), 32);
    }

    #[test]
    fn test_age_leap_day_birthday() {
        let dob = ymd(2000, 2, 29);
        assert_eq!(calculate_age(dob, ymd(2023, 2, 28)), 22);
        assert_eq!(calculate_age(dob, ymd(2023, 3, 1)), 23);
    }

    #[test]
    fn test_project_candidate() {
        let slot = project_candidate(&candidate(1, nyc()), &la(), ymd(2024, 6, 15));
        assert_eq!(
            slot,
            ProjectionSlot::Ready(UserDto {
                id: 1,
                name: "User 1".to_string(),
                gender: Some(Gender::Female),
                age: 34,
                distance_km: 3935,
            })
        );
    }

    #[tokio::test]
    async fn test_undecodable_location_leaves_zero_slot() {
        let candidates = vec![
            candidate(1, nyc()),
            candidate(2, b"location".to_vec()),
            candidate(3, nyc()),
        ];

        let batch = Projector::new(2).project(candidates, la(), ymd(2024, 6, 15)).await;
        assert_eq!(batch.len(), 3);
        assert_eq!(batch.skipped(), 1);
        assert!(matches!(batch.slots()[1], ProjectionSlot::Skipped { id: 2, .. }));

        let users = batch.into_users();
        assert_eq!(users.len(), 3);
        assert_eq!(users[0].id, 1);
        assert_eq!(users[1], UserDto::default());
        assert_eq!(users[2].id, 3);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_order_preserved_with_many_candidates() {
        let candidates: Vec<CandidateRecord> = (0..500)
            .map(|i| {
                let lat = -60.0 + (i as f64) * 0.2;
                candidate(i, geo::encode_coords(lat, 10.0).unwrap())
            })
            .collect();

        let batch = Projector::new(3).project(candidates, la(), ymd(2024, 6, 15)).await;
        let users = batch.into_users();

        assert_eq!(users.len(), 500);
        for (i, user) in users.iter().enumerate() {
            assert_eq!(user.id, i as UserId);
        }
    }

    #[tokio::test]
    async fn test_empty_input() {
        let batch = Projector::new(4).project(vec![], la(), ymd(2024, 6, 15)).await;
        assert!(batch.is_empty());
        assert_eq!(batch.skipped(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_units_in_flight_never_exceed_concurrency() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let unit = {
            let running = running.clone();
            let peak = peak.clone();
            move |i: usize| {
                let running = running.clone();
                let peak = peak.clone();
                async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                    i
                }
            }
        };

        let results = Projector::new(3).run_window((0..40).collect(), unit).await;

        assert_eq!(results, (0..40).map(Some).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 1);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_dropping_projection_aborts_outstanding_units() {
        let started = Arc::new(AtomicUsize::new(0));
        let finished = Arc::new(AtomicUsize::new(0));

        let unit = {
            let started = started.clone();
            let finished = finished.clone();
            move |_: usize| {
                let started = started.clone();
                let finished = finished.clone();
                async move {
                    started.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(200)).await;
                    finished.fetch_add(1, Ordering::SeqCst);
                }
            }
        };

        let projector = Projector::new(2);
        let projection = projector.run_window((0..10).collect(), unit);
        let outcome = tokio::time::timeout(Duration::from_millis(50), projection).await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(400)).await;

        assert_eq!(started.load(Ordering::SeqCst), 2);
        assert_eq!(finished.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrency_floor() {
        assert_eq!(Projector::new(0).concurrency(), 1);
        assert!(Projector::with_available_parallelism().concurrency() >= 1);
    }
}
