use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::time::Duration;

use crate::core::geo;
use crate::error::StorageError;
use crate::models::{
    CandidateRecord, DiscoveryFilter, MatchRecord, NewUser, PairKey, SwipeDirection, SwipeEvent,
    UserId,
};
use crate::services::store::{CandidateSource, MatchStore, Store, SwipeLedger, UserDirectory};

const MATCH_COLUMNS: &str = "id, user_low AS user_a, user_high AS user_b, matched, created_at";

/// PostgreSQL + PostGIS store
///
/// Locations live in a `geometry(Point, 4326)` column and are exchanged with
/// the engine as EWKB. The radius predicate is evaluated by PostGIS on the
/// `geography` cast, so the filter radius is in meters.
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Connect and run migrations
    pub async fn new(
        database_url: &str,
        max_connections: u32,
        min_connections: u32,
        acquire_timeout: Duration,
        idle_timeout: Duration,
    ) -> Result<Self, StorageError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .min_connections(min_connections)
            .acquire_timeout(acquire_timeout)
            .idle_timeout(idle_timeout)
            .test_before_acquire(true)
            .connect(database_url)
            .await?;

        // Run migrations on startup
        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create a store from settings
    pub async fn from_settings(
        url: &str,
        max_connections: Option<u32>,
        min_connections: Option<u32>,
        acquire_timeout_secs: Option<u64>,
        idle_timeout_secs: Option<u64>,
    ) -> Result<Self, StorageError> {
        tracing::info!("Connecting to PostgreSQL");

        Self::new(
            url,
            max_connections.unwrap_or(10),
            min_connections.unwrap_or(1),
            Duration::from_secs(acquire_timeout_secs.unwrap_or(5)),
            Duration::from_secs(idle_timeout_secs.unwrap_or(600)),
        )
        .await
    }

    async fn find_match(&self, pair: PairKey) -> Result<Option<MatchRecord>, StorageError> {
        let query = format!(
            "SELECT {} FROM matches WHERE user_low = $1 AND user_high = $2",
            MATCH_COLUMNS
        );
        let record = sqlx::query_as::<_, MatchRecord>(&query)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }
}

/// Build the candidate query for `requester`
fn candidate_query(requester: UserId, filter: &DiscoveryFilter) -> QueryBuilder<'static, Postgres> {
    let mut query = QueryBuilder::new(
        "SELECT u.id, u.email, u.name, u.gender, u.date_of_birth, \
         ST_AsEWKB(u.location) AS location \
         FROM users u WHERE u.id <> ",
    );
    query.push_bind(requester);

    query
        .push(" AND NOT EXISTS (SELECT 1 FROM swipes s WHERE s.user_id = ")
        .push_bind(requester)
        .push(" AND s.target_user_id = u.id)");

    query
        .push(" AND u.date_of_birth >= ")
        .push_bind(filter.dob_range.min_dob)
        .push(" AND u.date_of_birth <= ")
        .push_bind(filter.dob_range.max_dob);

    if let Some(gender) = filter.gender {
        query.push(" AND u.gender = ").push_bind(gender);
    }

    if filter.has_radius() {
        query
            .push(" AND ST_DWithin(u.location::geography, ST_SetSRID(ST_MakePoint(")
            .push_bind(filter.origin.lng())
            .push(", ")
            .push_bind(filter.origin.lat())
            .push("), 4326)::geography, ")
            .push_bind(filter.radius)
            .push(")");
    }

    query.push(" ORDER BY u.id");
    query
}

#[async_trait]
impl CandidateSource for PostgresStore {
    async fn query_candidates(
        &self,
        requester: UserId,
        filter: &DiscoveryFilter,
    ) -> Result<Vec<CandidateRecord>, StorageError> {
        let mut query = candidate_query(requester, filter);
        let candidates = query
            .build_query_as::<CandidateRecord>()
            .fetch_all(&self.pool)
            .await?;

        tracing::debug!("Found {} candidates for user {}", candidates.len(), requester);

        Ok(candidates)
    }
}

#[async_trait]
impl SwipeLedger for PostgresStore {
    async fn record_swipe(&self, event: &SwipeEvent) -> Result<(), StorageError> {
        let query = r#"
            INSERT INTO swipes (user_id, target_user_id, swiped_right)
            VALUES ($1, $2, $3)
        "#;

        sqlx::query(query)
            .bind(event.actor_id)
            .bind(event.target_id)
            .bind(event.direction == SwipeDirection::Right)
            .execute(&self.pool)
            .await?;

        tracing::debug!(
            "Recorded swipe: {} -> {} ({:?})",
            event.actor_id,
            event.target_id,
            event.direction
        );

        Ok(())
    }

    async fn has_right_swipe(&self, from: UserId, to: UserId) -> Result<bool, StorageError> {
        let query = r#"
            SELECT EXISTS (
                SELECT 1 FROM swipes
                WHERE user_id = $1 AND target_user_id = $2 AND swiped_right
            )
        "#;

        let found: bool = sqlx::query_scalar(query)
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await?;

        Ok(found)
    }
}

#[async_trait]
impl MatchStore for PostgresStore {
    /// Insert-if-absent on the unique `(user_low, user_high)` key
    ///
    /// A concurrent loser's insert waits for the winner's commit and then
    /// does nothing, so the follow-up read sees the winner's row.
    async fn resolve_match(&self, pair: PairKey) -> Result<MatchRecord, StorageError> {
        let query = format!(
            r#"
            INSERT INTO matches (user_low, user_high, matched)
            VALUES ($1, $2, TRUE)
            ON CONFLICT (user_low, user_high) DO NOTHING
            RETURNING {}
            "#,
            MATCH_COLUMNS
        );

        let inserted = sqlx::query_as::<_, MatchRecord>(&query)
            .bind(pair.low())
            .bind(pair.high())
            .fetch_optional(&self.pool)
            .await?;

        if let Some(record) = inserted {
            tracing::info!("Created match {} for users {} and {}", record.id, pair.low(), pair.high());
            return Ok(record);
        }

        self.find_match(pair).await?.ok_or_else(|| {
            StorageError::NotFound(format!("match for users {} and {}", pair.low(), pair.high()))
        })
    }
}

#[async_trait]
impl UserDirectory for PostgresStore {
    async fn insert_user(&self, user: &NewUser) -> Result<UserId, StorageError> {
        let location = geo::encode(&user.location)?;
        let query = r#"
            INSERT INTO users (email, name, gender, date_of_birth, location)
            VALUES ($1, $2, $3, $4, ST_GeomFromEWKB($5))
            RETURNING id
        "#;

        let id: UserId = sqlx::query_scalar(query)
            .bind(&user.email)
            .bind(&user.name)
            .bind(user.gender)
            .bind(user.date_of_birth)
            .bind(location)
            .fetch_one(&self.pool)
            .await?;

        Ok(id)
    }
}

#[async_trait]
impl Store for PostgresStore {
    async fn health_check(&self) -> Result<bool, StorageError> {
        sqlx::query("SELECT 1")
            .fetch_one(&self.pool)
            .await
            .map(|_| true)
            .map_err(Into::into)
    }
}
