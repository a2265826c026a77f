use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{calculate_age, Discovery, DiscoveryPreferences, FilterBuilder, MatchResolver, Projector};
use crate::error::EngineError;
use crate::models::{
    CreateUserRequest, CreateUserResponse, CreatedUser, DiscoverRequest, DiscoverResponse,
    HealthResponse, SwipeRequest, SwipeResponse,
};
use crate::routes::auth::{AuthenticatedUser, JwtVerifier};
use crate::services::{CandidateSource, MatchStore, Store, SwipeLedger, UserDirectory};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub discovery: Discovery,
    pub resolver: MatchResolver,
    pub filters: FilterBuilder,
    pub jwt: JwtVerifier,
}

impl AppState {
    /// Wire the engine components to a single store
    pub fn new<S: Store + 'static>(
        store: Arc<S>,
        filters: FilterBuilder,
        projector: Projector,
        jwt: JwtVerifier,
    ) -> Self {
        let candidates: Arc<dyn CandidateSource> = store.clone();
        let ledger: Arc<dyn SwipeLedger> = store.clone();
        let matches: Arc<dyn MatchStore> = store.clone();

        Self {
            discovery: Discovery::new(candidates, projector),
            resolver: MatchResolver::new(ledger, matches),
            store,
            filters,
            jwt,
        }
    }
}

/// Configure all user, discovery and swipe routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health_check))
        .route("/user/create", web::post().to(create_user))
        .route("/discover", web::get().to(discover))
        .route("/swipe", web::post().to(swipe));
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let healthy = state.store.health_check().await.unwrap_or_else(|e| {
        tracing::warn!("Store health check failed: {}", e);
        false
    });

    let status = if healthy { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// User creation endpoint
///
/// POST /api/v1/user/create
///
/// Request body:
/// ```json
/// {
///   "email": "ana@example.com",
///   "name": "Ana",
///   "gender": "FEMALE",
///   "dateOfBirth": "1995-04-02",
///   "lat": 40.7128,
///   "lng": -74.0060
/// }
/// ```
async fn create_user(
    state: web::Data<AppState>,
    req: web::Json<CreateUserRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for create user request: {:?}", errors);
        return Err(EngineError::Validation(errors.to_string()));
    }

    let user = req
        .to_new_user()
        .ok_or_else(|| EngineError::Validation("invalid user".to_string()))?;

    let id = state.store.insert_user(&user).await.map_err(|e| {
        tracing::error!("Failed to create user {}: {}", user.email, e);
        EngineError::from(e)
    })?;

    tracing::info!("Created user {}", id);

    Ok(HttpResponse::Created().json(CreateUserResponse {
        result: CreatedUser {
            id,
            age: calculate_age(user.date_of_birth, chrono::Utc::now().date_naive()),
            email: user.email,
            name: user.name,
            gender: user.gender,
        },
    }))
}

/// Discover endpoint
///
/// GET /api/v1/discover?lat=..&lng=..&distance=..&minAge=..&maxAge=..&gender=FEMALE
async fn discover(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query: web::Query<DiscoverRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = query.validate() {
        tracing::info!("Validation failed for discover request from {}: {:?}", user.0, errors);
        return Err(EngineError::Validation(errors.to_string()));
    }

    let mut preferences = DiscoveryPreferences::new()
        .with_location(query.latitude, query.longitude)
        .with_distance(query.distance)
        .with_age_range(query.min_age, query.max_age);
    if let Some(gender) = query.gender() {
        preferences = preferences.with_gender(gender);
    }

    let filter = state.filters.build(&preferences)?;

    tracing::info!(
        "Discovering for user {} (radius: {}m, ages {}-{})",
        user.0,
        filter.radius,
        filter.min_age,
        filter.max_age
    );

    let results = state.discovery.discover(user.0, &filter).await?;

    Ok(HttpResponse::Ok().json(DiscoverResponse { results }))
}

/// Swipe endpoint
///
/// POST /api/v1/swipe
///
/// Request body:
/// ```json
/// { "targetUserId": 42, "preference": "YES" }
/// ```
async fn swipe(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    req: web::Json<SwipeRequest>,
) -> Result<HttpResponse, EngineError> {
    if let Err(errors) = req.validate() {
        tracing::info!("Validation failed for swipe request from {}: {:?}", user.0, errors);
        return Err(EngineError::Validation(errors.to_string()));
    }

    let outcome = state
        .resolver
        .process_swipe(user.0, req.target_user_id, req.direction())
        .await?;

    tracing::info!(
        "User {} swiped {:?} on {} (matched: {})",
        user.0,
        req.direction(),
        req.target_user_id,
        outcome.matched
    );

    Ok(HttpResponse::Ok().json(SwipeResponse::from(outcome)))
}
