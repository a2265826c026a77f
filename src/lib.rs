//! Swipe Engine - discovery and reciprocity service for swipe-based matching
//!
//! The read path finds candidates around a requester and projects them into
//! DTOs carrying age and distance. The write path records swipes and turns
//! mutual right swipes into exactly one match per pair.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use crate::core::{distance_km, haversine_distance, Discovery, FilterBuilder, MatchResolver, Projector};
pub use error::{EngineError, GeoError, StorageError};
pub use models::{DiscoveryFilter, Point, SwipeDirection, SwipeOutcome, UserDto, UserId};
