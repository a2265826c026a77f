// Core engine exports
pub mod discovery;
pub mod filters;
pub mod geo;
pub mod projector;
pub mod resolver;

pub use discovery::Discovery;
pub use filters::{DiscoveryPreferences, FilterBuilder, RadiusPolicy};
pub use geo::{decode, distance_km, encode, haversine_distance};
pub use projector::{calculate_age, ProjectionBatch, ProjectionSlot, Projector};
pub use resolver::MatchResolver;
