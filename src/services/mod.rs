//! Business logic: request signatures, event publication and occupancy queries.

pub mod auth;
pub mod occupancy;
pub mod publisher;

pub use auth::{Params, SignatureAuthenticator, SignedRequest};
pub use occupancy::OccupancyService;
pub use publisher::{EventPublisher, PublishReport};
