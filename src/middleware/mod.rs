//! Middleware and extractors: request signature verification for the publish routes.

pub mod auth;

pub use auth::Verified;
