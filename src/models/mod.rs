//! Data models for event envelopes, publish requests, channels and presence.

pub mod channel;
pub mod event;
pub mod presence;

pub use channel::*;
pub use event::*;
pub use presence::*;
