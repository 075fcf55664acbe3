//! HTTP request handlers.

pub mod channels;
pub mod events;
pub mod http;

pub use channels::*;
pub use events::*;
pub use http::*;
