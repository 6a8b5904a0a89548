//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`downloads`]: Playlist jobs (submit, status, retrieve, events)
//! - [`system`]: Health and OpenAPI

mod downloads;
mod system;

// Re-export all handlers so `routes::function_name` works
pub use downloads::*;
pub use system::*;
