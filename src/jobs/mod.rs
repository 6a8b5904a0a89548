//! Job records and the job registry
//!
//! A [`Job`] owns its lifecycle: every state change goes through one of its
//! transition methods. The [`JobStore`] keeps jobs addressable by id and
//! serializes updates to each of them.

mod job;
mod store;

pub use job::{Artifact, Job};
pub use store::{InMemoryJobStore, JobStore};
