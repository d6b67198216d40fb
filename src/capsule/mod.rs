//! Saved narratives ("time capsules").
//!
//! [`CapsuleStore`] keeps at most [`MAX_CAPSULES`] entries, newest first,
//! in the SQLite database opened by [`crate::db`].

pub mod store;
pub mod types;

pub use store::{CapsuleStore, MAX_CAPSULES};
pub use types::{NewCapsule, TimeCapsule};
