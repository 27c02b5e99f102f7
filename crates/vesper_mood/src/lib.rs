//! # Vesper Mood
//!
//! The persona's persisted mood: which reply mode is active, when the user
//! last spoke, and how far the current silence episode has escalated.
//!
//! All mutation goes through [`MoodHandle`], which serializes
//! read-modify-write cycles and persists the full record after each one.

mod handle;
pub mod silence;
mod store;

pub use handle::MoodHandle;
pub use silence::{Escalation, SilenceMonitor};
pub use store::FileMoodStore;
