//! Content categories, usage tracking and the picker that chooses what to
//! post next.

pub mod instructions;
pub mod picker;
pub mod sqlite;

pub use picker::{ContentPicker, PickOutcome};
pub use sqlite::{CategoryStats, SqliteContentStore};
