//! Unique destination filenames.

use std::sync::Arc;

/// Produces a collision-free filename for each call
pub type NameGenerator = Arc<dyn Fn() -> String + Send + Sync>;

/// Default generator: `photo_<utc timestamp>_<uuid>.jpg`
///
/// The timestamp keeps directory listings ordered; the UUID makes names
/// unique across concurrent fetches.
pub fn generate_unique_filename() -> String {
    let stamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    format!("photo_{}_{}.jpg", stamp, uuid::Uuid::new_v4().simple())
}

/// Wrap [`generate_unique_filename`] as a [`NameGenerator`]
pub fn default_name_generator() -> NameGenerator {
    Arc::new(generate_unique_filename)
}
