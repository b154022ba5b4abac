//! Persistent guest identity.

use std::{fs, path::Path};

use clanker_shared::time::unix_millis;
use uuid::Uuid;

/// Default file the guest id is kept in, relative to the working directory
pub const DEFAULT_GUEST_FILE: &str = ".guest_id";

/// Load the guest id stored at `path`, or generate and store a new one.
///
/// Storing is best-effort: a write failure is logged and the generated id
/// is still used for this run.
pub fn load_or_create(path: &Path) -> String {
    if let Some(existing) = load(path) {
        tracing::debug!("Loaded guest id from {}", path.display());
        return existing;
    }

    let guest_id = generate();
    match fs::write(path, &guest_id) {
        Ok(()) => tracing::info!("Stored new guest id in {}", path.display()),
        Err(e) => tracing::warn!("Failed to store guest id in {}: {}", path.display(), e),
    }
    guest_id
}

fn load(path: &Path) -> Option<String> {
    let content = fs::read_to_string(path).ok()?;
    let trimmed = content.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// `<uuid v4 simple>-<unix millis>`
fn generate() -> String {
    format!("{}-{}", Uuid::new_v4().simple(), unix_millis())
}
