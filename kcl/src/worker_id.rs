//! Worker identity generation.

use uuid::Uuid;

/// Returns a fresh worker identity.
///
/// Every call yields a new random (v4) UUID in its hyphenated form, so two
/// workers started without an explicit identity never share a lease owner.
pub fn generate() -> String {
    Uuid::new_v4().to_string()
}
