//! Shared entity model and API payload types for `tasklink`.

pub mod task;
pub mod user;

/// Returns the current wall-clock time as milliseconds since the Unix epoch.
///
/// Used for `dateCreated` stamps on new entities.
#[must_use]
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
}
