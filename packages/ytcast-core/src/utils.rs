//! General utilities shared across the crate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use rand::Rng;
use url::Url;

// ─────────────────────────────────────────────────────────────────────────────
// Time Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Returns the current Unix timestamp in milliseconds.
///
/// Returns 0 if the system clock is before the Unix epoch (shouldn't happen in practice).
#[must_use]
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Clamps `value` into `[min, max]`.
///
/// Unlike [`Ord::clamp`] this never panics: if `min > max`, `max` wins.
#[must_use]
pub fn clamp_duration(value: Duration, min: Duration, max: Duration) -> Duration {
    value.max(min).min(max)
}

/// Picks a delay uniformly in `[min, max]` (millisecond resolution).
#[must_use]
pub fn random_delay(min: Duration, max: Duration) -> Duration {
    let min_ms = min.as_millis() as u64;
    let max_ms = (max.as_millis() as u64).max(min_ms);
    Duration::from_millis(rand::rng().random_range(min_ms..=max_ms))
}

// ─────────────────────────────────────────────────────────────────────────────
// URL Utilities
// ─────────────────────────────────────────────────────────────────────────────

/// Appends `segment` to the path of `base`, keeping exactly one `/` between them.
///
/// Query and fragment of `base` are preserved.
///
/// # Example
/// ```ignore
/// let url = url_join("http://192.168.1.10:8080/apps/", "YouTube")?;
/// assert_eq!(url, "http://192.168.1.10:8080/apps/YouTube");
/// ```
pub fn url_join(base: &str, segment: &str) -> Result<String, url::ParseError> {
    let mut url = Url::parse(base.trim())?;
    let path = format!(
        "{}/{}",
        url.path().trim_end_matches('/'),
        segment.trim_start_matches('/')
    );
    url.set_path(&path);
    Ok(url.to_string())
}

/// Extracts the host part of a URL, falling back to the input when unparsable.
#[must_use]
pub fn url_host(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| url.to_string())
}
