//! Session and registration lifetimes.

use std::env;

/// Refresh-token lifetime for `stay_login` sessions (30 days). Not configurable.
pub const LONG_REFRESH_TTL_SECS: u64 = 30 * 24 * 60 * 60;

/// Cache lifetime written on long-tier rotation (1 hour). Not configurable.
pub const LONG_CACHE_TTL_SECS: u64 = 60 * 60;

/// Lifetimes, in seconds, used by registration and the session engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// How long a pending registration stays in the cache (`ACTIVE_TTL`)
    pub registration_ttl_secs: u64,
    /// Short-tier refresh token lifetime (`REFRESH_TTL_SHORT`)
    pub refresh_short_ttl_secs: u64,
    /// Cache lifetime of the refresh token written at login (`REFRESH_CACHE`)
    pub refresh_cache_ttl_secs: u64,
    /// Access token lifetime (`ACCESS_TTL`)
    pub access_ttl_secs: u64,
}

impl SessionConfig {
    /// Create configuration from environment variables
    ///
    /// Expected environment variables:
    /// - `ACTIVE_TTL`: pending registration lifetime (default: 3600)
    /// - `REFRESH_TTL_SHORT`: short refresh token lifetime (default: 3600)
    /// - `REFRESH_CACHE`: refresh cache lifetime at login (default: 3600)
    /// - `ACCESS_TTL`: access token lifetime (default: 900)
    ///
    /// Missing, unparsable, zero or negative values fall back to the default.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            registration_ttl_secs: positive_env_or("ACTIVE_TTL", defaults.registration_ttl_secs),
            refresh_short_ttl_secs: positive_env_or(
                "REFRESH_TTL_SHORT",
                defaults.refresh_short_ttl_secs,
            ),
            refresh_cache_ttl_secs: positive_env_or(
                "REFRESH_CACHE",
                defaults.refresh_cache_ttl_secs,
            ),
            access_ttl_secs: positive_env_or("ACCESS_TTL", defaults.access_ttl_secs),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            registration_ttl_secs: 3600,
            refresh_short_ttl_secs: 3600,
            refresh_cache_ttl_secs: 3600,
            access_ttl_secs: 15 * 60,
        }
    }
}

/// Read a positive integer from `key`, falling back to `default`.
pub fn positive_env_or(key: &str, default: u64) -> u64 {
    parse_positive(env::var(key).ok().as_deref()).unwrap_or(default)
}

fn parse_positive(raw: Option<&str>) -> Option<u64> {
    let value = raw?.trim().parse::<f64>().ok()?;
    if value.is_finite() && value >= 1.0 {
        Some(value.floor() as u64)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.access_ttl_secs, 900);
        assert_eq!(config.refresh_short_ttl_secs, 3600);
        assert_eq!(config.refresh_cache_ttl_secs, 3600);
        assert_eq!(LONG_REFRESH_TTL_SECS, 2_592_000);
        assert_eq!(LONG_CACHE_TTL_SECS, 3600);
    }

    #[test]
    fn test_parse_positive() {
        assert_eq!(parse_positive(Some("120")), Some(120));
        assert_eq!(parse_positive(Some(" 90.7 ")), Some(90));
        assert_eq!(parse_positive(Some("0")), None);
        assert_eq!(parse_positive(Some("-5")), None);
        assert_eq!(parse_positive(Some("abc")), None);
        assert_eq!(parse_positive(Some("inf")), None);
        assert_eq!(parse_positive(None), None);
    }
}
