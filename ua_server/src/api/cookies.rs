//! Session cookies.
//!
//! Tokens travel in `HttpOnly`, `SameSite=Lax` cookies scoped to `/`.

use axum::http::{HeaderMap, HeaderValue, header::COOKIE};

pub const REFRESH_COOKIE: &str = "refresh_token";
pub const ACCESS_COOKIE: &str = "access_token";

/// Cookie attributes shared by all session cookies
#[derive(Debug, Clone, Copy, Default)]
pub struct CookieSettings {
    pub secure: bool,
}

impl CookieSettings {
    /// `Set-Cookie` value storing `value` for `max_age_secs`
    ///
    /// `None` (logged) when the value is not a valid header value.
    pub fn build(&self, name: &str, value: &str, max_age_secs: u64) -> Option<HeaderValue> {
        let mut cookie =
            format!("{name}={value}; Max-Age={max_age_secs}; Path=/; HttpOnly; SameSite=Lax");
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie)
            .map_err(|e| {
                tracing::warn!(cookie = name, error = %e, "Dropping unrepresentable Set-Cookie value");
            })
            .ok()
    }

    /// `Set-Cookie` value that removes the cookie
    pub fn clear(&self, name: &str) -> Option<HeaderValue> {
        self.build(name, "", 0)
    }
}

/// Value of cookie `name` from the request's `Cookie` headers
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; refresh_token=abc.def.ghi; other=1"),
        );
        assert_eq!(
            read_cookie(&headers, REFRESH_COOKIE).as_deref(),
            Some("abc.def.ghi")
        );
        assert!(read_cookie(&headers, ACCESS_COOKIE).is_none());
    }

    #[test]
    fn test_empty_cookie_is_absent() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("refresh_token="));
        assert!(read_cookie(&headers, REFRESH_COOKIE).is_none());
    }

    #[test]
    fn test_build_cookie_attributes() {
        let value = CookieSettings { secure: true }
            .build(REFRESH_COOKIE, "tok", 3600)
            .unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("refresh_token=tok;"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn test_clear_cookie() {
        let value = CookieSettings::default().clear(ACCESS_COOKIE).unwrap();
        let value = value.to_str().unwrap();
        assert!(value.starts_with("access_token=;"));
        assert!(value.contains("Max-Age=0"));
        assert!(!value.contains("Secure"));
    }

    #[test]
    fn test_unrepresentable_value_is_dropped() {
        let settings = CookieSettings::default();
        assert!(settings.build(REFRESH_COOKIE, "bad\nvalue", 60).is_none());
        assert!(settings.build(REFRESH_COOKIE, "good.value", 60).is_some());
    }
}
