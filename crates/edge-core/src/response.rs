//! Outgoing response model.

use http::header::{HeaderName, CACHE_CONTROL, EXPIRES, PRAGMA};
use http::{HeaderMap, HeaderValue, StatusCode};

/// Cache-Control value applied by [`Response::set_no_cache_headers`].
pub const NO_CACHE_CONTROL: &str = "max-age=0, must-revalidate, no-cache, no-store";

/// Expires value applied by [`Response::set_no_cache_headers`].
pub const EXPIRED_DATE: &str = "Thu, 01 Jan 1970 00:00:00 GMT";

/// A response under construction: status plus headers.
#[derive(Debug, Clone)]
pub struct Response {
    /// HTTP status code.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
}

impl Default for Response {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl Response {
    /// Create an empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// Set a header, replacing any previous value.
    ///
    /// Returns `false` when the name or value is not a valid header.
    pub fn set_header(&mut self, name: &str, value: &str) -> bool {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.insert(name, value);
                true
            }
            _ => false,
        }
    }

    /// Builder-style variant of [`Response::set_header`].
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Remove a header.
    pub fn clear_header(&mut self, name: &str) {
        self.headers.remove(name);
    }

    /// Replace caching headers with a conservative no-cache set.
    pub fn set_no_cache_headers(&mut self) {
        self.headers
            .insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE_CONTROL));
        self.headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
        self.headers
            .insert(EXPIRES, HeaderValue::from_static(EXPIRED_DATE));
    }

    /// Headers as ordered `(name, value)` string pairs.
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        let mut pairs: Vec<(String, String)> = self
            .headers
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    String::from_utf8_lossy(v.as_bytes()).into_owned(),
                )
            })
            .collect();
        pairs.sort();
        pairs
    }
}
