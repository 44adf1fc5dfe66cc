//! Request context with typed parameters.

use std::collections::HashMap;

use http::{HeaderMap, HeaderValue, Method};

/// Query string parameters.
pub type QueryParams = HashMap<String, String>;

/// Request cookies, keyed by cookie name.
pub type Cookies = HashMap<String, String>;

/// Header sent by browser-side scripts issuing XHR requests.
pub const X_REQUESTED_WITH: &str = "x-requested-with";

/// Query parameter carrying a cache-busting random string.
pub const CACHE_BUSTER_PARAM: &str = "_";

/// Typed request context handed to the cache coordinator.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// HTTP method.
    pub method: Method,
    /// Request path.
    pub path: String,
    /// Query string parameters.
    pub query: QueryParams,
    /// HTTP headers.
    pub headers: HeaderMap,
    /// Cookies sent with the request.
    pub cookies: Cookies,
    /// Explicit AJAX flag set by the host framework.
    pub ajax: bool,
}

impl RequestContext {
    /// Create a new request context.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: HashMap::new(),
            headers: HeaderMap::new(),
            cookies: HashMap::new(),
            ajax: false,
        }
    }

    /// Shorthand for a GET request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    /// Add a query parameter.
    pub fn with_query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.insert(name.into(), value.into());
        self
    }

    /// Add a cookie.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Add a header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::header::HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Mark the request as an AJAX request.
    pub fn with_ajax(mut self, ajax: bool) -> Self {
        self.ajax = ajax;
        self
    }

    /// Get a query parameter by name.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(|s| s.as_str())
    }

    /// Get a cookie by name.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(|s| s.as_str())
    }

    /// Get a header value by name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Whether the request is safe to serve from a shared cache.
    pub fn is_get_or_head(&self) -> bool {
        self.method == Method::GET || self.method == Method::HEAD
    }

    /// Whether the request was issued by a browser script.
    ///
    /// True when the host flagged it, when `X-Requested-With: XMLHttpRequest`
    /// is present, or when an `ajax`/`isAjax` query parameter is set.
    pub fn is_ajax(&self) -> bool {
        if self.ajax {
            return true;
        }
        if self
            .header(X_REQUESTED_WITH)
            .is_some_and(|v| v.eq_ignore_ascii_case("XMLHttpRequest"))
        {
            return true;
        }
        ["ajax", "isAjax"]
            .iter()
            .any(|p| self.query_param(p).is_some_and(is_truthy))
    }

    /// Whether the request carries a non-empty cache-busting parameter.
    pub fn has_cache_buster(&self) -> bool {
        self.query_param(CACHE_BUSTER_PARAM).is_some_and(is_truthy)
    }
}

/// Loose truthiness for request parameters: empty and `"0"` are false.
fn is_truthy(value: &str) -> bool {
    !value.is_empty() && value != "0"
}
