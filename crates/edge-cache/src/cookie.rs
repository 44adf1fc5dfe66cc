//! Cookie access used to persist the vary fingerprint between requests.

use std::collections::HashMap;

/// Attributes applied when writing or deleting a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieMetadata {
    /// Cookie path.
    pub path: String,
    /// Hidden from browser scripts.
    pub http_only: bool,
}

impl CookieMetadata {
    /// Script-inaccessible cookie scoped to `path`.
    pub fn sensitive(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            http_only: true,
        }
    }
}

/// Key/value cookie transport provided by the host.
pub trait CookieJar {
    /// Value sent by the client, if any.
    fn get(&self, name: &str) -> Option<String>;

    /// Write a script-inaccessible cookie.
    fn set_sensitive(&mut self, name: &str, value: &str, metadata: &CookieMetadata);

    /// Ask the client to drop a cookie.
    fn delete(&mut self, name: &str, metadata: &CookieMetadata);
}

/// A write recorded by [`MemoryCookieJar`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookieOp {
    Set {
        name: String,
        value: String,
        metadata: CookieMetadata,
    },
    Delete {
        name: String,
        metadata: CookieMetadata,
    },
}

impl CookieOp {
    /// Render as a `Set-Cookie` header value.
    pub fn to_set_cookie(&self) -> String {
        let (name, value, metadata, expire) = match self {
            Self::Set {
                name,
                value,
                metadata,
            } => (name, value.as_str(), metadata, false),
            Self::Delete { name, metadata } => (name, "", metadata, true),
        };

        let mut parts = vec![format!("{}={}", name, value)];
        if expire {
            parts.push("Max-Age=0".to_string());
        }
        parts.push(format!("Path={}", metadata.path));
        if metadata.http_only {
            parts.push("HttpOnly".to_string());
        }
        parts.join("; ")
    }
}

/// Cookie jar backed by the request's cookies that records every write.
#[derive(Debug, Clone, Default)]
pub struct MemoryCookieJar {
    cookies: HashMap<String, String>,
    ops: Vec<CookieOp>,
}

impl MemoryCookieJar {
    /// Create an empty jar.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a jar seeded with request cookies.
    pub fn from_request(cookies: &HashMap<String, String>) -> Self {
        Self {
            cookies: cookies.clone(),
            ops: Vec::new(),
        }
    }

    /// Seed a cookie as if the client had sent it.
    pub fn with_cookie(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.cookies.insert(name.into(), value.into());
        self
    }

    /// Writes performed so far.
    pub fn ops(&self) -> &[CookieOp] {
        &self.ops
    }

    /// `Set-Cookie` header values for every write.
    pub fn set_cookie_headers(&self) -> Vec<String> {
        self.ops.iter().map(CookieOp::to_set_cookie).collect()
    }
}

impl CookieJar for MemoryCookieJar {
    fn get(&self, name: &str) -> Option<String> {
        self.cookies.get(name).cloned()
    }

    fn set_sensitive(&mut self, name: &str, value: &str, metadata: &CookieMetadata) {
        self.cookies.insert(name.to_string(), value.to_string());
        self.ops.push(CookieOp::Set {
            name: name.to_string(),
            value: value.to_string(),
            metadata: metadata.clone(),
        });
    }

    fn delete(&mut self, name: &str, metadata: &CookieMetadata) {
        self.cookies.remove(name);
        self.ops.push(CookieOp::Delete {
            name: name.to_string(),
            metadata: metadata.clone(),
        });
    }
}
