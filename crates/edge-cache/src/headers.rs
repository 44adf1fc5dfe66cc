//! Surrogate protocol headers.

use std::collections::BTreeSet;

use edge_core::{Response, StatusCode};

use crate::encoding::{html_escape, truncate};
use crate::tags::{translate_tags, TagSet};

/// Header names understood by the surrogate cache.
pub mod header_names {
    /// Purge directive.
    pub const X_LITESPEED_PURGE: &str = "X-LiteSpeed-Purge";
    /// Cache-control directive for the surrogate.
    pub const X_LITESPEED_CACHE_CONTROL: &str = "X-LiteSpeed-Cache-Control";
    /// Cache tags of the response.
    pub const X_LITESPEED_TAG: &str = "X-LiteSpeed-Tag";
    /// Vary directive.
    pub const X_LITESPEED_VARY: &str = "X-LiteSpeed-Vary";
    /// Why the response is not cacheable.
    pub const X_LITEMAGE_DEBUG_INFO: &str = "X-LiteMage-Debug-Info";
    /// Mirror of the cache-control directive.
    pub const X_LITEMAGE_DEBUG_CC: &str = "X-LiteMage-Debug-CC";
    /// Raw vary context.
    pub const X_LITEMAGE_DEBUG_VARY: &str = "X-LiteMage-Debug-Vary";
    /// Mirror of the tag header.
    pub const X_LITEMAGE_DEBUG_TAG: &str = "X-LiteMage-Debug-Tag";
    /// Mirror of the purge directive.
    pub const X_LITEMAGE_DEBUG_PURGE: &str = "X-LiteMage-Debug-Purge";
    /// Tag header emitted natively by the framework; superseded by ours.
    pub const X_MAGENTO_TAGS: &str = "X-Magento-Tags";
    /// Standard cache-control header.
    pub const CACHE_CONTROL: &str = "Cache-Control";
}

/// Maximum length of the debug reason header.
pub const DEBUG_INFO_MAX_LEN: usize = 256;

/// Response surface the header emitter writes to.
pub trait ResponseHeaders {
    /// HTTP status of the response.
    fn status(&self) -> StatusCode;

    /// Current value of a header.
    fn header(&self, name: &str) -> Option<String>;

    /// Set a header, replacing any previous value.
    fn set_header(&mut self, name: &str, value: &str);

    /// Remove a header.
    fn clear_header(&mut self, name: &str);

    /// Replace caching headers with a no-cache set.
    fn set_no_cache_headers(&mut self);
}

impl ResponseHeaders for Response {
    fn status(&self) -> StatusCode {
        self.status
    }

    fn header(&self, name: &str) -> Option<String> {
        Response::header(self, name).map(str::to_string)
    }

    fn set_header(&mut self, name: &str, value: &str) {
        if !Response::set_header(self, name, value) {
            tracing::warn!(header = name, "dropping header with invalid value");
        }
    }

    fn clear_header(&mut self, name: &str) {
        Response::clear_header(self, name);
    }

    fn set_no_cache_headers(&mut self) {
        Response::set_no_cache_headers(self);
    }
}

/// Whether responses with this status may be stored.
pub fn is_cacheable_status(status: StatusCode) -> bool {
    status == StatusCode::OK || status == StatusCode::NOT_FOUND
}

/// Surrogate cache-control value for a cacheable response.
pub fn public_cache_control(ttl_secs: u64) -> String {
    format!("public,max-age={}", ttl_secs)
}

/// Append `esi=on` to a cache-control value.
pub fn with_esi(cache_control: &str) -> String {
    if cache_control.is_empty() {
        "esi=on".to_string()
    } else {
        format!("{},esi=on", cache_control)
    }
}

/// Detect an upstream full-page cache claim: `public` followed somewhere by
/// `s-maxage=<digits>`. Returns the claimed max age, saturated at `u64::MAX`.
pub fn upstream_shared_max_age(cache_control: &str) -> Option<u64> {
    const S_MAXAGE: &str = "s-maxage=";

    let public_at = cache_control.find("public")?;
    let rest = &cache_control[public_at + "public".len()..];

    // Like a greedy regex, prefer the last occurrence followed by digits.
    rest.rmatch_indices(S_MAXAGE).find_map(|(at, _)| {
        let tail = &rest[at + S_MAXAGE.len()..];
        let end = tail
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(tail.len());
        let digits = &tail[..end];
        if digits.is_empty() {
            None
        } else {
            Some(digits.parse().unwrap_or(u64::MAX))
        }
    })
}

/// Purge directive for a purge set, or `None` when nothing is to be purged.
pub fn purge_value(purge_tags: &TagSet) -> Option<String> {
    if purge_tags.is_empty() {
        return None;
    }
    if purge_tags.contains_wildcard() {
        return Some(crate::tags::PURGE_ALL.to_string());
    }

    let mut seen = BTreeSet::new();
    let clauses: Vec<String> = translate_tags(purge_tags.iter())
        .into_iter()
        .filter(|tag| seen.insert(tag.clone()))
        .map(|tag| format!("tag={}", tag))
        .collect();
    Some(clauses.join(","))
}

/// Sanitize a reason for the debug info header: newlines collapsed,
/// HTML-escaped, at most [`DEBUG_INFO_MAX_LEN`] bytes.
pub fn debug_info_value(reason: &str) -> String {
    let escaped = html_escape(&reason.replace('\n', " "));
    truncate(&escaped, DEBUG_INFO_MAX_LEN).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cacheable_status() {
        assert!(is_cacheable_status(StatusCode::OK));
        assert!(is_cacheable_status(StatusCode::NOT_FOUND));
        assert!(!is_cacheable_status(StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!is_cacheable_status(StatusCode::MOVED_PERMANENTLY));
    }

    #[test]
    fn test_cache_control_values() {
        assert_eq!(public_cache_control(3600), "public,max-age=3600");
        assert_eq!(with_esi("public,max-age=60"), "public,max-age=60,esi=on");
        assert_eq!(with_esi(""), "esi=on");
    }

    #[test]
    fn test_upstream_detection() {
        assert_eq!(upstream_shared_max_age("public, max-age=0, s-maxage=86400"), Some(86400));
        assert_eq!(upstream_shared_max_age("public,s-maxage=5"), Some(5));
        assert_eq!(upstream_shared_max_age("private, s-maxage=60"), None);
        assert_eq!(upstream_shared_max_age("s-maxage=60, public"), None);
        assert_eq!(upstream_shared_max_age("public, max-age=60"), None);
        assert_eq!(upstream_shared_max_age("public, s-maxage=abc"), None);
        assert_eq!(upstream_shared_max_age("public, s-maxage=5, s-maxage=x"), Some(5));
    }

    #[test]
    fn test_upstream_detection_saturates() {
        assert_eq!(
            upstream_shared_max_age("public, s-maxage=99999999999999999999999"),
            Some(u64::MAX)
        );
    }

    #[test]
    fn test_purge_wildcard() {
        let tags: TagSet = ["*", "x"].into_iter().collect();
        assert_eq!(purge_value(&tags).as_deref(), Some("*"));
    }

    #[test]
    fn test_purge_tags_translated() {
        let tags: TagSet = ["catalog_product_5", "cms_page_1"].into_iter().collect();
        assert_eq!(
            purge_value(&tags).as_deref(),
            Some("tag=P.5,tag=cms_page_1")
        );
    }

    #[test]
    fn test_purge_collapses_translated_duplicates() {
        // Both spellings translate to "C.7"
        let tags: TagSet = ["catalog_category_7", "catalog_category_product_7"]
            .into_iter()
            .collect();
        assert_eq!(purge_value(&tags).as_deref(), Some("tag=C.7"));
    }

    #[test]
    fn test_purge_tag_with_comma_is_one_clause() {
        let tags: TagSet = ["a,b"].into_iter().collect();
        assert_eq!(purge_value(&tags).as_deref(), Some("tag=a,b"));
    }

    #[test]
    fn test_purge_empty() {
        assert_eq!(purge_value(&TagSet::new()), None);
    }

    #[test]
    fn test_debug_info_value() {
        assert_eq!(debug_info_value("EnvVary a=1\n<b>"), "EnvVary a=1 &lt;b&gt;");
        assert_eq!(debug_info_value(&"x".repeat(400)).len(), DEBUG_INFO_MAX_LEN);
    }

    #[test]
    fn test_response_impl_drops_invalid_values() {
        let mut resp = Response::default();
        ResponseHeaders::set_header(&mut resp, "X-Test", "bad\rvalue");
        assert_eq!(ResponseHeaders::header(&resp, "X-Test"), None);
    }
}
