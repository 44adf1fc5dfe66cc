//! Per-request cache coordinator.

use std::sync::Arc;

use edge_core::{CacheControlConfig, DebugLevel, RequestContext};
use tracing::debug;

use crate::cookie::CookieJar;
use crate::decision::CacheDecision;
use crate::esi::EsiHandleCodec;
use crate::headers::{
    debug_info_value, header_names, is_cacheable_status, public_cache_control, purge_value,
    upstream_shared_max_age, with_esi, ResponseHeaders,
};
use crate::layout::{collect_element_tags, LayoutTree};
use crate::tags::TagSet;
use crate::vary::{VaryFingerprintEngine, VaryOutcome};

/// What [`CacheControl::render_cache_control`] emitted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedCacheControl {
    /// Value of the surrogate cache-control header, empty when none was set.
    pub cache_control: String,
    /// Value of the surrogate tag header, empty when none was set.
    pub tags: String,
    /// Vary reconciliation result.
    pub vary: VaryOutcome,
    /// Upstream shared max age the coordinator deferred to.
    pub deferred_to: Option<u64>,
}

/// Collects cacheability votes and tags for one request and renders them as
/// surrogate headers.
///
/// Create one per request. Disqualifying request properties (module
/// disabled, unsafe method, AJAX cache-buster) are evaluated on construction.
#[derive(Debug)]
pub struct CacheControl {
    config: Arc<CacheControlConfig>,
    decision: CacheDecision,
    purge_tags: TagSet,
    cache_tags: TagSet,
    esi_codec: EsiHandleCodec,
    vary: VaryFingerprintEngine,
    debug: DebugLevel,
    is_esi_request: bool,
    has_esi: bool,
    base_url: String,
}

impl CacheControl {
    /// Create the coordinator for `request`.
    pub fn new(config: Arc<CacheControlConfig>, request: &RequestContext) -> Self {
        let enabled = config.enabled;
        let (debug, vary) = if enabled {
            (
                config.debug,
                VaryFingerprintEngine::new(config.bypassed_context.iter().cloned()),
            )
        } else {
            (DebugLevel::Off, VaryFingerprintEngine::default())
        };
        let esi_codec = EsiHandleCodec::from_config(&config.esi);

        let mut control = Self {
            config,
            decision: CacheDecision::new(),
            purge_tags: TagSet::new(),
            cache_tags: TagSet::new(),
            esi_codec,
            vary,
            debug,
            is_esi_request: false,
            has_esi: false,
            base_url: String::new(),
        };

        let reason = "CacheControl constructor";
        if !enabled {
            control.mark_not_cacheable(&format!("{} module disabled", reason), None);
        } else if !request.is_get_or_head() {
            control.mark_not_cacheable(&format!("{} {}", reason, request.method), None);
        } else if request.is_ajax() && request.has_cache_buster() {
            control.mark_not_cacheable(&format!("{} ajax with random string", reason), None);
        }

        control
    }

    /// Set the base URL ESI fragment URLs are built on.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn module_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn debug_enabled(&self) -> bool {
        self.debug >= DebugLevel::Log
    }

    pub fn debug_level(&self) -> DebugLevel {
        self.debug
    }

    fn debug_headers(&self) -> bool {
        self.debug == DebugLevel::Headers
    }

    /// Current decision.
    pub fn decision(&self) -> &CacheDecision {
        &self.decision
    }

    /// Vote for caching with `ttl` seconds. `source` names the caller.
    pub fn mark_cacheable(&mut self, ttl: u64, source: &str) {
        if self.decision.mark_cacheable(ttl) && self.debug_enabled() {
            debug!(source, ttl, "setCacheable");
        }
    }

    /// Vote against caching.
    pub fn mark_not_cacheable(&mut self, reason: &str, short_reason: Option<&str>) {
        if self.decision.mark_not_cacheable(reason, short_reason) && self.debug_enabled() {
            debug!(reason, "setNotCacheable");
        }
    }

    pub fn is_cacheable(&self) -> bool {
        self.decision.is_cacheable()
    }

    /// Unset or cacheable.
    pub fn maybe_cacheable(&self) -> bool {
        self.decision.maybe_cacheable()
    }

    /// Mark the current request as an ESI fragment request.
    pub fn set_esi_request(&mut self, is_esi_request: bool) {
        self.is_esi_request = is_esi_request;
    }

    /// ESI includes may only be injected into cacheable top-level responses.
    pub fn can_inject_esi(&self) -> bool {
        self.decision.is_cacheable() && !self.is_esi_request
    }

    /// Record whether the response contains ESI includes.
    pub fn set_esi_on(&mut self, on: bool) {
        self.has_esi = on;
    }

    pub fn has_esi(&self) -> bool {
        self.has_esi
    }

    /// Fragment URL for `block_name` rendered under `handles`.
    pub fn esi_url<S: AsRef<str>>(&self, handles: &[S], block_name: &str) -> String {
        self.esi_codec.url(&self.base_url, handles, block_name)
    }

    /// Encode handles with the configured table.
    pub fn encode_esi_handles<S: AsRef<str>>(&self, handles: &[S]) -> String {
        self.esi_codec.encode(handles)
    }

    /// Decode a handle parameter with the configured table.
    pub fn decode_esi_handles(&self, param: &str) -> Vec<String> {
        self.esi_codec.decode(param)
    }

    /// Cache tags of an ESI fragment's subtree.
    pub fn element_cache_tags<T>(&self, tree: &mut T, element_name: &str) -> String
    where
        T: LayoutTree + ?Sized,
    {
        collect_element_tags(tree, element_name)
    }

    /// Whether a purge header will be emitted.
    pub fn need_purge(&self) -> bool {
        self.config.enabled && !self.purge_tags.is_empty()
    }

    /// Merge purge tags reported by `source`.
    pub fn add_purge_tags<I, S>(&mut self, tags: I, source: &str)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let added: Vec<String> = tags.into_iter().map(Into::into).collect();
        self.purge_tags.extend(added.iter().cloned());
        if self.debug_enabled() {
            debug!(
                source,
                tags = %added.join(","),
                result = %self.purge_tags,
                "add purge tags"
            );
        }
    }

    pub fn purge_tags(&self) -> &TagSet {
        &self.purge_tags
    }

    /// Merge a single cache tag.
    pub fn add_cache_tag(&mut self, tag: impl Into<String>) {
        self.cache_tags.insert(tag);
    }

    /// Merge cache tags.
    pub fn add_cache_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_tags.extend(tags);
    }

    /// Replace all cache tags.
    pub fn set_cache_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cache_tags.replace(tags);
    }

    pub fn cache_tags(&self) -> &TagSet {
        &self.cache_tags
    }

    /// Reconcile the vary cookie with the request's context. A mismatch makes
    /// the response not cacheable.
    pub fn check_vary<I, K, V>(&mut self, context: I, jar: &mut dyn CookieJar) -> VaryOutcome
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        if !self.config.enabled {
            return VaryOutcome::default();
        }
        let outcome = self.vary.evaluate(context, jar);
        if outcome.changed {
            self.mark_not_cacheable(&format!("EnvVary {}", outcome.raw), None);
        }
        if self.debug_enabled() && !outcome.raw.is_empty() {
            debug!(raw = %outcome.raw, "EnvVary");
        }
        outcome
    }

    /// Render cache-control, tag and debug headers onto `response`.
    ///
    /// Runs the vary check first, so a vary mismatch is reflected in the
    /// headers of this very response.
    pub fn render_cache_control<R, I, K, V>(
        &mut self,
        response: &mut R,
        context: I,
        jar: &mut dyn CookieJar,
    ) -> RenderedCacheControl
    where
        R: ResponseHeaders + ?Sized,
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vary = self.check_vary(context, jar);

        let mut cache_control = String::new();
        let mut tags = String::new();
        if is_cacheable_status(response.status()) && self.decision.is_cacheable() {
            tags = self.render_tag_header(response);
            cache_control = public_cache_control(self.decision.ttl_secs());
        }
        if self.has_esi {
            cache_control = with_esi(&cache_control);
        }
        if !cache_control.is_empty() {
            response.set_header(header_names::X_LITESPEED_CACHE_CONTROL, &cache_control);
            if self.debug_enabled() {
                debug!(cache_control = %cache_control, tags = %tags, "SetCacheControlHeaders");
            }
        }

        let deferred_to = response
            .header(header_names::CACHE_CONTROL)
            .and_then(|cc| upstream_shared_max_age(&cc));
        if let Some(max_age) = deferred_to {
            response.clear_header(header_names::X_LITESPEED_CACHE_CONTROL);
            response.clear_header(header_names::X_LITESPEED_TAG);
            response.set_no_cache_headers();
            self.mark_not_cacheable(&format!("upstream cache-control s-maxage={}", max_age), None);
        }

        if self.debug_headers() {
            response.set_header(header_names::X_LITEMAGE_DEBUG_CC, &cache_control);
            response.set_header(header_names::X_LITEMAGE_DEBUG_TAG, &tags);
            response.set_header(
                header_names::X_LITEMAGE_DEBUG_INFO,
                &debug_info_value(self.decision.reason()),
            );
            response.set_header(header_names::X_LITEMAGE_DEBUG_VARY, &vary.raw);
        }

        RenderedCacheControl {
            cache_control,
            tags,
            vary,
            deferred_to,
        }
    }

    fn render_tag_header<R>(&self, response: &mut R) -> String
    where
        R: ResponseHeaders + ?Sized,
    {
        if self.cache_tags.is_empty() {
            return String::new();
        }
        let tags = self.cache_tags.translated();
        response.set_header(header_names::X_LITESPEED_TAG, &tags);
        response.clear_header(header_names::X_MAGENTO_TAGS);
        tags
    }

    /// Render the purge header. Returns the emitted value.
    pub fn render_purge<R>(&self, response: &mut R) -> Option<String>
    where
        R: ResponseHeaders + ?Sized,
    {
        let value = purge_value(&self.purge_tags)?;
        response.set_header(header_names::X_LITESPEED_PURGE, &value);
        if self.debug_enabled() {
            debug!(purge = %value, "Set purge header");
            if self.debug_headers() {
                response.set_header(header_names::X_LITEMAGE_DEBUG_PURGE, &value);
            }
        }
        Some(value)
    }
}

#[cfg(test)]
mod tests {
    use edge_core::{Method, Response, StatusCode};

    use super::*;
    use crate::cookie::MemoryCookieJar;
    use crate::vary::VaryContext;

    fn control(config: CacheControlConfig, request: &RequestContext) -> CacheControl {
        CacheControl::new(Arc::new(config), request)
    }

    fn get() -> CacheControl {
        control(CacheControlConfig::default(), &RequestContext::get("/"))
    }

    #[test]
    fn test_disabled_module_not_cacheable() {
        let mut cc = control(CacheControlConfig::disabled(), &RequestContext::get("/"));
        cc.mark_cacheable(60, "test");
        assert!(!cc.is_cacheable());
        assert!(cc.decision().reason().contains("module disabled"));
        assert!(!cc.module_enabled());
    }

    #[test]
    fn test_disabled_module_ignores_debug() {
        let config = CacheControlConfig::disabled().with_debug(DebugLevel::Headers);
        let cc = control(config, &RequestContext::get("/"));
        assert!(!cc.debug_enabled());
    }

    #[test]
    fn test_disabled_module_leaves_vary_cookie() {
        let mut cc = control(CacheControlConfig::disabled(), &RequestContext::get("/"));
        let mut jar = MemoryCookieJar::new();
        let mut context = VaryContext::new();
        context.insert("currency".to_string(), "EUR".to_string());

        let outcome = cc.check_vary(context, &mut jar);
        assert!(!outcome.changed);
        assert!(jar.ops().is_empty());
    }

    #[test]
    fn test_post_not_cacheable() {
        let cc = control(
            CacheControlConfig::default(),
            &RequestContext::new(Method::POST, "/checkout"),
        );
        assert!(!cc.maybe_cacheable());
        assert!(cc.decision().reason().contains("POST"));
    }

    #[test]
    fn test_ajax_cache_buster_not_cacheable() {
        let request = RequestContext::get("/customer/section/load")
            .with_ajax(true)
            .with_query("_", "1712345678");
        let cc = control(CacheControlConfig::default(), &request);
        assert!(cc.decision().reason().contains("ajax with random string"));
    }

    #[test]
    fn test_ajax_without_buster_stays_open() {
        let request = RequestContext::get("/").with_ajax(true);
        let cc = control(CacheControlConfig::default(), &request);
        assert!(cc.maybe_cacheable());
    }

    #[test]
    fn test_can_inject_esi() {
        let mut cc = get();
        assert!(!cc.can_inject_esi());
        cc.mark_cacheable(60, "page");
        assert!(cc.can_inject_esi());
        cc.set_esi_request(true);
        assert!(!cc.can_inject_esi());
    }

    #[test]
    fn test_need_purge() {
        let mut cc = get();
        assert!(!cc.need_purge());
        cc.add_purge_tags(["catalog_product_1"], "product save");
        assert!(cc.need_purge());

        let mut disabled = control(CacheControlConfig::disabled(), &RequestContext::get("/"));
        disabled.add_purge_tags(["x"], "test");
        assert!(!disabled.need_purge());
    }

    #[test]
    fn test_add_purge_tags_set_semantics() {
        let mut cc = get();
        cc.add_purge_tags(["a", "a", "b"], "src");
        cc.add_purge_tags(["b", "c"], "src");
        let expected: TagSet = ["a", "b", "c"].into_iter().collect();
        assert_eq!(cc.purge_tags(), &expected);
    }

    #[test]
    fn test_cache_tags_merge_and_overwrite() {
        let mut cc = get();
        cc.add_cache_tag("cms_page_1");
        cc.add_cache_tag("cms_page_1");
        cc.add_cache_tags(["catalog_product_2", "cms_page_1"]);
        assert_eq!(cc.cache_tags().len(), 2);

        cc.set_cache_tags(["only"]);
        assert_eq!(cc.cache_tags().to_string(), "only");
    }

    #[test]
    fn test_render_cacheable_response() {
        let mut cc = get();
        cc.mark_cacheable(3600, "page");
        cc.add_cache_tags(["catalog_product_77", "catalog_category_3"]);

        let mut resp = Response::default().with_header("X-Magento-Tags", "cat_p_77");
        let mut jar = MemoryCookieJar::new();
        let out = cc.render_cache_control(&mut resp, VaryContext::new(), &mut jar);

        assert_eq!(out.cache_control, "public,max-age=3600");
        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), Some("public,max-age=3600"));
        assert_eq!(resp.header("X-LiteSpeed-Tag"), Some("C.3,P.77"));
        assert_eq!(resp.header("X-Magento-Tags"), None);
        assert_eq!(resp.header("X-LiteMage-Debug-CC"), None);
    }

    #[test]
    fn test_render_skips_error_status() {
        let mut cc = get();
        cc.mark_cacheable(60, "page");
        let mut resp = Response::new(StatusCode::INTERNAL_SERVER_ERROR);
        let out = cc.render_cache_control(&mut resp, VaryContext::new(), &mut MemoryCookieJar::new());

        assert_eq!(out.cache_control, "");
        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), None);
    }

    #[test]
    fn test_render_esi_only() {
        let mut cc = control(
            CacheControlConfig::default(),
            &RequestContext::new(Method::POST, "/"),
        );
        cc.set_esi_on(true);
        let mut resp = Response::default();
        cc.render_cache_control(&mut resp, VaryContext::new(), &mut MemoryCookieJar::new());

        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), Some("esi=on"));
    }

    #[test]
    fn test_vary_change_blocks_caching() {
        let mut cc = get();
        cc.mark_cacheable(60, "page");
        let mut context = VaryContext::new();
        context.insert("customer_group".to_string(), "2".to_string());

        let mut resp = Response::default();
        let mut jar = MemoryCookieJar::new();
        let out = cc.render_cache_control(&mut resp, context, &mut jar);

        assert!(out.vary.changed);
        assert!(!cc.is_cacheable());
        assert!(cc.decision().reason().starts_with("EnvVary customer_group=2 changed"));
        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), None);
        assert_eq!(jar.ops().len(), 1);
    }

    #[test]
    fn test_upstream_cache_claim_defers() {
        let mut cc = get();
        cc.mark_cacheable(60, "page");
        cc.add_cache_tag("cms_page_1");

        let mut resp = Response::default().with_header("Cache-Control", "public, max-age=0, s-maxage=86400");
        let out = cc.render_cache_control(&mut resp, VaryContext::new(), &mut MemoryCookieJar::new());

        assert_eq!(out.deferred_to, Some(86400));
        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), None);
        assert_eq!(resp.header("X-LiteSpeed-Tag"), None);
        assert_eq!(resp.header("Pragma"), Some("no-cache"));
        assert!(!cc.is_cacheable());
    }

    #[test]
    fn test_upstream_claim_with_huge_max_age_defers() {
        let mut cc = get();
        cc.mark_cacheable(60, "page");

        let mut resp = Response::default()
            .with_header("Cache-Control", "public, s-maxage=99999999999999999999999");
        let out = cc.render_cache_control(&mut resp, VaryContext::new(), &mut MemoryCookieJar::new());

        assert_eq!(out.deferred_to, Some(u64::MAX));
        assert_eq!(resp.header("X-LiteSpeed-Cache-Control"), None);
        assert!(!cc.is_cacheable());
    }

    #[test]
    fn test_log_level_emits_no_debug_headers() {
        let config = CacheControlConfig::default().with_debug(DebugLevel::Log);
        let mut cc = control(config, &RequestContext::get("/"));
        assert!(cc.debug_enabled());
        cc.mark_cacheable(60, "page");
        cc.add_cache_tag("cms_page_1");
        cc.add_purge_tags(["catalog_product_9"], "save");

        let mut context = VaryContext::new();
        context.insert("currency".to_string(), "EUR".to_string());
        let mut resp = Response::default();
        cc.render_cache_control(&mut resp, context, &mut MemoryCookieJar::new());
        assert_eq!(cc.render_purge(&mut resp).as_deref(), Some("tag=P.9"));

        assert_eq!(resp.header("X-LiteSpeed-Purge"), Some("tag=P.9"));
        for (name, _) in resp.to_pairs() {
            assert!(!name.starts_with("x-litemage-debug"), "unexpected {}", name);
        }
    }

    #[test]
    fn test_debug_headers() {
        let config = CacheControlConfig::default().with_debug(DebugLevel::Headers);
        let mut cc = control(config, &RequestContext::new(Method::PUT, "/"));
        let mut resp = Response::default();
        cc.render_cache_control(&mut resp, VaryContext::new(), &mut MemoryCookieJar::new());

        assert_eq!(resp.header("X-LiteMage-Debug-CC"), Some(""));
        assert_eq!(resp.header("X-LiteMage-Debug-Tag"), Some(""));
        assert_eq!(
            resp.header("X-LiteMage-Debug-Info"),
            Some("CacheControl constructor PUT")
        );
        assert_eq!(resp.header("X-LiteMage-Debug-Vary"), Some(""));
    }

    #[test]
    fn test_render_purge() {
        let config = CacheControlConfig::default().with_debug(DebugLevel::Headers);
        let mut cc = control(config, &RequestContext::get("/"));
        let mut resp = Response::default();
        assert_eq!(cc.render_purge(&mut resp), None);

        cc.add_purge_tags(["catalog_product_9", "catalog_product_9_block"], "save");
        assert_eq!(
            cc.render_purge(&mut resp).as_deref(),
            Some("tag=P.9,tag=P.9.B")
        );
        assert_eq!(resp.header("X-LiteSpeed-Purge"), Some("tag=P.9,tag=P.9.B"));
        assert_eq!(resp.header("X-LiteMage-Debug-Purge"), Some("tag=P.9,tag=P.9.B"));
    }

    #[test]
    fn test_render_purge_wildcard() {
        let mut cc = get();
        cc.add_purge_tags(["*", "x"], "flush");
        let mut resp = Response::default();
        cc.render_purge(&mut resp);
        assert_eq!(resp.header("X-LiteSpeed-Purge"), Some("*"));
        assert_eq!(resp.header("X-LiteMage-Debug-Purge"), None);
    }

    #[test]
    fn test_esi_url_and_decode() {
        let config = CacheControlConfig::default().translate_handle("default", "d");
        let cc = control(config, &RequestContext::get("/")).with_base_url("https://shop.test");

        assert_eq!(
            cc.esi_url(&["default", "cms_page"], "header.links"),
            "https://shop.test/litemage/block/esi?b=header.links&h=d%2Ccms_page"
        );
        assert_eq!(cc.decode_esi_handles("d,cms_page"), vec!["default", "cms_page"]);
    }
}
