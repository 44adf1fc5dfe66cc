//! Edge cache control for a surrogate (reverse-proxy) cache.
//!
//! Application code reports facts about the response being built and this
//! crate reduces them to a cacheability verdict plus the headers the
//! surrogate understands:
//! - `CacheControl` - Per-request coordinator
//! - `CacheDecision` - Monotonic cacheable/not-cacheable state machine
//! - `TagSet` / `translate_tag` - Cache and purge tags in surrogate form
//! - `EsiHandleCodec` - Layout-handle transport for ESI fragment URLs
//! - `collect_element_tags` - Cache-identity harvesting over a component tree
//! - `VaryFingerprintEngine` - Vary-context fingerprint and cookie sync
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use edge_cache::{CacheControl, MemoryCookieJar, VaryContext};
//! use edge_core::{CacheControlConfig, RequestContext, Response};
//!
//! let config = Arc::new(CacheControlConfig::default());
//! let mut control = CacheControl::new(config, &RequestContext::get("/p/55"));
//!
//! control.mark_cacheable(3600, "product page");
//! control.add_cache_tags(["catalog_product_55"]);
//!
//! let mut response = Response::default();
//! let mut jar = MemoryCookieJar::new();
//! control.render_cache_control(&mut response, VaryContext::new(), &mut jar);
//! control.render_purge(&mut response);
//! ```

mod control;
mod cookie;
mod decision;
mod encoding;
mod esi;
mod headers;
mod layout;
mod tags;
mod vary;

pub use control::*;
pub use cookie::*;
pub use decision::*;
pub use encoding::*;
pub use esi::*;
pub use headers::*;
pub use layout::*;
pub use tags::*;
pub use vary::*;
