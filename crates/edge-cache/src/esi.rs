//! ESI layout-handle transport.
//!
//! An ESI fragment is fetched by the surrogate through a separate request, so
//! the layout handles the fragment was rendered with travel in its URL as a
//! compact comma-separated list.

use std::collections::BTreeMap;

use edge_core::EsiHandlesConfig;

use crate::encoding::url_encode;

/// Route serving ESI fragments.
pub const ESI_ROUTE: &str = "litemage/block/esi";

/// Query parameter carrying the block (component) name.
pub const ESI_BLOCK_PARAM: &str = "b";

/// Query parameter carrying the encoded handle list.
pub const ESI_HANDLES_PARAM: &str = "h";

/// Encodes and decodes layout handle lists using a translation table.
#[derive(Debug, Clone, Default)]
pub struct EsiHandleCodec {
    translator: BTreeMap<String, String>,
    ignored: Vec<String>,
}

impl EsiHandleCodec {
    /// Create a codec from a translation table and ignore list.
    pub fn new(translator: BTreeMap<String, String>, ignored: Vec<String>) -> Self {
        Self { translator, ignored }
    }

    /// Create a codec from configuration.
    pub fn from_config(config: &EsiHandlesConfig) -> Self {
        Self::new(config.translator.clone(), config.ignored.clone())
    }

    /// Encode handles into a single parameter value.
    ///
    /// Translated handles emit their short code. An untranslated handle that
    /// contains an ignored substring ends encoding: it and every handle after
    /// it are dropped.
    pub fn encode<S: AsRef<str>>(&self, handles: &[S]) -> String {
        let mut used: Vec<&str> = Vec::with_capacity(handles.len());

        for handle in handles {
            let handle = handle.as_ref();
            if let Some(code) = self.translator.get(handle) {
                used.push(code.as_str());
                continue;
            }
            if self.ignored.iter().any(|i| handle.contains(i.as_str())) {
                break;
            }
            used.push(handle);
        }

        used.join(",")
    }

    /// Decode a parameter value back into handle names.
    ///
    /// Tokens matching a short code map back to their handle; anything else is
    /// passed through. An empty parameter decodes to no handles.
    pub fn decode(&self, param: &str) -> Vec<String> {
        if param.is_empty() {
            return Vec::new();
        }

        param
            .split(',')
            .map(|token| {
                self.translator
                    .iter()
                    .find(|(_, code)| code.as_str() == token)
                    .map(|(handle, _)| handle.clone())
                    .unwrap_or_else(|| token.to_string())
            })
            .collect()
    }

    /// Build the fragment URL for `block_name` rendered under `handles`.
    pub fn url<S: AsRef<str>>(&self, base_url: &str, handles: &[S], block_name: &str) -> String {
        format!(
            "{}/{}?{}={}&{}={}",
            base_url.trim_end_matches('/'),
            ESI_ROUTE,
            ESI_BLOCK_PARAM,
            url_encode(block_name),
            ESI_HANDLES_PARAM,
            url_encode(&self.encode(handles))
        )
    }
}
