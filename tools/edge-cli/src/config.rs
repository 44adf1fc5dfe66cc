//! CLI configuration.

use std::path::Path;

use anyhow::{Context, Result};
use edge_core::CacheControlConfig;
use serde::{Deserialize, Serialize};

/// CLI configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CliConfig {
    /// Storefront base URL used for ESI fragment URLs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Cache coordinator settings.
    #[serde(default)]
    pub cache: CacheControlConfig,
}

impl CliConfig {
    /// Load config from a file. Parsing only; see [`CliConfig::validate`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON config: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML config: {}", path.display()))
        }
    }

    /// Check the cache section and the base URL.
    pub fn validate(&self) -> Result<()> {
        self.cache.validate().context("Invalid [cache] section")?;

        if let Some(ref url) = self.base_url {
            if !(url.starts_with("http://") || url.starts_with("https://") || url.starts_with('/')) {
                anyhow::bail!("base_url must be absolute or root-relative: {}", url);
            }
        }

        Ok(())
    }
}

/// Generate a default edge.toml config file.
pub fn generate_default_config() -> String {
    r#"# Edge cache coordinator configuration

# Prefix for ESI fragment URLs. Leave unset for root-relative URLs.
# base_url = "https://shop.example.com"

[cache]
enabled = true
# 0 = off, 1 = log decisions, 2 = log and add X-LiteMage-Debug-* headers
debug = 0
# Vary-context keys that never split the cache
bypassed_context = []

[cache.esi]
# Substrings of layout handles that end handle encoding
ignored = ["checkout_", "customer_account"]

[cache.esi.translator]
default = "d"
catalog_product_view = "pv"
catalog_category_view = "cv"
cms_index_index = "h"
"#
    .to_string()
}
