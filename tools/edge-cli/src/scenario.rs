//! Request scenario files for `edge evaluate`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use edge_cache::{Block, ElementType, LayoutTree, MemoryLayout, SimpleBlock};
use edge_core::{Method, RequestContext, StatusCode};
use serde::{Deserialize, Serialize};

/// One simulated request and the votes cast while rendering it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Scenario {
    /// HTTP method.
    pub method: String,
    /// Request path.
    pub path: String,
    /// Request was issued by a browser script.
    pub ajax: bool,
    /// Query parameters.
    pub query: BTreeMap<String, String>,
    /// Request cookies.
    pub cookies: BTreeMap<String, String>,
    /// Response status.
    pub status: u16,
    /// `Cache-Control` header already set by the upstream page cache.
    pub cache_control: Option<String>,
    /// Vary context at response time.
    pub vary: BTreeMap<String, String>,
    /// TTL voted by a cacheable page.
    pub cacheable_ttl: Option<u64>,
    /// Reason voted by a non-cacheable component.
    pub not_cacheable: Option<String>,
    /// The request is itself an ESI fragment request.
    pub esi_request: bool,
    /// Tags of the entities rendered on the page.
    pub cache_tags: Vec<String>,
    /// Tags of entities modified by the request.
    pub purge_tags: Vec<String>,
    /// The response contains ESI includes.
    pub esi_on: bool,
    /// Fragment layout whose tags are added to the response.
    pub layout: Option<ScenarioLayout>,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            path: "/".to_string(),
            ajax: false,
            query: BTreeMap::new(),
            cookies: BTreeMap::new(),
            status: 200,
            cache_control: None,
            vary: BTreeMap::new(),
            cacheable_ttl: None,
            not_cacheable: None,
            esi_request: false,
            cache_tags: Vec::new(),
            purge_tags: Vec::new(),
            esi_on: false,
            layout: None,
        }
    }
}

/// Layout subtree of a scenario.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScenarioLayout {
    /// Element whose subtree is walked.
    pub root: String,
    /// Elements, parents listed before their children.
    #[serde(default)]
    pub elements: Vec<ScenarioElement>,
}

/// One layout element.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioElement {
    pub name: String,
    #[serde(default)]
    pub parent: Option<String>,
    /// `block`, `container`, `uiComponent` or anything else (not traversed).
    #[serde(rename = "type", default = "default_element_type")]
    pub element_type: String,
    /// Identity tags reported by the block.
    #[serde(default)]
    pub tags: Vec<String>,
    /// The block is the primary navigation widget.
    #[serde(default)]
    pub navigation: bool,
}

fn default_element_type() -> String {
    "block".to_string()
}

impl Scenario {
    /// Load a scenario. `.json` files are parsed as JSON, everything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario: {}", path.display()))?;

        if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse JSON scenario: {}", path.display()))
        } else {
            toml::from_str(&content)
                .with_context(|| format!("Failed to parse TOML scenario: {}", path.display()))
        }
    }

    /// Build the request context.
    pub fn request(&self) -> Result<RequestContext> {
        let method = Method::from_bytes(self.method.to_uppercase().as_bytes())
            .with_context(|| format!("Invalid method: {}", self.method))?;

        let mut request = RequestContext::new(method, self.path.clone()).with_ajax(self.ajax);
        for (name, value) in &self.query {
            request = request.with_query(name, value);
        }
        for (name, value) in &self.cookies {
            request = request.with_cookie(name, value);
        }
        Ok(request)
    }

    /// Response status.
    pub fn status(&self) -> Result<StatusCode> {
        StatusCode::from_u16(self.status)
            .with_context(|| format!("Invalid status: {}", self.status))
    }
}

impl ScenarioLayout {
    /// Build the in-memory layout tree.
    pub fn build(&self) -> Result<MemoryLayout> {
        let mut layout = MemoryLayout::new();
        for element in &self.elements {
            if let Some(ref parent) = element.parent {
                if !layout.has_element(parent) {
                    bail!(
                        "Layout element '{}' listed before its parent '{}'",
                        element.name,
                        parent
                    );
                }
            }

            let element_type = ElementType::from_name(&element.element_type);
            let block: Option<Box<dyn Block>> = if element.navigation {
                Some(Box::new(SimpleBlock::navigation()))
            } else if !element.tags.is_empty() {
                Some(Box::new(SimpleBlock::with_tags(element.tags.iter().cloned())))
            } else if element_type == ElementType::Block {
                Some(Box::new(SimpleBlock::plain()))
            } else {
                None
            };

            layout.add_element(element.name.clone(), element.parent.as_deref(), element_type, block);
        }

        if !layout.has_element(&self.root) {
            bail!("Layout root '{}' is not defined", self.root);
        }
        Ok(layout)
    }
}
