//! Cache-identity harvesting over a rendered component tree.
//!
//! ESI fragments need their own tags so a purge reaches them. The tags are
//! gathered by walking the subtree rooted at the fragment's element and asking
//! every block that can report identities for them.

use std::collections::{HashMap, HashSet};

use crate::tags::translate_and_join;

/// Tag contributed by the primary navigation widget.
pub const NAVIGATION_TAG: &str = "topnav";

/// Declared type of a layout element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ElementType {
    Block,
    Container,
    UiComponent,
    Other(String),
}

impl ElementType {
    /// Parse a framework type name (`block`, `container`, `uiComponent`).
    pub fn from_name(name: &str) -> Self {
        match name {
            "block" => Self::Block,
            "container" => Self::Container,
            "uiComponent" => Self::UiComponent,
            other => Self::Other(other.to_string()),
        }
    }

    /// Whether the traversal descends into elements of this type.
    pub fn is_traversable(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// ESI bookkeeping written onto blocks during traversal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EsiMark {
    /// The block sits inside an ESI fragment.
    Eligible,
    /// The block's identities were collected.
    Resolved,
}

/// What a block reports about its cache identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheIdentity {
    /// The block's own identity tags.
    Tags(Vec<String>),
    /// The site's primary navigation; always tagged [`NAVIGATION_TAG`].
    Navigation,
}

impl CacheIdentity {
    /// Tags this identity contributes.
    pub fn into_tags(self) -> Vec<String> {
        match self {
            Self::Tags(tags) => tags,
            Self::Navigation => vec![NAVIGATION_TAG.to_string()],
        }
    }
}

/// A live component instance in the layout.
pub trait Block: std::fmt::Debug {
    /// Record ESI bookkeeping on the block.
    fn set_esi_mark(&mut self, mark: EsiMark);

    /// Last ESI mark written, if any.
    fn esi_mark(&self) -> Option<EsiMark>;

    /// Identity capability. `None` when the block cannot report identities.
    fn cache_identity(&self) -> Option<CacheIdentity> {
        None
    }
}

/// Read access to the component hierarchy plus mutable access to its blocks.
pub trait LayoutTree {
    /// Whether an element with this name exists.
    fn has_element(&self, name: &str) -> bool;

    /// Names of the element's children, in layout order.
    fn child_names(&self, name: &str) -> Vec<String>;

    /// Declared type of an element.
    fn element_type(&self, name: &str) -> Option<ElementType>;

    /// The live block rendered for an element, if any.
    fn block_mut(&mut self, name: &str) -> Option<&mut dyn Block>;
}

/// Collect the cache tags of the subtree rooted at `root`.
///
/// Depth-first with an explicit stack, so the last enumerated child of an
/// element is visited first. Returns `""` when `root` does not exist and
/// `root` itself when no block reported any identity.
pub fn collect_element_tags<T>(tree: &mut T, root: &str) -> String
where
    T: LayoutTree + ?Sized,
{
    if !tree.has_element(root) {
        return String::new();
    }

    let mut tags: Vec<String> = Vec::new();
    let mut stack = vec![root.to_string()];
    let mut visited = HashSet::new();

    while let Some(name) = stack.pop() {
        if !visited.insert(name.clone()) {
            continue;
        }

        if let Some(block) = tree.block_mut(&name) {
            block.set_esi_mark(EsiMark::Eligible);
            if let Some(identity) = block.cache_identity() {
                tags.extend(identity.into_tags());
                block.set_esi_mark(EsiMark::Resolved);
            }
        }

        for child in tree.child_names(&name) {
            if tree
                .element_type(&child)
                .is_some_and(|t| t.is_traversable())
            {
                stack.push(child);
            }
        }
    }

    if tags.is_empty() {
        root.to_string()
    } else {
        translate_and_join(&tags)
    }
}

/// Plain block with a fixed identity.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SimpleBlock {
    identity: Option<CacheIdentity>,
    esi_mark: Option<EsiMark>,
}

impl SimpleBlock {
    /// Block without identity capability.
    pub fn plain() -> Self {
        Self::default()
    }

    /// Block reporting the given identity tags.
    pub fn with_tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            identity: Some(CacheIdentity::Tags(tags.into_iter().map(Into::into).collect())),
            esi_mark: None,
        }
    }

    /// The primary navigation widget.
    pub fn navigation() -> Self {
        Self {
            identity: Some(CacheIdentity::Navigation),
            esi_mark: None,
        }
    }
}

impl Block for SimpleBlock {
    fn set_esi_mark(&mut self, mark: EsiMark) {
        self.esi_mark = Some(mark);
    }

    fn esi_mark(&self) -> Option<EsiMark> {
        self.esi_mark
    }

    fn cache_identity(&self) -> Option<CacheIdentity> {
        self.identity.clone()
    }
}

#[derive(Debug)]
struct LayoutElement {
    element_type: ElementType,
    children: Vec<String>,
    block: Option<Box<dyn Block>>,
}

/// In-memory layout tree.
#[derive(Debug, Default)]
pub struct MemoryLayout {
    elements: HashMap<String, LayoutElement>,
}

impl MemoryLayout {
    /// Create an empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element under `parent` (or as a root when `None`).
    ///
    /// Children keep insertion order. Re-adding a name replaces the element.
    pub fn add_element(
        &mut self,
        name: impl Into<String>,
        parent: Option<&str>,
        element_type: ElementType,
        block: Option<Box<dyn Block>>,
    ) -> &mut Self {
        let name = name.into();
        if let Some(parent) = parent {
            if let Some(p) = self.elements.get_mut(parent) {
                if !p.children.contains(&name) {
                    p.children.push(name.clone());
                }
            }
        }
        self.elements.insert(
            name,
            LayoutElement {
                element_type,
                children: Vec::new(),
                block,
            },
        );
        self
    }

    /// Add a container element.
    pub fn container(&mut self, name: &str, parent: Option<&str>) -> &mut Self {
        self.add_element(name, parent, ElementType::Container, None)
    }

    /// Add a block element.
    pub fn block(&mut self, name: &str, parent: Option<&str>, block: impl Block + 'static) -> &mut Self {
        self.add_element(name, parent, ElementType::Block, Some(Box::new(block)))
    }

    /// Read a block back.
    pub fn get_block(&self, name: &str) -> Option<&dyn Block> {
        match self.elements.get(name).and_then(|e| e.block.as_ref()) {
            Some(block) => Some(&**block),
            None => None,
        }
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

impl LayoutTree for MemoryLayout {
    fn has_element(&self, name: &str) -> bool {
        self.elements.contains_key(name)
    }

    fn child_names(&self, name: &str) -> Vec<String> {
        self.elements
            .get(name)
            .map(|e| e.children.clone())
            .unwrap_or_default()
    }

    fn element_type(&self, name: &str) -> Option<ElementType> {
        self.elements.get(name).map(|e| e.element_type.clone())
    }

    fn block_mut(&mut self, name: &str) -> Option<&mut dyn Block> {
        match self.elements.get_mut(name).and_then(|e| e.block.as_mut()) {
            Some(block) => Some(&mut **block),
            None => None,
        }
    }
}
