//! Cache and purge tag handling.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Tag that purges every cached entry.
pub const PURGE_ALL: &str = "*";

/// Ordered rewrite rules turning framework tags into compact surrogate tags.
///
/// Applied one after another; each rule sees the output of the previous one.
/// `catalog_category_product_` must stay ahead of `catalog_category_`.
pub const TAG_REWRITES: [(&str, &str); 5] = [
    ("_block", ".B"),
    ("catalog_product_", "P."),
    ("catalog_product", "P"),
    ("catalog_category_product_", "C."),
    ("catalog_category_", "C."),
];

/// Translate a single tag through [`TAG_REWRITES`].
pub fn translate_tag(tag: &str) -> String {
    TAG_REWRITES
        .iter()
        .fold(tag.to_string(), |acc, (search, replace)| acc.replace(search, replace))
}

/// Translate each tag independently.
pub fn translate_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    tags.into_iter().map(|t| translate_tag(t.as_ref())).collect()
}

/// Translate, deduplicate and comma-join tags, keeping first-seen order.
pub fn translate_and_join<I, S>(tags: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for tag in translate_tags(tags) {
        if seen.insert(tag.clone()) {
            out.push(tag);
        }
    }
    out.join(",")
}

/// A set of opaque tags. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagSet {
    tags: BTreeSet<String>,
}

impl TagSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one tag. Empty tags are ignored.
    pub fn insert(&mut self, tag: impl Into<String>) -> bool {
        let tag = tag.into();
        if tag.is_empty() {
            return false;
        }
        self.tags.insert(tag)
    }

    /// Merge many tags.
    pub fn extend<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            self.insert(tag);
        }
    }

    /// Replace the whole set.
    pub fn replace<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags.clear();
        self.extend(tags);
    }

    /// Whether the set holds the purge-everything sentinel.
    pub fn contains_wildcard(&self) -> bool {
        self.tags.contains(PURGE_ALL)
    }

    /// Whether `tag` is present.
    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    /// Iterate tags in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tags.iter().map(String::as_str)
    }

    /// Translated, deduplicated, comma-joined form.
    pub fn translated(&self) -> String {
        translate_and_join(self.iter())
    }
}

impl std::fmt::Display for TagSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let joined: Vec<&str> = self.iter().collect();
        write!(f, "{}", joined.join(","))
    }
}

impl<S: Into<String>> FromIterator<S> for TagSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}
