//! Text metadata carried alongside an image.
//!
//! Metadata travels through the whole pipeline: a decoder fills it from
//! ancillary chunks, transforms leave it alone (or strip it), and an encoder
//! lowers it back into chunks. Two channels are kept apart:
//!
//! - **text entries** ([`TextData`]): ordered key/value pairs, PNG `tEXt` /
//!   `iTXt` style, optionally tagged with a language and a translated key;
//! - **comments**: free-form strings with no key.
//!
//! Insertion order is significant in both channels because it fixes the order
//! chunks are written in. Keys are not required to be unique; [`TextData::set`]
//! replaces only the first match.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// One key/value metadata item.
///
/// Empty `language` / `alternate_key` mean "absent". An entry with neither,
/// and with `is_utf8` unset, is *plain* and is stored in the simple text
/// encoding; anything else needs the international encoding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextEntry {
    pub key: String,
    pub value: String,
    pub language: String,
    /// Translated key, stored in UTF-8 alongside the Latin-1 `key`.
    pub alternate_key: String,
    pub is_utf8: bool,
    /// Reserved: compressed text is never written.
    pub compress: bool,
}

impl TextEntry {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Self::default()
        }
    }

    /// Mark the entry as UTF-8 text, forcing the international encoding.
    pub fn utf8(mut self) -> Self {
        self.is_utf8 = true;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_alternate_key(mut self, alternate_key: impl Into<String>) -> Self {
        self.alternate_key = alternate_key.into();
        self
    }

    /// True if the entry can use the simple text encoding.
    pub fn is_plain(&self) -> bool {
        self.language.is_empty() && self.alternate_key.is_empty() && !self.is_utf8
    }
}

/// Ordered collection of [`TextEntry`] values.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextData(Vec<TextEntry>);

impl TextData {
    pub fn new() -> Self {
        Self(Vec::with_capacity(8))
    }

    /// Build from key/value pairs, keeping their order.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(k, v)| TextEntry::new(k, v))
                .collect(),
        )
    }

    pub fn add(&mut self, entry: TextEntry) {
        self.0.push(entry);
    }

    pub fn add_string(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.add(TextEntry::new(key, value));
    }

    /// First entry with the given key.
    pub fn get(&self, key: &str) -> Option<&TextEntry> {
        self.0.iter().find(|e| e.key == key)
    }

    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key).map(|e| e.value.as_str())
    }

    /// Replace the first entry with the same key in place, or append.
    ///
    /// Returns `true` if an existing entry was replaced. Later entries with
    /// the same key are left untouched.
    pub fn set(&mut self, entry: TextEntry) -> bool {
        match self.0.iter_mut().find(|e| e.key == entry.key) {
            Some(slot) => {
                *slot = entry;
                true
            }
            None => {
                self.add(entry);
                false
            }
        }
    }

    pub fn set_string(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        self.set(TextEntry::new(key, value))
    }

    /// Flatten into a map. Later duplicates win.
    pub fn to_map(&self) -> HashMap<String, String> {
        self.0
            .iter()
            .map(|e| (e.key.clone(), e.value.clone()))
            .collect()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, TextEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a TextData {
    type Item = &'a TextEntry;
    type IntoIter = std::slice::Iter<'a, TextEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl FromIterator<TextEntry> for TextData {
    fn from_iter<I: IntoIterator<Item = TextEntry>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<TextEntry> for TextData {
    fn extend<I: IntoIterator<Item = TextEntry>>(&mut self, iter: I) {
        self.0.extend(iter);
    }
}

/// Codec-specific payload riding along with [`Metadata`]. Shared, not copied,
/// when metadata is cloned.
pub type SpecificData = Arc<dyn Any + Send + Sync>;

/// Text entries, comments and an opaque codec-specific payload.
#[derive(Clone, Default)]
pub struct Metadata {
    pub text: TextData,
    pub comments: Vec<String>,
    pub specific: Option<SpecificData>,
}

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.comments.is_empty() && self.specific.is_none()
    }

    /// Append another metadata set's entries and comments after ours.
    ///
    /// The other set's specific payload is taken only if we have none.
    pub fn absorb(&mut self, other: Metadata) {
        self.text.extend(other.text.0);
        self.comments.extend(other.comments);
        if self.specific.is_none() {
            self.specific = other.specific;
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

impl fmt::Debug for Metadata {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Metadata")
            .field("text", &self.text)
            .field("comments", &self.comments)
            .field("specific", &self.specific.as_ref().map(|_| ".."))
            .finish()
    }
}
