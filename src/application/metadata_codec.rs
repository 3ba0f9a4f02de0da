//! Inline tag lists inside metadata blobs

use crate::application::tag_registry;
use crate::domain::metadata::{self, Metadata};
use crate::domain::tag::TagId;
use crate::error::Result;
use crate::infrastructure::store::TagStore;

/// Converts a blob's `tags` field between mixed ids and plain names
pub struct MetadataTagCodec<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> MetadataTagCodec<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        MetadataTagCodec { store }
    }

    /// Resolve the blob's tags to names and rewrite the field with them.
    ///
    /// Text entries come first, as written; numeric entries follow as the
    /// titles of the tags they name. Ids without a tag and empty entries are
    /// dropped.
    pub fn decode_tag_names(&self, blob: &mut String) -> Result<Vec<String>> {
        let mut metadata = Metadata::parse(blob)?;

        let mut names = Vec::new();
        let mut ids: Vec<TagId> = Vec::new();
        for token in metadata.tag_tokens() {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match token.parse::<TagId>() {
                Ok(id) => ids.push(id),
                Err(_) => names.push(token.to_string()),
            }
        }

        if !ids.is_empty() {
            names.extend(tag_registry::titles(self.store, &ids)?);
        }

        metadata.set_tags(names.as_slice());
        *blob = metadata.to_json()?;
        Ok(names)
    }

    /// Write `names` into the blob's `tags` field
    pub fn encode_tag_names<N: AsRef<str>>(&self, blob: &mut String, names: &[N]) -> Result<()> {
        let mut metadata = Metadata::parse(blob)?;
        metadata.set_tags(names);
        *blob = metadata.to_json()?;
        Ok(())
    }

    /// Strip `#new#` markers from the blob's tags; see
    /// [`metadata::normalize_inline_tags`]
    pub fn normalize_inline_tags(&self, blob: &mut String) -> Result<Vec<String>> {
        metadata::normalize_inline_tags(blob)
    }
}
