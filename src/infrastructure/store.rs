//! Store abstraction consumed by the tagging services

use crate::domain::content_type::{ContentItemId, ContentType};
use crate::domain::mapping::{ItemTag, ItemTagsFilter, TagMapping};
use crate::domain::query::{ItemsQuery, TaggedItem};
use crate::domain::tag::{Tag, TagId};
use crate::domain::tree::TagTree;
use crate::error::Result;
use log::warn;

/// Abstract relational store holding tags, mappings and content types
pub trait TagStore {
    /// Open a transaction scope; scopes may nest
    fn begin(&mut self) -> Result<()>;

    /// Close the innermost scope keeping its writes
    fn commit(&mut self) -> Result<()>;

    /// Close the innermost scope discarding its writes
    fn rollback(&mut self) -> Result<()>;

    fn find_tag(&self, id: TagId) -> Result<Option<Tag>>;

    /// Case-sensitive exact title lookup
    fn find_tag_by_title(&self, title: &str) -> Result<Option<Tag>>;

    /// Tags with the given ids, in id order; unknown ids are skipped
    fn tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>>;

    /// Every tag row including the root
    fn all_tags(&self) -> Result<Vec<Tag>>;

    /// Tags with `lft` inside `[lft, rgt]`, ordered by `lft`
    fn tags_in_range(&self, lft: u64, rgt: u64) -> Result<Vec<Tag>>;

    /// Insert a new tag row and return the id the store assigned
    fn insert_tag(&mut self, tag: &Tag) -> Result<TagId>;

    /// Overwrite existing tag rows
    fn update_tags(&mut self, tags: &[Tag]) -> Result<()>;

    fn delete_tag(&mut self, id: TagId) -> Result<()>;

    /// Mapping rows of one item inner-joined with tags admitted by `filter`
    fn item_tags(
        &self,
        type_alias: &str,
        content_item_id: ContentItemId,
        filter: &ItemTagsFilter,
    ) -> Result<Vec<ItemTag>>;

    /// Tag ids mapped to any of the items, one per mapping row whose tag exists
    fn tag_ids_for_items(
        &self,
        type_alias: &str,
        content_item_ids: &[ContentItemId],
    ) -> Result<Vec<TagId>>;

    /// Insert mapping rows; a duplicate composite key is rejected
    fn insert_mappings(&mut self, rows: &[TagMapping]) -> Result<()>;

    fn delete_item_mappings(
        &mut self,
        type_alias: &str,
        content_item_id: ContentItemId,
    ) -> Result<usize>;

    fn delete_tag_mappings(&mut self, tag_id: TagId) -> Result<usize>;

    fn content_types(&self) -> Result<Vec<ContentType>>;

    fn execute_items_query(&self, query: &ItemsQuery) -> Result<Vec<TaggedItem>>;

    /// Load the full nested-set tree
    fn load_tree(&self) -> Result<TagTree> {
        TagTree::from_tags(self.all_tags()?)
    }
}

/// Run `work` inside a transaction scope.
///
/// Commits on success and rolls back on any error; the original error is
/// returned even if the rollback itself fails.
pub fn transaction<S, T, F>(store: &mut S, work: F) -> Result<T>
where
    S: TagStore + ?Sized,
    F: FnOnce(&mut S) -> Result<T>,
{
    store.begin()?;
    match work(store) {
        Ok(value) => {
            store.commit()?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = store.rollback() {
                warn!("Rollback failed after '{}': {}", err, rollback_err);
            }
            Err(err)
        }
    }
}
