//! Tag tree use cases
//!
//! Reads go straight to the store as range queries. Structural writes load
//! the tree, renumber it in memory and write the changed rows back inside
//! one transaction.

use crate::domain::tag::TagId;
use crate::domain::tree::Position;
use crate::error::Result;
use crate::infrastructure::store::{transaction, TagStore};
use log::info;

/// True iff the tag exists and has no children
pub fn is_leaf<S>(store: &S, id: TagId) -> Result<bool>
where
    S: TagStore + ?Sized,
{
    Ok(store.find_tag(id)?.is_some_and(|tag| tag.is_leaf()))
}

/// The tag's subtree, itself included, ordered by `lft`.
///
/// A leaf returns `[id]` without a range query; an unknown id returns an
/// empty list.
pub fn descendants<S>(store: &S, id: TagId) -> Result<Vec<TagId>>
where
    S: TagStore + ?Sized,
{
    let Some(tag) = store.find_tag(id)? else {
        return Ok(Vec::new());
    };
    if tag.is_leaf() {
        return Ok(vec![id]);
    }

    Ok(store
        .tags_in_range(tag.lft, tag.rgt)?
        .into_iter()
        .map(|t| t.id)
        .collect())
}

/// Service for structural changes to the tag tree
pub struct TagTreeService<'a, S: ?Sized> {
    store: &'a mut S,
}

impl<'a, S> TagTreeService<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a mut S) -> Self {
        TagTreeService { store }
    }

    pub fn is_leaf(&self, id: TagId) -> Result<bool> {
        is_leaf(&*self.store, id)
    }

    pub fn descendants(&self, id: TagId) -> Result<Vec<TagId>> {
        descendants(&*self.store, id)
    }

    /// Move a tag and its subtree relative to `anchor`.
    ///
    /// Returns the number of rows rewritten.
    pub fn set_location(&mut self, id: TagId, anchor: TagId, position: Position) -> Result<usize> {
        let rewritten = transaction(&mut *self.store, |store| {
            let mut tree = store.load_tree()?;
            let changed = tree.set_location(id, anchor, position)?;
            store.update_tags(&changed)?;
            Ok(changed.len())
        })?;

        info!(
            "Moved tag {} to {} {} ({} row(s) rewritten)",
            id, position, anchor, rewritten
        );
        Ok(rewritten)
    }

    /// Recompute boundaries, levels and paths of the whole tree
    pub fn rebuild(&mut self) -> Result<usize> {
        let rewritten = transaction(&mut *self.store, |store| {
            let mut tree = store.load_tree()?;
            let changed = tree.rebuild();
            store.update_tags(&changed)?;
            Ok(changed.len())
        })?;

        info!("Rebuilt tag tree ({} row(s) rewritten)", rewritten);
        Ok(rewritten)
    }
}
