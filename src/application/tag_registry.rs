//! Tag record use cases

use crate::application::TagMapper;
use crate::domain::tag::{AccessLevel, Tag, TagId};
use crate::domain::tree::Position;
use crate::error::{Result, TagmapError};
use crate::infrastructure::store::{transaction, TagStore};
use crate::infrastructure::EngineConfig;
use log::info;

/// Titles of the given tags, in id order; unknown ids are skipped
pub fn titles<S>(store: &S, ids: &[TagId]) -> Result<Vec<String>>
where
    S: TagStore + ?Sized,
{
    Ok(store.tags_by_ids(ids)?.into_iter().map(|t| t.title).collect())
}

/// Service for looking up, creating and deleting tags
pub struct TagRegistry<'a, S: ?Sized> {
    store: &'a mut S,
    config: &'a EngineConfig,
}

impl<'a, S> TagRegistry<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a mut S, config: &'a EngineConfig) -> Self {
        TagRegistry { store, config }
    }

    /// Load a tag or fail with `NotFound`
    pub fn get(&self, id: TagId) -> Result<Tag> {
        self.store
            .find_tag(id)?
            .ok_or_else(|| TagmapError::NotFound(format!("Tag {}", id)))
    }

    /// Case-sensitive exact title lookup
    pub fn find_by_title(&self, title: &str) -> Result<Option<Tag>> {
        self.store.find_tag_by_title(title)
    }

    /// Find a tag by exact title, creating it under the root with the
    /// configured default language and access level on a miss.
    pub fn find_or_create(&mut self, title: &str) -> Result<TagId> {
        let language = self.config.default_language.clone();
        self.find_or_create_with(title, &language, self.config.default_access)
    }

    /// Like [`TagRegistry::find_or_create`] with explicit language and access.
    ///
    /// A created tag is published, is the last child of the root and has its
    /// own alias as path. Fails with `Persistence` if the store rejects the
    /// row; nothing is created in that case.
    pub fn find_or_create_with(
        &mut self,
        title: &str,
        language: &str,
        access: AccessLevel,
    ) -> Result<TagId> {
        if title.trim().is_empty() {
            return Err(TagmapError::Validation("Tag title cannot be empty".to_string()));
        }
        if let Some(existing) = self.store.find_tag_by_title(title)? {
            return Ok(existing.id);
        }

        let id = transaction(&mut *self.store, |store| {
            let mut tree = store.load_tree()?;
            let mut tag = Tag::draft(title, access, language);
            tag.id = store.insert_tag(&tag)?;
            let id = tag.id;
            let root = tree.root_id();
            let changed = tree.insert(tag, root, Position::LastChild)?;
            store.update_tags(&changed)?;
            Ok(id)
        })?;

        info!("Created tag {} '{}'", id, title);
        Ok(id)
    }

    /// Remove every mapping of a leaf tag, then the tag itself.
    ///
    /// Tags with children and the root are refused before anything is
    /// deleted. Returns the number of mapping rows removed.
    pub fn delete_cascade(&mut self, id: TagId) -> Result<usize> {
        let tag = self.get(id)?;
        if tag.is_root() {
            return Err(TagmapError::Validation("The root tag cannot be deleted".to_string()));
        }
        if !tag.is_leaf() {
            return Err(TagmapError::Validation(format!(
                "Tag {} has children; move or delete them first",
                id
            )));
        }

        let removed = TagMapper::new(&mut *self.store, self.config).tag_delete_instances(id)?;

        transaction(&mut *self.store, |store| {
            let mut tree = store.load_tree()?;
            let changed = tree.remove_leaf(id)?;
            store.delete_tag(id)?;
            store.update_tags(&changed)
        })?;

        info!("Deleted tag {} '{}' and {} mapping(s)", id, tag.title, removed);
        Ok(removed)
    }
}
