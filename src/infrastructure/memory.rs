//! In-process reference store
//!
//! Keeps every table in memory, enforces the same constraints a relational
//! schema would (unique alias, unique mapping key, single root) and executes
//! [`ItemsQuery`] descriptions directly. Transactions are a stack of table
//! snapshots.

use crate::domain::content_type::{ContentItemId, ContentType};
use crate::domain::mapping::{
    ContentRecord, CoreContentId, ItemTag, ItemTagsFilter, TagMapping, User, UserId,
};
use crate::domain::query::{ItemsQuery, SortDirection, TaggedItem};
use crate::domain::tag::{Tag, TagId};
use crate::error::{Result, TagmapError};
use crate::infrastructure::config::EngineConfig;
use crate::infrastructure::context::ContentRecords;
use crate::infrastructure::store::TagStore;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Id given to the seeded root tag
pub const ROOT_TAG_ID: TagId = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Tables {
    pub(crate) tags: BTreeMap<TagId, Tag>,
    pub(crate) next_tag_id: TagId,
    pub(crate) mappings: Vec<TagMapping>,
    pub(crate) content_types: Vec<ContentType>,
    pub(crate) content: Vec<ContentRecord>,
    pub(crate) users: BTreeMap<UserId, User>,
}

/// Memory-backed implementation of [`TagStore`] and [`ContentRecords`]
#[derive(Debug, Clone)]
pub struct MemoryStore {
    pub(crate) tables: Tables,
    snapshots: Vec<Tables>,
}

impl MemoryStore {
    /// Create a store holding only the root tag
    pub fn new(root_alias: &str) -> Self {
        let root = Tag::root(ROOT_TAG_ID, root_alias);
        MemoryStore {
            tables: Tables {
                tags: BTreeMap::from([(ROOT_TAG_ID, root)]),
                next_tag_id: ROOT_TAG_ID + 1,
                mappings: Vec::new(),
                content_types: Vec::new(),
                content: Vec::new(),
                users: BTreeMap::new(),
            },
            snapshots: Vec::new(),
        }
    }

    /// Create an empty store whose root carries the configured alias
    pub fn from_config(config: &EngineConfig) -> Self {
        MemoryStore::new(&config.root_alias)
    }

    pub(crate) fn from_tables(tables: Tables) -> Self {
        MemoryStore {
            tables,
            snapshots: Vec::new(),
        }
    }

    pub fn in_transaction(&self) -> bool {
        !self.snapshots.is_empty()
    }

    /// Register a content type; alias and id must be unused
    pub fn register_type(&mut self, content_type: ContentType) -> Result<()> {
        if self.tables.content_types.iter().any(|t| {
            t.type_alias == content_type.type_alias || t.type_id == content_type.type_id
        }) {
            return Err(TagmapError::Persistence(format!(
                "Content type '{}' ({}) already registered",
                content_type.type_alias, content_type.type_id
            )));
        }
        self.tables.content_types.push(content_type);
        Ok(())
    }

    /// Add a generic content record; its id must be unused
    pub fn insert_content(&mut self, record: ContentRecord) -> Result<()> {
        if self
            .tables
            .content
            .iter()
            .any(|c| c.core_content_id == record.core_content_id)
        {
            return Err(TagmapError::Persistence(format!(
                "Duplicate core content id {}",
                record.core_content_id
            )));
        }
        self.tables.content.push(record);
        Ok(())
    }

    pub fn insert_user(&mut self, user: User) {
        self.tables.users.insert(user.id, user);
    }

    /// Every mapping row in insertion order
    pub fn mappings(&self) -> &[TagMapping] {
        &self.tables.mappings
    }

    pub fn content_records(&self) -> &[ContentRecord] {
        &self.tables.content
    }

    fn alias_taken(&self, alias: &str, except: TagId) -> bool {
        self.tables
            .tags
            .values()
            .any(|t| t.alias == alias && t.id != except)
    }

    fn find_content(&self, type_alias: &str, core_content_id: CoreContentId) -> Option<&ContentRecord> {
        self.tables
            .content
            .iter()
            .find(|c| c.type_alias == type_alias && c.core_content_id == core_content_id)
    }

    fn tagged_item(
        &self,
        mapping: &TagMapping,
        content: &ContentRecord,
        content_type: &ContentType,
    ) -> TaggedItem {
        let user = content
            .created_user_id
            .and_then(|id| self.tables.users.get(&id));

        TaggedItem {
            type_alias: mapping.type_alias.clone(),
            content_item_id: mapping.content_item_id,
            core_content_id: mapping.core_content_id,
            match_count: 1,
            tag_date: mapping.tag_date,
            core_title: content.title.clone(),
            core_alias: content.alias.clone(),
            core_body: content.body.clone(),
            core_state: content.state,
            core_access: content.access,
            core_metadata: content.metadata.clone(),
            core_created_user_id: content.created_user_id,
            core_created_by_alias: content.created_by_alias.clone(),
            core_created_time: content.created_time,
            core_modified_time: content.effective_modified_time(),
            core_images: content.images.clone(),
            core_language: content.language.clone(),
            core_catid: content.catid,
            core_publish_up: content.publish_up,
            core_publish_down: content.publish_down,
            content_type_title: content_type.title.clone(),
            router: content_type.router.clone(),
            author: content.author(user),
            author_email: user.map(|u| u.email.clone()),
        }
    }
}

impl TagStore for MemoryStore {
    fn begin(&mut self) -> Result<()> {
        self.snapshots.push(self.tables.clone());
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        self.snapshots
            .pop()
            .map(|_| ())
            .ok_or_else(|| TagmapError::Persistence("No open transaction to commit".to_string()))
    }

    fn rollback(&mut self) -> Result<()> {
        let snapshot = self.snapshots.pop().ok_or_else(|| {
            TagmapError::Persistence("No open transaction to roll back".to_string())
        })?;
        self.tables = snapshot;
        Ok(())
    }

    fn find_tag(&self, id: TagId) -> Result<Option<Tag>> {
        Ok(self.tables.tags.get(&id).cloned())
    }

    fn find_tag_by_title(&self, title: &str) -> Result<Option<Tag>> {
        Ok(self
            .tables
            .tags
            .values()
            .find(|t| t.title == title)
            .cloned())
    }

    fn tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>> {
        let wanted: BTreeSet<TagId> = ids.iter().copied().collect();
        Ok(self
            .tables
            .tags
            .values()
            .filter(|t| wanted.contains(&t.id))
            .cloned()
            .collect())
    }

    fn all_tags(&self) -> Result<Vec<Tag>> {
        Ok(self.tables.tags.values().cloned().collect())
    }

    fn tags_in_range(&self, lft: u64, rgt: u64) -> Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self
            .tables
            .tags
            .values()
            .filter(|t| t.lft >= lft && t.lft <= rgt)
            .cloned()
            .collect();
        tags.sort_by_key(|t| t.lft);
        Ok(tags)
    }

    fn insert_tag(&mut self, tag: &Tag) -> Result<TagId> {
        if tag.title.trim().is_empty() {
            return Err(TagmapError::Persistence("Tag title cannot be empty".to_string()));
        }
        if tag.alias.is_empty() {
            return Err(TagmapError::Persistence("Tag alias cannot be empty".to_string()));
        }
        if self.alias_taken(&tag.alias, 0) {
            return Err(TagmapError::Persistence(format!(
                "Duplicate tag alias '{}'",
                tag.alias
            )));
        }

        let id = self.tables.next_tag_id;
        self.tables.next_tag_id += 1;
        let mut row = tag.clone();
        row.id = id;
        self.tables.tags.insert(id, row);
        Ok(id)
    }

    fn update_tags(&mut self, tags: &[Tag]) -> Result<()> {
        for tag in tags {
            if !self.tables.tags.contains_key(&tag.id) {
                return Err(TagmapError::Persistence(format!(
                    "Cannot update missing tag {}",
                    tag.id
                )));
            }
            if self.alias_taken(&tag.alias, tag.id) {
                return Err(TagmapError::Persistence(format!(
                    "Duplicate tag alias '{}'",
                    tag.alias
                )));
            }
        }
        for tag in tags {
            self.tables.tags.insert(tag.id, tag.clone());
        }
        Ok(())
    }

    fn delete_tag(&mut self, id: TagId) -> Result<()> {
        self.tables
            .tags
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| TagmapError::NotFound(format!("Tag {}", id)))
    }

    fn item_tags(
        &self,
        type_alias: &str,
        content_item_id: ContentItemId,
        filter: &ItemTagsFilter,
    ) -> Result<Vec<ItemTag>> {
        Ok(self
            .tables
            .mappings
            .iter()
            .filter(|m| m.is_for(type_alias, content_item_id))
            .filter_map(|m| {
                let tag = self.tables.tags.get(&m.tag_id)?;
                filter.admits(tag).then(|| ItemTag {
                    mapping: m.clone(),
                    tag: Some(tag.clone()),
                })
            })
            .collect())
    }

    fn tag_ids_for_items(
        &self,
        type_alias: &str,
        content_item_ids: &[ContentItemId],
    ) -> Result<Vec<TagId>> {
        Ok(self
            .tables
            .mappings
            .iter()
            .filter(|m| m.type_alias == type_alias && content_item_ids.contains(&m.content_item_id))
            .filter(|m| self.tables.tags.contains_key(&m.tag_id))
            .map(|m| m.tag_id)
            .collect())
    }

    fn insert_mappings(&mut self, rows: &[TagMapping]) -> Result<()> {
        let mut keys: BTreeSet<(&str, ContentItemId, TagId)> =
            self.tables.mappings.iter().map(|m| m.key()).collect();
        for row in rows {
            if !keys.insert(row.key()) {
                return Err(TagmapError::Persistence(format!(
                    "Duplicate mapping ({}, {}, {})",
                    row.type_alias, row.content_item_id, row.tag_id
                )));
            }
        }
        self.tables.mappings.extend(rows.iter().cloned());
        Ok(())
    }

    fn delete_item_mappings(
        &mut self,
        type_alias: &str,
        content_item_id: ContentItemId,
    ) -> Result<usize> {
        let before = self.tables.mappings.len();
        self.tables
            .mappings
            .retain(|m| !m.is_for(type_alias, content_item_id));
        Ok(before - self.tables.mappings.len())
    }

    fn delete_tag_mappings(&mut self, tag_id: TagId) -> Result<usize> {
        let before = self.tables.mappings.len();
        self.tables.mappings.retain(|m| m.tag_id != tag_id);
        Ok(before - self.tables.mappings.len())
    }

    fn content_types(&self) -> Result<Vec<ContentType>> {
        Ok(self.tables.content_types.clone())
    }

    fn execute_items_query(&self, query: &ItemsQuery) -> Result<Vec<TaggedItem>> {
        let types: HashMap<&str, &ContentType> = self
            .tables
            .content_types
            .iter()
            .map(|t| (t.type_alias.as_str(), t))
            .collect();

        let mut groups: BTreeMap<(String, ContentItemId, CoreContentId), TaggedItem> =
            BTreeMap::new();
        for mapping in &self.tables.mappings {
            let Some(content) = self.find_content(&mapping.type_alias, mapping.core_content_id)
            else {
                continue;
            };
            let Some(content_type) = types.get(mapping.type_alias.as_str()) else {
                continue;
            };
            if !query.admits(mapping, content) {
                continue;
            }

            let key = (
                mapping.type_alias.clone(),
                mapping.content_item_id,
                mapping.core_content_id,
            );
            match groups.get_mut(&key) {
                Some(item) => {
                    item.match_count += 1;
                    item.tag_date = item.tag_date.max(mapping.tag_date);
                }
                None => {
                    groups.insert(key, self.tagged_item(mapping, content, content_type));
                }
            }
        }

        let mut rows: Vec<TaggedItem> = groups
            .into_values()
            .filter(|item| query.keeps_group(item.match_count))
            .collect();
        rows.sort_by(|a, b| {
            let ordering = a.sort_value(query.order).cmp(&b.sort_value(query.order));
            match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            }
        });
        Ok(rows)
    }
}

impl ContentRecords for MemoryStore {
    fn delete_record(&mut self, content_item_id: ContentItemId, type_alias: &str) -> Result<()> {
        self.tables
            .content
            .retain(|c| !(c.type_alias == type_alias && c.content_item_id == content_item_id));
        Ok(())
    }
}
