#![allow(dead_code)]

use chrono::{TimeZone, Utc};
use tagmap::application::{TagRegistry, TagTreeService};
use tagmap::domain::content_type::{ContentItemId, ContentType};
use tagmap::domain::mapping::{ContentRecord, ItemTag, ItemTagsFilter, TagMapping};
use tagmap::domain::query::{ItemsQuery, TaggedItem};
use tagmap::domain::tag::{AccessLevel, PublishState, Tag, TagId};
use tagmap::domain::tree::Position;
use tagmap::infrastructure::{EngineConfig, MemoryStore, TagStore};
use tagmap::{Result, TagmapError};

pub const ARTICLE: &str = "com_content.article";
pub const CONTACT: &str = "com_contact.contact";

/// Store with the article and contact types registered
pub fn store() -> MemoryStore {
    let mut store = MemoryStore::from_config(&EngineConfig::default());
    store
        .register_type(ContentType {
            type_id: 1,
            type_alias: ARTICLE.to_string(),
            table: "content".to_string(),
            router: "ContentHelperRoute::getArticleRoute".to_string(),
            title: "Article".to_string(),
        })
        .unwrap();
    store
        .register_type(ContentType {
            type_id: 2,
            type_alias: CONTACT.to_string(),
            table: "contact_details".to_string(),
            router: "ContactHelperRoute::getContactRoute".to_string(),
            title: "Contact".to_string(),
        })
        .unwrap();
    store
}

pub fn tag<S: TagStore + ?Sized>(store: &mut S, title: &str) -> TagId {
    let config = EngineConfig::default();
    TagRegistry::new(store, &config).find_or_create(title).unwrap()
}

pub fn tag_under<S: TagStore + ?Sized>(store: &mut S, title: &str, parent: TagId) -> TagId {
    let id = tag(store, title);
    TagTreeService::new(store)
        .set_location(id, parent, Position::LastChild)
        .unwrap();
    id
}

/// Generic content record for an item; core content id equals the item id
pub fn record(type_alias: &str, item: ContentItemId, title: &str) -> ContentRecord {
    ContentRecord {
        core_content_id: item,
        type_alias: type_alias.to_string(),
        content_item_id: item,
        title: title.to_string(),
        alias: title.to_lowercase().replace(' ', "-"),
        body: String::new(),
        state: PublishState::Published,
        access: 1,
        metadata: "{}".to_string(),
        created_user_id: None,
        created_by_alias: String::new(),
        created_time: Utc.with_ymd_and_hms(2024, 1, item as u32 % 28 + 1, 9, 0, 0).unwrap(),
        modified_time: None,
        images: String::new(),
        language: "*".to_string(),
        catid: 2,
        publish_up: None,
        publish_down: None,
    }
}

pub fn add_article(store: &mut MemoryStore, item: ContentItemId, title: &str) {
    store.insert_content(record(ARTICLE, item, title)).unwrap();
}

pub fn add_record_with(
    store: &mut MemoryStore,
    item: ContentItemId,
    title: &str,
    state: PublishState,
    access: AccessLevel,
    language: &str,
) {
    let mut record = record(ARTICLE, item, title);
    record.state = state;
    record.access = access;
    record.language = language.to_string();
    store.insert_content(record).unwrap();
}

/// Sorted tag ids mapped to an item, straight from the mapping table
pub fn mapped_ids(store: &MemoryStore, type_alias: &str, item: ContentItemId) -> Vec<TagId> {
    let mut ids: Vec<TagId> = store
        .mappings()
        .iter()
        .filter(|m| m.is_for(type_alias, item))
        .map(|m| m.tag_id)
        .collect();
    ids.sort_unstable();
    ids
}

pub fn item_ids(items: &[TaggedItem]) -> Vec<ContentItemId> {
    items.iter().map(|i| i.content_item_id).collect()
}

/// Delegates to a [`MemoryStore`] but rejects mapping inserts when armed
pub struct FailingStore {
    pub inner: MemoryStore,
    pub fail_mapping_inserts: bool,
}

impl FailingStore {
    pub fn new(inner: MemoryStore) -> Self {
        FailingStore {
            inner,
            fail_mapping_inserts: false,
        }
    }
}

impl TagStore for FailingStore {
    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    fn find_tag(&self, id: TagId) -> Result<Option<Tag>> {
        self.inner.find_tag(id)
    }

    fn find_tag_by_title(&self, title: &str) -> Result<Option<Tag>> {
        self.inner.find_tag_by_title(title)
    }

    fn tags_by_ids(&self, ids: &[TagId]) -> Result<Vec<Tag>> {
        self.inner.tags_by_ids(ids)
    }

    fn all_tags(&self) -> Result<Vec<Tag>> {
        self.inner.all_tags()
    }

    fn tags_in_range(&self, lft: u64, rgt: u64) -> Result<Vec<Tag>> {
        self.inner.tags_in_range(lft, rgt)
    }

    fn insert_tag(&mut self, tag: &Tag) -> Result<TagId> {
        self.inner.insert_tag(tag)
    }

    fn update_tags(&mut self, tags: &[Tag]) -> Result<()> {
        self.inner.update_tags(tags)
    }

    fn delete_tag(&mut self, id: TagId) -> Result<()> {
        self.inner.delete_tag(id)
    }

    fn item_tags(
        &self,
        type_alias: &str,
        content_item_id: ContentItemId,
        filter: &ItemTagsFilter,
    ) -> Result<Vec<ItemTag>> {
        self.inner.item_tags(type_alias, content_item_id, filter)
    }

    fn tag_ids_for_items(
        &self,
        type_alias: &str,
        content_item_ids: &[ContentItemId],
    ) -> Result<Vec<TagId>> {
        self.inner.tag_ids_for_items(type_alias, content_item_ids)
    }

    fn insert_mappings(&mut self, rows: &[TagMapping]) -> Result<()> {
        if self.fail_mapping_inserts {
            return Err(TagmapError::Persistence("mapping insert timed out".to_string()));
        }
        self.inner.insert_mappings(rows)
    }

    fn delete_item_mappings(
        &mut self,
        type_alias: &str,
        content_item_id: ContentItemId,
    ) -> Result<usize> {
        self.inner.delete_item_mappings(type_alias, content_item_id)
    }

    fn delete_tag_mappings(&mut self, tag_id: TagId) -> Result<usize> {
        self.inner.delete_tag_mappings(tag_id)
    }

    fn content_types(&self) -> Result<Vec<ContentType>> {
        self.inner.content_types()
    }

    fn execute_items_query(&self, query: &ItemsQuery) -> Result<Vec<TaggedItem>> {
        self.inner.execute_items_query(query)
    }
}
