//! Item to tag mappings
//!
//! Owns the mapping rows: replacing or merging an item's tag set, listing
//! the tags an actor may see on an item, and the cascades that remove rows
//! when items or tags go away.

use crate::application::{TagRegistry, TypeRegistry};
use crate::domain::content_type::ContentItemId;
use crate::domain::mapping::{CoreContentId, ItemTag, ItemTagsFilter, TagMapping};
use crate::domain::tag::{LanguageFilter, TagId, TagToken};
use crate::error::Result;
use crate::infrastructure::context::{ContentRecords, RequestContext};
use crate::infrastructure::store::{transaction, TagStore};
use crate::infrastructure::EngineConfig;
use chrono::Utc;
use log::{debug, info, warn};
use std::collections::HashSet;

/// Input to [`TagMapper::tag_item`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItemRequest {
    pub type_alias: String,
    pub content_item_id: ContentItemId,
    pub core_content_id: CoreContentId,
    /// The item has never been tagged; no prior rows are deleted
    pub is_new: bool,
    /// When false on an existing item, requested tags are merged with the
    /// ones it already carries
    pub replace: bool,
    pub tags: Vec<TagToken>,
}

impl TagItemRequest {
    /// A replacing request for an existing item with no tags yet
    pub fn new(type_alias: &str, content_item_id: ContentItemId, core_content_id: CoreContentId) -> Self {
        TagItemRequest {
            type_alias: type_alias.to_string(),
            content_item_id,
            core_content_id,
            is_new: false,
            replace: true,
            tags: Vec::new(),
        }
    }

    pub fn with_tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<TagToken>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn new_item(mut self) -> Self {
        self.is_new = true;
        self
    }

    pub fn merge(mut self) -> Self {
        self.replace = false;
        self
    }
}

/// What became of one requested token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenResolution {
    /// Numeric id of an existing tag
    Existing(TagId),
    /// Text matching the title of an existing tag
    Matched(TagId),
    /// Text that produced a new tag
    Created(TagId),
    /// Dropped from the applied set
    Skipped { reason: String },
}

impl TokenResolution {
    pub fn tag_id(&self) -> Option<TagId> {
        match self {
            TokenResolution::Existing(id)
            | TokenResolution::Matched(id)
            | TokenResolution::Created(id) => Some(*id),
            TokenResolution::Skipped { .. } => None,
        }
    }
}

/// Outcome of a successful [`TagMapper::tag_item`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagItemReport {
    /// The item's mapped tag ids, in application order
    pub tag_ids: Vec<TagId>,
    /// One entry per token after merging and de-duplication
    pub resolutions: Vec<(TagToken, TokenResolution)>,
}

impl TagItemReport {
    pub fn skipped(&self) -> impl Iterator<Item = &(TagToken, TokenResolution)> {
        self.resolutions
            .iter()
            .filter(|(_, r)| matches!(r, TokenResolution::Skipped { .. }))
    }
}

fn root_skipped() -> TokenResolution {
    TokenResolution::Skipped {
        reason: "the root tag cannot be mapped".to_string(),
    }
}

/// Service owning the mapping rows
pub struct TagMapper<'a, S: ?Sized> {
    store: &'a mut S,
    config: &'a EngineConfig,
}

impl<'a, S> TagMapper<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a mut S, config: &'a EngineConfig) -> Self {
        TagMapper { store, config }
    }

    /// Map an item to a set of tags, creating tags for unknown text.
    ///
    /// Returns `Ok(None)` when there is nothing to apply: no tags were
    /// requested or every token was skipped. Existing rows are untouched in
    /// that case. Otherwise the item's rows become exactly the resolved set,
    /// written in one transaction.
    pub fn tag_item(
        &mut self,
        ctx: &dyn RequestContext,
        request: &TagItemRequest,
    ) -> Result<Option<TagItemReport>> {
        if request.tags.is_empty() {
            debug!(
                "No tags requested for {} {}",
                request.type_alias, request.content_item_id
            );
            return Ok(None);
        }

        let type_id = TypeRegistry::new(&*self.store).type_id(&request.type_alias)?;

        let mut tokens = request.tags.clone();
        if !request.replace && !request.is_new {
            let current = self.get_item_tags(
                ctx,
                &request.type_alias,
                request.content_item_id,
                false,
                None,
            )?;
            tokens.extend(current.iter().map(|t| TagToken::Id(t.tag_id())));
        }
        let mut seen = HashSet::new();
        tokens.retain(|token| seen.insert(token.clone()));

        let mut resolutions = Vec::with_capacity(tokens.len());
        for token in tokens {
            let resolution = self.resolve_token(&token);
            if let TokenResolution::Skipped { reason } = &resolution {
                warn!(
                    "Skipping tag '{}' for {} {}: {}",
                    token, request.type_alias, request.content_item_id, reason
                );
            }
            resolutions.push((token, resolution));
        }

        let mut seen = HashSet::new();
        let tag_ids: Vec<TagId> = resolutions
            .iter()
            .filter_map(|(_, r)| r.tag_id())
            .filter(|id| seen.insert(*id))
            .collect();
        if tag_ids.is_empty() {
            return Ok(None);
        }

        let now = Utc::now();
        let rows: Vec<TagMapping> = tag_ids
            .iter()
            .map(|&tag_id| TagMapping {
                type_alias: request.type_alias.clone(),
                content_item_id: request.content_item_id,
                tag_id,
                core_content_id: request.core_content_id,
                type_id,
                tag_date: now,
            })
            .collect();

        transaction(&mut *self.store, |store| {
            if !request.is_new {
                store.delete_item_mappings(&request.type_alias, request.content_item_id)?;
            }
            store.insert_mappings(&rows)
        })?;

        info!(
            "Tagged {} {} with {} tag(s)",
            request.type_alias,
            request.content_item_id,
            tag_ids.len()
        );
        Ok(Some(TagItemReport {
            tag_ids,
            resolutions,
        }))
    }

    fn resolve_token(&mut self, token: &TagToken) -> TokenResolution {
        let outcome = match token {
            TagToken::Id(id) => self.store.find_tag(*id).map(|found| match found {
                Some(tag) if tag.is_root() => root_skipped(),
                Some(_) => TokenResolution::Existing(*id),
                None => TokenResolution::Skipped {
                    reason: format!("tag {} does not exist", id),
                },
            }),
            TagToken::Text(_) => token.title().and_then(|title| {
                let mut registry = TagRegistry::new(&mut *self.store, self.config);
                match registry.find_by_title(title)? {
                    Some(tag) if tag.is_root() => Ok(root_skipped()),
                    Some(tag) => Ok(TokenResolution::Matched(tag.id)),
                    None => registry.find_or_create(title).map(TokenResolution::Created),
                }
            }),
        };

        outcome.unwrap_or_else(|err| TokenResolution::Skipped {
            reason: err.to_string(),
        })
    }

    /// Delete every row of one item. Returns the number of rows removed.
    pub fn un_tag_item(&mut self, type_alias: &str, content_item_id: ContentItemId) -> Result<usize> {
        let removed = self.store.delete_item_mappings(type_alias, content_item_id)?;
        debug!(
            "Removed {} mapping(s) from {} {}",
            removed, type_alias, content_item_id
        );
        Ok(removed)
    }

    /// Tags of one item the actor may see.
    ///
    /// Only published tags at one of the actor's view levels are returned,
    /// restricted by `language` or, when `None`, by the configured listing
    /// filter. With `include_tag_data` false only the mapping rows are kept.
    pub fn get_item_tags(
        &self,
        ctx: &dyn RequestContext,
        type_alias: &str,
        content_item_id: ContentItemId,
        include_tag_data: bool,
        language: Option<&LanguageFilter>,
    ) -> Result<Vec<ItemTag>> {
        let language = language.unwrap_or(&self.config.tag_list_language_filter);
        let filter = ItemTagsFilter {
            access_levels: ctx.authorized_view_levels(),
            language: language.resolve(|| ctx.current_language_code()),
        };

        let mut rows = self.store.item_tags(type_alias, content_item_id, &filter)?;
        if !include_tag_data {
            for row in &mut rows {
                row.tag = None;
            }
        }
        Ok(rows)
    }

    /// Comma-joined tag ids mapped to any of the items, for prefetching.
    ///
    /// No access or language filtering is applied. Returns `None` when no
    /// item ids are given.
    pub fn get_tag_ids(
        &self,
        content_item_ids: &[ContentItemId],
        type_alias: &str,
    ) -> Result<Option<String>> {
        if content_item_ids.is_empty() {
            return Ok(None);
        }
        let ids = self.store.tag_ids_for_items(type_alias, content_item_ids)?;
        Ok(Some(
            ids.iter()
                .map(|id| id.to_string())
                .collect::<Vec<_>>()
                .join(","),
        ))
    }

    /// Delete every row pointing at a tag
    pub fn tag_delete_instances(&mut self, tag_id: TagId) -> Result<usize> {
        let removed = self.store.delete_tag_mappings(tag_id)?;
        debug!("Removed {} mapping(s) of tag {}", removed, tag_id);
        Ok(removed)
    }

    /// Untag each item and drop its generic content record through
    /// `records`, one item at a time.
    pub fn delete_tag_data_with<C>(
        &mut self,
        records: &mut C,
        content_item_ids: &[ContentItemId],
        type_alias: &str,
    ) -> Result<usize>
    where
        C: ContentRecords + ?Sized,
    {
        let mut removed = 0;
        for &id in content_item_ids {
            removed += self.un_tag_item(type_alias, id)?;
            records.delete_record(id, type_alias)?;
        }
        Ok(removed)
    }
}

impl<'a, S> TagMapper<'a, S>
where
    S: TagStore + ContentRecords + ?Sized,
{
    /// [`TagMapper::delete_tag_data_with`] for stores that also own the
    /// generic content records
    pub fn delete_tag_data(
        &mut self,
        content_item_ids: &[ContentItemId],
        type_alias: &str,
    ) -> Result<usize> {
        let mut removed = 0;
        for &id in content_item_ids {
            removed += self.un_tag_item(type_alias, id)?;
            self.store.delete_record(id, type_alias)?;
        }
        Ok(removed)
    }
}
