//! Mapping rows and the records they join against

use crate::domain::content_type::{ContentItemId, TypeId};
use crate::domain::tag::{language_matches, AccessLevel, PublishState, Tag, TagId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Primary key of a generic content record
pub type CoreContentId = u64;

/// Primary key of a user
pub type UserId = u64;

/// One (type alias, item, tag) association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagMapping {
    pub type_alias: String,
    pub content_item_id: ContentItemId,
    pub tag_id: TagId,
    pub core_content_id: CoreContentId,
    pub type_id: TypeId,
    pub tag_date: DateTime<Utc>,
}

impl TagMapping {
    /// The composite key; no two rows may share it
    pub fn key(&self) -> (&str, ContentItemId, TagId) {
        (&self.type_alias, self.content_item_id, self.tag_id)
    }

    /// Does this row belong to the given item?
    pub fn is_for(&self, type_alias: &str, content_item_id: ContentItemId) -> bool {
        self.type_alias == type_alias && self.content_item_id == content_item_id
    }
}

/// A mapping row, optionally joined with its tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTag {
    pub mapping: TagMapping,
    pub tag: Option<Tag>,
}

impl ItemTag {
    pub fn tag_id(&self) -> TagId {
        self.mapping.tag_id
    }
}

/// Visibility rules applied when listing an item's tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemTagsFilter {
    pub access_levels: BTreeSet<AccessLevel>,
    /// Resolved language code; `None` disables the language restriction
    pub language: Option<String>,
}

impl ItemTagsFilter {
    /// Is the tag published, visible at the caller's levels and in language?
    pub fn admits(&self, tag: &Tag) -> bool {
        tag.published == PublishState::Published
            && self.access_levels.contains(&tag.access)
            && self
                .language
                .as_deref()
                .map_or(true, |code| language_matches(code, &tag.language))
    }
}

/// Denormalized projection of any taggable item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRecord {
    pub core_content_id: CoreContentId,
    pub type_alias: String,
    pub content_item_id: ContentItemId,
    pub title: String,
    pub alias: String,
    pub body: String,
    pub state: PublishState,
    pub access: AccessLevel,
    pub metadata: String,
    pub created_user_id: Option<UserId>,
    pub created_by_alias: String,
    pub created_time: DateTime<Utc>,
    /// `None` when the record was never modified
    pub modified_time: Option<DateTime<Utc>>,
    pub images: String,
    pub language: String,
    pub catid: u64,
    pub publish_up: Option<DateTime<Utc>>,
    pub publish_down: Option<DateTime<Utc>>,
}

impl ContentRecord {
    /// Last modification, falling back to creation time
    pub fn effective_modified_time(&self) -> DateTime<Utc> {
        self.modified_time.unwrap_or(self.created_time)
    }

    /// The explicit author alias wins over the joined user's name
    pub fn author(&self, user: Option<&User>) -> Option<String> {
        if !self.created_by_alias.trim().is_empty() {
            Some(self.created_by_alias.clone())
        } else {
            user.map(|u| u.name.clone())
        }
    }
}

/// Author record joined for display name and email
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record() -> ContentRecord {
        ContentRecord {
            core_content_id: 1,
            type_alias: "com_content.article".to_string(),
            content_item_id: 10,
            title: "Hello".to_string(),
            alias: "hello".to_string(),
            body: String::new(),
            state: PublishState::Published,
            access: 1,
            metadata: "{}".to_string(),
            created_user_id: Some(5),
            created_by_alias: String::new(),
            created_time: Utc.with_ymd_and_hms(2024, 3, 1, 9, 0, 0).unwrap(),
            modified_time: None,
            images: String::new(),
            language: "*".to_string(),
            catid: 2,
            publish_up: None,
            publish_down: None,
        }
    }

    #[test]
    fn test_author_prefers_alias() {
        let user = User {
            id: 5,
            name: "Ada".to_string(),
            email: "ada@example.org".to_string(),
        };
        let mut rec = record();
        assert_eq!(rec.author(Some(&user)), Some("Ada".to_string()));

        rec.created_by_alias = "Guest Writer".to_string();
        assert_eq!(rec.author(Some(&user)), Some("Guest Writer".to_string()));
        assert_eq!(record().author(None), None);
    }

    #[test]
    fn test_effective_modified_time() {
        let mut rec = record();
        assert_eq!(rec.effective_modified_time(), rec.created_time);

        let later = Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap();
        rec.modified_time = Some(later);
        assert_eq!(rec.effective_modified_time(), later);
    }

    #[test]
    fn test_item_tags_filter_admits() {
        let mut tag = Tag::draft("Rust", 2, "en-GB");
        tag.id = 3;
        let filter = ItemTagsFilter {
            access_levels: BTreeSet::from([1, 2]),
            language: Some("en-GB".to_string()),
        };
        assert!(filter.admits(&tag));

        tag.published = PublishState::Unpublished;
        assert!(!filter.admits(&tag));

        tag.published = PublishState::Published;
        tag.access = 3;
        assert!(!filter.admits(&tag));

        tag.access = 1;
        tag.language = "fr-FR".to_string();
        assert!(!filter.admits(&tag));

        let unfiltered = ItemTagsFilter {
            language: None,
            ..filter
        };
        assert!(unfiltered.admits(&tag));
    }
}
