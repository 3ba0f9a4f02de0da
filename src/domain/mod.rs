//! Domain layer - Tag records, the nested-set tree and query descriptions

pub mod content_type;
pub mod mapping;
pub mod metadata;
pub mod query;
pub mod tag;
pub mod tree;

pub use content_type::{content_item_url, tag_url, ContentType, TypeAlias, TypeDescriptor};
pub use mapping::{ContentRecord, ItemTag, ItemTagsFilter, TagMapping, User};
pub use query::{ItemsQuery, OrderKey, Predicate, SortColumn, SortDirection, TaggedItem};
pub use tag::{LanguageFilter, PublishState, Tag, TagId, TagToken};
pub use tree::{Position, TagTree};
