//! Application layer - Tagging, tree and query use cases

pub mod items_query;
pub mod metadata_codec;
pub mod search_tags;
pub mod tag_mapper;
pub mod tag_registry;
pub mod tag_tree;
pub mod type_registry;

pub use items_query::{ItemsForTagsRequest, TagQueryBuilder};
pub use metadata_codec::MetadataTagCodec;
pub use search_tags::{SearchFilters, TagOption, TagSearch};
pub use tag_mapper::{TagItemReport, TagItemRequest, TagMapper, TokenResolution};
pub use tag_registry::TagRegistry;
pub use tag_tree::TagTreeService;
pub use type_registry::{TypeFilter, TypeRegistry};
