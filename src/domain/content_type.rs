//! Content types and the URLs built from type aliases

use crate::domain::tag::TagId;
use crate::error::{Result, TagmapError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Numeric content type id
pub type TypeId = u32;

/// Primary key of a content item inside its own table
pub type ContentItemId = u64;

/// Component that serves tag pages
pub const TAGS_COMPONENT: &str = "tags";

/// A registered taggable content kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentType {
    pub type_id: TypeId,
    pub type_alias: String,
    /// Backing table of the content kind
    pub table: String,
    /// Router reference used by the presentation layer
    pub router: String,
    pub title: String,
}

/// Resolved descriptor for a type alias
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub table: String,
    pub type_id: TypeId,
}

impl From<&ContentType> for TypeDescriptor {
    fn from(content_type: &ContentType) -> Self {
        TypeDescriptor {
            table: content_type.table.clone(),
            type_id: content_type.type_id,
        }
    }
}

/// A `component.view` type alias split into its two segments
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeAlias {
    component: String,
    view: String,
}

impl TypeAlias {
    /// Parse `component.view`; both segments must be non-empty
    pub fn parse(alias: &str) -> Result<Self> {
        match alias.split_once('.') {
            Some((component, view))
                if !component.is_empty() && !view.is_empty() && !view.contains('.') =>
            {
                Ok(TypeAlias {
                    component: component.to_string(),
                    view: view.to_string(),
                })
            }
            _ => Err(TagmapError::Validation(format!(
                "Invalid type alias: '{}'. Expected component.view",
                alias
            ))),
        }
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn view(&self) -> &str {
        &self.view
    }

    /// Route to a content item of this type
    pub fn content_item_url(&self, id: ContentItemId) -> String {
        format!("option={}&view={}&id={}", self.component, self.view, id)
    }
}

impl fmt::Display for TypeAlias {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.component, self.view)
    }
}

/// Route to a content item given its raw type alias
pub fn content_item_url(type_alias: &str, id: ContentItemId) -> Result<String> {
    Ok(TypeAlias::parse(type_alias)?.content_item_url(id))
}

/// Route to a tag page
pub fn tag_url(tag_id: TagId) -> String {
    format!("option={}&view=tag&id={}", TAGS_COMPONENT, tag_id)
}
