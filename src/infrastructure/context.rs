//! Collaborators supplied by the surrounding application

use crate::domain::content_type::ContentItemId;
use crate::domain::tag::{AccessLevel, ALL_LANGUAGES, PUBLIC_ACCESS};
use crate::error::Result;
use std::collections::BTreeSet;

/// The current actor and request language
pub trait RequestContext {
    /// Access levels the current actor may view
    fn authorized_view_levels(&self) -> BTreeSet<AccessLevel>;

    fn current_language_code(&self) -> String;
}

/// Owner of the denormalized generic content records
pub trait ContentRecords {
    fn delete_record(&mut self, content_item_id: ContentItemId, type_alias: &str) -> Result<()>;
}

/// Fixed context, for batch jobs and tests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticContext {
    pub view_levels: BTreeSet<AccessLevel>,
    pub language: String,
}

impl StaticContext {
    pub fn new<I>(view_levels: I, language: &str) -> Self
    where
        I: IntoIterator<Item = AccessLevel>,
    {
        StaticContext {
            view_levels: view_levels.into_iter().collect(),
            language: language.to_string(),
        }
    }

    /// Anonymous visitor: public level only, no language preference
    pub fn public() -> Self {
        StaticContext::new([PUBLIC_ACCESS], ALL_LANGUAGES)
    }
}

impl RequestContext for StaticContext {
    fn authorized_view_levels(&self) -> BTreeSet<AccessLevel> {
        self.view_levels.clone()
    }

    fn current_language_code(&self) -> String {
        self.language.clone()
    }
}
