//! Tag option listing for pickers

use crate::application::tag_tree::descendants;
use crate::domain::tag::{language_matches, PublishState, Tag, TagId};
use crate::error::Result;
use crate::infrastructure::store::TagStore;
use std::collections::{BTreeSet, HashMap};

/// Restrictions for [`TagSearch::search`]; unset or empty fields do not
/// filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchFilters {
    /// Language code; tags in `*` always pass
    pub language: Option<String>,
    /// Case-insensitive substring of the title or the path
    pub like: Option<String>,
    /// Exact title
    pub title: Option<String>,
    pub published: Option<PublishState>,
    /// Only this tag and its descendants
    pub parent_id: Option<TagId>,
}

fn non_empty(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().filter(|s| !s.is_empty())
}

/// One selectable tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagOption {
    pub value: TagId,
    /// Path with every alias replaced by its tag's title
    pub text: String,
    pub path: String,
}

pub struct TagSearch<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TagSearch<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        TagSearch { store }
    }

    /// Tags matching `filters`, root excluded, in tree order
    pub fn search(&self, filters: &SearchFilters) -> Result<Vec<TagOption>> {
        let subtree: Option<BTreeSet<TagId>> = match filters.parent_id {
            Some(parent) => Some(descendants(self.store, parent)?.into_iter().collect()),
            None => None,
        };
        let language = non_empty(&filters.language);
        let title = non_empty(&filters.title);
        let like = non_empty(&filters.like).map(str::to_lowercase);

        let mut tags: Vec<Tag> = self
            .store
            .all_tags()?
            .into_iter()
            .filter(|t| !t.is_root())
            .filter(|t| {
                language.map_or(true, |code| language_matches(code, &t.language))
            })
            .filter(|t| {
                like.as_deref().map_or(true, |needle| {
                    t.title.to_lowercase().contains(needle) || t.path.to_lowercase().contains(needle)
                })
            })
            .filter(|t| title.map_or(true, |title| t.title == title))
            .filter(|t| filters.published.map_or(true, |state| t.published == state))
            .filter(|t| subtree.as_ref().map_or(true, |ids| ids.contains(&t.id)))
            .collect();
        tags.sort_by_key(|t| t.lft);

        let options = tags
            .into_iter()
            .map(|t| TagOption {
                value: t.id,
                text: t.path.clone(),
                path: t.path,
            })
            .collect();
        self.convert_paths_to_names(options)
    }

    /// Replace each alias in the options' paths with the matching tag title.
    ///
    /// Aliases with no tag are kept as they are.
    pub fn convert_paths_to_names(&self, mut options: Vec<TagOption>) -> Result<Vec<TagOption>> {
        let aliases: BTreeSet<&str> = options
            .iter()
            .flat_map(|o| o.path.split('/'))
            .filter(|a| !a.is_empty())
            .collect();
        if aliases.is_empty() {
            return Ok(options);
        }

        let titles: HashMap<String, String> = self
            .store
            .all_tags()?
            .into_iter()
            .filter(|t| aliases.contains(t.alias.as_str()))
            .map(|t| (t.alias, t.title))
            .collect();

        for option in &mut options {
            if option.path.is_empty() {
                continue;
            }
            option.text = option
                .path
                .split('/')
                .map(|alias| titles.get(alias).map_or(alias, String::as_str))
                .collect::<Vec<_>>()
                .join("/");
        }
        Ok(options)
    }
}
