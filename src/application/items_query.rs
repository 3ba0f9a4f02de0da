//! Items-for-tags query construction

use crate::application::tag_tree::descendants;
use crate::application::type_registry::{TypeFilter, TypeRegistry};
use crate::domain::query::{
    Having, ItemsQuery, OrderKey, Predicate, SortDirection, TaggedItem,
};
use crate::domain::tag::{LanguageFilter, PublishState, TagId, ALL_LANGUAGES};
use crate::error::Result;
use crate::infrastructure::context::RequestContext;
use crate::infrastructure::store::TagStore;
use log::debug;
use std::collections::BTreeSet;

/// Parameters of an items-for-tags listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsForTagsRequest {
    pub tag_ids: Vec<TagId>,
    pub type_filter: Option<TypeFilter>,
    /// Match each tag's whole subtree instead of the tag alone
    pub include_children: bool,
    pub order: OrderKey,
    pub direction: SortDirection,
    /// ANY-match when true, ALL-match when false
    pub match_any: bool,
    pub language: LanguageFilter,
    pub states: Vec<PublishState>,
}

impl ItemsForTagsRequest {
    pub fn new<I>(tag_ids: I) -> Self
    where
        I: IntoIterator<Item = TagId>,
    {
        ItemsForTagsRequest {
            tag_ids: tag_ids.into_iter().collect(),
            type_filter: None,
            include_children: false,
            order: OrderKey::default(),
            direction: SortDirection::Asc,
            match_any: true,
            language: LanguageFilter::All,
            states: vec![PublishState::Unpublished, PublishState::Published],
        }
    }

    pub fn types(mut self, filter: TypeFilter) -> Self {
        self.type_filter = Some(filter);
        self
    }

    pub fn include_children(mut self) -> Self {
        self.include_children = true;
        self
    }

    pub fn match_all(mut self) -> Self {
        self.match_any = false;
        self
    }

    pub fn order_by(mut self, order: OrderKey, direction: SortDirection) -> Self {
        self.order = order;
        self.direction = direction;
        self
    }

    pub fn language(mut self, language: LanguageFilter) -> Self {
        self.language = language;
        self
    }

    pub fn states<I>(mut self, states: I) -> Self
    where
        I: IntoIterator<Item = PublishState>,
    {
        self.states = states.into_iter().collect();
        self
    }
}

/// Builds [`ItemsQuery`] descriptions from listing requests
pub struct TagQueryBuilder<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TagQueryBuilder<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        TagQueryBuilder { store }
    }

    /// Compose the query for `request` as seen by the actor in `ctx`.
    ///
    /// Unknown tag ids and type filters that match no registered type yield
    /// a query that matches nothing rather than an error.
    pub fn build(&self, ctx: &dyn RequestContext, request: &ItemsForTagsRequest) -> Result<ItemsQuery> {
        let mut seen = BTreeSet::new();
        let requested: Vec<TagId> = request
            .tag_ids
            .iter()
            .copied()
            .filter(|id| seen.insert(*id))
            .collect();

        let tag_ids = if request.include_children {
            let mut expanded = Vec::new();
            let mut seen = BTreeSet::new();
            for &id in &requested {
                for descendant in descendants(self.store, id)? {
                    if seen.insert(descendant) {
                        expanded.push(descendant);
                    }
                }
            }
            debug!("Expanded tags {:?} to {:?}", requested, expanded);
            if expanded.is_empty() {
                requested.clone()
            } else {
                expanded
            }
        } else {
            requested.clone()
        };

        let mut predicates = vec![
            Predicate::TagIdIn(tag_ids),
            Predicate::StateIn(request.states.clone()),
        ];

        if let Some(code) = request.language.resolve(|| ctx.current_language_code()) {
            let mut codes = vec![code];
            if codes[0] != ALL_LANGUAGES {
                codes.push(ALL_LANGUAGES.to_string());
            }
            predicates.push(Predicate::LanguageIn(codes));
        }

        let aliases = TypeRegistry::new(self.store)
            .list_types(request.type_filter.as_ref())?
            .into_iter()
            .map(|t| t.type_alias)
            .collect();
        predicates.push(Predicate::TypeAliasIn(aliases));

        predicates.push(Predicate::AccessIn(
            ctx.authorized_view_levels().into_iter().collect(),
        ));

        let having = if !request.match_any && !request.include_children && requested.len() > 1 {
            debug!("Requiring all {} requested tags", requested.len());
            Some(Having::MatchCountEquals(requested.len()))
        } else {
            if !request.match_any {
                debug!("ALL-match not applied to {:?}", requested);
            }
            None
        };

        Ok(ItemsQuery {
            predicates,
            having,
            order: request.order,
            direction: request.direction,
        })
    }

    /// Build the query and run it against the store
    pub fn items_for_tags(
        &self,
        ctx: &dyn RequestContext,
        request: &ItemsForTagsRequest,
    ) -> Result<Vec<TaggedItem>> {
        let query = self.build(ctx, request)?;
        self.store.execute_items_query(&query)
    }
}
