//! Content type lookups

use crate::domain::content_type::{ContentType, TypeDescriptor, TypeId};
use crate::error::{Result, TagmapError};
use crate::infrastructure::store::TagStore;

/// Identifiers restricting [`TypeRegistry::list_types`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    Aliases(Vec<String>),
    Ids(Vec<TypeId>),
}

impl TypeFilter {
    /// Interpret raw identifiers as aliases or as numeric ids.
    ///
    /// Fails with `Validation` when `use_alias` is false and an identifier
    /// is not a number.
    pub fn from_identifiers(identifiers: &[&str], use_alias: bool) -> Result<Self> {
        if use_alias {
            return Ok(TypeFilter::Aliases(
                identifiers.iter().map(|s| s.trim().to_string()).collect(),
            ));
        }

        let ids = identifiers
            .iter()
            .map(|raw| {
                raw.trim().parse::<TypeId>().map_err(|_| {
                    TagmapError::Validation(format!("Invalid content type id: '{}'", raw))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TypeFilter::Ids(ids))
    }

    fn is_empty(&self) -> bool {
        match self {
            TypeFilter::Aliases(aliases) => aliases.is_empty(),
            TypeFilter::Ids(ids) => ids.is_empty(),
        }
    }

    fn matches(&self, content_type: &ContentType) -> bool {
        match self {
            TypeFilter::Aliases(aliases) => aliases.contains(&content_type.type_alias),
            TypeFilter::Ids(ids) => ids.contains(&content_type.type_id),
        }
    }
}

/// Registry of taggable content types
pub struct TypeRegistry<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> TypeRegistry<'a, S>
where
    S: TagStore + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        TypeRegistry { store }
    }

    /// Exact alias lookup; an unregistered alias is `NotFound`
    pub fn resolve(&self, type_alias: &str) -> Result<TypeDescriptor> {
        self.store
            .content_types()?
            .iter()
            .find(|t| t.type_alias == type_alias)
            .map(TypeDescriptor::from)
            .ok_or_else(|| TagmapError::NotFound(format!("Content type '{}'", type_alias)))
    }

    pub fn table_name(&self, type_alias: &str) -> Result<String> {
        Ok(self.resolve(type_alias)?.table)
    }

    pub fn type_id(&self, type_alias: &str) -> Result<TypeId> {
        Ok(self.resolve(type_alias)?.type_id)
    }

    /// All registered types, or those matching `filter`.
    ///
    /// An absent or empty filter lists everything.
    pub fn list_types(&self, filter: Option<&TypeFilter>) -> Result<Vec<ContentType>> {
        let types = self.store.content_types()?;
        Ok(match filter {
            Some(filter) if !filter.is_empty() => {
                types.into_iter().filter(|t| filter.matches(t)).collect()
            }
            _ => types,
        })
    }
}
