//! Abstract "items for tags" query description
//!
//! [`ItemsQuery`] is what the query builder produces and what a store
//! executes: a predicate list over the joined mapping/content/type rows, the
//! fixed grouping by item, an optional ALL-match HAVING clause, and an
//! ordering. Column names come from closed enumerations, so rendering to SQL
//! never interpolates caller-supplied identifiers.

use crate::domain::content_type::{content_item_url, ContentItemId};
use crate::domain::mapping::{ContentRecord, CoreContentId, TagMapping, UserId};
use crate::domain::tag::{AccessLevel, PublishState, TagId};
use crate::error::{Result, TagmapError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

pub const TAG_MAP_TABLE: &str = "contentitem_tag_map";
pub const CONTENT_TABLE: &str = "ucm_content";
pub const TYPES_TABLE: &str = "content_types";
pub const USERS_TABLE: &str = "users";

/// Columns the result rows are grouped by
pub const GROUP_BY: [&str; 3] = ["m.type_alias", "m.content_item_id", "m.core_content_id"];

const SELECT_LIST: &[&str] = &[
    "m.type_alias",
    "m.content_item_id",
    "m.core_content_id",
    "COUNT(m.tag_id) AS match_count",
    "MAX(m.tag_date) AS tag_date",
    "MAX(c.core_title) AS core_title",
    "MAX(c.core_alias) AS core_alias",
    "MAX(c.core_body) AS core_body",
    "MAX(c.core_state) AS core_state",
    "MAX(c.core_access) AS core_access",
    "MAX(c.core_metadata) AS core_metadata",
    "MAX(c.core_created_user_id) AS core_created_user_id",
    "MAX(c.core_created_by_alias) AS core_created_by_alias",
    "MAX(c.core_created_time) AS core_created_time",
    "MAX(c.core_images) AS core_images",
    "CASE WHEN MAX(c.core_modified_time) IS NULL THEN MAX(c.core_created_time) \
     ELSE MAX(c.core_modified_time) END AS core_modified_time",
    "MAX(c.core_language) AS core_language",
    "MAX(c.core_catid) AS core_catid",
    "MAX(c.core_publish_up) AS core_publish_up",
    "MAX(c.core_publish_down) AS core_publish_down",
    "MAX(ct.type_title) AS content_type_title",
    "MAX(ct.router) AS router",
    "CASE WHEN MAX(c.core_created_by_alias) > ' ' THEN MAX(c.core_created_by_alias) \
     ELSE MAX(ua.name) END AS author",
    "MAX(ua.email) AS author_email",
];

/// Columns an item listing may be ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SortColumn {
    TagDate,
    CoreTitle,
    CoreAlias,
    CoreBody,
    CoreState,
    CoreAccess,
    CoreMetadata,
    CoreCreatedUserId,
    CoreCreatedByAlias,
    CoreCreatedTime,
    CoreModifiedTime,
    CoreImages,
    CoreLanguage,
    CoreCatid,
    CorePublishUp,
    CorePublishDown,
    ContentTypeTitle,
    Router,
}

impl SortColumn {
    /// Table-qualified column name
    pub fn qualified(self) -> &'static str {
        match self {
            SortColumn::TagDate => "m.tag_date",
            SortColumn::CoreTitle => "c.core_title",
            SortColumn::CoreAlias => "c.core_alias",
            SortColumn::CoreBody => "c.core_body",
            SortColumn::CoreState => "c.core_state",
            SortColumn::CoreAccess => "c.core_access",
            SortColumn::CoreMetadata => "c.core_metadata",
            SortColumn::CoreCreatedUserId => "c.core_created_user_id",
            SortColumn::CoreCreatedByAlias => "c.core_created_by_alias",
            SortColumn::CoreCreatedTime => "c.core_created_time",
            SortColumn::CoreModifiedTime => "c.core_modified_time",
            SortColumn::CoreImages => "c.core_images",
            SortColumn::CoreLanguage => "c.core_language",
            SortColumn::CoreCatid => "c.core_catid",
            SortColumn::CorePublishUp => "c.core_publish_up",
            SortColumn::CorePublishDown => "c.core_publish_down",
            SortColumn::ContentTypeTitle => "ct.type_title",
            SortColumn::Router => "ct.router",
        }
    }
}

/// What the result is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderKey {
    /// Number of requested tags the item matched
    MatchCount,
    /// `MAX(column)` over the grouped rows
    Max(SortColumn),
}

impl Default for OrderKey {
    fn default() -> Self {
        OrderKey::Max(SortColumn::CoreTitle)
    }
}

impl FromStr for OrderKey {
    type Err = TagmapError;

    /// Accepts bare or table-qualified names, e.g. `core_title`,
    /// `c.core_title`, `m.tag_date`, `match_count`.
    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim();
        let name = name
            .strip_prefix("c.")
            .or_else(|| name.strip_prefix("m."))
            .or_else(|| name.strip_prefix("ct."))
            .unwrap_or(name);

        let column = match name {
            "match_count" => return Ok(OrderKey::MatchCount),
            "tag_date" => SortColumn::TagDate,
            "core_title" => SortColumn::CoreTitle,
            "core_alias" => SortColumn::CoreAlias,
            "core_body" => SortColumn::CoreBody,
            "core_state" => SortColumn::CoreState,
            "core_access" => SortColumn::CoreAccess,
            "core_metadata" => SortColumn::CoreMetadata,
            "core_created_user_id" => SortColumn::CoreCreatedUserId,
            "core_created_by_alias" => SortColumn::CoreCreatedByAlias,
            "core_created_time" => SortColumn::CoreCreatedTime,
            "core_modified_time" => SortColumn::CoreModifiedTime,
            "core_images" => SortColumn::CoreImages,
            "core_language" => SortColumn::CoreLanguage,
            "core_catid" => SortColumn::CoreCatid,
            "core_publish_up" => SortColumn::CorePublishUp,
            "core_publish_down" => SortColumn::CorePublishDown,
            "type_title" | "content_type_title" => SortColumn::ContentTypeTitle,
            "router" => SortColumn::Router,
            _ => {
                return Err(TagmapError::Validation(format!(
                    "Unknown order column: '{}'",
                    s
                )))
            }
        };
        Ok(OrderKey::Max(column))
    }
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderKey::MatchCount => write!(f, "COUNT(m.tag_id)"),
            OrderKey::Max(column) => write!(f, "MAX({})", column.qualified()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl FromStr for SortDirection {
    type Err = TagmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "ASC" => Ok(SortDirection::Asc),
            "DESC" => Ok(SortDirection::Desc),
            _ => Err(TagmapError::Validation(format!(
                "Invalid order direction: '{}'",
                s
            ))),
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortDirection::Asc => write!(f, "ASC"),
            SortDirection::Desc => write!(f, "DESC"),
        }
    }
}

/// One WHERE restriction over the joined rows
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    TagIdIn(Vec<TagId>),
    StateIn(Vec<PublishState>),
    TypeAliasIn(Vec<String>),
    AccessIn(Vec<AccessLevel>),
    /// Content language is one of these codes
    LanguageIn(Vec<String>),
}

impl Predicate {
    /// Evaluate against one joined mapping/content pair
    pub fn admits(&self, mapping: &TagMapping, content: &ContentRecord) -> bool {
        match self {
            Predicate::TagIdIn(ids) => ids.contains(&mapping.tag_id),
            Predicate::StateIn(states) => states.contains(&content.state),
            Predicate::TypeAliasIn(aliases) => aliases.contains(&mapping.type_alias),
            Predicate::AccessIn(levels) => levels.contains(&content.access),
            Predicate::LanguageIn(codes) => codes.contains(&content.language),
        }
    }

    fn render(&self, params: &mut Vec<SqlParam>) -> String {
        let (column, values): (&str, Vec<SqlParam>) = match self {
            Predicate::TagIdIn(ids) => (
                "m.tag_id",
                ids.iter().map(|&id| SqlParam::Int(id as i64)).collect(),
            ),
            Predicate::StateIn(states) => (
                "c.core_state",
                states.iter().map(|s| SqlParam::Int(s.code() as i64)).collect(),
            ),
            Predicate::TypeAliasIn(aliases) => (
                "m.type_alias",
                aliases.iter().map(|a| SqlParam::Text(a.clone())).collect(),
            ),
            Predicate::AccessIn(levels) => (
                "c.core_access",
                levels.iter().map(|&l| SqlParam::Int(l as i64)).collect(),
            ),
            Predicate::LanguageIn(codes) => (
                "c.core_language",
                codes.iter().map(|c| SqlParam::Text(c.clone())).collect(),
            ),
        };

        if values.is_empty() {
            return "1 = 0".to_string();
        }
        let placeholders = vec!["?"; values.len()].join(", ");
        params.extend(values);
        format!("{} IN ({})", column, placeholders)
    }
}

/// Post-aggregation restriction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Having {
    /// ALL-match: the item matched exactly this many requested tags
    MatchCountEquals(usize),
}

/// Bound value of a rendered statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Int(i64),
    Text(String),
}

/// Parameterized SQL text plus its values in placeholder order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

/// The composed, not yet executed, "items for tags" query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemsQuery {
    pub predicates: Vec<Predicate>,
    pub having: Option<Having>,
    pub order: OrderKey,
    pub direction: SortDirection,
}

impl ItemsQuery {
    /// The tag ids the query matches against
    pub fn tag_ids(&self) -> &[TagId] {
        self.predicates
            .iter()
            .find_map(|p| match p {
                Predicate::TagIdIn(ids) => Some(ids.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Do all predicates admit this joined pair?
    pub fn admits(&self, mapping: &TagMapping, content: &ContentRecord) -> bool {
        self.predicates.iter().all(|p| p.admits(mapping, content))
    }

    /// Does a grouped row with `match_count` matches survive HAVING?
    pub fn keeps_group(&self, match_count: usize) -> bool {
        match self.having {
            Some(Having::MatchCountEquals(required)) => match_count == required,
            None => true,
        }
    }

    /// Render as parameterized SQL
    pub fn to_sql(&self) -> SqlStatement {
        let mut params = Vec::new();
        let mut sql = format!("SELECT {}", SELECT_LIST.join(", "));

        sql.push_str(&format!(" FROM {} AS m", TAG_MAP_TABLE));
        sql.push_str(&format!(
            " INNER JOIN {} AS c ON m.type_alias = c.core_type_alias \
             AND m.core_content_id = c.core_content_id",
            CONTENT_TABLE
        ));
        sql.push_str(&format!(
            " INNER JOIN {} AS ct ON ct.type_alias = m.type_alias",
            TYPES_TABLE
        ));
        sql.push_str(&format!(
            " LEFT JOIN {} AS ua ON ua.id = c.core_created_user_id",
            USERS_TABLE
        ));

        if !self.predicates.is_empty() {
            let clauses: Vec<String> = self
                .predicates
                .iter()
                .map(|p| p.render(&mut params))
                .collect();
            sql.push_str(&format!(" WHERE {}", clauses.join(" AND ")));
        }

        sql.push_str(&format!(" GROUP BY {}", GROUP_BY.join(", ")));

        if let Some(Having::MatchCountEquals(required)) = self.having {
            sql.push_str(" HAVING COUNT(m.tag_id) = ?");
            params.push(SqlParam::Int(required as i64));
        }

        sql.push_str(&format!(" ORDER BY {} {}", self.order, self.direction));

        SqlStatement { sql, params }
    }
}

/// Comparable value of a result row under an [`OrderKey`]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Null,
    Int(i64),
    Text(String),
    Time(DateTime<Utc>),
}

impl From<Option<DateTime<Utc>>> for SortValue {
    fn from(value: Option<DateTime<Utc>>) -> Self {
        value.map_or(SortValue::Null, SortValue::Time)
    }
}

/// One grouped result row: an item with its aggregated display columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedItem {
    pub type_alias: String,
    pub content_item_id: ContentItemId,
    pub core_content_id: CoreContentId,
    pub match_count: usize,
    pub tag_date: DateTime<Utc>,
    pub core_title: String,
    pub core_alias: String,
    pub core_body: String,
    pub core_state: PublishState,
    pub core_access: AccessLevel,
    pub core_metadata: String,
    pub core_created_user_id: Option<UserId>,
    pub core_created_by_alias: String,
    pub core_created_time: DateTime<Utc>,
    pub core_modified_time: DateTime<Utc>,
    pub core_images: String,
    pub core_language: String,
    pub core_catid: u64,
    pub core_publish_up: Option<DateTime<Utc>>,
    pub core_publish_down: Option<DateTime<Utc>>,
    pub content_type_title: String,
    pub router: String,
    pub author: Option<String>,
    pub author_email: Option<String>,
}

impl TaggedItem {
    pub fn sort_value(&self, key: OrderKey) -> SortValue {
        let column = match key {
            OrderKey::MatchCount => return SortValue::Int(self.match_count as i64),
            OrderKey::Max(column) => column,
        };
        match column {
            SortColumn::TagDate => SortValue::Time(self.tag_date),
            SortColumn::CoreTitle => SortValue::Text(self.core_title.clone()),
            SortColumn::CoreAlias => SortValue::Text(self.core_alias.clone()),
            SortColumn::CoreBody => SortValue::Text(self.core_body.clone()),
            SortColumn::CoreState => SortValue::Int(self.core_state.code() as i64),
            SortColumn::CoreAccess => SortValue::Int(self.core_access as i64),
            SortColumn::CoreMetadata => SortValue::Text(self.core_metadata.clone()),
            SortColumn::CoreCreatedUserId => self
                .core_created_user_id
                .map_or(SortValue::Null, |id| SortValue::Int(id as i64)),
            SortColumn::CoreCreatedByAlias => SortValue::Text(self.core_created_by_alias.clone()),
            SortColumn::CoreCreatedTime => SortValue::Time(self.core_created_time),
            SortColumn::CoreModifiedTime => SortValue::Time(self.core_modified_time),
            SortColumn::CoreImages => SortValue::Text(self.core_images.clone()),
            SortColumn::CoreLanguage => SortValue::Text(self.core_language.clone()),
            SortColumn::CoreCatid => SortValue::Int(self.core_catid as i64),
            SortColumn::CorePublishUp => self.core_publish_up.into(),
            SortColumn::CorePublishDown => self.core_publish_down.into(),
            SortColumn::ContentTypeTitle => SortValue::Text(self.content_type_title.clone()),
            SortColumn::Router => SortValue::Text(self.router.clone()),
        }
    }

    /// Route to this item
    pub fn url(&self) -> Result<String> {
        content_item_url(&self.type_alias, self.content_item_id)
    }
}
