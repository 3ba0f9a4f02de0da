//! Tag records, tag tokens and language filters

use crate::error::{Result, TagmapError};
use chrono::Utc;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

/// Primary key of a tag
pub type TagId = u64;

/// Access-level (view level) id
pub type AccessLevel = u32;

/// Language code matching every language
pub const ALL_LANGUAGES: &str = "*";

/// Marker a client puts in front of free text to request a new tag
pub const NEW_TAG_MARKER: &str = "#new#";

/// The public view level
pub const PUBLIC_ACCESS: AccessLevel = 1;

/// Runs of characters that cannot appear in an alias
fn alias_separator_regex() -> &'static Regex {
    static REGEX: OnceLock<Regex> = OnceLock::new();
    REGEX.get_or_init(|| Regex::new(r"[^\p{L}\p{N}]+").unwrap())
}

/// Publication state shared by tags and generic content records
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PublishState {
    Trashed,
    Unpublished,
    #[default]
    Published,
    Archived,
}

impl PublishState {
    /// Numeric state code as stored in state columns
    pub fn code(self) -> i32 {
        match self {
            PublishState::Trashed => -2,
            PublishState::Unpublished => 0,
            PublishState::Published => 1,
            PublishState::Archived => 2,
        }
    }

    /// Inverse of [`PublishState::code`]
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            -2 => Some(PublishState::Trashed),
            0 => Some(PublishState::Unpublished),
            1 => Some(PublishState::Published),
            2 => Some(PublishState::Archived),
            _ => None,
        }
    }
}

/// A node of the tag hierarchy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub title: String,
    pub alias: String,
    /// 0 for the root
    pub parent_id: TagId,
    pub lft: u64,
    pub rgt: u64,
    pub level: u32,
    /// Slash-joined ancestor aliases, root excluded
    pub path: String,
    pub published: PublishState,
    pub access: AccessLevel,
    pub language: String,
}

impl Tag {
    /// Build an unsaved tag with an alias derived from its title.
    ///
    /// Structural fields are placeholders until the tag is placed in a tree.
    pub fn draft(title: &str, access: AccessLevel, language: &str) -> Self {
        Tag {
            id: 0,
            title: title.to_string(),
            alias: alias_from_title(title),
            parent_id: 0,
            lft: 0,
            rgt: 0,
            level: 0,
            path: String::new(),
            published: PublishState::Published,
            access,
            language: language.to_string(),
        }
    }

    /// Build the root tag
    pub fn root(id: TagId, alias: &str) -> Self {
        Tag {
            id,
            title: "ROOT".to_string(),
            alias: alias.to_string(),
            parent_id: 0,
            lft: 0,
            rgt: 1,
            level: 0,
            path: String::new(),
            published: PublishState::Published,
            access: PUBLIC_ACCESS,
            language: ALL_LANGUAGES.to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_id == 0
    }

    pub fn is_leaf(&self) -> bool {
        self.rgt == self.lft + 1
    }

    /// True if `other` lies strictly inside this tag's boundaries
    pub fn contains(&self, other: &Tag) -> bool {
        self.lft < other.lft && other.rgt < self.rgt
    }
}

/// Derive a URL-safe alias from a title.
///
/// Lowercases, collapses every run of non-alphanumeric characters to a
/// single dash and trims dashes. Falls back to a timestamp when nothing
/// usable is left.
pub fn alias_from_title(title: &str) -> String {
    let lowered = title.trim().to_lowercase();
    let alias = alias_separator_regex()
        .replace_all(&lowered, "-")
        .trim_matches('-')
        .to_string();

    if alias.is_empty() {
        Utc::now().format("%Y-%m-%d-%H-%M-%S").to_string()
    } else {
        alias
    }
}

/// Remove every `#new#` marker from a raw token
pub fn strip_new_marker(raw: &str) -> String {
    raw.replace(NEW_TAG_MARKER, "")
}

/// One entry of a requested tag set: an existing id or free text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TagToken {
    Id(TagId),
    Text(String),
}

impl TagToken {
    /// Classify a raw token. Purely numeric tokens are ids; anything else is
    /// tag text with `#new#` markers stripped.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        match trimmed.parse::<TagId>() {
            Ok(id) => TagToken::Id(id),
            Err(_) => TagToken::Text(strip_new_marker(trimmed).trim().to_string()),
        }
    }

    /// The title a text token resolves to
    pub fn title(&self) -> Result<&str> {
        match self {
            TagToken::Text(text) if !text.is_empty() => Ok(text),
            TagToken::Text(_) => Err(TagmapError::Validation(
                "Empty tag text".to_string(),
            )),
            TagToken::Id(id) => Err(TagmapError::Validation(format!(
                "Token {} is a tag id, not tag text",
                id
            ))),
        }
    }
}

impl From<TagId> for TagToken {
    fn from(id: TagId) -> Self {
        TagToken::Id(id)
    }
}

impl From<&str> for TagToken {
    fn from(raw: &str) -> Self {
        TagToken::parse(raw)
    }
}

impl fmt::Display for TagToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagToken::Id(id) => write!(f, "{}", id),
            TagToken::Text(text) => write!(f, "{}", text),
        }
    }
}

/// Language restriction for tag and item listings
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum LanguageFilter {
    /// No restriction
    #[default]
    All,
    /// The caller's current language plus `*`
    Current,
    /// An explicit language code plus `*`
    Code(String),
}

impl LanguageFilter {
    /// Resolve to a concrete code, or `None` when nothing is filtered
    pub fn resolve<F>(&self, current_language: F) -> Option<String>
    where
        F: FnOnce() -> String,
    {
        match self {
            LanguageFilter::All => None,
            LanguageFilter::Current => Some(current_language()),
            LanguageFilter::Code(code) => Some(code.clone()),
        }
    }
}

/// Does `language` pass a resolved filter `code`? `*` always passes.
pub fn language_matches(code: &str, language: &str) -> bool {
    language == code || language == ALL_LANGUAGES
}

impl FromStr for LanguageFilter {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" | "all" => LanguageFilter::All,
            "current" | "current_language" => LanguageFilter::Current,
            code => LanguageFilter::Code(code.to_string()),
        })
    }
}

impl From<String> for LanguageFilter {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(filter) => filter,
            Err(never) => match never {},
        }
    }
}

impl From<LanguageFilter> for String {
    fn from(filter: LanguageFilter) -> Self {
        filter.to_string()
    }
}

impl fmt::Display for LanguageFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageFilter::All => write!(f, "all"),
            LanguageFilter::Current => write!(f, "current"),
            LanguageFilter::Code(code) => write!(f, "{}", code),
        }
    }
}
