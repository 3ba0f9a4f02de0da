//! tagmap - Polymorphic tag mapping over a nested-set tag tree
//!
//! Associates items of any registered content type with a shared hierarchy
//! of tags, and builds the aggregated "items for these tags" queries that
//! list them with ANY/ALL matching, descendant expansion and access control.

pub mod application;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use error::{Result, TagmapError};
