//! Nested-set tag tree
//!
//! The tree is an explicit table of tags keyed by id. Each tag carries
//! `lft`/`rgt` boundaries such that every descendant of a node lies strictly
//! inside the node's range and sibling ranges never overlap. Containment and
//! descendant lookups are therefore range comparisons.
//!
//! Structural changes never patch boundaries field by field. They edit the
//! parent/child ordering and then renumber the whole tree in one depth-first
//! pass, returning the rows whose stored fields changed so the caller can
//! write them back inside a single transaction.

use crate::domain::tag::{Tag, TagId};
use crate::error::{Result, TagmapError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Where a tag goes relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Position {
    /// First child of the anchor
    FirstChild,
    /// Last child of the anchor
    #[default]
    LastChild,
    /// Sibling placed immediately before the anchor
    Before,
    /// Sibling placed immediately after the anchor
    After,
}

impl FromStr for Position {
    type Err = TagmapError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "first-child" => Ok(Position::FirstChild),
            "last-child" => Ok(Position::LastChild),
            "before" => Ok(Position::Before),
            "after" => Ok(Position::After),
            _ => Err(TagmapError::Validation(format!(
                "Invalid position: '{}'. Expected first-child, last-child, before or after",
                s
            ))),
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Position::FirstChild => "first-child",
            Position::LastChild => "last-child",
            Position::Before => "before",
            Position::After => "after",
        };
        write!(f, "{}", name)
    }
}

type ChildMap = BTreeMap<TagId, Vec<TagId>>;

/// In-memory nested-set tree of tags
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagTree {
    nodes: BTreeMap<TagId, Tag>,
    root_id: TagId,
}

impl TagTree {
    /// Build a tree from stored rows.
    ///
    /// Requires exactly one root, every parent to exist and every tag to be
    /// reachable from the root. Boundaries are taken as stored; call
    /// [`TagTree::check_invariants`] to verify them.
    pub fn from_tags<I>(tags: I) -> Result<Self>
    where
        I: IntoIterator<Item = Tag>,
    {
        let nodes: BTreeMap<TagId, Tag> = tags.into_iter().map(|t| (t.id, t)).collect();

        let roots: Vec<TagId> = nodes.values().filter(|t| t.is_root()).map(|t| t.id).collect();
        let root_id = match roots.as_slice() {
            [root] => *root,
            _ => {
                return Err(TagmapError::Validation(format!(
                    "Tag tree must have exactly one root, found {}",
                    roots.len()
                )))
            }
        };

        for tag in nodes.values() {
            if !tag.is_root() && !nodes.contains_key(&tag.parent_id) {
                return Err(TagmapError::Validation(format!(
                    "Tag {} references missing parent {}",
                    tag.id, tag.parent_id
                )));
            }
        }

        let tree = TagTree { nodes, root_id };
        let reachable = tree.count_reachable(&tree.children_map());
        if reachable != tree.nodes.len() {
            return Err(TagmapError::Validation(format!(
                "{} tag(s) are not reachable from the root",
                tree.nodes.len() - reachable
            )));
        }

        Ok(tree)
    }

    pub fn root_id(&self) -> TagId {
        self.root_id
    }

    pub fn get(&self, id: TagId) -> Option<&Tag> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: TagId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All tags ordered by `lft`
    pub fn tags(&self) -> Vec<&Tag> {
        let mut tags: Vec<&Tag> = self.nodes.values().collect();
        tags.sort_by_key(|t| (t.lft, t.id));
        tags
    }

    /// True iff the tag exists and no tag has it as parent
    pub fn is_leaf(&self, id: TagId) -> bool {
        self.contains(id) && self.nodes.values().all(|t| t.parent_id != id)
    }

    /// The tag's subtree, itself included, ordered by `lft`.
    ///
    /// Leaves short-circuit to `[id]`; unknown ids yield an empty list.
    pub fn descendants(&self, id: TagId) -> Vec<TagId> {
        let Some(node) = self.nodes.get(&id) else {
            return Vec::new();
        };
        if self.is_leaf(id) {
            return vec![id];
        }

        let mut subtree: Vec<&Tag> = self
            .nodes
            .values()
            .filter(|t| t.lft >= node.lft && t.lft <= node.rgt)
            .collect();
        subtree.sort_by_key(|t| t.lft);
        subtree.into_iter().map(|t| t.id).collect()
    }

    /// Ancestor ids from the root down to the direct parent
    pub fn ancestors(&self, id: TagId) -> Vec<TagId> {
        let mut chain = Vec::new();
        let mut current = self.nodes.get(&id);
        while let Some(tag) = current {
            if tag.is_root() {
                break;
            }
            chain.push(tag.parent_id);
            current = self.nodes.get(&tag.parent_id);
        }
        chain.reverse();
        chain
    }

    /// Add a new tag relative to `anchor`, returning every row to write
    pub fn insert(&mut self, tag: Tag, anchor: TagId, position: Position) -> Result<Vec<Tag>> {
        if tag.id == 0 || self.nodes.contains_key(&tag.id) {
            return Err(TagmapError::Validation(format!(
                "Cannot insert tag with id {}: id must be new and non-zero",
                tag.id
            )));
        }
        self.require(anchor)?;

        let id = tag.id;
        let mut children = self.children_map();
        let parent = self.place(&mut children, id, anchor, position)?;
        let mut tag = tag;
        tag.parent_id = parent;
        self.nodes.insert(id, tag);

        Ok(self.renumber(&children))
    }

    /// Move `id` and its subtree relative to `anchor`.
    ///
    /// Returns the rows whose stored fields changed.
    pub fn set_location(&mut self, id: TagId, anchor: TagId, position: Position) -> Result<Vec<Tag>> {
        self.require(id)?;
        self.require(anchor)?;

        if id == self.root_id {
            return Err(TagmapError::Validation("The root tag cannot be moved".to_string()));
        }
        if self.is_self_or_descendant(anchor, id) {
            return Err(TagmapError::Validation(format!(
                "Cannot move tag {} relative to {}: anchor is inside the moved subtree",
                id, anchor
            )));
        }

        let mut children = self.children_map();
        if let Some(siblings) = children.get_mut(&self.nodes[&id].parent_id) {
            siblings.retain(|&child| child != id);
        }
        let parent = self.place(&mut children, id, anchor, position)?;
        if let Some(tag) = self.nodes.get_mut(&id) {
            tag.parent_id = parent;
        }

        Ok(self.renumber(&children))
    }

    /// Remove a leaf tag and close the gap it leaves
    pub fn remove_leaf(&mut self, id: TagId) -> Result<Vec<Tag>> {
        self.require(id)?;
        if id == self.root_id {
            return Err(TagmapError::Validation("The root tag cannot be deleted".to_string()));
        }
        if !self.is_leaf(id) {
            return Err(TagmapError::Validation(format!(
                "Tag {} has children; move or delete them first",
                id
            )));
        }

        self.nodes.remove(&id);
        let children = self.children_map();
        Ok(self.renumber(&children))
    }

    /// Recompute every boundary, level and path from the parent pointers,
    /// keeping the current sibling order.
    pub fn rebuild(&mut self) -> Vec<Tag> {
        let children = self.children_map();
        self.renumber(&children)
    }

    /// Verify the nested-set invariant and the derived fields
    pub fn check_invariants(&self) -> Result<()> {
        let root = &self.nodes[&self.root_id];
        if root.lft != 0 {
            return Err(invariant(format!("root lft is {}, expected 0", root.lft)));
        }
        let expected_rgt = self.nodes.len() as u64 * 2 - 1;
        if root.rgt != expected_rgt {
            return Err(invariant(format!(
                "root rgt is {}, expected {}",
                root.rgt, expected_rgt
            )));
        }

        for tag in self.nodes.values() {
            if tag.lft >= tag.rgt {
                return Err(invariant(format!("tag {} has lft >= rgt", tag.id)));
            }
            if tag.is_root() {
                continue;
            }
            let parent = &self.nodes[&tag.parent_id];
            if !parent.contains(tag) {
                return Err(invariant(format!(
                    "tag {} is not inside its parent {}",
                    tag.id, parent.id
                )));
            }
            if tag.level != parent.level + 1 {
                return Err(invariant(format!("tag {} has level {}", tag.id, tag.level)));
            }
            let expected_path = if parent.is_root() {
                tag.alias.clone()
            } else {
                format!("{}/{}", parent.path, tag.alias)
            };
            if tag.path != expected_path {
                return Err(invariant(format!(
                    "tag {} has path '{}', expected '{}'",
                    tag.id, tag.path, expected_path
                )));
            }
        }

        for siblings in self.children_map().values() {
            for pair in siblings.windows(2) {
                let (a, b) = (&self.nodes[&pair[0]], &self.nodes[&pair[1]]);
                if a.rgt >= b.lft {
                    return Err(invariant(format!(
                        "siblings {} and {} overlap",
                        a.id, b.id
                    )));
                }
            }
        }

        Ok(())
    }

    fn require(&self, id: TagId) -> Result<()> {
        if self.nodes.contains_key(&id) {
            Ok(())
        } else {
            Err(TagmapError::NotFound(format!("Tag {}", id)))
        }
    }

    /// Walks parent pointers so it stays correct while boundaries are stale
    fn is_self_or_descendant(&self, candidate: TagId, of: TagId) -> bool {
        candidate == of || self.ancestors(candidate).contains(&of)
    }

    /// Children per parent, ordered by current `lft`
    fn children_map(&self) -> ChildMap {
        let mut children: ChildMap = BTreeMap::new();
        for tag in self.tags() {
            if !tag.is_root() {
                children.entry(tag.parent_id).or_default().push(tag.id);
            }
        }
        children
    }

    /// Insert `id` into the child lists, returning its new parent
    fn place(
        &self,
        children: &mut ChildMap,
        id: TagId,
        anchor: TagId,
        position: Position,
    ) -> Result<TagId> {
        match position {
            Position::FirstChild => {
                children.entry(anchor).or_default().insert(0, id);
                Ok(anchor)
            }
            Position::LastChild => {
                children.entry(anchor).or_default().push(id);
                Ok(anchor)
            }
            Position::Before | Position::After => {
                if anchor == self.root_id {
                    return Err(TagmapError::Validation(
                        "Cannot place a tag beside the root".to_string(),
                    ));
                }
                let parent = self.nodes[&anchor].parent_id;
                let siblings = children.entry(parent).or_default();
                let index = siblings
                    .iter()
                    .position(|&sibling| sibling == anchor)
                    .unwrap_or(siblings.len());
                let index = if position == Position::After {
                    index + 1
                } else {
                    index
                };
                siblings.insert(index.min(siblings.len()), id);
                Ok(parent)
            }
        }
    }

    fn count_reachable(&self, children: &ChildMap) -> usize {
        let mut seen = BTreeSet::new();
        let mut stack = vec![self.root_id];
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            if let Some(kids) = children.get(&id) {
                stack.extend(kids.iter().copied());
            }
        }
        seen.len()
    }

    fn renumber(&mut self, children: &ChildMap) -> Vec<Tag> {
        let before = self.nodes.clone();
        let mut counter = 0;
        self.number_subtree(self.root_id, 0, 0, "", children, &mut counter);

        let mut changed: Vec<Tag> = self
            .nodes
            .values()
            .filter(|tag| before.get(&tag.id) != Some(*tag))
            .cloned()
            .collect();
        changed.sort_by_key(|t| t.lft);
        changed
    }

    fn number_subtree(
        &mut self,
        id: TagId,
        parent_id: TagId,
        level: u32,
        parent_path: &str,
        children: &ChildMap,
        counter: &mut u64,
    ) {
        let alias = self.nodes[&id].alias.clone();
        let path = match level {
            0 => String::new(),
            _ if parent_path.is_empty() => alias,
            _ => format!("{}/{}", parent_path, alias),
        };

        let lft = *counter;
        *counter += 1;
        if let Some(kids) = children.get(&id) {
            for &child in kids {
                self.number_subtree(child, id, level + 1, &path, children, counter);
            }
        }
        let rgt = *counter;
        *counter += 1;

        if let Some(tag) = self.nodes.get_mut(&id) {
            tag.parent_id = if level == 0 { 0 } else { parent_id };
            tag.lft = lft;
            tag.rgt = rgt;
            tag.level = level;
            tag.path = path;
        }
    }
}

fn invariant(detail: String) -> TagmapError {
    TagmapError::Validation(format!("Nested-set invariant violated: {}", detail))
}
