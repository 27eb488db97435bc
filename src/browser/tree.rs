use std::collections::BTreeMap;

use crate::browser::item::Item;
use crate::browser::path;
use crate::error::{BrowserError, Result};

/// A node in the lazily populated folder tree.
#[derive(Debug, Clone, Default)]
pub struct TreeNode {
    pub name: String,
    pub children: BTreeMap<String, TreeNode>,
    /// Children were fetched from the listing source at least once.
    pub has_opened: bool,
    /// The node is currently shown expanded.
    pub is_open: bool,
    /// Set when the node is a file leaf rather than a folder.
    pub file_data: Option<Item>,
    pub full_path: String,
    /// Bumped every time a merge refreshes this node.
    pub version: u64,
}

impl TreeNode {
    fn folder(name: &str, full_path: String) -> Self {
        Self {
            name: name.to_string(),
            full_path,
            ..Default::default()
        }
    }

    fn file(name: &str, full_path: String, item: Option<Item>) -> Self {
        Self {
            name: name.to_string(),
            full_path,
            has_opened: true,
            file_data: item,
            ..Default::default()
        }
    }

    pub fn is_file(&self) -> bool {
        self.file_data.is_some()
    }

    /// Whether a renderer should offer to expand or collapse this node.
    pub fn is_expandable(&self) -> bool {
        !self.is_file() && !(self.has_opened && self.children.is_empty())
    }

    /// Total number of nodes in this subtree, including this one.
    pub fn subtree_len(&self) -> usize {
        1 + self
            .children
            .values()
            .map(TreeNode::subtree_len)
            .sum::<usize>()
    }
}

/// A flattened tree row for rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatNode {
    pub label: String,
    pub full_path: String,
    pub depth: usize,
    pub is_open: bool,
    pub is_file: bool,
    pub is_expandable: bool,
    pub is_last_sibling: bool,
}

/// The persistent folder tree of one browser.
#[derive(Debug, Clone)]
pub struct BrowserTree {
    root: TreeNode,
    next_version: u64,
}

impl Default for BrowserTree {
    fn default() -> Self {
        Self::new()
    }
}

impl BrowserTree {
    /// Empty tree with an expanded root.
    pub fn new() -> Self {
        Self {
            root: TreeNode {
                is_open: true,
                ..Default::default()
            },
            next_version: 0,
        }
    }

    /// Empty tree whose root must be reopened, as after a forced refresh.
    pub fn closed() -> Self {
        Self {
            root: TreeNode::default(),
            next_version: 0,
        }
    }

    pub fn root(&self) -> &TreeNode {
        &self.root
    }

    fn bump(&mut self) -> u64 {
        self.next_version += 1;
        self.next_version
    }

    /// Incorporate `names` as the children of the node at `path`.
    ///
    /// Names containing a slash belong to deeper folders and are merged one
    /// level further down, so a recursive listing fills several levels at
    /// once. Existing children are reused by name, keeping their open state
    /// and subtrees; children not named are dropped. When `files` is given the
    /// names are file leaves and their payload is looked up by full path.
    pub fn merge_listing<S: AsRef<str>>(&mut self, path: &str, names: &[S], files: Option<&[Item]>) {
        let path = path::normalize(path);
        let (nested, direct): (Vec<&str>, Vec<&str>) = names
            .iter()
            .map(|n| path::normalize(n.as_ref()))
            .filter(|n| !n.is_empty())
            .partition(|n| n.contains('/'));

        if !nested.is_empty() {
            self.merge_listing(path, &direct, files);
            let mut groups: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
            for name in nested {
                if let Some((head, rest)) = name.split_once('/') {
                    groups.entry(head).or_default().push(rest);
                }
            }
            for (head, rest) in groups {
                self.merge_listing(&path::join(path, head), &rest, files);
            }
            return;
        }

        let version = self.bump();
        let mut node = &mut self.root;
        for part in path::segments(path) {
            let full = path::join(&node.full_path, part);
            node.file_data = None;
            node = node
                .children
                .entry(part.to_string())
                .or_insert_with(|| TreeNode::folder(part, full));
        }

        let previous = std::mem::take(&mut node.children);
        node.children = rebuild_children(previous, &node.full_path, &direct, files);
        node.has_opened = true;
        node.file_data = None;
        node.version = version;
    }

    /// Add file leaves for `items` below the folder at `path`, keeping the
    /// folders already there. Items outside `path` are ignored.
    pub fn attach_files(&mut self, path: &str, items: &[Item]) {
        let path = path::normalize(path);
        let version = self.bump();
        for item in items {
            let rel = path::relative_to(path, &item.name);
            if rel.is_empty() || (!path.is_empty() && rel == path::normalize(&item.name)) {
                continue;
            }
            let mut node = &mut self.root;
            for part in path::segments(path) {
                let full = path::join(&node.full_path, part);
                node = node
                    .children
                    .entry(part.to_string())
                    .or_insert_with(|| TreeNode::folder(part, full));
            }
            node.version = version;
            let mut parts: Vec<&str> = path::segments(rel).collect();
            let Some(leaf) = parts.pop() else {
                continue;
            };
            for part in parts {
                let full = path::join(&node.full_path, part);
                node.file_data = None;
                node = node
                    .children
                    .entry(part.to_string())
                    .or_insert_with(|| TreeNode::folder(part, full));
            }
            node.file_data = None;
            let full = path::join(&node.full_path, leaf);
            let entry = node
                .children
                .entry(leaf.to_string())
                .or_insert_with(|| TreeNode::file(leaf, full, None));
            if entry.children.is_empty() {
                entry.file_data = Some(item.clone());
                entry.has_opened = true;
            }
        }
    }

    /// Look up the node at `path`.
    pub fn folder_from_path(&self, path: &str) -> Result<&TreeNode> {
        let mut node = &self.root;
        for part in path::segments(path) {
            node = node
                .children
                .get(part)
                .ok_or_else(|| BrowserError::NotFound(path::normalize(path).to_string()))?;
        }
        Ok(node)
    }

    pub fn node_mut(&mut self, path: &str) -> Option<&mut TreeNode> {
        let mut node = &mut self.root;
        for part in path::segments(path) {
            node = node.children.get_mut(part)?;
        }
        Some(node)
    }

    /// Version of the node at `path`, if present.
    pub fn version_of(&self, path: &str) -> Option<u64> {
        self.folder_from_path(path).ok().map(|n| n.version)
    }

    /// Rows of the visible tree, descending only into open nodes.
    /// Folders are listed before files at each level.
    pub fn flatten(&self) -> Vec<FlatNode> {
        let mut rows = Vec::new();
        flatten_node(&self.root, 0, true, &mut rows);
        rows
    }
}

fn rebuild_children(
    mut previous: BTreeMap<String, TreeNode>,
    parent_path: &str,
    names: &[&str],
    files: Option<&[Item]>,
) -> BTreeMap<String, TreeNode> {
    let mut children = BTreeMap::new();
    for &name in names {
        let child = previous.remove(name).unwrap_or_else(|| {
            let full = path::join(parent_path, name);
            match files {
                Some(items) => {
                    let item = items.iter().find(|i| path::normalize(&i.name) == full).cloned();
                    TreeNode::file(name, full, item)
                }
                None => TreeNode::folder(name, full),
            }
        });
        children.insert(name.to_string(), child);
    }
    children
}

fn flatten_node(node: &TreeNode, depth: usize, is_last: bool, rows: &mut Vec<FlatNode>) {
    rows.push(FlatNode {
        label: if depth == 0 && node.name.is_empty() {
            path::ROOT_LABEL.to_string()
        } else {
            node.name.clone()
        },
        full_path: node.full_path.clone(),
        depth,
        is_open: node.is_open,
        is_file: node.is_file(),
        is_expandable: node.is_expandable(),
        is_last_sibling: is_last,
    });

    if !node.is_open {
        return;
    }
    let (folders, files): (Vec<&TreeNode>, Vec<&TreeNode>) =
        node.children.values().partition(|c| !c.is_file());
    let ordered: Vec<&TreeNode> = folders.into_iter().chain(files).collect();
    let count = ordered.len();
    for (i, child) in ordered.into_iter().enumerate() {
        flatten_node(child, depth + 1, i + 1 == count, rows);
    }
}
