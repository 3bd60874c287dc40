use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fs::path_key::{entry_key, normalize_path};

/// Type of filesystem node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeType {
    File,
    Directory,
}

/// Which entries show up in the tree.
#[derive(Debug, Clone)]
pub struct TreeFilter {
    /// Lowercase file extensions to list. Directories are always listed.
    /// Empty means every file.
    pub extensions: Vec<String>,
}

impl TreeFilter {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions.iter().map(|e| e.to_lowercase()).collect(),
        }
    }

    fn accepts(&self, node: &TreeNode) -> bool {
        if node.node_type == NodeType::Directory || self.extensions.is_empty() {
            return true;
        }
        node.path
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|e| *e == ext))
    }
}

impl Default for TreeFilter {
    fn default() -> Self {
        Self {
            extensions: vec!["md".into(), "markdown".into()],
        }
    }
}

/// A node in the document tree.
#[derive(Debug, Clone)]
pub struct TreeNode {
    pub name: String,
    pub path: PathBuf,
    pub node_type: NodeType,
    pub children: Option<Vec<TreeNode>>,
    pub is_expanded: bool,
    pub depth: usize,
    pub is_hidden: bool,
}

impl TreeNode {
    /// Create a node from a filesystem path. Symlinks are followed; a broken
    /// link is an error.
    pub fn new(path: &Path, depth: usize) -> Result<Self> {
        let metadata = fs::metadata(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string_lossy().to_string());

        let node_type = if metadata.is_dir() {
            NodeType::Directory
        } else {
            NodeType::File
        };
        let is_hidden = name.starts_with('.');

        Ok(Self {
            name,
            path: path.to_path_buf(),
            node_type,
            children: None,
            is_expanded: false,
            depth,
            is_hidden,
        })
    }

    /// Read this directory's entries into sorted children.
    ///
    /// Unreadable entries, broken symlinks and files rejected by `filter`
    /// are skipped. Entries that vanish mid-read simply do not appear.
    pub fn load_children(&mut self, filter: &TreeFilter) -> Result<()> {
        if self.node_type != NodeType::Directory {
            return Ok(());
        }

        let mut children = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let Ok(entry) = entry else {
                continue;
            };
            if let Ok(node) = TreeNode::new(&entry.path(), self.depth + 1) {
                if filter.accepts(&node) {
                    children.push(node);
                }
            }
        }
        sort_nodes(&mut children);
        self.children = Some(children);
        Ok(())
    }

    fn expand(&mut self, filter: &TreeFilter) {
        if self.node_type != NodeType::Directory || self.is_expanded {
            return;
        }
        if self.load_children(filter).is_err() {
            self.children = Some(Vec::new());
        }
        self.is_expanded = true;
    }
}

/// Directories first, then case-insensitive name.
fn sort_nodes(nodes: &mut [TreeNode]) {
    nodes.sort_by(|a, b| {
        (b.node_type == NodeType::Directory)
            .cmp(&(a.node_type == NodeType::Directory))
            .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
    });
}

/// A flattened representation of a tree node for rendering.
#[derive(Debug, Clone)]
pub struct FlatItem {
    pub name: String,
    pub path: PathBuf,
    pub node_type: NodeType,
    pub depth: usize,
    pub is_expanded: bool,
    pub is_last_sibling: bool,
    pub is_hidden: bool,
}

/// Live projection of the document tree under one root.
pub struct TreeState {
    pub root: TreeNode,
    pub flat_items: Vec<FlatItem>,
    pub selected_index: usize,
    pub scroll_offset: usize,
    pub show_hidden: bool,
    filter: TreeFilter,
}

impl TreeState {
    /// Materialize the tree for `path` with only the root expanded.
    pub fn new(path: &Path, filter: TreeFilter, show_hidden: bool) -> Result<Self> {
        let mut root = TreeNode::new(path, 0)?;
        if root.node_type == NodeType::Directory {
            root.load_children(&filter)?;
            root.is_expanded = true;
        }

        let mut state = Self {
            root,
            flat_items: Vec::new(),
            selected_index: 0,
            scroll_offset: 0,
            show_hidden,
            filter,
        };
        state.flatten();
        Ok(state)
    }

    /// Rebuild the flat items list from the tree, respecting `show_hidden`.
    ///
    /// The root node is always included regardless of hidden status.
    pub fn flatten(&mut self) {
        self.flat_items.clear();
        Self::flatten_node(&self.root, &mut self.flat_items, self.show_hidden, true, true);
        if !self.flat_items.is_empty() && self.selected_index >= self.flat_items.len() {
            self.selected_index = self.flat_items.len() - 1;
        }
    }

    fn flatten_node(
        node: &TreeNode,
        items: &mut Vec<FlatItem>,
        show_hidden: bool,
        is_last: bool,
        is_root: bool,
    ) {
        if !is_root && !show_hidden && node.is_hidden {
            return;
        }

        items.push(FlatItem {
            name: node.name.clone(),
            path: node.path.clone(),
            node_type: node.node_type,
            depth: node.depth,
            is_expanded: node.is_expanded,
            is_last_sibling: is_last,
            is_hidden: node.is_hidden,
        });

        if node.is_expanded {
            if let Some(children) = &node.children {
                let visible: Vec<&TreeNode> = children
                    .iter()
                    .filter(|c| show_hidden || !c.is_hidden)
                    .collect();
                for (i, child) in visible.iter().enumerate() {
                    Self::flatten_node(child, items, show_hidden, i == visible.len() - 1, false);
                }
            }
        }
    }

    /// The currently selected item.
    pub fn selected(&self) -> Option<&FlatItem> {
        self.flat_items.get(self.selected_index)
    }

    pub fn select_next(&mut self) {
        let len = self.flat_items.len();
        if len > 0 && self.selected_index < len - 1 {
            self.selected_index += 1;
        }
    }

    pub fn select_previous(&mut self) {
        self.selected_index = self.selected_index.saturating_sub(1);
    }

    pub fn select_first(&mut self) {
        self.selected_index = 0;
    }

    pub fn select_last(&mut self) {
        self.selected_index = self.flat_items.len().saturating_sub(1);
    }

    /// Expand the selected directory. Returns its path if it was newly
    /// expanded.
    pub fn expand_selected(&mut self) -> Option<PathBuf> {
        let selected = self.selected()?;
        if selected.node_type != NodeType::Directory || selected.is_expanded {
            return None;
        }
        let path = selected.path.clone();
        let filter = self.filter.clone();
        let node = Self::find_node_mut(&mut self.root, &path)?;
        node.expand(&filter);
        self.flatten();
        Some(path)
    }

    /// Collapse the selected directory, or jump to its parent.
    pub fn collapse_selected(&mut self) {
        let Some(selected) = self.selected() else {
            return;
        };
        let path = selected.path.clone();

        if selected.node_type == NodeType::Directory && selected.is_expanded && selected.depth > 0
        {
            if let Some(node) = Self::find_node_mut(&mut self.root, &path) {
                node.is_expanded = false;
                self.flatten();
            }
            return;
        }

        if let Some(parent) = path.parent() {
            if let Some(idx) = self.find_index_by_path(parent) {
                self.selected_index = idx;
            }
        }
    }

    /// Toggle visibility of hidden entries.
    pub fn toggle_hidden(&mut self) {
        self.show_hidden = !self.show_hidden;
        self.flatten();
    }

    fn find_node_mut<'a>(node: &'a mut TreeNode, target: &Path) -> Option<&'a mut TreeNode> {
        if node.path == target {
            return Some(node);
        }
        if !target.starts_with(&node.path) {
            return None;
        }
        node.children
            .as_mut()?
            .iter_mut()
            .find_map(|child| Self::find_node_mut(child, target))
    }

    /// Update the scroll offset so the selected item is visible.
    pub fn update_scroll(&mut self, visible_height: usize) {
        if visible_height == 0 {
            return;
        }
        if self.selected_index < self.scroll_offset {
            self.scroll_offset = self.selected_index;
        } else if self.selected_index >= self.scroll_offset + visible_height {
            self.scroll_offset = self.selected_index - visible_height + 1;
        }
    }

    /// Position of `path` in the flat list.
    pub fn find_index_by_path(&self, path: &Path) -> Option<usize> {
        self.flat_items.iter().position(|item| item.path == path)
    }

    /// Expand every ancestor of `path` below the root and select it.
    pub fn reveal(&mut self, path: &Path) -> bool {
        let Ok(relative) = path.strip_prefix(&self.root.path) else {
            return false;
        };
        let filter = self.filter.clone();
        let mut cursor = self.root.path.clone();
        let components: Vec<_> = relative.components().collect();
        for component in components.iter().take(components.len().saturating_sub(1)) {
            cursor.push(component);
            match Self::find_node_mut(&mut self.root, &cursor) {
                Some(node) => node.expand(&filter),
                None => return false,
            }
        }
        self.flatten();
        match self.find_index_by_path(path) {
            Some(idx) => {
                self.selected_index = idx;
                true
            }
            None => false,
        }
    }

    /// Entry keys of every expanded directory below the root, depth first,
    /// without duplicates. Descendants of a collapsed directory are
    /// never visited.
    pub fn collect_expanded(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut seen = HashSet::new();
        if let Some(children) = &self.root.children {
            for child in children {
                Self::collect_node(child, &mut out, &mut seen);
            }
        }
        out
    }

    fn collect_node(node: &TreeNode, out: &mut Vec<String>, seen: &mut HashSet<String>) {
        if node.node_type != NodeType::Directory || !node.is_expanded {
            return;
        }
        let key = entry_key(&node.path);
        if seen.insert(key.clone()) {
            out.push(key);
        }
        if let Some(children) = &node.children {
            for child in children {
                Self::collect_node(child, out, seen);
            }
        }
    }

    /// Expand every directory whose entry key is in `targets`, descending
    /// only into directories it expands. Paths that no longer exist are
    /// skipped, and so is any directory that resolves to one of its own
    /// ancestors. Returns the directories that ended up expanded.
    pub fn restore_expanded(&mut self, targets: &HashSet<String>) -> Vec<PathBuf> {
        let filter = self.filter.clone();
        let mut expanded = Vec::new();
        let mut ancestors = vec![normalize_path(&self.root.path)];
        if let Some(children) = self.root.children.as_mut() {
            for child in children.iter_mut() {
                Self::restore_node(child, targets, &filter, &mut ancestors, &mut expanded);
            }
        }
        self.flatten();
        expanded
    }

    fn restore_node(
        node: &mut TreeNode,
        targets: &HashSet<String>,
        filter: &TreeFilter,
        ancestors: &mut Vec<String>,
        expanded: &mut Vec<PathBuf>,
    ) {
        if node.node_type != NodeType::Directory || !targets.contains(&entry_key(&node.path)) {
            return;
        }
        let resolved = normalize_path(&node.path);
        if ancestors.contains(&resolved) {
            return;
        }
        node.expand(filter);
        expanded.push(node.path.clone());
        ancestors.push(resolved);
        if let Some(children) = node.children.as_mut() {
            for child in children.iter_mut() {
                Self::restore_node(child, targets, filter, ancestors, expanded);
            }
        }
        ancestors.pop();
    }

    /// Paths of every expanded directory, root included.
    pub fn expanded_dirs(&self) -> Vec<PathBuf> {
        let mut out = Vec::new();
        Self::expanded_dirs_of(&self.root, &mut out);
        out
    }

    fn expanded_dirs_of(node: &TreeNode, out: &mut Vec<PathBuf>) {
        if node.node_type != NodeType::Directory || !node.is_expanded {
            return;
        }
        out.push(node.path.clone());
        for child in node.children.iter().flatten() {
            Self::expanded_dirs_of(child, out);
        }
    }
}
