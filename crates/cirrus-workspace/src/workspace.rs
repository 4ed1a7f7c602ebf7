//! Mutable registry of open source trees.

use cirrus_ast::FileUri;
use cirrus_parser::SourceTree;
use indexmap::IndexMap;
use std::sync::Arc;

/// URI → source tree map.
///
/// Cloning is cheap (it clones `Arc`s), which is how a compile takes a
/// consistent snapshot without holding any lock.
#[derive(Debug, Clone, Default)]
pub struct Workspace {
    trees: IndexMap<FileUri, Arc<SourceTree>>,
}

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a tree; returns the previous tree for that URI.
    pub fn upsert(&mut self, tree: Arc<SourceTree>) -> Option<Arc<SourceTree>> {
        self.trees.insert(tree.uri().clone(), tree)
    }

    /// Parse `text` and insert it.
    pub fn upsert_text(&mut self, uri: FileUri, text: impl Into<String>) -> Arc<SourceTree> {
        let tree = Arc::new(SourceTree::parse(uri, text));
        self.upsert(tree.clone());
        tree
    }

    pub fn remove(&mut self, uri: &FileUri) -> Option<Arc<SourceTree>> {
        self.trees.shift_remove(uri)
    }

    pub fn get(&self, uri: &FileUri) -> Option<&Arc<SourceTree>> {
        self.trees.get(uri)
    }

    pub fn contains(&self, uri: &FileUri) -> bool {
        self.trees.contains_key(uri)
    }

    /// URIs in insertion order.
    pub fn uris(&self) -> impl Iterator<Item = &FileUri> {
        self.trees.keys()
    }

    pub fn len(&self) -> usize {
        self.trees.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uri(path: &str) -> FileUri {
        FileUri::parse(&format!("inmemory:///{path}")).unwrap()
    }

    #[test]
    fn test_upsert_replaces_tree() {
        let mut workspace = Workspace::new();
        let first = workspace.upsert_text(uri("a.cirrus"), "var a = 1");
        let second = workspace.upsert_text(uri("a.cirrus"), "var a = 2");
        assert_eq!(workspace.len(), 1);
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(workspace.get(&uri("a.cirrus")).unwrap(), &second));
    }

    #[test]
    fn test_remove() {
        let mut workspace = Workspace::new();
        workspace.upsert_text(uri("a.cirrus"), "");
        workspace.upsert_text(uri("b.cirrus"), "");
        assert!(workspace.remove(&uri("a.cirrus")).is_some());
        assert!(workspace.remove(&uri("a.cirrus")).is_none());
        assert_eq!(workspace.uris().collect::<Vec<_>>(), vec![&uri("b.cirrus")]);
    }

    #[test]
    fn test_clone_is_a_snapshot() {
        let mut workspace = Workspace::new();
        workspace.upsert_text(uri("a.cirrus"), "var a = 1");
        let snapshot = workspace.clone();
        workspace.upsert_text(uri("a.cirrus"), "var a = 2");
        assert_eq!(snapshot.get(&uri("a.cirrus")).unwrap().text(), "var a = 1");
    }
}
