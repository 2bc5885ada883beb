//! Arena-backed directory tree
//!
//! Nodes live in a slot vector addressed by [`NodeId`]. Each directory keeps
//! an insertion-ordered child list and each node records its parent, so
//! upward and downward navigation are both index lookups. The root is a
//! directory with no parent and can never be removed.

mod node;

pub use node::{DataOrigin, Node, NodeId, NodeKind};

/// The editable directory tree of one image
#[derive(Debug, Clone)]
pub struct Tree {
    nodes: Vec<Option<Node>>,
    root: NodeId,
}

impl Default for Tree {
    fn default() -> Self {
        Self::new()
    }
}

impl Tree {
    /// Create a tree holding only an empty root directory
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node::directory(""))],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    /// Check if `id` refers to a live node
    pub fn contains(&self, id: NodeId) -> bool {
        self.get(id).is_some()
    }

    /// Number of live nodes, root included
    pub fn len(&self) -> usize {
        self.nodes.iter().filter(|slot| slot.is_some()).count()
    }

    /// A tree always holds its root
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_directory(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(Node::is_directory)
    }

    /// Children of a directory, empty for files and stale ids
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.get(id).map(Node::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).and_then(Node::parent)
    }

    /// Find a child by name, ignoring case
    pub fn find_child(&self, dir: NodeId, name: &str) -> Option<NodeId> {
        let wanted = name.to_lowercase();
        self.children(dir)
            .iter()
            .copied()
            .find(|child| {
                self.get(*child)
                    .is_some_and(|node| node.name.to_lowercase() == wanted)
            })
    }

    /// Append `node` to the directory `parent`
    ///
    /// Returns `None` when `parent` is not a live directory. Name uniqueness
    /// is the caller's concern.
    pub(crate) fn insert(&mut self, parent: NodeId, node: Node) -> Option<NodeId> {
        let position = self.children(parent).len();
        self.insert_at(parent, position, node)
    }

    /// Insert `node` into `parent` at child position `position`
    pub(crate) fn insert_at(
        &mut self,
        parent: NodeId,
        position: usize,
        mut node: Node,
    ) -> Option<NodeId> {
        if !self.is_directory(parent) {
            return None;
        }

        let id = NodeId(self.nodes.len());
        node.parent = Some(parent);
        self.nodes.push(Some(node));

        if let Some(NodeKind::Directory { children }) = self.get_mut(parent).map(|p| &mut p.kind) {
            let position = position.min(children.len());
            children.insert(position, id);
        }

        Some(id)
    }

    /// Swap `existing` for `node`, keeping its position among its siblings
    pub(crate) fn replace(&mut self, existing: NodeId, node: Node) -> Option<NodeId> {
        let parent = self.parent(existing)?;
        let position = self.children(parent).iter().position(|c| *c == existing)?;
        self.remove(existing);
        self.insert_at(parent, position, node)
    }

    /// Detach `id` from its parent and destroy its subtree
    ///
    /// Returns `false` for the root, stale ids and parentless nodes.
    pub(crate) fn remove(&mut self, id: NodeId) -> bool {
        if id == self.root {
            return false;
        }
        let Some(parent) = self.parent(id) else {
            return false;
        };

        if let Some(NodeKind::Directory { children }) = self.get_mut(parent).map(|p| &mut p.kind) {
            children.retain(|child| *child != id);
        }

        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                pending.extend_from_slice(node.children());
            }
        }

        true
    }

    /// Absolute path of a node inside the image, e.g. `/DOCS/README.TXT`
    pub fn path_of(&self, id: NodeId) -> Option<String> {
        let mut parts = Vec::new();
        let mut current = id;
        loop {
            let node = self.get(current)?;
            match node.parent {
                Some(parent) => {
                    parts.push(node.name.as_str());
                    current = parent;
                }
                None => break,
            }
        }

        if parts.is_empty() {
            return Some("/".to_string());
        }
        parts.reverse();
        Some(format!("/{}", parts.join("/")))
    }

    /// Look up a node by absolute path, ignoring case
    pub fn resolve_path(&self, path: &str) -> Option<NodeId> {
        path.split('/')
            .filter(|part| !part.is_empty())
            .try_fold(self.root, |dir, part| self.find_child(dir, part))
    }

    /// All nodes below `id` in pre-order, `id` itself excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut result = Vec::new();
        let mut pending: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = pending.pop() {
            result.push(current);
            pending.extend(self.children(current).iter().rev());
        }
        result
    }

    /// Total payload size of all file nodes
    pub fn total_size(&self) -> u64 {
        self.nodes
            .iter()
            .flatten()
            .filter(|node| node.is_file())
            .map(|node| node.size)
            .sum()
    }
}
