//! Markup Document - Arena-based tree representation
//!
//! Efficient tree storage with:
//! - Arena allocation for nodes
//! - NodeId indices for traversal
//! - Parent and sibling links, so detaching a node is O(1)
//!
//! Nodes are never freed individually: a detached node simply stops being
//! reachable from the root. The whole arena is dropped with the document.

use super::node::{Element, Node, NodeId, NodeKind};

/// A parsed document stored in arena format
#[derive(Debug, Clone)]
pub struct Document {
    /// Arena of nodes; index 0 is the document root
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document holding only the root node
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(256);
        nodes.push(Node::new(NodeKind::Document));
        Document { nodes }
    }

    /// Root node ID
    #[inline]
    pub fn root(&self) -> NodeId {
        0
    }

    /// Get node count (including detached nodes)
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// Get a node by ID
    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id as usize]
    }

    /// Get a node mutably by ID
    #[inline]
    pub fn get_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id as usize]
    }

    /// Element payload of a node, if it is an element
    #[inline]
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        self.get(id).as_element()
    }

    #[inline]
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        self.get_mut(id).as_element_mut()
    }

    /// Element name of a node, if it is an element
    #[inline]
    pub fn element_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|e| e.name.as_str())
    }

    /// Allocate a detached node
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(Node::new(kind));
        id
    }

    /// Allocate a node and append it as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.link_child(parent, id);
        id
    }

    /// Link a detached node as the last child of `parent`
    pub fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let prev_last = self.get(parent).last_child;
        {
            let node = self.get_mut(child);
            node.parent = Some(parent);
            node.prev_sibling = prev_last;
            node.next_sibling = None;
        }
        if let Some(prev) = prev_last {
            self.get_mut(prev).next_sibling = Some(child);
        } else {
            self.get_mut(parent).first_child = Some(child);
        }
        self.get_mut(parent).last_child = Some(child);
    }

    /// Unlink a node (and its subtree) from its parent
    pub fn detach(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.get(id);
            (node.parent, node.prev_sibling, node.next_sibling)
        };
        match prev {
            Some(p) => self.get_mut(p).next_sibling = next,
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).first_child = next;
                }
            }
        }
        match next {
            Some(n) => self.get_mut(n).prev_sibling = prev,
            None => {
                if let Some(parent) = parent {
                    self.get_mut(parent).last_child = prev;
                }
            }
        }
        let node = self.get_mut(id);
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Iterate over children of a node
    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter { doc: self, next: self.get(id).first_child }
    }

    /// Collect children IDs, for loops that mutate the tree
    pub fn children_vec(&self, id: NodeId) -> Vec<NodeId> {
        self.children(id).collect()
    }

    /// Iterate over descendants in document order (excluding `id` itself)
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut stack: Vec<NodeId> = self.children(id).collect();
        stack.reverse();
        DescendantIter { doc: self, stack }
    }

    /// Merge runs of adjacent text nodes under `parent` into the first of each run
    pub fn normalize_text(&mut self, parent: NodeId) {
        let mut current = self.get(parent).first_child;
        while let Some(id) = current {
            let next = self.get(id).next_sibling;
            if let (Some(next_id), true) = (next, self.get(id).is_text()) {
                if let Some(tail) = self.get(next_id).as_text().map(str::to_string) {
                    if let NodeKind::Text(text) = &mut self.get_mut(id).kind {
                        text.push_str(&tail);
                    }
                    self.detach(next_id);
                    // Stay on this node: the one after may be text too
                    continue;
                }
            }
            current = next;
        }
    }
}

/// Iterator over children of a node
pub struct ChildIter<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.doc.get(current).next_sibling;
        Some(current)
    }
}

/// Iterator over descendants of a node (pre-order)
pub struct DescendantIter<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.stack.pop()?;
        let mut children: Vec<NodeId> = self.doc.children(current).collect();
        children.reverse();
        self.stack.extend(children);
        Some(current)
    }
}
