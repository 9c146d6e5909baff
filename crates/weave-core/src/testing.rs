#![forbid(unsafe_code)]

//! In-memory host tree for tests.
//!
//! [`MemNode`] is a reference-counted node with a label and an ordered child
//! list. Every node is also a [`View`] over its own children, so a test can
//! use an element directly as the parent view of a boundary.
//!
//! Sibling lookups are linear in the parent's child count; this tree favours
//! being obviously correct over speed.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use crate::host::{HostNode, View, ViewError, ViewResult};

thread_local! {
    static NEXT_NODE_ID: Cell<u64> = const { Cell::new(1) };
}

struct NodeData {
    id: u64,
    label: String,
    parent: RefCell<Weak<NodeData>>,
    children: RefCell<Vec<MemNode>>,
}

/// A node in the in-memory host tree.
#[derive(Clone)]
pub struct MemNode {
    data: Rc<NodeData>,
}

impl MemNode {
    fn new(label: impl Into<String>) -> Self {
        let id = NEXT_NODE_ID.with(|next| {
            let id = next.get();
            next.set(id + 1);
            id
        });
        Self {
            data: Rc::new(NodeData {
                id,
                label: label.into(),
                parent: RefCell::new(Weak::new()),
                children: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Create a detached element node.
    #[must_use]
    pub fn element(label: impl Into<String>) -> Self {
        Self::new(label)
    }

    /// Create a detached leaf node.
    #[must_use]
    pub fn text(label: impl Into<String>) -> Self {
        Self::new(label)
    }

    /// Unique node id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.data.id
    }

    /// Node label.
    #[must_use]
    pub fn label(&self) -> String {
        self.data.label.clone()
    }

    /// Current parent, if attached.
    #[must_use]
    pub fn parent(&self) -> Option<MemNode> {
        self.data
            .parent
            .borrow()
            .upgrade()
            .map(|data| MemNode { data })
    }

    /// Snapshot of the child list.
    #[must_use]
    pub fn children(&self) -> Vec<MemNode> {
        self.data.children.borrow().clone()
    }

    /// Labels of the direct children, in order.
    #[must_use]
    pub fn child_labels(&self) -> Vec<String> {
        self.data
            .children
            .borrow()
            .iter()
            .map(MemNode::label)
            .collect()
    }

    /// Render the subtree as `label[child,child[grandchild]]`.
    #[must_use]
    pub fn render(&self) -> String {
        let children = self.data.children.borrow();
        if children.is_empty() {
            return self.data.label.clone();
        }
        let inner: Vec<String> = children.iter().map(MemNode::render).collect();
        format!("{}[{}]", self.data.label, inner.join(","))
    }

    fn index_in_parent(&self) -> Option<(MemNode, usize)> {
        let parent = self.parent()?;
        let index = parent
            .data
            .children
            .borrow()
            .iter()
            .position(|child| child == self)?;
        Some((parent, index))
    }

    fn detach(&self) {
        if let Some((parent, index)) = self.index_in_parent() {
            parent.data.children.borrow_mut().remove(index);
        }
        *self.data.parent.borrow_mut() = Weak::new();
    }

    fn position_of(&self, node: &MemNode) -> Option<usize> {
        self.data
            .children
            .borrow()
            .iter()
            .position(|child| child == node)
    }
}

impl PartialEq for MemNode {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.data, &other.data)
    }
}

impl Eq for MemNode {}

impl fmt::Debug for MemNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.data.label, self.data.id)
    }
}

impl HostNode for MemNode {
    fn next_sibling(&self) -> Option<Self> {
        let (parent, index) = self.index_in_parent()?;
        parent.data.children.borrow().get(index + 1).cloned()
    }

    fn previous_sibling(&self) -> Option<Self> {
        let (parent, index) = self.index_in_parent()?;
        let index = index.checked_sub(1)?;
        parent.data.children.borrow().get(index).cloned()
    }
}

impl View<MemNode> for MemNode {
    fn insert_before(&self, node: MemNode, reference: Option<&MemNode>) -> ViewResult {
        if reference == Some(&node) {
            return Ok(());
        }
        if let Some(reference) = reference
            && self.position_of(reference).is_none()
        {
            return Err(ViewError::NotAChild(format!("{reference:?}")));
        }
        node.detach();
        let index = match reference {
            Some(reference) => self
                .position_of(reference)
                .ok_or_else(|| ViewError::NotAChild(format!("{reference:?}")))?,
            None => self.data.children.borrow().len(),
        };
        *node.data.parent.borrow_mut() = Rc::downgrade(&self.data);
        self.data.children.borrow_mut().insert(index, node);
        Ok(())
    }

    fn remove_child(&self, node: &MemNode) -> ViewResult {
        let index = self
            .position_of(node)
            .ok_or_else(|| ViewError::NotAChild(format!("{node:?}")))?;
        self.data.children.borrow_mut().remove(index);
        *node.data.parent.borrow_mut() = Weak::new();
        Ok(())
    }

    fn replace_child(&self, node: MemNode, old: &MemNode) -> ViewResult {
        if &node == old {
            return Ok(());
        }
        if self.position_of(old).is_none() {
            return Err(ViewError::NotAChild(format!("{old:?}")));
        }
        node.detach();
        let index = self
            .position_of(old)
            .ok_or_else(|| ViewError::NotAChild(format!("{old:?}")))?;
        *node.data.parent.borrow_mut() = Rc::downgrade(&self.data);
        self.data.children.borrow_mut()[index] = node;
        *old.data.parent.borrow_mut() = Weak::new();
        Ok(())
    }

    fn first_child(&self) -> Option<MemNode> {
        self.data.children.borrow().first().cloned()
    }

    fn last_child(&self) -> Option<MemNode> {
        self.data.children.borrow().last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filled(labels: &[&str]) -> MemNode {
        let root = MemNode::element("root");
        for label in labels {
            root.insert_before(MemNode::text(*label), None).unwrap();
        }
        root
    }

    #[test]
    fn insert_before_reference() {
        let root = filled(&["a", "c"]);
        let c = root.last_child().unwrap();
        root.insert_before(MemNode::text("b"), Some(&c)).unwrap();
        assert_eq!(root.child_labels(), vec!["a", "b", "c"]);
    }

    #[test]
    fn insert_existing_node_moves_it() {
        let root = filled(&["a", "b", "c"]);
        let a = root.first_child().unwrap();
        root.insert_before(a, None).unwrap();
        assert_eq!(root.child_labels(), vec!["b", "c", "a"]);
    }

    #[test]
    fn insert_with_foreign_reference_fails() {
        let root = filled(&["a"]);
        let stranger = MemNode::text("x");
        let err = root
            .insert_before(MemNode::text("b"), Some(&stranger))
            .unwrap_err();
        assert!(matches!(err, ViewError::NotAChild(_)));
        assert_eq!(root.child_labels(), vec!["a"]);
    }

    #[test]
    fn siblings_follow_child_order() {
        let root = filled(&["a", "b", "c"]);
        let b = root.children()[1].clone();
        assert_eq!(b.previous_sibling().unwrap().label(), "a");
        assert_eq!(b.next_sibling().unwrap().label(), "c");
        assert!(root.first_child().unwrap().previous_sibling().is_none());
        assert!(root.last_child().unwrap().next_sibling().is_none());
    }

    #[test]
    fn replace_and_remove() {
        let root = filled(&["a", "b"]);
        let a = root.first_child().unwrap();
        root.replace_child(MemNode::text("z"), &a).unwrap();
        assert_eq!(root.child_labels(), vec!["z", "b"]);
        assert!(a.parent().is_none());

        let b = root.last_child().unwrap();
        root.remove_child(&b).unwrap();
        assert_eq!(root.child_labels(), vec!["z"]);
        assert!(root.remove_child(&b).is_err());
    }

    #[test]
    fn render_nested() {
        let root = filled(&["a"]);
        let inner = MemNode::element("ul");
        inner.insert_before(MemNode::text("li"), None).unwrap();
        root.insert_before(inner, None).unwrap();
        assert_eq!(root.render(), "root[a,ul[li]]");
    }

    #[test]
    fn identity_equality() {
        let a = MemNode::text("same");
        let b = MemNode::text("same");
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }
}
