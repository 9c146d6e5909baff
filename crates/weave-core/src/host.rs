#![forbid(unsafe_code)]

//! Host-tree contract.
//!
//! Weave never creates host nodes and never writes their properties. It only
//! moves opaque node handles around inside views. A host binding provides:
//!
//! - a node handle type implementing [`HostNode`] (cheap to clone, compared by
//!   identity, able to report its physical siblings), and
//! - one or more [`View`] implementations: an element exposing its child list,
//!   or a sub-range of another view.
//!
//! # Invariants
//!
//! 1. `first_child()`/`last_child()` always reflect the physical tree: the
//!    first and last node currently inside the view, or `None` when empty.
//! 2. `insert_before(node, None)` appends at the end of the view.
//! 3. Inserting a node that is already attached elsewhere moves it.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Reference node not in view | [`ViewError::NotAChild`] |
//! | Removing a foreign node | [`ViewError::NotAChild`] |
//! | View whose backing record is gone | [`ViewError::Detached`] |
//! | Host-specific failure | [`ViewError::Host`] |

use std::fmt;

/// A handle to a node owned by the host tree.
///
/// Equality must be identity: two handles are equal iff they denote the same
/// physical node.
pub trait HostNode: Clone + PartialEq + fmt::Debug + 'static {
    /// The node immediately after this one under the same parent.
    fn next_sibling(&self) -> Option<Self>;

    /// The node immediately before this one under the same parent.
    fn previous_sibling(&self) -> Option<Self>;
}

/// Errors reported by view operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewError {
    /// The node (or reference node) is not a child of this view.
    NotAChild(String),
    /// The view no longer has a backing record.
    Detached,
    /// Host-specific failure.
    Host(String),
}

impl fmt::Display for ViewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAChild(node) => write!(f, "node {node} is not a child of this view"),
            Self::Detached => write!(f, "view is detached from its boundary list"),
            Self::Host(msg) => write!(f, "host error: {msg}"),
        }
    }
}

impl std::error::Error for ViewError {}

/// Result of a mutating view operation.
pub type ViewResult = Result<(), ViewError>;

/// A mutable window onto a contiguous run of children in the host tree.
///
/// The same contract serves both multi-node views and single-slot hosts: a
/// single-slot user simply keeps at most one node in the view and uses the
/// provided [`write`](View::write) and [`remove`](View::remove) methods.
pub trait View<N: HostNode> {
    /// Insert `node` before `reference`, or at the end of the view when
    /// `reference` is `None`.
    fn insert_before(&self, node: N, reference: Option<&N>) -> ViewResult;

    /// Remove `node` from the view.
    fn remove_child(&self, node: &N) -> ViewResult;

    /// Replace `old` with `node`.
    fn replace_child(&self, node: N, old: &N) -> ViewResult;

    /// First node in the view.
    fn first_child(&self) -> Option<N>;

    /// Last node in the view.
    fn last_child(&self) -> Option<N>;

    /// Write `node` into the view: replaces the current head if there is
    /// one, otherwise appends.
    fn write(&self, node: N) -> ViewResult {
        match self.first_child() {
            Some(head) => self.replace_child(node, &head),
            None => self.insert_before(node, None),
        }
    }

    /// Remove the current head node, if any.
    fn remove(&self) -> ViewResult {
        match self.first_child() {
            Some(head) => self.remove_child(&head),
            None => Ok(()),
        }
    }

    /// The single node held by a single-slot view.
    fn node(&self) -> Option<N> {
        self.first_child()
    }
}

/// Collect the nodes from `first` to `last` inclusive, following
/// [`HostNode::next_sibling`].
///
/// Stops early if the sibling chain ends before `last` is reached.
#[must_use]
pub fn range_nodes<N: HostNode>(first: Option<N>, last: Option<&N>) -> Vec<N> {
    let mut nodes = Vec::new();
    let Some(last) = last else {
        return nodes;
    };
    let mut cursor = first;
    while let Some(node) = cursor {
        let done = &node == last;
        cursor = if done { None } else { node.next_sibling() };
        nodes.push(node);
    }
    nodes
}
