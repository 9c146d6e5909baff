#![forbid(unsafe_code)]

//! Boundary views over a shared parent range.
//!
//! A [`BoundaryArena`] owns the records of every boundary that shares one
//! parent view. Each record stores the first and last host node currently
//! inside its range plus `previous`/`next` handles to its sibling records.
//! Records refer to each other only through [`ViewId`] handles into the
//! arena, so the doubly linked chain has no ownership cycles.
//!
//! A [`BoundaryView`] is an (arena, id) pair implementing [`View`]: writes go
//! straight to the parent view while the record's head/tail are kept in
//! step. No marker or wrapper nodes are ever created.
//!
//! # Invariants
//!
//! 1. A record's `head`/`tail` are the first/last physical node in its
//!    range, or both `None` when the range is empty.
//! 2. The nodes of a record form a contiguous run in the parent.
//! 3. Linked records appear in the parent in chain order, except for
//!    records relinked since the last [`settle_pending`](BoundaryArena::settle_pending).
//! 4. The arena tail is the last linked record; there is no head pointer.
//!
//! # Failure Modes
//!
//! | Condition | Behavior |
//! |-----------|----------|
//! | Operating on a discarded record | [`ViewError::Detached`] |
//! | Linking before an unlinked or missing record | [`ViewError::Detached`] |
//! | Parent rejects a node operation | Error propagated, bookkeeping untouched |

use std::cell::RefCell;
use std::fmt;
use std::mem;
use std::rc::Rc;

use slotmap::{SecondaryMap, SlotMap};
use weave_core::{HostNode, View, ViewError, ViewResult, range_nodes};

slotmap::new_key_type! {
    /// Handle to a boundary record inside a [`BoundaryArena`].
    pub struct ViewId;
}

struct Record<N> {
    head: Option<N>,
    tail: Option<N>,
    previous: Option<ViewId>,
    next: Option<ViewId>,
    linked: bool,
    unsettled: bool,
}

impl<N> Record<N> {
    fn empty() -> Self {
        Self {
            head: None,
            tail: None,
            previous: None,
            next: None,
            linked: false,
            unsettled: false,
        }
    }
}

struct ChainState<N> {
    records: SlotMap<ViewId, Record<N>>,
    tail: Option<ViewId>,
    /// Records whose nodes may lag behind their chain position.
    unsettled: Vec<ViewId>,
}

impl<N> ChainState<N> {
    fn mark_unsettled(&mut self, id: ViewId) {
        if let Some(record) = self.records.get_mut(id)
            && !record.unsettled
        {
            record.unsettled = true;
            self.unsettled.push(id);
        }
    }

    fn is_linked(&self, id: ViewId) -> bool {
        self.records.get(id).is_some_and(|record| record.linked)
    }

    fn unlink(&mut self, id: ViewId) {
        let Some(record) = self.records.get_mut(id) else {
            return;
        };
        if !record.linked {
            return;
        }
        let previous = record.previous.take();
        let next = record.next.take();
        record.linked = false;

        if let Some(previous) = previous
            && let Some(prev_record) = self.records.get_mut(previous)
        {
            prev_record.next = next;
        }
        match next {
            Some(next) => {
                if let Some(next_record) = self.records.get_mut(next) {
                    next_record.previous = previous;
                }
            }
            None => self.tail = previous,
        }
    }

    fn link_before(&mut self, id: ViewId, before: Option<ViewId>) -> ViewResult {
        if before == Some(id) {
            return Ok(());
        }
        if !self.records.contains_key(id) {
            return Err(ViewError::Detached);
        }
        if let Some(before) = before
            && !self.is_linked(before)
        {
            return Err(ViewError::Detached);
        }
        self.unlink(id);

        let previous = match before {
            Some(before) => self.records.get(before).and_then(|r| r.previous),
            None => self.tail,
        };
        if let Some(record) = self.records.get_mut(id) {
            record.previous = previous;
            record.next = before;
            record.linked = true;
        }
        if let Some(previous) = previous
            && let Some(prev_record) = self.records.get_mut(previous)
        {
            prev_record.next = Some(id);
        }
        match before {
            Some(before) => {
                if let Some(next_record) = self.records.get_mut(before) {
                    next_record.previous = Some(id);
                }
            }
            None => self.tail = Some(id),
        }
        Ok(())
    }
}

impl<N: Clone> ChainState<N> {
    /// First node of the first non-empty linked record at or after `start`.
    fn first_node_from(&self, start: Option<ViewId>) -> Option<N> {
        let mut cursor = start;
        while let Some(id) = cursor {
            let record = self.records.get(id)?;
            if let Some(head) = &record.head {
                return Some(head.clone());
            }
            cursor = record.next;
        }
        None
    }
}

// ---------------------------------------------------------------------------
// BoundaryArena
// ---------------------------------------------------------------------------

struct ArenaInner<N> {
    parent: Rc<dyn View<N>>,
    state: RefCell<ChainState<N>>,
}

/// Records for all boundaries sharing one parent view.
///
/// Cloning yields another handle to the same arena.
pub struct BoundaryArena<N: HostNode> {
    inner: Rc<ArenaInner<N>>,
}

impl<N: HostNode> Clone for BoundaryArena<N> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<N: HostNode> fmt::Debug for BoundaryArena<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("BoundaryArena")
            .field("records", &state.records.len())
            .field("tail", &state.tail)
            .finish()
    }
}

impl<N: HostNode> BoundaryArena<N> {
    pub fn new(parent: Rc<dyn View<N>>) -> Self {
        Self {
            inner: Rc::new(ArenaInner {
                parent,
                state: RefCell::new(ChainState {
                    records: SlotMap::with_key(),
                    tail: None,
                    unsettled: Vec::new(),
                }),
            }),
        }
    }

    /// The view every record writes through.
    #[must_use]
    pub fn parent(&self) -> &Rc<dyn View<N>> {
        &self.inner.parent
    }

    /// Allocate an empty, unlinked record.
    pub fn create(&self) -> ViewId {
        self.inner.state.borrow_mut().records.insert(Record::empty())
    }

    /// A view over the record `id`.
    #[must_use]
    pub fn view(&self, id: ViewId) -> BoundaryView<N> {
        BoundaryView {
            arena: self.clone(),
            id,
        }
    }

    #[must_use]
    pub fn contains(&self, id: ViewId) -> bool {
        self.inner.state.borrow().records.contains_key(id)
    }

    #[must_use]
    pub fn is_linked(&self, id: ViewId) -> bool {
        self.inner.state.borrow().is_linked(id)
    }

    /// Number of live records, linked or not.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.state.borrow().records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Link `id` immediately before `before`, or at the end of the chain.
    /// An already linked record is relinked. Nodes are not moved.
    pub fn link_before(&self, id: ViewId, before: Option<ViewId>) -> ViewResult {
        self.inner.state.borrow_mut().link_before(id, before)
    }

    /// Link `id` like [`link_before`](Self::link_before) and leave its nodes
    /// where they are until [`settle_pending`](Self::settle_pending) runs.
    ///
    /// Until then, a first write into any empty record of this arena is
    /// settled along with it.
    pub fn relink(&self, id: ViewId, before: Option<ViewId>) -> ViewResult {
        let mut state = self.inner.state.borrow_mut();
        state.link_before(id, before)?;
        state.mark_unsettled(id);
        Ok(())
    }

    /// Whether any relinked record still waits for its nodes to move.
    #[must_use]
    pub fn has_unsettled(&self) -> bool {
        !self.inner.state.borrow().unsettled.is_empty()
    }

    /// Settle every pending record, from the end of the chain backwards.
    ///
    /// Each record lands in front of a successor that is already in place,
    /// so the host order matches the chain however many relinks piled up.
    /// Records discarded in the meantime are skipped. Keeps going after a
    /// failure and reports the first one.
    pub fn settle_pending(&self) -> ViewResult {
        let pending = {
            let mut state = self.inner.state.borrow_mut();
            let pending = mem::take(&mut state.unsettled);
            let mut marked = SecondaryMap::new();
            for id in pending {
                if let Some(record) = state.records.get_mut(id) {
                    record.unsettled = false;
                    marked.insert(id, ());
                }
            }
            marked
        };
        if pending.is_empty() {
            return Ok(());
        }
        let mut outcome = Ok(());
        for id in self.order().into_iter().rev() {
            if pending.contains_key(id)
                && let Err(err) = self.settle(id)
                && outcome.is_ok()
            {
                outcome = Err(err);
            }
        }
        outcome
    }

    /// Remove `id` from the chain, keeping the record and its node handles.
    pub fn unlink(&self, id: ViewId) {
        self.inner.state.borrow_mut().unlink(id);
    }

    /// Unlink and drop the record. Its nodes are left where they are.
    pub fn discard(&self, id: ViewId) {
        let mut state = self.inner.state.borrow_mut();
        state.unlink(id);
        state.records.remove(id);
    }

    /// Linked record ids in chain order.
    #[must_use]
    pub fn order(&self) -> Vec<ViewId> {
        let state = self.inner.state.borrow();
        let mut order = Vec::new();
        let mut cursor = state.tail;
        while let Some(id) = cursor {
            order.push(id);
            cursor = state.records.get(id).and_then(|r| r.previous);
        }
        order.reverse();
        order
    }

    #[must_use]
    pub fn next_of(&self, id: ViewId) -> Option<ViewId> {
        self.inner.state.borrow().records.get(id).and_then(|r| r.next)
    }

    #[must_use]
    pub fn previous_of(&self, id: ViewId) -> Option<ViewId> {
        self.inner
            .state
            .borrow()
            .records
            .get(id)
            .and_then(|r| r.previous)
    }

    /// First node of the first non-empty record at or after `start`.
    #[must_use]
    pub fn first_node_from(&self, start: Option<ViewId>) -> Option<N> {
        self.inner.state.borrow().first_node_from(start)
    }

    /// Current `(head, tail)` of `id`.
    pub fn bounds(&self, id: ViewId) -> Result<(Option<N>, Option<N>), ViewError> {
        let state = self.inner.state.borrow();
        let record = state.records.get(id).ok_or(ViewError::Detached)?;
        Ok((record.head.clone(), record.tail.clone()))
    }

    /// A write just filled the empty record `id`. Its position came from the
    /// chain, so it moves with the next settle pass if one is pending.
    fn note_first_write(&self, id: ViewId) {
        let mut state = self.inner.state.borrow_mut();
        if !state.unsettled.is_empty() && state.is_linked(id) {
            state.mark_unsettled(id);
        }
    }

    fn set_bounds(&self, id: ViewId, head: Option<N>, tail: Option<N>) -> ViewResult {
        let mut state = self.inner.state.borrow_mut();
        let record = state.records.get_mut(id).ok_or(ViewError::Detached)?;
        record.head = head;
        record.tail = tail;
        Ok(())
    }

    /// Nodes currently inside `id`, in order.
    pub fn nodes(&self, id: ViewId) -> Result<Vec<N>, ViewError> {
        let (head, tail) = self.bounds(id)?;
        Ok(range_nodes(head, tail.as_ref()))
    }

    /// Relink `id` before `before` and move its nodes to match.
    ///
    /// The physical reference is the first node of the nearest non-empty
    /// record after `id` in its new position, or the end of the parent.
    pub fn place(&self, id: ViewId, before: Option<ViewId>) -> ViewResult {
        self.link_before(id, before)?;
        self.settle(id)
    }

    /// Move the nodes of a linked record in front of the nearest non-empty
    /// record after it, or to the end of the parent. The chain is not
    /// touched.
    pub fn settle(&self, id: ViewId) -> ViewResult {
        if !self.is_linked(id) {
            return Err(ViewError::Detached);
        }
        let nodes = self.nodes(id)?;
        let Some(last) = nodes.last() else {
            return Ok(());
        };
        let reference = self.first_node_from(self.next_of(id));
        let in_place = match &reference {
            Some(reference) => last.next_sibling().as_ref() == Some(reference),
            None => self.inner.parent.last_child().as_ref() == Some(last),
        };
        if in_place {
            return Ok(());
        }
        for node in nodes {
            self.inner.parent.insert_before(node, reference.as_ref())?;
        }
        Ok(())
    }

    /// Remove every node of `id` from the parent and empty the record.
    pub fn clear_nodes(&self, id: ViewId) -> ViewResult {
        let nodes = self.nodes(id)?;
        let mut outcome = Ok(());
        for node in &nodes {
            if let Err(err) = self.inner.parent.remove_child(node) {
                outcome = Err(err);
            }
        }
        self.set_bounds(id, None, None)?;
        outcome
    }
}

// ---------------------------------------------------------------------------
// BoundaryView
// ---------------------------------------------------------------------------

/// A [`View`] over one record's range of the parent.
pub struct BoundaryView<N: HostNode> {
    arena: BoundaryArena<N>,
    id: ViewId,
}

impl<N: HostNode> Clone for BoundaryView<N> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena.clone(),
            id: self.id,
        }
    }
}

impl<N: HostNode> fmt::Debug for BoundaryView<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bounds = self.arena.bounds(self.id).ok();
        f.debug_struct("BoundaryView")
            .field("id", &self.id)
            .field("bounds", &bounds)
            .finish()
    }
}

impl<N: HostNode> BoundaryView<N> {
    /// Wrap `parent` in a single-record arena.
    ///
    /// The boundary starts empty: content written through it never disturbs
    /// nodes the parent already holds.
    pub fn standalone(parent: Rc<dyn View<N>>) -> Self {
        let arena = BoundaryArena::new(parent);
        let id = arena.create();
        // A fresh record always links at the end of an empty chain.
        let _ = arena.link_before(id, None);
        arena.view(id)
    }

    #[must_use]
    pub fn id(&self) -> ViewId {
        self.id
    }

    #[must_use]
    pub fn arena(&self) -> &BoundaryArena<N> {
        &self.arena
    }

    /// Whether the backing record still exists.
    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.arena.contains(self.id)
    }

    /// Nodes inside this boundary, in order.
    pub fn nodes(&self) -> Result<Vec<N>, ViewError> {
        self.arena.nodes(self.id)
    }

    /// Remove every node inside this boundary.
    pub fn clear(&self) -> ViewResult {
        self.arena.clear_nodes(self.id)
    }

    fn parent(&self) -> &Rc<dyn View<N>> {
        self.arena.parent()
    }

    /// Physical reference for appending after `tail`.
    fn after_tail(&self, tail: Option<&N>) -> Option<N> {
        match tail {
            Some(tail) => {
                if self.parent().last_child().as_ref() == Some(tail) {
                    None
                } else {
                    tail.next_sibling()
                }
            }
            None => self
                .arena
                .first_node_from(self.arena.next_of(self.id)),
        }
    }
}

/// Drop `node` from the `(head, tail)` pair if it sits on either end.
fn forget<N: HostNode>(head: &mut Option<N>, tail: &mut Option<N>, node: &N) {
    let is_head = head.as_ref() == Some(node);
    let is_tail = tail.as_ref() == Some(node);
    match (is_head, is_tail) {
        (true, true) => {
            *head = None;
            *tail = None;
        }
        (true, false) => *head = node.next_sibling(),
        (false, true) => *tail = node.previous_sibling(),
        (false, false) => {}
    }
}

impl<N: HostNode> View<N> for BoundaryView<N> {
    fn insert_before(&self, node: N, reference: Option<&N>) -> ViewResult {
        if reference == Some(&node) {
            return Ok(());
        }
        let (mut head, mut tail) = self.arena.bounds(self.id)?;
        forget(&mut head, &mut tail, &node);
        let was_empty = head.is_none();

        let real_ref = match reference {
            Some(reference) => {
                if head.is_none() {
                    return Err(ViewError::NotAChild(format!("{reference:?}")));
                }
                if head.as_ref() == Some(reference) {
                    head = Some(node.clone());
                }
                Some(reference.clone())
            }
            None => {
                let real_ref = self.after_tail(tail.as_ref());
                if head.is_none() {
                    head = Some(node.clone());
                }
                tail = Some(node.clone());
                real_ref
            }
        };

        if real_ref.as_ref() != Some(&node) {
            self.parent().insert_before(node, real_ref.as_ref())?;
        }
        self.arena.set_bounds(self.id, head, tail)?;
        if was_empty {
            self.arena.note_first_write(self.id);
        }
        Ok(())
    }

    fn remove_child(&self, node: &N) -> ViewResult {
        let (mut head, mut tail) = self.arena.bounds(self.id)?;
        forget(&mut head, &mut tail, node);
        self.parent().remove_child(node)?;
        self.arena.set_bounds(self.id, head, tail)
    }

    fn replace_child(&self, node: N, old: &N) -> ViewResult {
        if &node == old {
            return Ok(());
        }
        let (mut head, mut tail) = self.arena.bounds(self.id)?;
        if head.as_ref() == Some(old) {
            head = Some(node.clone());
        }
        if tail.as_ref() == Some(old) {
            tail = Some(node.clone());
        }
        self.parent().replace_child(node, old)?;
        self.arena.set_bounds(self.id, head, tail)
    }

    fn first_child(&self) -> Option<N> {
        self.arena.bounds(self.id).ok().and_then(|(head, _)| head)
    }

    fn last_child(&self) -> Option<N> {
        self.arena.bounds(self.id).ok().and_then(|(_, tail)| tail)
    }
}
