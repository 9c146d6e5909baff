#![forbid(unsafe_code)]

//! Scheduler tasks applying view changes to the host tree.
//!
//! The writer relinks boundary records as soon as a batch is applied, so the
//! chain is already in logical order when these tasks run; they only bring
//! host nodes in line with it.

use std::cell::Cell;
use std::rc::Rc;

use weave_core::HostNode;
use weave_runtime::{Task, TaskMetadata};

use crate::boundary::{BoundaryArena, ViewId};

/// Move the nodes of every record relinked since the last pass to match the
/// chain. `requested` is cleared when the task starts, so later batches can
/// request another pass.
pub fn settle_view_children<N: HostNode>(arena: &BoundaryArena<N>, requested: Rc<Cell<bool>>) -> Task {
    let arena = arena.clone();
    Task::mutate(move || {
        requested.set(false);
        arena.settle_pending()?;
        Ok(())
    })
    .with_metadata(TaskMetadata::new("settle_view_children"))
}

/// Remove every node of a retired record, then drop the record.
///
/// The record is dropped even when a node could not be removed.
pub fn remove_view_child<N: HostNode>(arena: &BoundaryArena<N>, id: ViewId, target: String) -> Task {
    let arena = arena.clone();
    Task::mutate(move || {
        let cleared = arena.clear_nodes(id);
        arena.discard(id);
        cleared?;
        Ok(())
    })
    .with_metadata(TaskMetadata::new("remove_view_child").with_target(target))
}

/// Remove every node of a record, keeping the record.
pub fn clear_view<N: HostNode>(arena: &BoundaryArena<N>, id: ViewId) -> Task {
    let arena = arena.clone();
    Task::mutate(move || {
        arena.clear_nodes(id)?;
        Ok(())
    })
    .with_metadata(TaskMetadata::new("clear_view"))
}
