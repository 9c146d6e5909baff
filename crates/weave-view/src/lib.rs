#![forbid(unsafe_code)]

//! Views, keyed lists and controls for Weave.
//!
//! # Role in Weave
//!
//! `weave-view` is where reconciliation meets the host tree. It turns
//! batches of [`ViewChange`](weave_render::ViewChange) commands into
//! scheduled host-tree mutations, and lets many dynamic regions share one
//! parent without wrapper or placeholder nodes.
//!
//! # Primary responsibilities
//!
//! - **Boundaries**: [`BoundaryView`] tracks the first and last node of a
//!   range inside a parent view; [`BoundaryArena`] chains such ranges.
//! - **Keyed lists**: [`BoundaryList`] maps keys to boundaries in order.
//! - **Writers**: [`ViewChangeWriter`] applies view changes, owns child
//!   lifecycles and defers node moves and removals to the scheduler.
//! - **Controls**: [`view_control`], [`keyed_view_control`],
//!   [`compose_view_control`], [`render_control`] and [`portal_control`].
//!
//! # How it fits in the system
//!
//! Controls receive a [`ViewContext`] carrying the view, the
//! [`Scheduler`](weave_runtime::Scheduler) and the
//! [`Lifecycle`](weave_core::Lifecycle) of the region they own. Nothing in
//! this crate creates host nodes; it only moves the ones controls write.

pub mod boundary;
pub mod compose;
pub mod context;
pub mod keyed;
pub mod list;
pub mod mount;
pub mod tasks;
pub mod writer;

pub use boundary::{BoundaryArena, BoundaryView, ViewId};
pub use compose::compose_view_control;
pub use context::{BoxedControl, Control, FnControl, IntoControl, ViewContext, control_fn};
pub use keyed::keyed_view_control;
pub use list::{BoundaryList, ListError};
pub use mount::{RenderControl, RootControl, portal_control, render_control};
pub use writer::{ViewChangeWriter, view_control};
