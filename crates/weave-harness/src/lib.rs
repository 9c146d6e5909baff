#![forbid(unsafe_code)]

//! Test harness for Weave.
//!
//! - [`Fixture`]: an in-memory root, a manually flushed scheduler and a root
//!   lifecycle.
//! - [`controls`]: leaf and tracked controls for the in-memory host.
//! - [`strategies`]: proptest strategies for keyed orderings.
//! - [`LogCapture`]: a `tracing` layer for asserting on logged events.
//!
//! The in-memory host itself lives in `weave_core::testing` and is
//! re-exported here as [`MemNode`].

pub mod capture;
pub mod controls;
pub mod fixture;
pub mod strategies;

pub use capture::{CapturedEvent, LogCapture};
pub use controls::{
    EventLog, MemFactory, dynamic_text, element_control, nodes_control, text_control,
    text_factory, text_ordering, tracked_control, tracked_factory, tracked_ordering,
};
pub use fixture::{Fixture, MAX_FLUSH_ROUNDS};
pub use weave_core::testing::MemNode;
