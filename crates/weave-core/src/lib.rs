#![forbid(unsafe_code)]

//! Core contracts for Weave.
//!
//! This crate holds the pieces every other layer agrees on:
//!
//! - [`host`]: the host-tree contract ([`HostNode`], [`View`]) that concrete
//!   trees implement, and the [`ViewError`] they report.
//! - [`lifecycle`]: the exactly-once detach context ([`Lifecycle`]) used to
//!   release resources when a rendered unit is torn down.
//!
//! With the `test-helpers` feature, [`testing`] provides an in-memory host
//! tree suitable for unit and integration tests.

pub mod host;
pub mod lifecycle;
#[cfg(any(test, feature = "test-helpers"))]
pub mod testing;

pub use host::{HostNode, View, ViewError, ViewResult, range_nodes};
pub use lifecycle::{DetachSubscription, Lifecycle};
