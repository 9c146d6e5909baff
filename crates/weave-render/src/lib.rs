#![forbid(unsafe_code)]

//! Keyed reconciliation for Weave.
//!
//! This crate is pure: it knows nothing about host trees or scheduling. It
//! computes which [`ViewChange`] commands turn one keyed order into another
//! ([`diff`]), and can check a batch against a plain key list ([`replay`]).

pub mod keyed_diff;
pub mod replay;

pub use keyed_diff::{ChildFactory, KeyedDiffer, KeyedOrdering, SharedFactory, ViewChange, diff};
pub use replay::{ReplayError, replay};
