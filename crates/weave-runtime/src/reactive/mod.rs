#![forbid(unsafe_code)]

//! Push streams for driving views.
//!
//! - [`Observer`] / [`Subscribable`]: the minimal push contract, with an
//!   explicit [`StreamSubscription`] handle instead of a full stream library.
//! - [`Subject`]: a multicast source that producers push into.
//! - [`until_detach`]: ties a subscription to a [`Lifecycle`](weave_core::Lifecycle).
//! - [`map_stream`]: per-value transform.
//!
//! # Architecture
//!
//! Everything is single-threaded: observers are shared as
//! `Rc<dyn Observer<T>>` and keep their own state behind `Cell`/`RefCell`.
//!
//! # Invariants
//!
//! 1. `StreamSubscription::unsubscribe` runs its teardown at most once.
//! 2. A completed [`Subject`] delivers no further values.
//! 3. Subscribing to a completed source completes the observer immediately.

pub mod operators;
pub mod stream;
pub mod subject;

pub use operators::{MapStream, UntilDetach, map_stream, until_detach};
pub use stream::{FnObserver, Observer, StreamSubscription, Subscribable};
pub use subject::Subject;
