#![forbid(unsafe_code)]

//! Minimal push-stream contract.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

/// Receives values pushed by a [`Subscribable`].
pub trait Observer<T> {
    fn next(&self, value: T);

    /// The source will push no further values.
    fn complete(&self) {}
}

/// A push source.
pub trait Subscribable<T> {
    /// Start pushing values to `observer`.
    ///
    /// A source that is already complete may call `observer.complete()`
    /// before returning.
    fn subscribe(&self, observer: Rc<dyn Observer<T>>) -> StreamSubscription;
}

impl<T, S: Subscribable<T> + ?Sized> Subscribable<T> for Rc<S> {
    fn subscribe(&self, observer: Rc<dyn Observer<T>>) -> StreamSubscription {
        (**self).subscribe(observer)
    }
}

// ---------------------------------------------------------------------------
// StreamSubscription
// ---------------------------------------------------------------------------

struct SubscriptionInner {
    closed: Cell<bool>,
    teardown: RefCell<Option<Box<dyn FnOnce()>>>,
}

/// Handle to an active subscription.
///
/// Clones share state; [`unsubscribe`](Self::unsubscribe) runs the teardown at
/// most once across all clones. Dropping the handle does not unsubscribe.
#[derive(Clone)]
pub struct StreamSubscription {
    inner: Rc<SubscriptionInner>,
}

impl fmt::Debug for StreamSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSubscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

impl StreamSubscription {
    /// A subscription whose `unsubscribe` runs `teardown`.
    pub fn new(teardown: impl FnOnce() + 'static) -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                closed: Cell::new(false),
                teardown: RefCell::new(Some(Box::new(teardown))),
            }),
        }
    }

    /// An already-closed subscription.
    #[must_use]
    pub fn closed() -> Self {
        Self {
            inner: Rc::new(SubscriptionInner {
                closed: Cell::new(true),
                teardown: RefCell::new(None),
            }),
        }
    }

    pub fn unsubscribe(&self) {
        if self.inner.closed.replace(true) {
            return;
        }
        let teardown = self.inner.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.get()
    }
}

// ---------------------------------------------------------------------------
// FnObserver
// ---------------------------------------------------------------------------

/// Closure-backed [`Observer`].
pub struct FnObserver<T> {
    on_next: Box<dyn Fn(T)>,
    on_complete: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl<T: 'static> FnObserver<T> {
    pub fn new(on_next: impl Fn(T) + 'static) -> Self {
        Self {
            on_next: Box::new(on_next),
            on_complete: RefCell::new(None),
        }
    }

    #[must_use]
    pub fn on_complete(self, on_complete: impl FnOnce() + 'static) -> Self {
        *self.on_complete.borrow_mut() = Some(Box::new(on_complete));
        self
    }

    /// Wrap in an `Rc<dyn Observer>` ready for [`Subscribable::subscribe`].
    #[must_use]
    pub fn shared(self) -> Rc<dyn Observer<T>> {
        Rc::new(self)
    }
}

impl<T> Observer<T> for FnObserver<T> {
    fn next(&self, value: T) {
        (self.on_next)(value);
    }

    fn complete(&self) {
        let on_complete = self.on_complete.borrow_mut().take();
        if let Some(on_complete) = on_complete {
            on_complete();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsubscribe_runs_teardown_once() {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let sub = StreamSubscription::new(move || h.set(h.get() + 1));
        let twin = sub.clone();
        assert!(!sub.is_closed());

        sub.unsubscribe();
        twin.unsubscribe();
        assert_eq!(hits.get(), 1);
        assert!(twin.is_closed());
    }

    #[test]
    fn closed_subscription_is_inert() {
        let sub = StreamSubscription::closed();
        assert!(sub.is_closed());
        sub.unsubscribe();
    }

    #[test]
    fn fn_observer_forwards_and_completes_once() {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let c = Rc::clone(&completions);
        let observer = FnObserver::new(move |v: i32| s.borrow_mut().push(v))
            .on_complete(move || c.set(c.get() + 1))
            .shared();

        observer.next(1);
        observer.next(2);
        observer.complete();
        observer.complete();
        assert_eq!(*seen.borrow(), vec![1, 2]);
        assert_eq!(completions.get(), 1);
    }
}
