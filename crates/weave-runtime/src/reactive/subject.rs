#![forbid(unsafe_code)]

//! Multicast push source.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use super::stream::{Observer, StreamSubscription, Subscribable};

type Entry<T> = (u64, Rc<dyn Observer<T>>);

struct SubjectInner<T> {
    observers: RefCell<Vec<Entry<T>>>,
    next_id: Cell<u64>,
    completed: Cell<bool>,
}

/// A hot source that pushes each value to every current subscriber.
///
/// Observers are notified in subscription order. An observer that
/// unsubscribes while a value is being delivered does not receive it if it
/// has not been reached yet. Subscribing after [`complete`](Self::complete)
/// completes the observer immediately.
pub struct Subject<T> {
    inner: Rc<SubjectInner<T>>,
}

impl<T> Clone for Subject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Default for Subject<T> {
    fn default() -> Self {
        Self {
            inner: Rc::new(SubjectInner {
                observers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
                completed: Cell::new(false),
            }),
        }
    }
}

impl<T> fmt::Debug for Subject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subject")
            .field("observers", &self.observer_count())
            .field("completed", &self.is_completed())
            .finish()
    }
}

impl<T: Clone + 'static> Subject<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Push `value` to every subscriber.
    pub fn next(&self, value: T) {
        if self.inner.completed.get() {
            return;
        }
        let snapshot: Vec<Entry<T>> = self.inner.observers.borrow().clone();
        for (id, observer) in snapshot {
            if self.is_subscribed(id) {
                observer.next(value.clone());
            }
        }
    }

    /// Complete every subscriber and refuse further values.
    pub fn complete(&self) {
        if self.inner.completed.replace(true) {
            return;
        }
        let observers = std::mem::take(&mut *self.inner.observers.borrow_mut());
        for (_, observer) in observers {
            observer.complete();
        }
    }

    fn is_subscribed(&self, id: u64) -> bool {
        self.inner
            .observers
            .borrow()
            .iter()
            .any(|(entry, _)| *entry == id)
    }
}

impl<T> Subject<T> {
    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.inner.completed.get()
    }
}

impl<T: 'static> Subscribable<T> for Subject<T> {
    fn subscribe(&self, observer: Rc<dyn Observer<T>>) -> StreamSubscription {
        if self.inner.completed.get() {
            observer.complete();
            return StreamSubscription::closed();
        }
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner.observers.borrow_mut().push((id, observer));

        let weak: Weak<SubjectInner<T>> = Rc::downgrade(&self.inner);
        StreamSubscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.observers.borrow_mut().retain(|(entry, _)| *entry != id);
            }
        })
    }
}

impl<T: Clone + 'static> Observer<T> for Subject<T> {
    fn next(&self, value: T) {
        Subject::next(self, value);
    }

    fn complete(&self) {
        Subject::complete(self);
    }
}
