#![forbid(unsafe_code)]

//! Stream adapters.

use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;

use weave_core::{DetachSubscription, Lifecycle};

use super::stream::{Observer, StreamSubscription, Subscribable};

// ---------------------------------------------------------------------------
// until_detach
// ---------------------------------------------------------------------------

/// Source returned by [`until_detach`].
pub struct UntilDetach<S> {
    source: S,
    lifecycle: Lifecycle,
}

/// Forward values from `source` until `lifecycle` fires, then complete the
/// observer and unsubscribe from `source`.
pub fn until_detach<S>(source: S, lifecycle: &Lifecycle) -> UntilDetach<S> {
    UntilDetach {
        source,
        lifecycle: lifecycle.clone(),
    }
}

struct Gate<T> {
    observer: Rc<dyn Observer<T>>,
    done: Cell<bool>,
    detach: RefCell<Option<DetachSubscription>>,
}

impl<T> Gate<T> {
    fn close(&self) -> bool {
        if self.done.replace(true) {
            return false;
        }
        let detach = self.detach.borrow_mut().take();
        if let Some(detach) = detach {
            detach.unsubscribe();
        }
        true
    }
}

impl<T> Observer<T> for Gate<T> {
    fn next(&self, value: T) {
        if !self.done.get() {
            self.observer.next(value);
        }
    }

    fn complete(&self) {
        if self.close() {
            self.observer.complete();
        }
    }
}

impl<T: 'static, S: Subscribable<T>> Subscribable<T> for UntilDetach<S> {
    fn subscribe(&self, observer: Rc<dyn Observer<T>>) -> StreamSubscription {
        if self.lifecycle.is_fired() {
            observer.complete();
            return StreamSubscription::closed();
        }
        let gate = Rc::new(Gate {
            observer,
            done: Cell::new(false),
            detach: RefCell::new(None),
        });
        let upstream = self.source.subscribe(Rc::clone(&gate) as Rc<dyn Observer<T>>);
        if gate.done.get() {
            upstream.unsubscribe();
            return StreamSubscription::closed();
        }

        let on_fire = {
            let gate = Rc::clone(&gate);
            let upstream = upstream.clone();
            move || {
                upstream.unsubscribe();
                gate.complete();
            }
        };
        *gate.detach.borrow_mut() = Some(self.lifecycle.on_detach(on_fire));

        StreamSubscription::new(move || {
            gate.close();
            upstream.unsubscribe();
        })
    }
}

// ---------------------------------------------------------------------------
// map_stream
// ---------------------------------------------------------------------------

/// Source returned by [`map_stream`].
pub struct MapStream<S, F, T> {
    source: S,
    map: Rc<F>,
    _input: PhantomData<fn(T)>,
}

/// Transform every value of `source` with `map`.
pub fn map_stream<S, F, T, U>(source: S, map: F) -> MapStream<S, F, T>
where
    S: Subscribable<T>,
    F: Fn(T) -> U + 'static,
{
    MapStream {
        source,
        map: Rc::new(map),
        _input: PhantomData,
    }
}

struct MapObserver<F, U> {
    map: Rc<F>,
    observer: Rc<dyn Observer<U>>,
}

impl<T, U, F: Fn(T) -> U> Observer<T> for MapObserver<F, U> {
    fn next(&self, value: T) {
        self.observer.next((self.map)(value));
    }

    fn complete(&self) {
        self.observer.complete();
    }
}

impl<S, F, T, U> Subscribable<U> for MapStream<S, F, T>
where
    S: Subscribable<T>,
    F: Fn(T) -> U + 'static,
    T: 'static,
    U: 'static,
{
    fn subscribe(&self, observer: Rc<dyn Observer<U>>) -> StreamSubscription {
        let mapped: Rc<dyn Observer<T>> = Rc::new(MapObserver {
            map: Rc::clone(&self.map),
            observer,
        });
        self.source.subscribe(mapped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{FnObserver, Subject};

    fn observe(
        source: &impl Subscribable<i32>,
    ) -> (Rc<RefCell<Vec<i32>>>, Rc<Cell<u32>>, StreamSubscription) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let completions = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let c = Rc::clone(&completions);
        let sub = source.subscribe(
            FnObserver::new(move |v| s.borrow_mut().push(v))
                .on_complete(move || c.set(c.get() + 1))
                .shared(),
        );
        (seen, completions, sub)
    }

    #[test]
    fn until_detach_completes_on_fire() {
        let subject = Subject::new();
        let lifecycle = Lifecycle::new();
        let source = until_detach(subject.clone(), &lifecycle);
        let (seen, completions, _sub) = observe(&source);

        subject.next(1);
        lifecycle.fire();
        subject.next(2);

        assert_eq!(*seen.borrow(), vec![1]);
        assert_eq!(completions.get(), 1);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn until_detach_on_fired_lifecycle_completes_immediately() {
        let subject: Subject<i32> = Subject::new();
        let lifecycle = Lifecycle::new();
        lifecycle.fire();
        let (_, completions, sub) = observe(&until_detach(subject.clone(), &lifecycle));
        assert_eq!(completions.get(), 1);
        assert!(sub.is_closed());
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn until_detach_source_completion_withdraws_handler() {
        let subject: Subject<i32> = Subject::new();
        let lifecycle = Lifecycle::new();
        let (_, completions, _sub) = observe(&until_detach(subject.clone(), &lifecycle));
        assert_eq!(lifecycle.handler_count(), 1);

        subject.complete();
        assert_eq!(completions.get(), 1);
        assert_eq!(lifecycle.handler_count(), 0);
        lifecycle.fire();
        assert_eq!(completions.get(), 1);
    }

    #[test]
    fn until_detach_unsubscribe_releases_everything() {
        let subject: Subject<i32> = Subject::new();
        let lifecycle = Lifecycle::new();
        let (seen, completions, sub) = observe(&until_detach(subject.clone(), &lifecycle));
        sub.unsubscribe();
        subject.next(3);
        assert!(seen.borrow().is_empty());
        assert_eq!(completions.get(), 0);
        assert_eq!(lifecycle.handler_count(), 0);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn map_stream_transforms_values() {
        let subject: Subject<i32> = Subject::new();
        let doubled = map_stream(subject.clone(), |v: i32| v * 2);
        let (seen, completions, _sub) = observe(&doubled);
        subject.next(2);
        subject.next(5);
        subject.complete();
        assert_eq!(*seen.borrow(), vec![4, 10]);
        assert_eq!(completions.get(), 1);
    }
}
