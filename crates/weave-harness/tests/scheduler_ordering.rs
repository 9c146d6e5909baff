#![forbid(unsafe_code)]

//! Integration tests: flush ordering as seen from rendered views, and the
//! events the scheduler logs.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::Level;
use weave_harness::{Fixture, LogCapture, MemFactory, MemNode, text_control, text_ordering};
use weave_render::KeyedOrdering;
use weave_runtime::{QueueName, SchedulerConfig, Subject, Task, TaskMetadata};
use weave_view::{ViewContext, control_fn, keyed_view_control};

// ============================================================================
// Phases
// ============================================================================

#[test]
fn measure_observes_the_finished_mutate_phase() {
    let fixture = Fixture::new();
    let orderings: Subject<KeyedOrdering<&'static str, MemFactory>> = Subject::new();
    fixture.mount(keyed_view_control(orderings.clone()));

    let seen: Rc<RefCell<Vec<String>>> = Rc::default();
    let root = fixture.root().clone();
    let sink = Rc::clone(&seen);
    fixture.scheduler().schedule(Task::measure(move || {
        *sink.borrow_mut() = root.child_labels();
        Ok(())
    }));
    orderings.next(text_ordering(&["a", "b", "c"]));

    assert_eq!(fixture.flush(), 1);
    assert_eq!(*seen.borrow(), vec!["a", "b", "c"]);
}

#[test]
fn custom_queues_follow_measure_in_first_seen_order() {
    let fixture = Fixture::new();
    let order: Rc<RefCell<Vec<String>>> = Rc::default();
    for queue in ["paint", "measure", "idle", "mutate", "paint"] {
        let scheduler = fixture.scheduler().clone();
        let order = Rc::clone(&order);
        fixture.scheduler().schedule(Task::new(queue, move || {
            let running = scheduler.running_queue().map(|q| q.to_string());
            order.borrow_mut().push(running.unwrap_or_default());
            Ok(())
        }));
    }
    fixture.flush();
    assert_eq!(
        *order.borrow(),
        vec!["mutate", "measure", "paint", "paint", "idle"]
    );
    assert_eq!(fixture.scheduler().running_queue(), None);
}

#[test]
fn writes_from_a_mutate_task_land_in_the_same_flush() {
    let fixture = Fixture::new();
    let root_view = fixture.context();
    fixture.scheduler().schedule(Task::mutate(move || {
        text_control("inline").init(root_view);
        Ok(())
    }));
    assert_eq!(fixture.flush(), 1);
    assert_eq!(fixture.labels(), vec!["inline"]);
}

#[test]
fn measure_scheduled_writes_wait_for_the_next_flush() {
    let fixture = Fixture::new();
    let cx = fixture.context();
    fixture.scheduler().schedule(Task::measure(move || {
        assert_eq!(cx.scheduler().running_queue(), Some(QueueName::Measure));
        text_control("late").init(cx);
        Ok(())
    }));
    assert!(fixture.flush_once());
    assert!(fixture.labels().is_empty());
    assert!(fixture.flush_once());
    assert_eq!(fixture.labels(), vec!["late"]);
}

// ============================================================================
// Logged events
// ============================================================================

#[test]
fn panicking_task_is_logged_and_isolated() {
    let capture = LogCapture::new();
    let _guard = capture.install();
    let fixture = Fixture::new();
    fixture.mount(control_fn(|cx: ViewContext<MemNode>| {
        cx.schedule(
            Task::mutate(|| panic!("layout exploded")).with_metadata(TaskMetadata::new("layout")),
        );
    }));
    fixture.mount(text_control("after"));
    fixture.flush();

    assert_eq!(fixture.labels(), vec!["after"]);
    let errors = capture.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].field("signature"), Some("layout"));
    assert_eq!(errors[0].field("queue"), Some("mutate"));
    assert!(
        errors[0]
            .field("error")
            .is_some_and(|e| e.contains("layout exploded"))
    );
}

#[test]
fn oversized_flush_warns() {
    let capture = LogCapture::new();
    let _guard = capture.install();
    let fixture =
        Fixture::with_config(SchedulerConfig::default().with_slow_flush_task_threshold(2));
    for label in ["a", "b", "c"] {
        fixture.mount(text_control(label));
    }
    fixture.flush();
    assert!(capture.contains(Level::WARN, "slow flush"));

    capture.clear();
    fixture.mount(text_control("d"));
    fixture.flush();
    assert!(capture.at_level(Level::WARN).is_empty());
}

#[test]
fn reentrant_flush_is_refused() {
    let capture = LogCapture::new();
    let _guard = capture.install();
    let fixture = Fixture::new();
    let scheduler = fixture.scheduler().clone();
    fixture.scheduler().schedule(Task::mutate(move || {
        assert_eq!(scheduler.flush(), 0);
        Ok(())
    }));
    fixture.flush();
    assert!(capture.contains(Level::WARN, "from inside a running task"));
    assert_eq!(fixture.scheduler().stats().tasks_failed, 0);
}
