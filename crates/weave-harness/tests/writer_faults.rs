#![forbid(unsafe_code)]

//! Integration tests: integrity faults in view-change batches and failing
//! deferred tasks.

use tracing::Level;
use weave_harness::{EventLog, Fixture, LogCapture, MemFactory, MemNode, text_control, tracked_factory};
use weave_render::ViewChange;
use weave_runtime::{Subject, Task, TaskMetadata};
use weave_view::{
    ListError, ViewChangeWriter, ViewContext, compose_view_control, control_fn, view_control,
};

type Batch = Vec<ViewChange<&'static str, MemFactory>>;

fn insert(key: &'static str, log: &EventLog) -> ViewChange<&'static str, MemFactory> {
    ViewChange::Insert {
        key,
        ref_key: None,
        child: tracked_factory(key, log),
    }
}

// ============================================================================
// Stream-driven faults
// ============================================================================

#[test]
fn unknown_key_shuts_the_view_down() {
    let capture = LogCapture::new();
    let _guard = capture.install();
    let fixture = Fixture::new();
    let log = EventLog::new();
    let batches: Subject<Batch> = Subject::new();
    fixture.mount(view_control(batches.clone()));

    batches.next(vec![insert("a", &log), insert("b", &log)]);
    fixture.flush();
    assert_eq!(fixture.labels(), vec!["a", "b"]);
    assert_eq!(batches.observer_count(), 1);

    batches.next(vec![ViewChange::Move {
        key: "ghost",
        ref_key: None,
    }]);

    let errors = capture.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].message.contains("view change batch rejected"));
    assert!(errors[0].field("error").is_some_and(|e| e.contains("ghost")));
    assert_eq!(batches.observer_count(), 0);
    assert!(log.contains("detach a (attached)"));
    assert!(log.contains("detach b (attached)"));
    assert_eq!(fixture.lifecycle().handler_count(), 0);

    batches.next(vec![insert("c", &log)]);
    fixture.flush();
    assert!(!log.contains("init c"));
}

#[test]
fn completion_releases_children_once() {
    let fixture = Fixture::new();
    let log = EventLog::new();
    let batches: Subject<Batch> = Subject::new();
    fixture.mount(view_control(batches.clone()));

    batches.next(vec![insert("a", &log)]);
    batches.complete();
    assert_eq!(log.entries(), vec!["init a", "detach a"]);

    fixture.detach();
    assert_eq!(log.count("detach a"), 1);
}

#[test]
fn already_completed_source_leaves_no_handlers() {
    let fixture = Fixture::new();
    let batches: Subject<Batch> = Subject::new();
    batches.complete();

    let writer: ViewChangeWriter<&'static str, MemNode> = ViewChangeWriter::new(fixture.context());
    writer.attach(&batches);
    assert!(writer.is_closed());
    assert_eq!(fixture.lifecycle().handler_count(), 0);
}

// ============================================================================
// Direct application
// ============================================================================

#[test]
fn direct_apply_reports_and_keeps_earlier_commands() {
    let fixture = Fixture::new();
    let log = EventLog::new();
    let writer: ViewChangeWriter<&'static str, MemNode> = ViewChangeWriter::new(fixture.context());

    let result = writer.apply(vec![
        insert("a", &log),
        ViewChange::Remove { key: "ghost" },
        insert("b", &log),
    ]);
    assert!(matches!(result, Err(ListError::NotFound { .. })));
    assert!(!writer.is_closed());
    assert_eq!(writer.len(), 1);

    fixture.flush();
    assert_eq!(fixture.labels(), vec!["a"]);
    assert!(!log.contains("init b"));
}

#[test]
fn direct_apply_rejects_duplicates_and_bad_references() {
    let fixture = Fixture::new();
    let log = EventLog::new();
    let writer: ViewChangeWriter<&'static str, MemNode> = ViewChangeWriter::new(fixture.context());
    writer.apply(vec![insert("a", &log)]).unwrap();

    let duplicate = writer.apply(vec![insert("a", &log)]);
    assert!(matches!(duplicate, Err(ListError::DuplicateKey { .. })));

    let bad_ref = writer.apply(vec![ViewChange::Insert {
        key: "b",
        ref_key: Some("nowhere"),
        child: tracked_factory("b", &log),
    }]);
    assert!(matches!(bad_ref, Err(ListError::ReferenceNotFound { .. })));

    fixture.flush();
    assert_eq!(fixture.labels(), vec!["a"]);
    assert_eq!(log.count("init a"), 1);
}

// ============================================================================
// Failing tasks
// ============================================================================

#[test]
fn failing_task_leaves_sibling_regions_intact() {
    let capture = LogCapture::new();
    let _guard = capture.install();
    let fixture = Fixture::new();
    let failing = control_fn(|cx: ViewContext<MemNode>| {
        cx.schedule(
            Task::mutate(|| Err("host refused the node".into()))
                .with_metadata(TaskMetadata::new("explode").with_target("middle")),
        );
    });
    fixture.mount(compose_view_control(vec![
        text_control("left"),
        failing,
        text_control("right"),
    ]));
    fixture.flush();

    assert_eq!(fixture.labels(), vec!["left", "right"]);
    let errors = capture.at_level(Level::ERROR);
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].message, "scheduled task failed");
    assert_eq!(errors[0].field("signature"), Some("explode"));
    assert_eq!(errors[0].field("target"), Some("middle"));
    assert_eq!(errors[0].field("error"), Some("host refused the node"));
    assert_eq!(fixture.scheduler().stats().tasks_failed, 1);
}
