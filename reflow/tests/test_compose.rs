mod common;

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::CallCounter;
use reflow::{
    combine2, combine_map, merge, Accessor, DynSource, Input, OneShot, ResourceBuilder,
    ResourceState, Status,
};
use tokio::time::sleep;

#[tokio::test(start_paused = true)]
async fn test_combine_withholds_until_push_source_emits() {
    let query: Input<String> = Input::new();
    let combined = combine2(Accessor::new(|| 5i32), query.clone());

    let calls = CallCounter::new();
    let resource = ResourceBuilder::new().build_with_source(combined, {
        let calls = calls.clone();
        move |(page, query): (i32, String)| {
            calls.bump();
            async move { format!("{page}-{query}") }
        }
    });

    // The push member has not emitted and has no initial value: no combined
    // output, no production.
    sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.get(), 0);
    assert_eq!(resource.status(), Status::Idle);

    query.set("ready".to_string());
    sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.get(), 1);
    assert_eq!(
        resource.state(),
        ResourceState::Resolved("5-ready".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn test_push_source_dedupes_consecutive_equal_values() {
    let query: Input<String> = Input::new();
    let combined = combine2(Accessor::new(|| 1i32), query.clone());

    let calls = CallCounter::new();
    let _resource = ResourceBuilder::new().build_with_source(combined, {
        let calls = calls.clone();
        move |_input: (i32, String)| {
            calls.bump();
            async move { 0u32 }
        }
    });

    query.set("a".to_string());
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.get(), 1);

    // Same value again: no recombination.
    query.set("a".to_string());
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.get(), 1);

    query.set("b".to_string());
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.get(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_accessor_is_reread_on_every_recombination() {
    let revision = Arc::new(AtomicI32::new(1));
    let query: Input<&'static str> = Input::new();
    let combined = combine2(
        Accessor::new({
            let revision = revision.clone();
            move || revision.load(Ordering::SeqCst)
        }),
        query.clone(),
    );

    let resource = ResourceBuilder::new().build_with_source(combined, {
        move |(revision, query): (i32, &'static str)| async move {
            format!("{revision}:{query}")
        }
    });

    query.set("x");
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved("1:x".to_string()));

    // The accessor moved between pushes; the next recombination sees it.
    revision.store(2, Ordering::SeqCst);
    query.set("y");
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved("2:y".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_one_shot_placeholder_lets_combine_emit_immediately() {
    let confirmed: OneShot<&'static str> = OneShot::new();
    let combined = combine2(Accessor::new(|| 1i32), confirmed.clone());

    let calls = CallCounter::new();
    let seen: Arc<std::sync::Mutex<Vec<Option<&'static str>>>> = Arc::default();
    let _resource = ResourceBuilder::new().build_with_source(combined, {
        let calls = calls.clone();
        let seen = seen.clone();
        move |(_, event): (i32, Option<&'static str>)| {
            calls.bump();
            seen.lock().unwrap().push(event);
            async move { 0u32 }
        }
    });

    // The one-shot is seeded with a placeholder, so the combine does not
    // withhold waiting for an event that may never fire.
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.get(), 1);

    confirmed.fire("go");
    sleep(Duration::from_millis(20)).await;
    assert_eq!(calls.get(), 2);
    assert_eq!(*seen.lock().unwrap(), vec![None, Some("go")]);
}

#[tokio::test(start_paused = true)]
async fn test_merge_emits_latest_from_whichever_source_changed() {
    let a: Input<i32> = Input::new();
    let b: Input<i32> = Input::new();
    let merged = merge(vec![
        Arc::new(a.clone()) as DynSource<i32>,
        Arc::new(b.clone()) as DynSource<i32>,
    ])
    .expect("non-empty");

    let resource = ResourceBuilder::new()
        .build_with_source(merged, |value: i32| async move { value });

    a.set(1);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved(1));

    b.set(2);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved(2));

    a.set(3);
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved(3));
}

#[tokio::test(start_paused = true)]
async fn test_combine_map_produces_keyed_output() {
    let page: Input<i32> = Input::with_value(1);
    let size: Input<i32> = Input::with_value(20);
    let combined = combine_map(vec![
        ("page", Arc::new(page.clone()) as DynSource<i32>),
        ("size", Arc::new(size.clone()) as DynSource<i32>),
    ])
    .expect("valid keys");

    let resource = ResourceBuilder::new().build_with_source(combined, {
        |view: BTreeMap<String, i32>| async move { view }
    });

    sleep(Duration::from_millis(20)).await;
    let expected: BTreeMap<String, i32> =
        [("page".to_string(), 1), ("size".to_string(), 20)].into();
    assert_eq!(resource.state(), ResourceState::Resolved(expected));

    page.set(2);
    sleep(Duration::from_millis(20)).await;
    let expected: BTreeMap<String, i32> =
        [("page".to_string(), 2), ("size".to_string(), 20)].into();
    assert_eq!(resource.state(), ResourceState::Resolved(expected));
}

#[tokio::test(start_paused = true)]
async fn test_manual_trigger_rereads_source_current() {
    let query: Input<&'static str> = Input::with_value("q");
    let revision = Arc::new(AtomicI32::new(1));
    let combined = combine2(
        Accessor::new({
            let revision = revision.clone();
            move || revision.load(Ordering::SeqCst)
        }),
        query.clone(),
    );

    let resource = ResourceBuilder::new().build_with_source(combined, {
        move |(revision, query): (i32, &'static str)| async move {
            format!("{revision}:{query}")
        }
    });

    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved("1:q".to_string()));

    // Nothing pushed, but a manual trigger re-reads the accessor.
    revision.store(2, Ordering::SeqCst);
    resource.trigger();
    sleep(Duration::from_millis(20)).await;
    assert_eq!(resource.state(), ResourceState::Resolved("2:q".to_string()));
}
