mod common;

use std::time::Duration;

use common::{delayed, CallCounter};
use reflow::{Poller, ResourceBuilder, ResourceState};
use tokio::time::sleep;

fn counting_poller(calls: &CallCounter, interval_ms: u64, duration_ms: u64) -> Poller<u32> {
    let calls = calls.clone();
    Poller::new(Duration::from_millis(interval_ms), move || {
        let call = calls.bump() as u32;
        async move { delayed(call, duration_ms).await }
    })
}

#[tokio::test(start_paused = true)]
async fn test_ticks_run_when_nothing_is_in_flight() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 100, 30);

    // Ticks at 0, 100, 200, 300; each attempt settles well before the next.
    sleep(Duration::from_millis(350)).await;
    assert_eq!(calls.get(), 4);
    assert_eq!(poller.state(), ResourceState::Resolved(4));
}

#[tokio::test(start_paused = true)]
async fn test_ticks_are_dropped_while_an_attempt_is_in_flight() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 100, 150);

    // Tick 0 runs (settles 150), tick 100 dropped, tick 200 runs (settles
    // 350), tick 300 dropped, tick 400 runs.
    sleep(Duration::from_millis(450)).await;
    assert_eq!(calls.get(), 3);
    poller.dispose();
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_between_ticks() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 1000, 10);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.get(), 1);

    poller.refresh();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(calls.get(), 2);
    assert_eq!(poller.state(), ResourceState::Resolved(2));
}

#[tokio::test(start_paused = true)]
async fn test_manual_refresh_is_dropped_while_busy() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 1000, 200);

    sleep(Duration::from_millis(50)).await;
    poller.refresh();
    sleep(Duration::from_millis(250)).await;
    assert_eq!(calls.get(), 1);
    assert_eq!(poller.state(), ResourceState::Resolved(1));
}

#[tokio::test(start_paused = true)]
async fn test_dispose_stops_ticking() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 100, 10);

    sleep(Duration::from_millis(250)).await;
    let before = calls.get();
    assert_eq!(before, 3);

    poller.dispose();
    assert!(poller.is_disposed());
    poller.dispose();

    sleep(Duration::from_millis(500)).await;
    assert_eq!(calls.get(), before);
    poller.refresh();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(calls.get(), before);
}

#[tokio::test(start_paused = true)]
async fn test_poller_keeps_stale_value_while_refreshing() {
    let calls = CallCounter::new();
    let poller = counting_poller(&calls, 100, 40);

    sleep(Duration::from_millis(50)).await;
    assert_eq!(poller.state(), ResourceState::Resolved(1));

    // Mid second attempt: previous value still visible.
    sleep(Duration::from_millis(70)).await; // t=120
    assert_eq!(poller.state(), ResourceState::Reloading(1));

    sleep(Duration::from_millis(30)).await; // t=150
    assert_eq!(poller.state(), ResourceState::Resolved(2));

    let options = ResourceBuilder::new().initial_value(0u32);
    let seeded = Poller::with_options(Duration::from_millis(100), options, {
        let calls = calls.clone();
        move || {
            let call = calls.bump() as u32;
            async move { delayed(call, 40).await }
        }
    });
    sleep(Duration::from_millis(20)).await;
    assert!(matches!(seeded.state(), ResourceState::Reloading(0)));
}
