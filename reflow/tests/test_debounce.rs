use std::time::Duration;

use futures::stream::{self, StreamExt};
use reflow::ReflowStreamExt;
use tokio::time::Instant;

/// Rapidly-changing grid view state, the kind of structured value this
/// operator is meant to settle.
#[derive(Debug, Clone, PartialEq)]
struct ViewState {
    page: u32,
    filter: Option<&'static str>,
}

const INITIAL: ViewState = ViewState {
    page: 1,
    filter: None,
};
const STATE_A: ViewState = ViewState {
    page: 1,
    filter: Some("a"),
};
const STATE_B: ViewState = ViewState {
    page: 2,
    filter: Some("a"),
};

fn timed_emissions(
    schedule: Vec<(u64, ViewState)>,
) -> impl futures::Stream<Item = ViewState> + Send {
    let start = Instant::now();
    stream::iter(schedule).then(move |(at, state)| async move {
        tokio::time::sleep_until(start + Duration::from_millis(at)).await;
        state
    })
}

#[tokio::test(start_paused = true)]
async fn test_initial_emits_then_debounces_and_dedupes() {
    // initial at 0, A at 50, A again at 550, B at 600; 500ms debounce.
    let source = timed_emissions(vec![
        (0, INITIAL),
        (50, STATE_A),
        (550, STATE_A),
        (600, STATE_B),
    ])
    .chain(stream::pending());

    let start = Instant::now();
    let mut settled = source
        .debounce_distinct(Duration::from_millis(500))
        .boxed();

    let mut emissions = Vec::new();
    for _ in 0..3 {
        let state = settled.next().await.expect("stream stays open");
        emissions.push((start.elapsed().as_millis() as u64, state));
    }

    // The repeat A inside the window is coalesced, never emitted on its own.
    assert_eq!(
        emissions,
        vec![(0, INITIAL), (550, STATE_A), (1100, STATE_B)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_oscillation_back_to_last_emitted_is_suppressed() {
    let source = timed_emissions(vec![
        (0, STATE_A),
        (50, STATE_B),
        (100, STATE_A),
    ])
    .chain(stream::pending());

    let mut settled = source
        .debounce_distinct(Duration::from_millis(500))
        .boxed();

    assert_eq!(settled.next().await, Some(STATE_A));

    // B was replaced by A before settling, and A equals the last emission:
    // nothing further comes out.
    let next = tokio::time::timeout(Duration::from_millis(2000), settled.next()).await;
    assert!(next.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_pending_value_is_flushed_when_the_stream_ends() {
    let start = Instant::now();
    let mut settled = stream::iter(vec![INITIAL, STATE_A])
        .debounce_distinct(Duration::from_millis(500))
        .boxed();

    assert_eq!(settled.next().await, Some(INITIAL));
    assert_eq!(settled.next().await, Some(STATE_A));
    assert_eq!(settled.next().await, None);
    // The trailing value does not wait out the debounce window.
    assert!(start.elapsed() < Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_duplicate_of_last_emitted_never_arms_the_timer() {
    let source = timed_emissions(vec![(0, STATE_A), (50, STATE_A)]).chain(stream::pending());

    let mut settled = source
        .debounce_distinct(Duration::from_millis(500))
        .boxed();

    assert_eq!(settled.next().await, Some(STATE_A));
    let next = tokio::time::timeout(Duration::from_millis(2000), settled.next()).await;
    assert!(next.is_err());
}
