//! Typeahead search over a combined (page, query) input: keystrokes are
//! debounced to a settled query, every settled change refetches with the
//! switch policy, and stale in-flight requests never clobber newer results.

use std::time::Duration;

use futures::StreamExt;
use reflow::{
    combine2, Accessor, Input, OverlapPolicy, ReflowStreamExt, ResourceBuilder, ResourceState,
};
use tokio::time::sleep;
use tracing::info;

async fn search(page: u32, query: String) -> Result<Vec<String>, String> {
    // Pretend network latency; longer queries are "rarer" and slower.
    sleep(Duration::from_millis(80 + 40 * query.len() as u64)).await;
    if query == "crash" {
        return Err("index unavailable".to_string());
    }
    Ok((0..3)
        .map(|n| format!("{query}-match-{}", page * 10 + n))
        .collect())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let keystrokes: Input<String> = Input::new();
    let settled_query: Input<String> = Input::new();
    let page: Input<u32> = Input::with_value(1);

    // Let rapid keystrokes settle before they reach the resource.
    tokio::spawn({
        use reflow::Source;
        let raw = keystrokes.changes();
        let settled_query = settled_query.clone();
        async move {
            let mut settled = Box::pin(raw.debounce_distinct(Duration::from_millis(200)));
            while let Some(query) = settled.next().await {
                settled_query.set(query);
            }
        }
    });

    let combined = combine2(
        combine2(page.clone(), settled_query.clone()),
        Accessor::new(|| 20u32), // page size, read fresh on every recombination
    );

    let results = ResourceBuilder::new()
        .policy(OverlapPolicy::Switch)
        .on_error(|_| Some(Vec::new())) // render an empty list on failure
        .build_with_source(combined, |((page, query), _size)| search(page, query));

    tokio::spawn({
        let mut states = results.to_stream();
        async move {
            while let Some(state) = states.next().await {
                match state {
                    ResourceState::Reloading(old) => {
                        info!("refreshing, still showing {} stale rows", old.len())
                    }
                    ResourceState::Resolved(rows) => info!(?rows, "resolved"),
                    other => info!(status = ?other.status(), "state"),
                }
            }
        }
    });

    // Simulated typing: interim values are coalesced by the debounce.
    for query in ["r", "ru", "rus", "rust"] {
        keystrokes.set(query.to_string());
        sleep(Duration::from_millis(60)).await;
    }
    sleep(Duration::from_millis(600)).await;

    // Page flip refetches with the same settled query.
    page.set(2);
    sleep(Duration::from_millis(600)).await;

    results.dispose();
}
