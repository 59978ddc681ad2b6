//! Dashboard metrics refreshed on a fixed interval, with a manual refresh
//! button and a registry owning every resource's lifetime.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use reflow::{Poller, ResourceBuilder, ResourceRegistry, ResourceState};
use tokio::time::sleep;
use tracing::info;

#[derive(Debug, Clone, PartialEq)]
struct Metrics {
    active_sessions: u64,
    queue_depth: u64,
}

async fn fetch_metrics(tick: u64) -> Metrics {
    sleep(Duration::from_millis(120)).await;
    Metrics {
        active_sessions: 40 + tick * 3,
        queue_depth: tick % 5,
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_target(false).init();

    let tick = Arc::new(AtomicU64::new(0));
    let options = ResourceBuilder::new().on_success(|metrics: &Metrics| {
        info!(sessions = metrics.active_sessions, "metrics updated");
    });
    let metrics = Poller::with_options(Duration::from_millis(500), options, {
        let tick = tick.clone();
        move || fetch_metrics(tick.fetch_add(1, Ordering::SeqCst))
    });

    tokio::spawn({
        let mut states = metrics.to_stream();
        async move {
            while let Some(state) = states.next().await {
                match state {
                    ResourceState::Reloading(stale) => info!(?stale, "refreshing"),
                    ResourceState::Resolved(fresh) => info!(?fresh, "resolved"),
                    other => info!(status = ?other.status(), "state"),
                }
            }
        }
    });

    // A refresh landing while a poll is in flight is dropped, so spamming
    // the button cannot pile up requests.
    sleep(Duration::from_millis(700)).await;
    metrics.refresh();
    metrics.refresh();

    sleep(Duration::from_millis(1300)).await;

    let mut registry = ResourceRegistry::new();
    registry.register(metrics);
    registry.dispose_all();
    info!("dashboard shut down");
}
