use std::future::Future;
use std::time::Duration;

use futures_signals::signal::{MutableSignalCloned, SignalStream};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::produce::ProducerResult;
use crate::resource::{AsyncResource, ResourceBuilder};
use crate::state::{ResourceState, Status};
use crate::OverlapPolicy;

/// Fixed-interval re-triggering layered over an [`AsyncResource`] pinned to
/// [`OverlapPolicy::Exhaust`]: a tick or a manual [`Poller::refresh`] landing
/// while the previous attempt is still in flight is dropped, never queued.
///
/// The first tick fires immediately. There is no per-attempt deadline; a
/// producer that outlives the interval simply causes ticks to be dropped
/// until it settles.
pub struct Poller<T: Clone + Send + Sync + 'static> {
    resource: AsyncResource<T>,
    ticker: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> Poller<T> {
    pub fn new<F, Fut, R>(interval: Duration, producer: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ProducerResult<T> + Send + 'static,
    {
        Self::with_options(interval, ResourceBuilder::new(), producer)
    }

    /// Build with extra resource options (initial value, hooks). The overlap
    /// policy and laziness are owned by the poller and cannot be overridden.
    pub fn with_options<F, Fut, R>(
        interval: Duration,
        options: ResourceBuilder<T>,
        producer: F,
    ) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ProducerResult<T> + Send + 'static,
    {
        let resource = options
            .policy(OverlapPolicy::Exhaust)
            .lazy(true)
            .build(producer);

        let ticker = CancellationToken::new();
        let tick_guard = ticker.clone();
        let trigger = resource.trigger_handle();
        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = tick_guard.cancelled() => break,
                    _ = ticks.tick() => {
                        debug!("poll tick");
                        trigger();
                    }
                }
            }
        });

        Poller { resource, ticker }
    }

    pub fn state(&self) -> ResourceState<T> {
        self.resource.state()
    }

    pub fn status(&self) -> Status {
        self.resource.status()
    }

    pub fn to_stream(
        &self,
    ) -> SignalStream<MutableSignalCloned<ResourceState<T>>> {
        self.resource.to_stream()
    }

    /// Manual refresh, subject to the same in-flight dropping as a tick.
    pub fn refresh(&self) {
        self.resource.trigger();
    }

    /// Stop ticking and dispose the underlying resource. Idempotent.
    pub fn dispose(&self) {
        self.ticker.cancel();
        self.resource.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.resource.is_disposed()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for Poller<T> {
    fn drop(&mut self) {
        self.ticker.cancel();
    }
}
