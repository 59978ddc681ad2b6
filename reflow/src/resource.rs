use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, BoxStream, StreamExt};
use futures_signals::signal::{Mutable, MutableSignalCloned, SignalExt, SignalStream};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::oneshot::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::overlap::{AttemptTracker, OverlapPolicy, TriggerDecision};
use crate::produce::ProducerResult;
use crate::source::Source;
use crate::state::{ResourceError, ResourceState, Status};

type Producer<T, I> =
    Arc<dyn Fn(I) -> BoxFuture<'static, Result<T, ResourceError>> + Send + Sync>;
type LoadingHook = Arc<dyn Fn() + Send + Sync>;
type SuccessHook<T> = Arc<dyn Fn(&T) + Send + Sync>;
type ErrorHook<T> = Arc<dyn Fn(&ResourceError) -> Option<T> + Send + Sync>;

enum Command<T: Clone> {
    Trigger,
    Read(tokio::sync::oneshot::Sender<ResourceState<T>>),
}

/// Configuration for an [`AsyncResource`]. Explicit named options instead of
/// overloaded entry points.
pub struct ResourceBuilder<T: Clone + Send + Sync + 'static> {
    initial_value: Option<T>,
    lazy: bool,
    policy: OverlapPolicy,
    on_loading: Option<LoadingHook>,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<T>>,
    throw_on_error: bool,
}

impl<T: Clone + Send + Sync + 'static> Default for ResourceBuilder<T> {
    fn default() -> Self {
        ResourceBuilder {
            initial_value: None,
            lazy: false,
            policy: OverlapPolicy::default(),
            on_loading: None,
            on_success: None,
            on_error: None,
            throw_on_error: false,
        }
    }
}

impl<T: Clone + Send + Sync + 'static> ResourceBuilder<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Value the resource starts with. The first attempt then enters
    /// `Reloading` instead of `Loading`, retaining this value.
    pub fn initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    /// Start in `Idle` and produce nothing until the first `trigger()` (or,
    /// for a sourced resource, the first dependency change after a trigger).
    pub fn lazy(mut self, lazy: bool) -> Self {
        self.lazy = lazy;
        self
    }

    pub fn policy(mut self, policy: OverlapPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Fired once per transition into `Loading`/`Reloading`. Runs on the
    /// driver task after the state write; anything it does to the resource is
    /// enqueued, never applied inline.
    pub fn on_loading(mut self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_loading = Some(Arc::new(hook));
        self
    }

    /// Fired once per transition into `Resolved`, including fallback
    /// promotions.
    pub fn on_success(mut self, hook: impl Fn(&T) + Send + Sync + 'static) -> Self {
        self.on_success = Some(Arc::new(hook));
        self
    }

    /// Offered every failed outcome before it settles into `Error`.
    /// Returning `Some(value)` promotes the attempt to `Resolved` with that
    /// fallback and no stored error; `None` stores the error.
    pub fn on_error(
        mut self,
        hook: impl Fn(&ResourceError) -> Option<T> + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(hook));
        self
    }

    /// After `on_error` declines, store the error and then panic on the
    /// driver task instead of only storing it. Opt-in "crash loudly"
    /// semantics; the resource is unusable afterwards.
    pub fn throw_on_error(mut self, throw: bool) -> Self {
        self.throw_on_error = throw;
        self
    }

    /// Build a manually triggered resource. The producer is re-invoked on
    /// every applied `trigger()` and needs no cleanup between calls.
    pub fn build<F, Fut, R>(self, producer: F) -> AsyncResource<T>
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ProducerResult<T> + Send + 'static,
    {
        let producer: Producer<T, ()> = Arc::new(move |_| {
            let future = producer();
            Box::pin(async move { future.await.into_outcome() })
        });
        let feed = SourceFeed {
            changes: stream::pending().boxed(),
            current: Arc::new(|| Some(())),
            reactive: false,
        };
        spawn_resource(self, producer, feed)
    }

    /// Build a resource re-triggered by every emission of `source`. The
    /// producer receives the latest combined input; a manual `trigger()`
    /// re-reads `source.current()` (synchronous accessors are re-read) and
    /// falls back to the last seen input.
    pub fn build_with_source<S, F, Fut, R>(self, source: S, producer: F) -> AsyncResource<T>
    where
        S: Source,
        F: Fn(S::Item) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = R> + Send + 'static,
        R: ProducerResult<T> + Send + 'static,
    {
        let producer: Producer<T, S::Item> = Arc::new(move |input| {
            let future = producer(input);
            Box::pin(async move { future.await.into_outcome() })
        });
        let source = Arc::new(source);
        let feed = SourceFeed {
            changes: source.changes().chain(stream::pending()).boxed(),
            current: {
                let source = source.clone();
                Arc::new(move || source.current())
            },
            reactive: true,
        };
        spawn_resource(self, producer, feed)
    }
}

/// Holder of one asynchronous resource: current state, trigger entry point,
/// overlap policy bookkeeping, and the driver task that owns all of it.
///
/// Dropping the handle disposes the resource.
pub struct AsyncResource<T: Clone + Send + Sync + 'static> {
    state: Mutable<ResourceState<T>>,
    commands: UnboundedSender<Command<T>>,
    shutdown: CancellationToken,
}

impl<T: Clone + Send + Sync + 'static> AsyncResource<T> {
    pub fn builder() -> ResourceBuilder<T> {
        ResourceBuilder::new()
    }

    /// Snapshot read. Always available, never blocks, never panics.
    pub fn state(&self) -> ResourceState<T> {
        self.state.get_cloned()
    }

    pub fn status(&self) -> Status {
        self.state.lock_ref().status()
    }

    pub fn to_signal(&self) -> MutableSignalCloned<ResourceState<T>> {
        self.state.signal_cloned()
    }

    pub fn to_stream(&self) -> SignalStream<MutableSignalCloned<ResourceState<T>>> {
        self.state.signal_cloned().to_stream()
    }

    /// Request a new attempt per the overlap policy. A no-op only under
    /// `Exhaust` while busy, or after disposal.
    pub fn trigger(&self) {
        let _ = self.commands.send(Command::Trigger);
    }

    pub(crate) fn trigger_handle(&self) -> impl Fn() + Send + Sync + 'static {
        let commands = self.commands.clone();
        move || {
            let _ = commands.send(Command::Trigger);
        }
    }

    /// State after every command queued so far has been applied. Errs once
    /// the resource is disposed.
    pub async fn await_state(&self) -> Result<ResourceState<T>, RecvError> {
        let (reply_tx, reply_rx) = tokio::sync::oneshot::channel();
        let _ = self.commands.send(Command::Read(reply_tx));
        reply_rx.await
    }

    /// Cancel in-flight attempts, detach from dependency sources, and turn
    /// subsequent `trigger()` calls into no-ops. Idempotent.
    pub fn dispose(&self) {
        self.shutdown.cancel();
    }

    pub fn is_disposed(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl<T: Clone + Send + Sync + 'static> Drop for AsyncResource<T> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct SourceFeed<I> {
    changes: BoxStream<'static, I>,
    current: Arc<dyn Fn() -> Option<I> + Send + Sync>,
    reactive: bool,
}

fn spawn_resource<T, I>(
    options: ResourceBuilder<T>,
    producer: Producer<T, I>,
    feed: SourceFeed<I>,
) -> AsyncResource<T>
where
    T: Clone + Send + Sync + 'static,
    I: Clone + Send + 'static,
{
    let initial_state = match options.initial_value {
        Some(value) => ResourceState::Resolved(value),
        None => ResourceState::Idle,
    };
    let state = Mutable::new(initial_state);
    let (command_tx, command_rx) = tokio::sync::mpsc::unbounded_channel();
    let (settled_tx, settled_rx) = tokio::sync::mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();

    let driver = Driver {
        state: state.clone(),
        producer,
        tracker: AttemptTracker::new(options.policy),
        tokens: HashMap::new(),
        backlog: VecDeque::new(),
        settled_tx,
        on_loading: options.on_loading,
        on_success: options.on_success,
        on_error: options.on_error,
        throw_on_error: options.throw_on_error,
        started: !options.lazy,
        latest_input: None,
        current: feed.current,
        reactive: feed.reactive,
    };
    tokio::spawn(driver.run(shutdown.clone(), command_rx, settled_rx, feed.changes));

    AsyncResource {
        state,
        commands: command_tx,
        shutdown,
    }
}

struct Driver<T: Clone + Send + Sync + 'static, I: Clone + Send + 'static> {
    state: Mutable<ResourceState<T>>,
    producer: Producer<T, I>,
    tracker: AttemptTracker,
    tokens: HashMap<u64, CancellationToken>,
    backlog: VecDeque<I>,
    settled_tx: UnboundedSender<(u64, Result<T, ResourceError>)>,
    on_loading: Option<LoadingHook>,
    on_success: Option<SuccessHook<T>>,
    on_error: Option<ErrorHook<T>>,
    throw_on_error: bool,
    started: bool,
    latest_input: Option<I>,
    current: Arc<dyn Fn() -> Option<I> + Send + Sync>,
    reactive: bool,
}

impl<T, I> Driver<T, I>
where
    T: Clone + Send + Sync + 'static,
    I: Clone + Send + 'static,
{
    async fn run(
        mut self,
        shutdown: CancellationToken,
        mut commands: UnboundedReceiver<Command<T>>,
        mut settled: UnboundedReceiver<(u64, Result<T, ResourceError>)>,
        mut changes: BoxStream<'static, I>,
    ) {
        // Eager sourceless start. Sourced resources start from the source's
        // subscription-time emission instead, so the first input is never
        // produced twice.
        if self.started && !self.reactive {
            if let Some(input) = (self.current)() {
                self.request(input);
            }
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    for token in self.tokens.values() {
                        token.cancel();
                    }
                    break;
                }
                Some((generation, outcome)) = settled.recv() => {
                    self.apply_settle(generation, outcome);
                }
                Some(command) = commands.recv() => match command {
                    Command::Trigger => self.on_manual_trigger(),
                    Command::Read(reply) => {
                        let _ = reply.send(self.state.get_cloned());
                    }
                },
                Some(input) = changes.next() => self.on_input(input),
            }
        }
    }

    fn on_manual_trigger(&mut self) {
        self.started = true;
        match (self.current)().or_else(|| self.latest_input.clone()) {
            Some(input) => self.request(input),
            None => debug!("trigger ignored: combined inputs not ready"),
        }
    }

    fn on_input(&mut self, input: I) {
        self.latest_input = Some(input.clone());
        if self.started {
            self.request(input);
        }
    }

    fn request(&mut self, input: I) {
        match self.tracker.on_trigger() {
            TriggerDecision::Drop => {
                debug!("attempt dropped while busy (exhaust policy)");
            }
            TriggerDecision::Queue => {
                self.backlog.push_back(input);
            }
            TriggerDecision::Start { generation, cancel } => {
                for stale in cancel {
                    if let Some(token) = self.tokens.remove(&stale) {
                        token.cancel();
                    }
                }
                self.enter_loading();
                self.spawn_attempt(generation, input);
            }
        }
    }

    fn enter_loading(&mut self) {
        let previous = self.state.get_cloned();
        if previous.is_loading() {
            // Overlapping attempt while already loading: no transition, the
            // loading hook must not re-fire.
            return;
        }
        let next = previous.into_loading();
        debug!(status = ?next.status(), "attempt starting");
        self.state.set(next);
        if let Some(hook) = &self.on_loading {
            hook();
        }
    }

    fn spawn_attempt(&mut self, generation: u64, input: I) {
        let token = CancellationToken::new();
        self.tokens.insert(generation, token.clone());
        let future = (self.producer)(input);
        let settled = self.settled_tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                outcome = future => {
                    let _ = settled.send((generation, outcome));
                }
            }
        });
    }

    fn apply_settle(&mut self, generation: u64, outcome: Result<T, ResourceError>) {
        self.tokens.remove(&generation);
        if !self.tracker.on_settle(generation) {
            // Late arrival from a cancelled attempt. Never touches state.
            debug!(generation, "stale attempt outcome discarded");
            return;
        }
        match outcome {
            Ok(value) => self.resolve(value),
            Err(error) => {
                let fallback = self.on_error.as_ref().and_then(|hook| hook(&error));
                match fallback {
                    Some(value) => {
                        debug!(%error, "failed attempt promoted to fallback value");
                        self.resolve(value);
                    }
                    None => {
                        warn!(%error, "attempt failed");
                        self.state.set(ResourceState::Error(error.clone()));
                        if self.throw_on_error {
                            panic!("resource attempt failed: {error}");
                        }
                    }
                }
            }
        }
        self.start_backlogged();
    }

    fn resolve(&mut self, value: T) {
        self.state.set(ResourceState::Resolved(value.clone()));
        if let Some(hook) = &self.on_success {
            hook(&value);
        }
    }

    fn start_backlogged(&mut self) {
        if self.tracker.policy() != OverlapPolicy::Concat || self.tracker.is_busy() {
            return;
        }
        if let Some(input) = self.backlog.pop_front() {
            if let TriggerDecision::Start { generation, .. } = self.tracker.on_queued_start() {
                self.enter_loading();
                self.spawn_attempt(generation, input);
            }
        }
    }
}
