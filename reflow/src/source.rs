use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use futures_signals::signal::{Mutable, SignalExt};

/// Minimal capability contract for a reactive dependency: read the current
/// value, subscribe to changes, unsubscribe by dropping the stream.
///
/// `changes()` emits the current value immediately when the source has one
/// (signal semantics), then every future value. `current()` returns `None`
/// while a push source has not emitted yet, which is what makes combined
/// outputs withhold until every member is ready.
pub trait Source: Send + Sync + 'static {
    type Item: Clone + Send + 'static;

    fn current(&self) -> Option<Self::Item>;

    fn changes(&self) -> BoxStream<'static, Self::Item>;
}

/// Shareable type-erased source handle, used by the homogeneous combinators.
pub type DynSource<T> = Arc<dyn Source<Item = T>>;

impl<T: Clone + Send + 'static> Source for Arc<dyn Source<Item = T>> {
    type Item = T;

    fn current(&self) -> Option<T> {
        (**self).current()
    }

    fn changes(&self) -> BoxStream<'static, T> {
        (**self).changes()
    }
}

/// Push-based input cell. Starts unseeded unless built with
/// [`Input::with_value`]; consecutive equal pushes are deduplicated per
/// subscriber, so they never cause a redundant recombination downstream.
#[derive(Debug)]
pub struct Input<T: Clone> {
    inner: Mutable<Option<T>>,
}

impl<T: Clone> Clone for Input<T> {
    fn clone(&self) -> Self {
        Input {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Default for Input<T> {
    fn default() -> Self {
        Input {
            inner: Mutable::new(None),
        }
    }
}

impl<T: Clone> Input<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(value: T) -> Self {
        Input {
            inner: Mutable::new(Some(value)),
        }
    }

    pub fn set(&self, value: T) {
        self.inner.set(Some(value));
    }

    pub fn get(&self) -> Option<T> {
        self.inner.get_cloned()
    }
}

impl<T> Source for Input<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Item = T;

    fn current(&self) -> Option<T> {
        self.inner.get_cloned()
    }

    fn changes(&self) -> BoxStream<'static, T> {
        self.inner
            .signal_cloned()
            .dedupe_cloned()
            .to_stream()
            .filter_map(|value| async move { value })
            .boxed()
    }
}

/// Pure synchronous accessor. Has no change stream of its own beyond a single
/// subscription-time emission; combinators re-read it on every recombination
/// instead, since there is no way to know whether the underlying value moved
/// without invoking it again.
pub struct Accessor<T> {
    read: Arc<dyn Fn() -> T + Send + Sync>,
}

impl<T> Clone for Accessor<T> {
    fn clone(&self) -> Self {
        Accessor {
            read: self.read.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Accessor<T> {
    pub fn new(read: impl Fn() -> T + Send + Sync + 'static) -> Self {
        Accessor {
            read: Arc::new(read),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Source for Accessor<T> {
    type Item = T;

    fn current(&self) -> Option<T> {
        Some((self.read)())
    }

    fn changes(&self) -> BoxStream<'static, T> {
        let read = self.read.clone();
        stream::once(async move { read() }).boxed()
    }
}

/// At-most-once event source. Seeded with a `None` placeholder so a combined
/// output containing it can emit immediately instead of withholding forever;
/// after [`OneShot::fire`] the item becomes `Some(value)`. Repeat fires are
/// ignored.
#[derive(Debug)]
pub struct OneShot<T: Clone> {
    inner: Mutable<Option<T>>,
}

impl<T: Clone> Clone for OneShot<T> {
    fn clone(&self) -> Self {
        OneShot {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> Default for OneShot<T> {
    fn default() -> Self {
        OneShot {
            inner: Mutable::new(None),
        }
    }
}

impl<T: Clone> OneShot<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire the event. Returns `false` if it already fired.
    pub fn fire(&self, value: T) -> bool {
        let mut slot = self.inner.lock_mut();
        if slot.is_some() {
            return false;
        }
        *slot = Some(value);
        true
    }

    pub fn fired(&self) -> bool {
        self.inner.lock_ref().is_some()
    }
}

impl<T> Source for OneShot<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    type Item = Option<T>;

    fn current(&self) -> Option<Option<T>> {
        Some(self.inner.get_cloned())
    }

    fn changes(&self) -> BoxStream<'static, Option<T>> {
        self.inner
            .signal_cloned()
            .dedupe_cloned()
            .to_stream()
            .boxed()
    }
}
