use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use futures_core::stream::Stream;
use pin_project::pin_project;
use tokio::time::{sleep, Sleep};

/// Extension trait that provides additional utility methods for Stream types.
///
/// This trait is implemented for all types that implement the `Stream` trait.
pub trait ReflowStreamExt: Stream {
    /// Creates a stream that lets rapidly-changing structured state settle
    /// before emitting it.
    ///
    /// The first item passes through immediately. Afterwards each incoming
    /// item is held for `delay`; an item arriving within the window replaces
    /// the held one and restarts the timer, except that an item equal to the
    /// currently held one is coalesced without restarting it. When the timer
    /// fires, the held item is emitted unless it is equal to the last item
    /// that was **emitted** — so rapid oscillation back to a previously
    /// emitted value inside the window produces nothing at all. When the
    /// inner stream ends, a still-held item is flushed immediately.
    ///
    /// Typical use: a grid view state (paging, sorting, filters) that fires
    /// many interim values while the user types, feeding a resource that
    /// should only refetch on the settled end state.
    ///
    /// ## Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use futures_signals::signal::SignalExt;
    /// use reflow::ReflowStreamExt;
    ///
    /// async fn example() {
    ///     let stream = futures_signals::signal::always(0)
    ///         .to_stream()
    ///         .debounce_distinct(Duration::from_millis(500));
    ///
    ///     // Emits 0 immediately; later values settle for 500ms and are
    ///     // dropped when they equal the last emission.
    /// }
    /// ```
    fn debounce_distinct(self, delay: Duration) -> DebounceDistinct<Self>
    where
        Self::Item: Clone + PartialEq,
        Self: Sized,
    {
        DebounceDistinct {
            stream: self,
            delay,
            timer: None,
            last_emitted: None,
            held: None,
            done: false,
        }
    }
}

impl<T: ?Sized> ReflowStreamExt for T where T: Stream {}

/// Stream returned by [`ReflowStreamExt::debounce_distinct`].
#[pin_project(project = DebounceDistinctProj)]
#[must_use = "Streams do nothing unless polled"]
pub struct DebounceDistinct<S: Stream> {
    #[pin]
    stream: S,
    delay: Duration,
    #[pin]
    timer: Option<Sleep>,
    last_emitted: Option<S::Item>,
    held: Option<S::Item>,
    done: bool,
}

impl<S> Stream for DebounceDistinct<S>
where
    S: Stream,
    S::Item: Clone + PartialEq,
{
    type Item = S::Item;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let mut this = self.project();

        // Drain everything the inner stream has ready before consulting the
        // timer, so an item and a timer expiry at the same instant resolve
        // the same way regardless of wakeup order.
        while !*this.done {
            match this.stream.as_mut().poll_next(cx) {
                Poll::Ready(Some(item)) => {
                    if this.last_emitted.is_none() && this.held.is_none() {
                        // Initial value passes through undelayed.
                        *this.last_emitted = Some(item.clone());
                        return Poll::Ready(Some(item));
                    }
                    if this.held.as_ref() == Some(&item) {
                        // Coalesced; the running timer keeps its deadline.
                        continue;
                    }
                    if this.held.is_none() && this.last_emitted.as_ref() == Some(&item) {
                        continue;
                    }
                    *this.held = Some(item);
                    this.timer.as_mut().set(Some(sleep(*this.delay)));
                }
                Poll::Ready(None) => {
                    *this.done = true;
                }
                Poll::Pending => break,
            }
        }

        if *this.done {
            this.timer.as_mut().set(None);
            return match this.held.take() {
                Some(item) if this.last_emitted.as_ref() != Some(&item) => {
                    *this.last_emitted = Some(item.clone());
                    Poll::Ready(Some(item))
                }
                _ => Poll::Ready(None),
            };
        }

        if this.held.is_some() {
            if let Some(timer) = this.timer.as_mut().as_pin_mut() {
                if timer.poll(cx).is_ready() {
                    this.timer.as_mut().set(None);
                    if let Some(item) = this.held.take() {
                        if this.last_emitted.as_ref() != Some(&item) {
                            *this.last_emitted = Some(item.clone());
                            return Poll::Ready(Some(item));
                        }
                    }
                }
            }
        }

        Poll::Pending
    }
}
