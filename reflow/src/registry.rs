use crate::poll::Poller;
use crate::resource::AsyncResource;

/// Anything that can be shut down exactly once and tolerates being shut down
/// again.
pub trait Disposable: Send {
    fn dispose(&self);
}

impl<T: Clone + Send + Sync + 'static> Disposable for AsyncResource<T> {
    fn dispose(&self) {
        AsyncResource::dispose(self);
    }
}

impl<T: Clone + Send + Sync + 'static> Disposable for Poller<T> {
    fn dispose(&self) {
        Poller::dispose(self);
    }
}

/// Explicitly owned collection of resources, replacing any ambient/global
/// registry: the owner decides the lifetime, and dropping the registry
/// disposes everything it holds.
#[derive(Default)]
pub struct ResourceRegistry {
    items: Vec<Box<dyn Disposable>>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, item: impl Disposable + 'static) {
        self.items.push(Box::new(item));
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Dispose everything without dropping the handles. Idempotent.
    pub fn dispose_all(&self) {
        for item in &self.items {
            item.dispose();
        }
    }
}

impl Drop for ResourceRegistry {
    fn drop(&mut self) {
        self.dispose_all();
    }
}
