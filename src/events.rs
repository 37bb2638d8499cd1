// Document-level pointer events.
//
// Components that need to react to interactions anywhere on the page (the
// typeahead closing on an outside click) subscribe here. A subscription is a
// guard: dropping it removes the listener, so every subscribe is paired with
// exactly one unsubscribe tied to the owner's lifetime.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Identity of a mounted component, used to decide whether a pointer-down
/// happened inside or outside of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        ElementId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

// `target` is the component the pointer landed in, None for the page background
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerDown {
    pub target: Option<ElementId>,
}

impl PointerDown {
    pub fn on(target: ElementId) -> Self {
        Self { target: Some(target) }
    }

    pub fn background() -> Self {
        Self { target: None }
    }
}

type Listener = Arc<dyn Fn(&PointerDown) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<u64, Listener>,
}

#[derive(Clone, Default)]
pub struct Document {
    registry: Arc<Mutex<Registry>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    // A panicking listener never runs under the lock, so the data is still consistent
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PointerDown) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.listeners.insert(id, Arc::new(listener));
        tracing::trace!(listener_id = id, "Document listener attached");
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    // Listeners are called outside the lock so they may subscribe or drop subscriptions
    pub fn dispatch(&self, event: PointerDown) {
        let listeners: Vec<Listener> = lock(&self.registry).listeners.values().cloned().collect();
        for listener in listeners {
            listener(&event);
        }
    }

    pub fn listener_count(&self) -> usize {
        lock(&self.registry).listeners.len()
    }
}

#[must_use = "dropping a Subscription detaches the listener immediately"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).listeners.remove(&self.id);
            tracing::trace!(listener_id = self.id, "Document listener detached");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn dropping_subscription_detaches_listener() {
        let document = Document::new();
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = hits.clone();
        let subscription = document.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(document.listener_count(), 1);

        document.dispatch(PointerDown::background());
        drop(subscription);
        document.dispatch(PointerDown::background());

        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(document.listener_count(), 0);
    }

    #[test]
    fn subscription_outliving_document_is_harmless() {
        let document = Document::new();
        let subscription = document.subscribe(|_| {});
        drop(document);
        drop(subscription);
    }

    #[test]
    fn element_ids_are_unique() {
        assert_ne!(ElementId::next(), ElementId::next());
    }
}
