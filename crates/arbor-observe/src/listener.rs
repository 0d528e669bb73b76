//! The listener capability and its identity.

use std::sync::Arc;

use crate::event::EventIterator;

/// Receives the events of one bundle that pass the listener's filter.
///
/// Implementations run on the observation manager's dispatcher thread and
/// may call back into the manager, including removing themselves.
pub trait EventListener: Send + Sync {
    /// Called once per bundle with the matching events, in bundle order.
    fn on_event(&self, events: EventIterator);
}

/// Adapts a closure into an [`EventListener`].
pub struct FnListener<F>(F);

impl<F> EventListener for FnListener<F>
where
    F: Fn(EventIterator) + Send + Sync,
{
    fn on_event(&self, events: EventIterator) {
        (self.0)(events)
    }
}

/// Wraps a closure as a shareable listener handle.
pub fn listener_fn<F>(f: F) -> Arc<dyn EventListener>
where
    F: Fn(EventIterator) + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

/// Returns `true` if both handles refer to the same listener allocation.
///
/// Registration identity is the address of the shared listener, so clones
/// of one `Arc` are the same listener while two separate allocations of
/// equal closures are not.
pub fn same_listener(a: &Arc<dyn EventListener>, b: &Arc<dyn EventListener>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Iterator over the listeners registered with a manager.
pub type EventListenerIterator = arbor_types::RangeIter<Arc<dyn EventListener>>;
