//! Request-lifecycle status bus
//!
//! A single logical channel (`ajax:status`) carrying `StatusEvent`s for
//! every request, multiplexed by the caller-chosen context string. One
//! subscriber can therefore watch all request activity in the process.
//!
//! Delivery is synchronous: a broadcast invokes every handler registered
//! at that moment, in registration order, before it returns. Nothing is
//! buffered or replayed, so a handler registered after a broadcast never
//! sees it.

use crate::error::TransportError;
use crate::types::StatusEvent;
use futures::Stream;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;

/// Logical name of the status channel
pub const STATUS_CHANNEL: &str = "ajax:status";

type Handler = Arc<dyn Fn(&StatusEvent) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    id: u64,
    // Cleared under the registry write lock by `unsubscribe`; checked right
    // before each call so an in-progress broadcast skips detached handlers.
    active: Arc<AtomicBool>,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: Vec<Entry>,
}

/// Publish/subscribe channel for request lifecycle events
///
/// Cheap to clone; clones share the same subscriber registry. Construct
/// one per application and hand it to every `RequestRunner` and observer
/// that should share it.
#[derive(Clone, Default)]
pub struct StatusBus {
    registry: Arc<RwLock<Registry>>,
}

impl StatusBus {
    /// Create a bus with no subscribers
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce that a request has started
    pub fn broadcast_loading(&self, context: &str) {
        self.broadcast(StatusEvent::loading(context));
    }

    /// Announce that a request completed successfully
    pub fn broadcast_success(&self, context: &str) {
        self.broadcast(StatusEvent::success(context));
    }

    /// Announce that a request failed
    pub fn broadcast_error(&self, context: &str, info: TransportError) {
        self.broadcast(StatusEvent::error(context, info));
    }

    /// Deliver an event to every current subscriber, returning how many
    /// handlers were invoked
    ///
    /// Handlers run without the registry lock held, so they may subscribe
    /// or unsubscribe freely. A handler registered during a broadcast
    /// first hears the next one; a handler detached during a broadcast,
    /// from any thread, is skipped if delivery has not yet reached it.
    /// A panicking handler is logged and skipped, and delivery continues.
    pub fn broadcast(&self, event: StatusEvent) -> usize {
        let handlers: Vec<Entry> = self.read().handlers.clone();

        tracing::trace!(
            channel = STATUS_CHANNEL,
            status = %event.status,
            context = %event.context,
            subscribers = handlers.len(),
            "Broadcasting status"
        );

        let mut delivered = 0;
        for entry in &handlers {
            if !entry.active.load(Ordering::Acquire) {
                continue;
            }
            delivered += 1;
            if catch_unwind(AssertUnwindSafe(|| (entry.handler)(&event))).is_err() {
                tracing::error!(
                    channel = STATUS_CHANNEL,
                    status = %event.status,
                    context = %event.context,
                    "Status handler panicked"
                );
            }
        }

        delivered
    }

    /// Register a handler for all status events
    ///
    /// The handler stays attached until `Subscription::unsubscribe` is
    /// called; dropping the handle leaves it attached.
    pub fn on_status<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        let id = {
            let mut registry = self.write();
            let id = registry.next_id;
            registry.next_id += 1;
            registry.handlers.push(Entry {
                id,
                active: Arc::new(AtomicBool::new(true)),
                handler: Arc::new(handler),
            });
            id
        };

        tracing::debug!(channel = STATUS_CHANNEL, subscription = id, "Status handler registered");

        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
        }
    }

    /// Subscribe as an async stream of events
    ///
    /// The stream detaches from the bus when dropped.
    pub fn stream(&self) -> StatusStream {
        let (tx, rx) = mpsc::unbounded_channel();
        let subscription = self.on_status(move |event| {
            let _ = tx.send(event.clone());
        });
        StatusStream {
            inner: UnboundedReceiverStream::new(rx),
            subscription,
        }
    }

    /// Number of currently attached handlers
    pub fn subscriber_count(&self) -> usize {
        self.read().handlers.len()
    }

    // Handlers never run under the lock, so poisoning can only come from a
    // panic inside the registry bookkeeping itself; the data stays valid.
    fn read(&self) -> RwLockReadGuard<'_, Registry> {
        self.registry.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Registry> {
        self.registry.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for StatusBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusBus")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// Handle to a registered status handler
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    registry: Weak<RwLock<Registry>>,
}

impl Subscription {
    /// Detach the handler from the bus
    ///
    /// Returns `true` if the handler was still attached. Calling it again
    /// is a no-op.
    pub fn unsubscribe(&self) -> bool {
        let Some(registry) = self.registry.upgrade() else {
            return false;
        };
        let mut registry = registry.write().unwrap_or_else(|e| e.into_inner());
        let Some(pos) = registry.handlers.iter().position(|e| e.id == self.id) else {
            return false;
        };
        let entry = registry.handlers.remove(pos);
        entry.active.store(false, Ordering::Release);
        tracing::debug!(channel = STATUS_CHANNEL, subscription = self.id, "Status handler removed");
        true
    }

    /// Whether the handler is still attached
    pub fn is_active(&self) -> bool {
        self.registry.upgrade().is_some_and(|registry| {
            registry
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .handlers
                .iter()
                .any(|e| e.id == self.id)
        })
    }
}

/// Async stream of status events
///
/// Events are queued from the moment the stream is created; the stream
/// ends only if the bus is dropped.
pub struct StatusStream {
    inner: UnboundedReceiverStream<StatusEvent>,
    subscription: Subscription,
}

impl Stream for StatusStream {
    type Item = StatusEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<StatusEvent>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

impl Drop for StatusStream {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Status;
    use std::sync::Mutex;

    fn recorder(bus: &StatusBus) -> (Subscription, Arc<Mutex<Vec<StatusEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let sub = bus.on_status(move |e| sink.lock().unwrap().push(e.clone()));
        (sub, seen)
    }

    #[test]
    fn test_broadcast_without_subscribers_is_noop() {
        let bus = StatusBus::new();
        assert_eq!(bus.broadcast(StatusEvent::loading("x")), 0);
        bus.broadcast_success("x");
    }

    #[test]
    fn test_broadcast_variants() {
        let bus = StatusBus::new();
        let (_sub, seen) = recorder(&bus);

        bus.broadcast_loading("users");
        bus.broadcast_success("users");
        bus.broadcast_error("users", TransportError::Aborted);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 3);
        assert_eq!(seen[0], StatusEvent::loading("users"));
        assert_eq!(seen[1].status, Status::Success);
        assert!(seen[1].info.is_none());
        assert_eq!(seen[2].status, Status::Error);
        assert_eq!(seen[2].info, Some(TransportError::Aborted));
    }

    #[test]
    fn test_registration_order() {
        let bus = StatusBus::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let subs: Vec<_> = (0..4)
            .map(|i| {
                let order = order.clone();
                bus.on_status(move |_| order.lock().unwrap().push(i))
            })
            .collect();

        assert_eq!(bus.broadcast(StatusEvent::loading("x")), 4);
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
        assert_eq!(subs.len(), 4);
    }

    #[test]
    fn test_unsubscribe() {
        let bus = StatusBus::new();
        let (sub, seen) = recorder(&bus);
        assert!(sub.is_active());

        bus.broadcast_loading("a");
        assert!(sub.unsubscribe());
        assert!(!sub.unsubscribe());
        assert!(!sub.is_active());
        bus.broadcast_success("a");

        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_dropping_handle_keeps_handler() {
        let bus = StatusBus::new();
        let (sub, seen) = recorder(&bus);
        drop(sub);
        bus.broadcast_loading("a");
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_clones_share_registry() {
        let bus = StatusBus::new();
        let other = bus.clone();
        let (_sub, seen) = recorder(&other);
        bus.broadcast_loading("shared");
        assert_eq!(seen.lock().unwrap().len(), 1);
        assert_eq!(bus.subscriber_count(), 1);
    }

    #[test]
    fn test_reentrant_subscribe_and_unsubscribe() {
        let bus = StatusBus::new();
        let late_hits = Arc::new(Mutex::new(0));
        let victim_hits = Arc::new(Mutex::new(0));

        let victim = {
            let hits = victim_hits.clone();
            Arc::new(bus.on_status(move |_| *hits.lock().unwrap() += 1))
        };

        let inner_bus = bus.clone();
        let hits = late_hits.clone();
        let victim_handle = victim.clone();
        let _adder = bus.on_status(move |e| {
            if e.status == Status::Loading {
                victim_handle.unsubscribe();
                let hits = hits.clone();
                let _ = inner_bus.on_status(move |_| *hits.lock().unwrap() += 1);
            }
        });

        // Changes made during delivery apply from the next broadcast
        bus.broadcast_loading("x");
        assert_eq!(*victim_hits.lock().unwrap(), 1);
        assert_eq!(*late_hits.lock().unwrap(), 0);

        bus.broadcast_success("x");
        assert_eq!(*victim_hits.lock().unwrap(), 1);
        assert_eq!(*late_hits.lock().unwrap(), 1);
    }

    #[test]
    fn test_unsubscribe_from_other_thread_during_broadcast() {
        use std::sync::mpsc;

        let bus = StatusBus::new();
        let (entered_tx, entered_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let entered_tx = Mutex::new(entered_tx);
        let release_rx = Mutex::new(release_rx);

        let _blocker = bus.on_status(move |_| {
            entered_tx.lock().unwrap().send(()).unwrap();
            release_rx.lock().unwrap().recv().unwrap();
        });
        let (victim, seen) = recorder(&bus);

        let sender = bus.clone();
        let broadcaster = std::thread::spawn(move || sender.broadcast(StatusEvent::loading("x")));

        // The snapshot is taken and delivery is parked inside the first handler
        entered_rx.recv().unwrap();
        assert!(victim.unsubscribe());
        release_tx.send(()).unwrap();

        assert_eq!(broadcaster.join().unwrap(), 1);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let bus = StatusBus::new();
        let _bad = bus.on_status(|_| panic!("handler failure"));
        let (_sub, seen) = recorder(&bus);

        assert_eq!(bus.broadcast(StatusEvent::loading("x")), 2);
        assert_eq!(seen.lock().unwrap().len(), 1);

        bus.broadcast_success("x");
        assert_eq!(seen.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_unsubscribe_after_bus_dropped() {
        let bus = StatusBus::new();
        let sub = bus.on_status(|_| {});
        drop(bus);
        assert!(!sub.is_active());
        assert!(!sub.unsubscribe());
    }

    #[tokio::test]
    async fn test_stream_receives_events() {
        use futures::StreamExt;

        let bus = StatusBus::new();
        let mut stream = bus.stream();
        assert_eq!(bus.subscriber_count(), 1);

        bus.broadcast_loading("s");
        bus.broadcast_error(
            "s",
            TransportError::Network {
                message: "refused".to_string(),
                timeout: false,
            },
        );

        let first = stream.next().await.unwrap();
        assert_eq!(first.status, Status::Loading);
        let second = stream.next().await.unwrap();
        assert_eq!(second.status, Status::Error);

        drop(stream);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
