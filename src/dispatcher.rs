//! Delivery of lifecycle events to subscribers.
//!
//! A [`Dispatcher`] owns a registry mapping each [`EventKind`] to an ordered
//! list of subscriber callbacks. The client builds one dispatcher when it is
//! constructed, registers the configured [`EventListener`] for both event
//! kinds, and only reads from it afterwards, so concurrent calls never observe
//! registration changes.

use crate::events::{EventKind, LifecycleEvent, RequestSentEvent, ResponseReceivedEvent};
use crate::{Error, Result};
use std::collections::HashMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// The error type listener callbacks may return.
pub type ListenerError = Box<dyn std::error::Error + Send + Sync>;

/// A subscriber callback.
pub type Callback =
    Arc<dyn Fn(&LifecycleEvent) -> std::result::Result<(), ListenerError> + Send + Sync>;

/// Receives lifecycle events for every call made by a client.
///
/// Both methods default to doing nothing, so implementors only override the
/// events they care about. Errors and panics raised by a listener are
/// logged and never fail the call.
///
/// # Examples
///
/// ```
/// use shipengine::dispatcher::{EventListener, ListenerError};
/// use shipengine::events::RequestSentEvent;
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// #[derive(Default)]
/// struct CountingListener(AtomicUsize);
///
/// impl EventListener for CountingListener {
///     fn on_request_sent(&self, _event: &RequestSentEvent) -> Result<(), ListenerError> {
///         self.0.fetch_add(1, Ordering::SeqCst);
///         Ok(())
///     }
/// }
/// ```
pub trait EventListener: Send + Sync {
    /// Called before every attempt of a call.
    fn on_request_sent(&self, _event: &RequestSentEvent) -> std::result::Result<(), ListenerError> {
        Ok(())
    }

    /// Called once when a call completes successfully.
    fn on_response_received(
        &self,
        _event: &ResponseReceivedEvent,
    ) -> std::result::Result<(), ListenerError> {
        Ok(())
    }
}

/// A listener that logs every event through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl EventListener for LoggingListener {
    fn on_request_sent(&self, event: &RequestSentEvent) -> std::result::Result<(), ListenerError> {
        tracing::info!(
            request_id = %event.request_id,
            url = %event.url,
            retry = event.retry,
            timeout_secs = event.timeout.as_secs(),
            "{}",
            event.message
        );
        Ok(())
    }

    fn on_response_received(
        &self,
        event: &ResponseReceivedEvent,
    ) -> std::result::Result<(), ListenerError> {
        tracing::info!(
            request_id = %event.request_id,
            status = event.status_code,
            retry = event.retry,
            elapsed_ms = event.elapsed.as_millis(),
            "{}",
            event.message
        );
        Ok(())
    }
}

/// A callback that failed while an event was being delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryFailure {
    /// The kind of event being delivered.
    pub kind: EventKind,
    /// The subscriber whose callback failed.
    pub subscriber_id: String,
    /// The error the callback returned.
    pub error: String,
}

struct Subscription {
    id: String,
    callback: Callback,
}

/// Routes lifecycle events to registered callbacks.
///
/// Only event kinds declared at construction can be registered or dispatched.
#[derive(Default)]
pub struct Dispatcher {
    registry: HashMap<EventKind, Vec<Subscription>>,
}

impl Dispatcher {
    /// The subscriber id used for the listener registered by [`Dispatcher::for_listener`].
    pub const LISTENER_ID: &'static str = "event-listener";

    /// Creates a dispatcher accepting the given event kinds, with no subscribers.
    pub fn new(kinds: impl IntoIterator<Item = EventKind>) -> Self {
        Self {
            registry: kinds.into_iter().map(|kind| (kind, Vec::new())).collect(),
        }
    }

    /// Creates a dispatcher for both event kinds with `listener` subscribed to each.
    pub fn for_listener(listener: Arc<dyn EventListener>) -> Self {
        let mut dispatcher = Self::new([EventKind::RequestSent, EventKind::ResponseReceived]);
        dispatcher.register_listener(Self::LISTENER_ID, listener);
        dispatcher
    }

    /// Registers `callback` for `kind` under `subscriber_id`.
    ///
    /// Registering an id that is already present replaces its callback and
    /// keeps its position in the delivery order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if `kind` was not declared for this dispatcher.
    pub fn register(
        &mut self,
        kind: EventKind,
        subscriber_id: impl Into<String>,
        callback: Callback,
    ) -> Result<()> {
        if !self.registry.contains_key(&kind) {
            return Err(unknown_kind(kind));
        }
        self.insert(kind, subscriber_id.into(), callback);
        Ok(())
    }

    /// Registers an [`EventListener`] for every declared event kind.
    pub fn register_listener(
        &mut self,
        subscriber_id: impl Into<String>,
        listener: Arc<dyn EventListener>,
    ) {
        let subscriber_id = subscriber_id.into();
        let kinds: Vec<EventKind> = self.registry.keys().copied().collect();
        for kind in kinds {
            self.insert(kind, subscriber_id.clone(), listener_callback(&listener));
        }
    }

    /// Removes the subscriber from `kind`. Returns `true` if it was registered.
    pub fn unregister(&mut self, kind: EventKind, subscriber_id: &str) -> bool {
        match self.registry.get_mut(&kind) {
            Some(subscriptions) => {
                let before = subscriptions.len();
                subscriptions.retain(|s| s.id != subscriber_id);
                subscriptions.len() != before
            }
            None => false,
        }
    }

    /// Returns the ids subscribed to `kind`, in delivery order.
    pub fn subscribers(&self, kind: EventKind) -> Vec<&str> {
        self.registry
            .get(&kind)
            .map(|subs| subs.iter().map(|s| s.id.as_str()).collect())
            .unwrap_or_default()
    }

    /// Delivers `event` to every subscriber of its kind, in registration order.
    ///
    /// A failing callback does not prevent delivery to the ones after it; all
    /// failures are returned once every callback has run. A callback that
    /// panics is reported as a failure the same way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the event's kind was not declared
    /// for this dispatcher.
    pub fn dispatch(&self, event: &LifecycleEvent) -> Result<Vec<DeliveryFailure>> {
        let kind = event.kind();
        let subscriptions = self.registry.get(&kind).ok_or_else(|| unknown_kind(kind))?;

        let failures = subscriptions
            .iter()
            .filter_map(|subscription| {
                let outcome =
                    panic::catch_unwind(AssertUnwindSafe(|| (subscription.callback)(event)));
                let error = match outcome {
                    Ok(Ok(())) => return None,
                    Ok(Err(e)) => e.to_string(),
                    Err(payload) => panic_message(payload.as_ref()),
                };
                Some(DeliveryFailure {
                    kind,
                    subscriber_id: subscription.id.clone(),
                    error,
                })
            })
            .collect();

        Ok(failures)
    }

    fn insert(&mut self, kind: EventKind, id: String, callback: Callback) {
        let subscriptions = self.registry.entry(kind).or_default();
        match subscriptions.iter_mut().find(|s| s.id == id) {
            Some(existing) => existing.callback = callback,
            None => subscriptions.push(Subscription { id, callback }),
        }
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for (kind, subs) in &self.registry {
            let ids: Vec<&str> = subs.iter().map(|s| s.id.as_str()).collect();
            map.entry(kind, &ids);
        }
        map.finish()
    }
}

fn listener_callback(listener: &Arc<dyn EventListener>) -> Callback {
    let listener = Arc::clone(listener);
    Arc::new(move |event: &LifecycleEvent| match event {
        LifecycleEvent::RequestSent(e) => listener.on_request_sent(e),
        LifecycleEvent::ResponseReceived(e) => listener.on_response_received(e),
    })
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic");
    format!("listener panicked: {}", detail)
}

fn unknown_kind(kind: EventKind) -> Error {
    Error::configuration(format!(
        "Event type [{}] is not known to this dispatcher.",
        kind
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::HeaderSnapshot;
    use std::sync::Mutex;
    use std::time::Duration;

    fn sent_event() -> LifecycleEvent {
        RequestSentEvent::new(
            "req_1",
            "Calling the ShipEngine test API at http://localhost",
            "http://localhost",
            HeaderSnapshot::new(),
            serde_json::Value::Null,
            0,
            Duration::from_secs(5),
        )
        .into()
    }

    fn recording(log: &Arc<Mutex<Vec<String>>>, name: &'static str) -> Callback {
        let log = Arc::clone(log);
        Arc::new(move |_event: &LifecycleEvent| -> std::result::Result<(), ListenerError> {
            log.lock().unwrap().push(name.to_string());
            Ok(())
        })
    }

    #[test]
    fn test_dispatch_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new([EventKind::RequestSent]);
        dispatcher.register(EventKind::RequestSent, "b", recording(&log, "b")).unwrap();
        dispatcher.register(EventKind::RequestSent, "a", recording(&log, "a")).unwrap();
        dispatcher.register(EventKind::RequestSent, "c", recording(&log, "c")).unwrap();

        let failures = dispatcher.dispatch(&sent_event()).unwrap();
        assert!(failures.is_empty());
        assert_eq!(*log.lock().unwrap(), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_reregistering_keeps_position() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new([EventKind::RequestSent]);
        dispatcher.register(EventKind::RequestSent, "first", recording(&log, "old")).unwrap();
        dispatcher.register(EventKind::RequestSent, "second", recording(&log, "second")).unwrap();
        dispatcher.register(EventKind::RequestSent, "first", recording(&log, "new")).unwrap();

        dispatcher.dispatch(&sent_event()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["new", "second"]);
        assert_eq!(dispatcher.subscribers(EventKind::RequestSent), vec!["first", "second"]);
    }

    #[test]
    fn test_failing_callback_does_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new([EventKind::RequestSent]);
        dispatcher
            .register(
                EventKind::RequestSent,
                "broken",
                Arc::new(
                    |_event: &LifecycleEvent| -> std::result::Result<(), ListenerError> {
                        Err("listener exploded".into())
                    },
                ),
            )
            .unwrap();
        dispatcher.register(EventKind::RequestSent, "after", recording(&log, "after")).unwrap();

        let failures = dispatcher.dispatch(&sent_event()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(
            failures,
            vec![DeliveryFailure {
                kind: EventKind::RequestSent,
                subscriber_id: "broken".to_string(),
                error: "listener exploded".to_string(),
            }]
        );
    }

    #[test]
    fn test_panicking_callback_does_not_stop_delivery() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new([EventKind::RequestSent]);
        dispatcher
            .register(
                EventKind::RequestSent,
                "panics",
                Arc::new(
                    |_event: &LifecycleEvent| -> std::result::Result<(), ListenerError> {
                        panic!("listener blew up")
                    },
                ),
            )
            .unwrap();
        dispatcher.register(EventKind::RequestSent, "after", recording(&log, "after")).unwrap();

        let failures = dispatcher.dispatch(&sent_event()).unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["after"]);
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].subscriber_id, "panics");
        assert_eq!(failures[0].error, "listener panicked: listener blew up");
    }

    #[test]
    fn test_undeclared_kind_is_configuration_error() {
        let mut dispatcher = Dispatcher::new([EventKind::ResponseReceived]);
        assert!(matches!(
            dispatcher.dispatch(&sent_event()),
            Err(Error::Configuration(_))
        ));

        let callback: Callback =
            Arc::new(|_event: &LifecycleEvent| -> std::result::Result<(), ListenerError> { Ok(()) });
        assert!(matches!(
            dispatcher.register(EventKind::RequestSent, "x", callback),
            Err(Error::Configuration(_))
        ));
    }

    #[test]
    fn test_unregister() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut dispatcher = Dispatcher::new([EventKind::RequestSent]);
        dispatcher.register(EventKind::RequestSent, "gone", recording(&log, "gone")).unwrap();

        assert!(dispatcher.unregister(EventKind::RequestSent, "gone"));
        assert!(!dispatcher.unregister(EventKind::RequestSent, "gone"));
        assert!(!dispatcher.unregister(EventKind::ResponseReceived, "gone"));

        dispatcher.dispatch(&sent_event()).unwrap();
        assert!(log.lock().unwrap().is_empty());
    }

    #[test]
    fn test_for_listener_routes_by_kind() {
        #[derive(Default)]
        struct Recorder(Mutex<Vec<EventKind>>);

        impl EventListener for Recorder {
            fn on_request_sent(
                &self,
                event: &RequestSentEvent,
            ) -> std::result::Result<(), ListenerError> {
                self.0.lock().unwrap().push(event.kind);
                Ok(())
            }
        }

        let recorder = Arc::new(Recorder::default());
        let dispatcher = Dispatcher::for_listener(recorder.clone());
        dispatcher.dispatch(&sent_event()).unwrap();

        assert_eq!(*recorder.0.lock().unwrap(), vec![EventKind::RequestSent]);
        assert_eq!(
            dispatcher.subscribers(EventKind::ResponseReceived),
            vec![Dispatcher::LISTENER_ID]
        );
    }
}
