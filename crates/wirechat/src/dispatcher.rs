//! Routes inbound envelopes to callbacks and the event stream.
//!
//! There is one slot per event kind. Registering a callback replaces the
//! previous one. The read task clones the handler it needs out of the
//! table and calls it with no lock held, so a callback may re-register
//! handlers or call back into the client.

use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::broadcast;
use wirechat_protocol::{EventKind, HistoryEvent, Inbound, MessageEvent, ProtocolError, UserEvent};

use crate::{ErrorKind, Event, StateEvent, WirechatError};

/// A registered callback.
pub type Handler<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

#[derive(Default)]
struct Handlers {
    message: Option<Handler<MessageEvent>>,
    user_joined: Option<Handler<UserEvent>>,
    user_left: Option<Handler<UserEvent>>,
    history: Option<Handler<HistoryEvent>>,
    error: Option<Handler<WirechatError>>,
    state: Option<Handler<StateEvent>>,
}

pub(crate) struct Dispatcher {
    handlers: RwLock<Handlers>,
    events: broadcast::Sender<Event>,
}

impl Dispatcher {
    pub(crate) fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(capacity.max(1));
        Self {
            handlers: RwLock::new(Handlers::default()),
            events,
        }
    }

    pub(crate) fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    pub(crate) fn set_message(&self, handler: Handler<MessageEvent>) {
        self.handlers.write().message = Some(handler);
    }

    pub(crate) fn set_user_joined(&self, handler: Handler<UserEvent>) {
        self.handlers.write().user_joined = Some(handler);
    }

    pub(crate) fn set_user_left(&self, handler: Handler<UserEvent>) {
        self.handlers.write().user_left = Some(handler);
    }

    pub(crate) fn set_history(&self, handler: Handler<HistoryEvent>) {
        self.handlers.write().history = Some(handler);
    }

    pub(crate) fn set_error(&self, handler: Handler<WirechatError>) {
        self.handlers.write().error = Some(handler);
    }

    pub(crate) fn set_state(&self, handler: Handler<StateEvent>) {
        self.handlers.write().state = Some(handler);
    }

    /// Handles one inbound envelope.
    pub(crate) fn dispatch(&self, envelope: Inbound) {
        if envelope.is_error() {
            let err = match envelope.error.as_ref() {
                Some(payload) => WirechatError::from(payload),
                None => ProtocolError::InvalidMessage("error envelope without error payload".into())
                    .into(),
            };
            tracing::debug!(code = %err.kind(), msg = err.message(), "server reported error");
            self.report_error(err);
            return;
        }

        if !envelope.is_event() {
            self.report_error(
                ProtocolError::InvalidMessage(format!("unexpected envelope type {:?}", envelope.kind))
                    .into(),
            );
            return;
        }

        let Some(kind) = envelope.event_kind() else {
            tracing::trace!(event = ?envelope.event, "dropping unknown event kind");
            return;
        };
        let data = envelope.data;

        match kind {
            EventKind::Message => {
                let handler = self.handlers.read().message.clone();
                self.deliver(kind, data, handler, Event::Message);
            }
            EventKind::UserJoined => {
                let handler = self.handlers.read().user_joined.clone();
                self.deliver(kind, data, handler, Event::UserJoined);
            }
            EventKind::UserLeft => {
                let handler = self.handlers.read().user_left.clone();
                self.deliver(kind, data, handler, Event::UserLeft);
            }
            EventKind::History => {
                let handler = self.handlers.read().history.clone();
                self.deliver(kind, data, handler, Event::History);
            }
        }
    }

    /// Sends `err` to the error callback and the event stream.
    pub(crate) fn report_error(&self, err: WirechatError) {
        let handler = self.handlers.read().error.clone();
        let _ = self.events.send(Event::Error(err.clone()));
        if let Some(handler) = handler {
            handler(err);
        }
    }

    /// Sends a transition to the state callback and the event stream.
    pub(crate) fn emit_state(&self, event: StateEvent) {
        let handler = self.handlers.read().state.clone();
        let _ = self.events.send(Event::StateChanged(event.clone()));
        if let Some(handler) = handler {
            handler(event);
        }
    }

    /// Decodes `data` only if someone is listening for it.
    fn deliver<T>(
        &self,
        kind: EventKind,
        data: Option<Value>,
        handler: Option<Handler<T>>,
        wrap: fn(T) -> Event,
    ) where
        T: DeserializeOwned + Clone,
    {
        let subscribed = self.events.receiver_count() > 0;
        if handler.is_none() && !subscribed {
            return;
        }

        let payload: T = match serde_json::from_value(data.unwrap_or(Value::Null)) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::debug!(event = %kind, error = %e, "failed to decode event payload");
                self.report_error(WirechatError::wrap(
                    ErrorKind::Serialization,
                    format!("failed to decode {kind} event"),
                    ProtocolError::Decode(e),
                ));
                return;
            }
        };

        if subscribed {
            let _ = self.events.send(wrap(payload.clone()));
        }
        if let Some(handler) = handler {
            handler(payload);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use serde_json::json;

    use super::*;
    use crate::ConnectionState;

    fn message_json() -> Value {
        json!({"id": 7, "room": "general", "user": "alice", "text": "hi", "ts": 1700000000})
    }

    /// Collects every value passed to a handler.
    fn recorder<T: Send + 'static>() -> (Handler<T>, Arc<Mutex<Vec<T>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (Arc::new(move |v: T| sink.lock().unwrap().push(v)), seen)
    }

    #[test]
    fn test_message_event_reaches_handler() {
        let dispatcher = Dispatcher::new(8);
        let (handler, seen) = recorder();
        dispatcher.set_message(handler);

        dispatcher.dispatch(Inbound::event(EventKind::Message, message_json()));

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].text, "hi");
        assert_eq!(seen[0].id, 7);
    }

    #[test]
    fn test_user_and_history_events() {
        let dispatcher = Dispatcher::new(8);
        let (joined, joined_seen) = recorder();
        let (left, left_seen) = recorder();
        let (history, history_seen) = recorder();
        dispatcher.set_user_joined(joined);
        dispatcher.set_user_left(left);
        dispatcher.set_history(history);

        let user = json!({"room": "r", "user": "bob"});
        dispatcher.dispatch(Inbound::event(EventKind::UserJoined, user.clone()));
        dispatcher.dispatch(Inbound::event(EventKind::UserLeft, user));
        dispatcher.dispatch(Inbound::event(
            EventKind::History,
            json!({"room": "r", "messages": [message_json()]}),
        ));

        assert_eq!(joined_seen.lock().unwrap()[0].user, "bob");
        assert_eq!(left_seen.lock().unwrap()[0].user, "bob");
        assert_eq!(history_seen.lock().unwrap()[0].messages.len(), 1);
    }

    #[test]
    fn test_error_envelope_maps_code() {
        let dispatcher = Dispatcher::new(8);
        let (handler, seen) = recorder();
        dispatcher.set_error(handler);

        dispatcher.dispatch(Inbound::error("unauthorized", "bad token"));

        let seen = seen.lock().unwrap();
        assert_eq!(seen[0].kind(), ErrorKind::Unauthorized);
        assert!(seen[0].is_protocol());
        assert!(!seen[0].is_connection());
        assert_eq!(seen[0].message(), "bad token");
    }

    #[test]
    fn test_bad_payload_reports_serialization_error_only() {
        let dispatcher = Dispatcher::new(8);
        let (messages, message_seen) = recorder::<MessageEvent>();
        let (errors, error_seen) = recorder();
        dispatcher.set_message(messages);
        dispatcher.set_error(errors);

        dispatcher.dispatch(Inbound::event(EventKind::Message, json!({"room": 5})));

        assert!(message_seen.lock().unwrap().is_empty());
        let errors = error_seen.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Serialization);
    }

    #[test]
    fn test_unregistered_kind_is_dropped_without_decoding() {
        let dispatcher = Dispatcher::new(8);
        let (errors, error_seen) = recorder();
        dispatcher.set_error(errors);

        // Malformed, but nobody listens for messages, so no error either.
        dispatcher.dispatch(Inbound::event(EventKind::Message, json!("garbage")));

        assert!(error_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_event_tag_is_dropped() {
        let dispatcher = Dispatcher::new(8);
        let (errors, error_seen) = recorder();
        dispatcher.set_error(errors);

        let envelope = Inbound {
            kind: "event".into(),
            event: Some("typing".into()),
            data: Some(json!({})),
            error: None,
        };
        dispatcher.dispatch(envelope);

        assert!(error_seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_unexpected_envelope_type_is_reported() {
        let dispatcher = Dispatcher::new(8);
        let (errors, error_seen) = recorder();
        dispatcher.set_error(errors);

        let envelope = Inbound {
            kind: "pong".into(),
            event: None,
            data: None,
            error: None,
        };
        dispatcher.dispatch(envelope);

        let errors = error_seen.lock().unwrap();
        assert_eq!(errors[0].kind(), ErrorKind::Serialization);
        assert!(errors[0].message().contains("unexpected envelope type"));
    }

    #[test]
    fn test_error_envelope_without_payload_is_invalid() {
        let dispatcher = Dispatcher::new(8);
        let (errors, error_seen) = recorder();
        dispatcher.set_error(errors);

        let envelope = Inbound {
            kind: "error".into(),
            event: None,
            data: None,
            error: None,
        };
        dispatcher.dispatch(envelope);

        let errors = error_seen.lock().unwrap();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind(), ErrorKind::Serialization);
        assert!(errors[0].message().starts_with("invalid message"));
    }

    #[test]
    fn test_last_registration_wins() {
        let dispatcher = Dispatcher::new(8);
        let (first, first_seen) = recorder::<MessageEvent>();
        let (second, second_seen) = recorder::<MessageEvent>();
        dispatcher.set_message(first);
        dispatcher.set_message(second);

        dispatcher.dispatch(Inbound::event(EventKind::Message, message_json()));

        assert!(first_seen.lock().unwrap().is_empty());
        assert_eq!(second_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_handler_may_reregister_during_dispatch() {
        let dispatcher = Arc::new(Dispatcher::new(8));
        let (replacement, replacement_seen) = recorder::<MessageEvent>();
        let inner = Arc::clone(&dispatcher);
        dispatcher.set_message(Arc::new(move |_: MessageEvent| {
            inner.set_message(Arc::clone(&replacement));
        }));

        dispatcher.dispatch(Inbound::event(EventKind::Message, message_json()));
        assert!(replacement_seen.lock().unwrap().is_empty());

        dispatcher.dispatch(Inbound::event(EventKind::Message, message_json()));
        assert_eq!(replacement_seen.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_subscriber_receives_events_without_callbacks() {
        let dispatcher = Dispatcher::new(8);
        let mut rx = dispatcher.subscribe();

        dispatcher.dispatch(Inbound::event(EventKind::Message, message_json()));
        dispatcher.emit_state(StateEvent {
            old: ConnectionState::Connecting,
            new: ConnectionState::Connected,
            error: None,
        });

        assert!(matches!(rx.try_recv(), Ok(Event::Message(m)) if m.user == "alice"));
        assert!(matches!(
            rx.try_recv(),
            Ok(Event::StateChanged(StateEvent { new: ConnectionState::Connected, .. }))
        ));
    }
}
