//! Typed event subscriptions.
//!
//! Owners register one handler per event kind and get back a [`SubscriptionId`]
//! they can later hand to `unsubscribe`. Handlers are invoked outside of every
//! internal lock, in registration order, on the task that received the frame.

use crate::messaging::InboundMessage;
use crate::types::{GameAction, GameEnd, GameState};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Handle identifying one registered handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Connection lifecycle notifications.
#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleEvent {
    /// The channel for `session_id` is open.
    Opened { session_id: String },
    /// The channel closed. `expected` is true only for closes caused by `disconnect()`.
    Closed {
        session_id: String,
        code: Option<u16>,
        reason: Option<String>,
        expected: bool,
    },
    /// A reconnect attempt is scheduled after `delay`.
    Reconnecting {
        session_id: String,
        attempt: u32,
        delay: Duration,
    },
    /// The manager gave up on `session_id`.
    Failed {
        session_id: String,
        attempts: u32,
        reason: String,
    },
}

type Handler<T> = Arc<dyn Fn(&T) + Send + Sync>;

enum Slot {
    GameState(Handler<GameState>),
    GameAction(Handler<GameAction>),
    GameEnd(Handler<GameEnd>),
    ServerError(Handler<Value>),
    Lifecycle(Handler<LifecycleEvent>),
}

#[derive(Default)]
pub(crate) struct Subscribers {
    next_id: AtomicU64,
    slots: RwLock<Vec<(SubscriptionId, Slot)>>,
}

impl Subscribers {
    fn add(&self, slot: Slot) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.slots.write().push((id, slot));
        id
    }

    pub(crate) fn on_game_state<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameState) + Send + Sync + 'static,
    {
        self.add(Slot::GameState(Arc::new(handler)))
    }

    pub(crate) fn on_game_action<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameAction) + Send + Sync + 'static,
    {
        self.add(Slot::GameAction(Arc::new(handler)))
    }

    pub(crate) fn on_game_end<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&GameEnd) + Send + Sync + 'static,
    {
        self.add(Slot::GameEnd(Arc::new(handler)))
    }

    pub(crate) fn on_server_error<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.add(Slot::ServerError(Arc::new(handler)))
    }

    pub(crate) fn on_lifecycle<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&LifecycleEvent) + Send + Sync + 'static,
    {
        self.add(Slot::Lifecycle(Arc::new(handler)))
    }

    /// Removes a handler. Returns false if the id was unknown.
    pub(crate) fn remove(&self, id: SubscriptionId) -> bool {
        let mut slots = self.slots.write();
        let before = slots.len();
        slots.retain(|(slot_id, _)| *slot_id != id);
        slots.len() != before
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.read().len()
    }

    /// Routes a decoded message to the handlers of its kind.
    /// Returns the number of handlers invoked.
    pub(crate) fn dispatch(&self, message: &InboundMessage) -> usize {
        match message {
            InboundMessage::GameState(state) => invoke(
                self.collect(|slot| match slot {
                    Slot::GameState(h) => Some(h.clone()),
                    _ => None,
                }),
                state,
            ),
            InboundMessage::GameAction(action) => invoke(
                self.collect(|slot| match slot {
                    Slot::GameAction(h) => Some(h.clone()),
                    _ => None,
                }),
                action,
            ),
            InboundMessage::GameEnd(end) => invoke(
                self.collect(|slot| match slot {
                    Slot::GameEnd(h) => Some(h.clone()),
                    _ => None,
                }),
                end,
            ),
            InboundMessage::Error(payload) => invoke(
                self.collect(|slot| match slot {
                    Slot::ServerError(h) => Some(h.clone()),
                    _ => None,
                }),
                payload,
            ),
        }
    }

    pub(crate) fn emit_lifecycle(&self, event: &LifecycleEvent) -> usize {
        invoke(
            self.collect(|slot| match slot {
                Slot::Lifecycle(h) => Some(h.clone()),
                _ => None,
            }),
            event,
        )
    }

    // Snapshot under the read lock so handlers may (un)subscribe re-entrantly.
    fn collect<T: ?Sized>(&self, pick: impl Fn(&Slot) -> Option<Handler<T>>) -> Vec<Handler<T>> {
        self.slots
            .read()
            .iter()
            .filter_map(|(_, slot)| pick(slot))
            .collect()
    }
}

fn invoke<T: ?Sized>(handlers: Vec<Handler<T>>, value: &T) -> usize {
    for handler in &handlers {
        handler(value);
    }
    handlers.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_dispatch_routes_by_kind() {
        let subscribers = Subscribers::default();
        let states = Arc::new(AtomicUsize::new(0));
        let ends = Arc::new(AtomicUsize::new(0));

        let s = states.clone();
        subscribers.on_game_state(move |_| {
            s.fetch_add(1, Ordering::SeqCst);
        });
        let e = ends.clone();
        subscribers.on_game_end(move |_| {
            e.fetch_add(1, Ordering::SeqCst);
        });

        let invoked = subscribers.dispatch(&InboundMessage::GameEnd(GameEnd::default()));
        assert_eq!(invoked, 1);
        assert_eq!(states.load(Ordering::SeqCst), 0);
        assert_eq!(ends.load(Ordering::SeqCst), 1);

        let invoked = subscribers.dispatch(&InboundMessage::Error(json!("boom")));
        assert_eq!(invoked, 0);
    }

    #[test]
    fn test_unsubscribe_removes_handler() {
        let subscribers = Subscribers::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let id = subscribers.on_game_action(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(subscribers.remove(id));
        assert!(!subscribers.remove(id));
        assert_eq!(subscribers.len(), 0);

        subscribers.dispatch(&InboundMessage::GameAction(GameAction::default()));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_handler_can_unsubscribe_itself() {
        let subscribers = Arc::new(Subscribers::default());
        let own_id = Arc::new(parking_lot::Mutex::new(None));

        let subs = subscribers.clone();
        let slot = own_id.clone();
        let id = subscribers.on_lifecycle(move |_| {
            if let Some(id) = *slot.lock() {
                subs.remove(id);
            }
        });
        *own_id.lock() = Some(id);

        let event = LifecycleEvent::Opened {
            session_id: "g1".into(),
        };
        assert_eq!(subscribers.emit_lifecycle(&event), 1);
        assert_eq!(subscribers.emit_lifecycle(&event), 0);
    }
}
