use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, Mutex};

use serde::de::DeserializeOwned;

use crate::types::frame::WireFrame;

type Handler = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Multimap of `(message_type, handler)` registrations. Not persisted; UI
/// components rebuild their registrations on mount.
#[derive(Default)]
pub struct SubscriberMap {
    state: Mutex<MapState>,
}

#[derive(Default)]
struct MapState {
    next_id: u64,
    by_type: HashMap<String, Vec<(u64, Handler)>>,
}

impl SubscriberMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in a named message type. The returned handle
    /// removes exactly this registration; dropping the handle does not.
    pub fn register(
        map: &Arc<Self>,
        message_type: &str,
        handler: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let id = {
            let mut state = map.state.lock().expect("subscriber lock");
            let id = state.next_id;
            state.next_id += 1;
            state
                .by_type
                .entry(message_type.to_string())
                .or_default()
                .push((id, Arc::new(handler)));
            id
        };
        SubscriptionHandle {
            map: Arc::clone(map),
            message_type: message_type.to_string(),
            id,
        }
    }

    /// Registers a handler that only sees payloads passing the message
    /// type's schema; payloads failing it are dropped and logged.
    pub fn register_typed<D: DeserializeOwned>(
        map: &Arc<Self>,
        message_type: &str,
        handler: impl Fn(D) + Send + Sync + 'static,
    ) -> SubscriptionHandle {
        let schema_type = message_type.to_string();
        Self::register(map, message_type, move |data| {
            match serde_json::from_value::<D>(data.clone()) {
                Ok(value) => handler(value),
                Err(error) => tracing::error!(
                    message_type = %schema_type,
                    %error,
                    "dropping payload that fails its message schema"
                ),
            }
        })
    }

    /// Invokes every handler registered for the frame's type, synchronously
    /// and in registration order. A panicking handler is isolated so the
    /// remaining handlers still run. Returns the number of handlers invoked.
    pub fn dispatch(&self, frame: &WireFrame) -> usize {
        let handlers: Vec<Handler> = {
            let state = self.state.lock().expect("subscriber lock");
            state
                .by_type
                .get(&frame.frame_type)
                .map(|entries| entries.iter().map(|(_, handler)| Arc::clone(handler)).collect())
                .unwrap_or_default()
        };

        for handler in &handlers {
            if catch_unwind(AssertUnwindSafe(|| handler(&frame.data))).is_err() {
                tracing::error!(
                    message_type = %frame.frame_type,
                    "subscriber handler panicked; continuing dispatch"
                );
            }
        }
        handlers.len()
    }

    #[must_use]
    pub fn handler_count(&self, message_type: &str) -> usize {
        let state = self.state.lock().expect("subscriber lock");
        state
            .by_type
            .get(message_type)
            .map(Vec::len)
            .unwrap_or(0)
    }

    fn remove(&self, message_type: &str, id: u64) {
        let mut state = self.state.lock().expect("subscriber lock");
        if let Some(entries) = state.by_type.get_mut(message_type) {
            entries.retain(|(entry_id, _)| *entry_id != id);
            if entries.is_empty() {
                state.by_type.remove(message_type);
            }
        }
    }
}

/// Removes one registration. Calling `unsubscribe` more than once is a no-op
/// after the first call.
pub struct SubscriptionHandle {
    map: Arc<SubscriberMap>,
    message_type: String,
    id: u64,
}

impl SubscriptionHandle {
    pub fn unsubscribe(&self) {
        self.map.remove(&self.message_type, self.id);
    }
}
