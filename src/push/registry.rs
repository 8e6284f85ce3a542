use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::types::push::{MetadataValue, SubscriptionKeys, SubscriptionRecord};

/// Input for a registration or re-registration. Lifecycle timestamps are
/// owned by the registry, not the caller.
#[derive(Debug, Clone)]
pub struct NewSubscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
    pub user_id: String,
    pub expiration_time: Option<i64>,
    pub metadata: HashMap<String, MetadataValue>,
}

/// In-process source of truth mapping users to their push endpoints.
///
/// Endpoint-unique; a single lock serializes access, which keeps removal and
/// lookup linearizable. In-memory only: contents are lost on restart unless a
/// production deployment backs this with an external store.
#[derive(Default)]
pub struct SubscriptionRegistry {
    state: Mutex<RegistryState>,
}

#[derive(Default)]
struct RegistryState {
    by_endpoint: HashMap<String, SubscriptionRecord>,
    user_index: HashMap<String, HashSet<String>>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces by endpoint. A re-registration overwrites keys,
    /// owner, and metadata but preserves the original `created_at`.
    pub fn upsert(&self, new: NewSubscription, now: OffsetDateTime) -> SubscriptionRecord {
        let mut state = self.state.lock().expect("registry lock");

        let existing = state
            .by_endpoint
            .get(&new.endpoint)
            .map(|existing| (existing.user_id.clone(), existing.created_at));
        let created_at = match existing {
            Some((existing_user_id, existing_created_at)) => {
                if existing_user_id != new.user_id {
                    if let Some(endpoints) = state.user_index.get_mut(&existing_user_id) {
                        endpoints.remove(&new.endpoint);
                        if endpoints.is_empty() {
                            state.user_index.remove(&existing_user_id);
                        }
                    }
                }
                existing_created_at
            }
            None => now,
        };

        let record = SubscriptionRecord {
            endpoint: new.endpoint.clone(),
            keys: new.keys,
            user_id: new.user_id.clone(),
            created_at,
            updated_at: now,
            expiration_time: new.expiration_time,
            metadata: new.metadata,
        };
        state
            .user_index
            .entry(new.user_id)
            .or_default()
            .insert(new.endpoint.clone());
        state.by_endpoint.insert(new.endpoint, record.clone());
        record
    }

    #[must_use]
    pub fn get_by_endpoint(&self, endpoint: &str) -> Option<SubscriptionRecord> {
        let state = self.state.lock().expect("registry lock");
        state.by_endpoint.get(endpoint).cloned()
    }

    /// All records owned by a user; order is not significant.
    #[must_use]
    pub fn get_for_user(&self, user_id: &str) -> Vec<SubscriptionRecord> {
        let state = self.state.lock().expect("registry lock");
        state
            .user_index
            .get(user_id)
            .map(|endpoints| {
                endpoints
                    .iter()
                    .filter_map(|endpoint| state.by_endpoint.get(endpoint).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Deletes one record; returns whether it existed.
    pub fn remove(&self, endpoint: &str) -> bool {
        let mut state = self.state.lock().expect("registry lock");
        let Some(record) = state.by_endpoint.remove(endpoint) else {
            return false;
        };
        if let Some(endpoints) = state.user_index.get_mut(&record.user_id) {
            endpoints.remove(endpoint);
            if endpoints.is_empty() {
                state.user_index.remove(&record.user_id);
            }
        }
        true
    }

    /// Administrative/testing reset.
    pub fn clear(&self) {
        let mut state = self.state.lock().expect("registry lock");
        state.by_endpoint.clear();
        state.user_index.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().expect("registry lock").by_endpoint.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
