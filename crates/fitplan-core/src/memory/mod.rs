//! Per-user memory of past agent results and user preferences.
//!
//! [`MemoryStore`] is one user's memory: an append-only history per agent
//! name, plus a shallow-merged preference bag. It cannot fail.
//! [`SharedMemory`] gives every user their own lock. The registry lock is
//! held only to find or insert a user's store, so invocations for different
//! users never wait on each other. Its only failure mode is a poisoned lock,
//! which callers treat as a warning.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::agent::AgentResult;

/// One stored agent result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryEntry {
    pub agent_name: String,
    pub result: AgentResult,
    pub timestamp: DateTime<Utc>,
}

/// A single user's memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    histories: HashMap<String, Vec<MemoryEntry>>,
    preferences: Map<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a result to `agent_name`'s history.
    pub fn store_result(&mut self, agent_name: &str, result: AgentResult) {
        let entry = MemoryEntry {
            agent_name: agent_name.to_string(),
            result,
            timestamp: Utc::now(),
        };
        self.histories
            .entry(agent_name.to_string())
            .or_default()
            .push(entry);
    }

    /// Full history for `agent_name`, oldest first. Empty if none.
    pub fn agent_history(&self, agent_name: &str) -> &[MemoryEntry] {
        self.histories
            .get(agent_name)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// The most recently stored result for `agent_name`.
    pub fn latest_result(&self, agent_name: &str) -> Option<&AgentResult> {
        self.agent_history(agent_name).last().map(|e| &e.result)
    }

    /// Shallow-merge `partial` into the preference bag. Later keys win.
    pub fn store_user_preferences(&mut self, partial: Map<String, Value>) {
        self.preferences.extend(partial);
    }

    pub fn user_preferences(&self) -> &Map<String, Value> {
        &self.preferences
    }

    /// Clear every agent history.
    ///
    /// Preferences are left untouched.
    pub fn reset(&mut self) {
        self.histories.clear();
    }
}

/// Failure accessing [`SharedMemory`].
#[derive(Debug, Error)]
pub enum MemoryError {
    #[error("memory lock poisoned while accessing user {user_id}")]
    Poisoned { user_id: Uuid },
}

/// Memory stores for every user, keyed by user id.
#[derive(Debug, Default)]
pub struct SharedMemory {
    users: RwLock<HashMap<Uuid, Arc<Mutex<MemoryStore>>>>,
}

impl SharedMemory {
    pub fn new() -> Self {
        Self::default()
    }

    fn existing(&self, user_id: Uuid) -> Result<Option<Arc<Mutex<MemoryStore>>>, MemoryError> {
        let users = self
            .users
            .read()
            .map_err(|_| MemoryError::Poisoned { user_id })?;
        Ok(users.get(&user_id).cloned())
    }

    fn get_or_create(&self, user_id: Uuid) -> Result<Arc<Mutex<MemoryStore>>, MemoryError> {
        if let Some(store) = self.existing(user_id)? {
            return Ok(store);
        }
        let mut users = self
            .users
            .write()
            .map_err(|_| MemoryError::Poisoned { user_id })?;
        Ok(Arc::clone(users.entry(user_id).or_default()))
    }

    /// Run `f` against the user's store, creating it if needed.
    pub fn with_user<R>(
        &self,
        user_id: Uuid,
        f: impl FnOnce(&mut MemoryStore) -> R,
    ) -> Result<R, MemoryError> {
        let store = self.get_or_create(user_id)?;
        let mut guard = store
            .lock()
            .map_err(|_| MemoryError::Poisoned { user_id })?;
        Ok(f(&mut *guard))
    }

    /// Run `f` against the user's store without creating one.
    pub fn read_user<R>(
        &self,
        user_id: Uuid,
        f: impl FnOnce(Option<&MemoryStore>) -> R,
    ) -> Result<R, MemoryError> {
        let Some(store) = self.existing(user_id)? else {
            return Ok(f(None));
        };
        let guard = store
            .lock()
            .map_err(|_| MemoryError::Poisoned { user_id })?;
        Ok(f(Some(&*guard)))
    }

    /// The user's preference bag, or an empty map if the user is unknown.
    pub fn preferences(&self, user_id: Uuid) -> Result<Map<String, Value>, MemoryError> {
        self.read_user(user_id, |store| {
            store
                .map(|s| s.user_preferences().clone())
                .unwrap_or_default()
        })
    }

    pub fn store_result(
        &self,
        user_id: Uuid,
        agent_name: &str,
        result: AgentResult,
    ) -> Result<(), MemoryError> {
        self.with_user(user_id, |store| store.store_result(agent_name, result))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::agent::AgentKind;

    fn result(reasoning: &str) -> AgentResult {
        AgentResult::success(AgentKind::WorkoutPlan, Map::new(), reasoning)
    }

    fn prefs(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn history_is_empty_for_unknown_agent() {
        let store = MemoryStore::new();
        assert!(store.agent_history("workout-plan").is_empty());
        assert!(store.latest_result("workout-plan").is_none());
    }

    #[test]
    fn latest_tracks_last_append_per_agent() {
        let mut store = MemoryStore::new();
        store.store_result("workout-plan", result("first"));
        store.store_result("nutrition", result("meals"));
        store.store_result("workout-plan", result("second"));

        assert_eq!(store.agent_history("workout-plan").len(), 2);
        assert_eq!(
            store.latest_result("workout-plan").unwrap().reasoning,
            "second"
        );
        assert_eq!(store.latest_result("nutrition").unwrap().reasoning, "meals");
        assert_eq!(
            store.agent_history("workout-plan")[0].agent_name,
            "workout-plan"
        );
    }

    #[test]
    fn preferences_merge_shallowly() {
        let mut store = MemoryStore::new();
        store.store_user_preferences(prefs(json!({"units": "metric", "equipment": {"bands": true}})));
        store.store_user_preferences(prefs(json!({"equipment": {"dumbbells": true}, "days": 4})));

        assert_eq!(
            Value::Object(store.user_preferences().clone()),
            json!({"units": "metric", "equipment": {"dumbbells": true}, "days": 4})
        );
    }

    #[test]
    fn reset_clears_histories_but_keeps_preferences() {
        let mut store = MemoryStore::new();
        store.store_result("workout-plan", result("a"));
        store.store_result("nutrition", result("b"));
        store.store_user_preferences(prefs(json!({"units": "imperial"})));
        let before = store.user_preferences().clone();

        store.reset();

        assert!(store.agent_history("workout-plan").is_empty());
        assert!(store.agent_history("nutrition").is_empty());
        assert!(store.latest_result("workout-plan").is_none());
        assert_eq!(store.user_preferences(), &before);
    }

    #[test]
    fn shared_memory_partitions_by_user() {
        let shared = SharedMemory::new();
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        shared.store_result(alice, "workout-plan", result("alice")).unwrap();
        shared
            .with_user(bob, |s| s.store_user_preferences(prefs(json!({"units": "metric"}))))
            .unwrap();

        let alice_len = shared
            .read_user(alice, |s| s.map(|s| s.agent_history("workout-plan").len()))
            .unwrap();
        assert_eq!(alice_len, Some(1));
        let bob_len = shared
            .read_user(bob, |s| s.map(|s| s.agent_history("workout-plan").len()))
            .unwrap();
        assert_eq!(bob_len, Some(0));

        assert!(shared.preferences(alice).unwrap().is_empty());
        assert_eq!(shared.preferences(bob).unwrap()["units"], "metric");
        assert!(shared.preferences(Uuid::new_v4()).unwrap().is_empty());
    }

    #[test]
    fn poisoned_lock_surfaces_as_error() {
        let shared = Arc::new(SharedMemory::new());
        let user_id = Uuid::new_v4();

        let poisoner = Arc::clone(&shared);
        let joined = std::thread::spawn(move || {
            let _ = poisoner.with_user(user_id, |_| panic!("poison the lock"));
        })
        .join();
        assert!(joined.is_err());

        let err = shared.preferences(user_id).unwrap_err();
        assert!(matches!(err, MemoryError::Poisoned { user_id: id } if id == user_id));
        assert!(shared.store_result(user_id, "workout-plan", result("x")).is_err());
    }

    #[test]
    fn poisoned_user_does_not_affect_others() {
        let shared = Arc::new(SharedMemory::new());
        let broken = Uuid::new_v4();
        let healthy = Uuid::new_v4();

        let poisoner = Arc::clone(&shared);
        let _ = std::thread::spawn(move || {
            let _ = poisoner.with_user(broken, |_| panic!("poison one user"));
        })
        .join();

        assert!(shared.preferences(broken).is_err());
        shared.store_result(healthy, "workout-plan", result("ok")).unwrap();
        let len = shared
            .read_user(healthy, |s| s.map(|s| s.agent_history("workout-plan").len()))
            .unwrap();
        assert_eq!(len, Some(1));
    }

    #[test]
    fn one_users_held_store_does_not_block_another() {
        let shared = Arc::new(SharedMemory::new());
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();
        let (entered_tx, entered_rx) = std::sync::mpsc::channel();
        let (release_tx, release_rx) = std::sync::mpsc::channel::<()>();

        let holder = Arc::clone(&shared);
        let handle = std::thread::spawn(move || {
            holder
                .with_user(alice, |_| {
                    entered_tx.send(()).unwrap();
                    release_rx.recv().unwrap();
                })
                .unwrap();
        });

        entered_rx.recv().unwrap();
        // Alice's store is still locked by the other thread.
        shared.store_result(bob, "nutrition", result("bob")).unwrap();
        assert_eq!(
            shared
                .read_user(bob, |s| s.map(|s| s.agent_history("nutrition").len()))
                .unwrap(),
            Some(1)
        );

        release_tx.send(()).unwrap();
        handle.join().unwrap();
    }
}
