//! Scoped state buffers and the load / flush cycle around a turn.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use tracing::debug;

use crate::channels::Activity;
use crate::context::TurnContext;
use crate::error::StateError;
use crate::store::Database;

/// Who a piece of state belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StateScope {
    /// Keyed by the sender; survives across conversations.
    User,
    /// Keyed by the conversation; holds the dialog stack.
    Conversation,
}

impl StateScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Conversation => "conversation",
        }
    }
}

impl std::fmt::Display for StateScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Storage identity of one state bag.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StateKey {
    pub scope: StateScope,
    pub owner_id: String,
}

impl StateKey {
    /// User-scoped key: `{channel}/{user_id}`.
    pub fn user(activity: &Activity) -> Self {
        Self {
            scope: StateScope::User,
            owner_id: format!("{}/{}", activity.channel, activity.user_id),
        }
    }

    /// Conversation-scoped key: `{channel}/{conversation_id}`.
    pub fn conversation(activity: &Activity) -> Self {
        Self {
            scope: StateScope::Conversation,
            owner_id: format!("{}/{}", activity.channel, activity.conversation_id),
        }
    }
}

/// In-memory view of one state bag for the duration of a turn.
///
/// Writes are buffered; `changed` tracks which properties must be written
/// (or deleted) on the next flush.
#[derive(Debug, Clone)]
pub struct CachedState {
    key: StateKey,
    values: BTreeMap<String, serde_json::Value>,
    changed: BTreeSet<String>,
}

impl CachedState {
    /// A bag with nothing stored yet.
    pub fn empty(key: StateKey) -> Self {
        Self {
            key,
            values: BTreeMap::new(),
            changed: BTreeSet::new(),
        }
    }

    fn loaded(key: StateKey, values: Vec<(String, serde_json::Value)>) -> Self {
        Self {
            key,
            values: values.into_iter().collect(),
            changed: BTreeSet::new(),
        }
    }

    pub fn key(&self) -> &StateKey {
        &self.key
    }

    pub fn get(&self, property: &str) -> Option<&serde_json::Value> {
        self.values.get(property)
    }

    /// Overwrite a property. Writing the value already held is a no-op.
    pub fn set(&mut self, property: &str, value: serde_json::Value) {
        if self.values.get(property) == Some(&value) {
            return;
        }
        self.values.insert(property.to_string(), value);
        self.changed.insert(property.to_string());
    }

    /// Remove a property. Removing an absent property is a no-op.
    pub fn remove(&mut self, property: &str) {
        if self.values.remove(property).is_some() {
            self.changed.insert(property.to_string());
        }
    }

    /// Whether there are buffered writes.
    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }
}

/// Loads and flushes scoped state against a `Database`.
#[derive(Clone)]
pub struct BotState {
    db: Arc<dyn Database>,
}

impl BotState {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }

    /// Read every property of one bag.
    pub async fn load(&self, key: StateKey) -> Result<CachedState, StateError> {
        let values = self
            .db
            .load_state(key.scope.as_str(), &key.owner_id)
            .await
            .map_err(|source| StateError::PersistenceFailure {
                scope: key.scope.to_string(),
                owner_id: key.owner_id.clone(),
                source,
            })?;
        Ok(CachedState::loaded(key, values))
    }

    /// Flush buffered writes. Returns the number of properties written or
    /// deleted. On failure the unflushed properties stay marked, so a retry
    /// writes them again.
    pub async fn save_changes(&self, cache: &mut CachedState) -> Result<usize, StateError> {
        let pending: Vec<String> = cache.changed.iter().cloned().collect();
        let scope = cache.key.scope.as_str();
        let owner_id = cache.key.owner_id.clone();

        for property in &pending {
            let result = match cache.values.get(property) {
                Some(value) => self.db.set_state(scope, &owner_id, property, value).await,
                None => self
                    .db
                    .delete_state(scope, &owner_id, property)
                    .await
                    .map(|_| ()),
            };
            result.map_err(|source| StateError::PersistenceFailure {
                scope: scope.to_string(),
                owner_id: owner_id.clone(),
                source,
            })?;
            cache.changed.remove(property);
        }

        if !pending.is_empty() {
            debug!(scope, owner_id = %owner_id, count = pending.len(), "State flushed");
        }
        Ok(pending.len())
    }

    /// Build the turn context for an activity, loading both scopes.
    pub async fn load_turn(&self, activity: Activity) -> Result<TurnContext, StateError> {
        let user = self.load(StateKey::user(&activity)).await?;
        let conversation = self.load(StateKey::conversation(&activity)).await?;
        Ok(TurnContext::new(activity, user, conversation))
    }

    /// Flush both scopes of a turn.
    pub async fn save_turn(&self, turn: &mut TurnContext) -> Result<usize, StateError> {
        let mut written = self.save_changes(turn.state_mut(StateScope::User)).await?;
        written += self
            .save_changes(turn.state_mut(StateScope::Conversation))
            .await?;
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::LibSqlBackend;

    async fn test_state() -> (BotState, Arc<dyn Database>) {
        let db: Arc<dyn Database> = Arc::new(LibSqlBackend::new_memory().await.unwrap());
        (BotState::new(Arc::clone(&db)), db)
    }

    fn key(owner: &str) -> StateKey {
        StateKey {
            scope: StateScope::User,
            owner_id: owner.to_string(),
        }
    }

    #[test]
    fn identical_write_is_not_dirty() {
        let mut cache = CachedState::loaded(
            key("cli/a"),
            vec![("languagePreference".into(), serde_json::json!("es"))],
        );
        cache.set("languagePreference", serde_json::json!("es"));
        assert!(!cache.is_dirty());
        cache.set("languagePreference", serde_json::json!("ko"));
        assert!(cache.is_dirty());
    }

    #[test]
    fn removing_absent_property_is_not_dirty() {
        let mut cache = CachedState::empty(key("cli/a"));
        cache.remove("dialogState");
        assert!(!cache.is_dirty());
    }

    #[test]
    fn keys_are_channel_qualified() {
        let activity = Activity::message("cli", "ana", "hi").with_conversation("room-1");
        assert_eq!(StateKey::user(&activity).owner_id, "cli/ana");
        assert_eq!(StateKey::conversation(&activity).owner_id, "cli/room-1");
        assert_eq!(StateKey::conversation(&activity).scope, StateScope::Conversation);
    }

    #[tokio::test]
    async fn buffered_writes_reach_storage_only_after_save() {
        let (state, db) = test_state().await;
        let mut cache = state.load(key("cli/a")).await.unwrap();
        cache.set("languagePreference", serde_json::json!("ko"));

        assert!(db.get_state("user", "cli/a", "languagePreference").await.unwrap().is_none());

        let written = state.save_changes(&mut cache).await.unwrap();
        assert_eq!(written, 1);
        assert!(!cache.is_dirty());
        assert_eq!(
            db.get_state("user", "cli/a", "languagePreference").await.unwrap().unwrap(),
            "ko"
        );

        // Nothing left to flush
        assert_eq!(state.save_changes(&mut cache).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn removal_deletes_row() {
        let (state, db) = test_state().await;
        db.set_state("user", "cli/a", "dialogState", &serde_json::json!({"stack": []}))
            .await
            .unwrap();

        let mut cache = state.load(key("cli/a")).await.unwrap();
        assert!(cache.get("dialogState").is_some());
        cache.remove("dialogState");
        state.save_changes(&mut cache).await.unwrap();

        assert!(db.get_state("user", "cli/a", "dialogState").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn load_turn_reads_both_scopes() {
        let (state, db) = test_state().await;
        db.set_state("user", "cli/ana", "languagePreference", &serde_json::json!("es"))
            .await
            .unwrap();
        db.set_state("conversation", "cli/ana", "dialogState", &serde_json::json!({"stack": []}))
            .await
            .unwrap();

        let turn = state
            .load_turn(Activity::message("cli", "ana", "hola"))
            .await
            .unwrap();
        assert_eq!(
            turn.state(StateScope::User).get("languagePreference").unwrap(),
            "es"
        );
        assert!(turn.state(StateScope::Conversation).get("dialogState").is_some());
    }
}
