//! Typed accessor for one named property in a scoped state bag.

use std::marker::PhantomData;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::context::TurnContext;
use crate::error::StateError;

use super::bot_state::StateScope;

/// A typed view of one property, e.g. the user's `languagePreference`.
///
/// Accessors are plain values: they carry only the scope and property name,
/// and operate on whatever `TurnContext` they are given.
#[derive(Debug)]
pub struct StateProperty<T> {
    scope: StateScope,
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StateProperty<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateProperty<T> {}

impl<T> StateProperty<T> {
    pub const fn new(scope: StateScope, name: &'static str) -> Self {
        Self {
            scope,
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn scope(&self) -> StateScope {
        self.scope
    }
}

impl<T> StateProperty<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Read the property, `None` if absent.
    pub fn get(&self, turn: &TurnContext) -> Result<Option<T>, StateError> {
        turn.state(self.scope)
            .get(self.name)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| StateError::Corrupt {
                    property: self.name.to_string(),
                    reason: e.to_string(),
                })
            })
            .transpose()
    }

    /// Read the property, storing and returning `default()` if absent.
    pub fn get_or_insert_with(
        &self,
        turn: &mut TurnContext,
        default: impl FnOnce() -> T,
    ) -> Result<T, StateError> {
        if let Some(value) = self.get(turn)? {
            return Ok(value);
        }
        let value = default();
        self.set(turn, &value)?;
        Ok(value)
    }

    /// Overwrite the property in the turn's buffer.
    pub fn set(&self, turn: &mut TurnContext, value: &T) -> Result<(), StateError> {
        let json = serde_json::to_value(value).map_err(|e| StateError::Corrupt {
            property: self.name.to_string(),
            reason: e.to_string(),
        })?;
        turn.state_mut(self.scope).set(self.name, json);
        Ok(())
    }

    /// Remove the property from the turn's buffer.
    pub fn delete(&self, turn: &mut TurnContext) {
        turn.state_mut(self.scope).remove(self.name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::Activity;
    use crate::state::{CachedState, StateKey};

    const COUNTER: StateProperty<u32> = StateProperty::new(StateScope::Conversation, "counter");

    fn turn() -> TurnContext {
        let activity = Activity::message("test", "u1", "hi");
        TurnContext::new(
            activity.clone(),
            CachedState::empty(StateKey::user(&activity)),
            CachedState::empty(StateKey::conversation(&activity)),
        )
    }

    #[test]
    fn absent_property_reads_none() {
        let turn = turn();
        assert_eq!(COUNTER.get(&turn).unwrap(), None);
    }

    #[test]
    fn default_is_created_lazily() {
        let mut turn = turn();
        assert!(!turn.state(StateScope::Conversation).is_dirty());
        let value = COUNTER.get_or_insert_with(&mut turn, || 7).unwrap();
        assert_eq!(value, 7);
        assert!(turn.state(StateScope::Conversation).is_dirty());
        assert_eq!(COUNTER.get(&turn).unwrap(), Some(7));
    }

    #[test]
    fn set_then_get_round_trips() {
        let mut turn = turn();
        COUNTER.set(&mut turn, &42).unwrap();
        assert_eq!(COUNTER.get(&turn).unwrap(), Some(42));
        COUNTER.delete(&mut turn);
        assert_eq!(COUNTER.get(&turn).unwrap(), None);
    }

    #[test]
    fn wrong_shape_is_corrupt() {
        let mut turn = turn();
        turn.state_mut(StateScope::Conversation)
            .set("counter", serde_json::json!("not a number"));
        let err = COUNTER.get(&turn).unwrap_err();
        assert!(matches!(err, StateError::Corrupt { ref property, .. } if property == "counter"));
    }
}
