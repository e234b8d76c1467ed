//! Turn context — everything one turn reads and writes.

use crate::channels::{Activity, Reply};
use crate::state::{CachedState, StateScope};

/// Context for a single turn.
///
/// Holds the inbound activity, the user- and conversation-scoped state loaded
/// for it, and the replies produced so far. Replies are buffered and handed to
/// the channel once the turn's logic has run.
#[derive(Debug)]
pub struct TurnContext {
    activity: Activity,
    user_state: CachedState,
    conversation_state: CachedState,
    replies: Vec<Reply>,
}

impl TurnContext {
    pub fn new(activity: Activity, user_state: CachedState, conversation_state: CachedState) -> Self {
        Self {
            activity,
            user_state,
            conversation_state,
            replies: Vec::new(),
        }
    }

    /// The activity that started this turn.
    pub fn activity(&self) -> &Activity {
        &self.activity
    }

    /// Queue a reply for delivery at the end of the turn.
    pub fn send(&mut self, reply: Reply) {
        self.replies.push(reply);
    }

    /// Replies queued so far.
    pub fn replies(&self) -> &[Reply] {
        &self.replies
    }

    /// Drain the queued replies.
    pub fn take_replies(&mut self) -> Vec<Reply> {
        std::mem::take(&mut self.replies)
    }

    pub fn state(&self, scope: StateScope) -> &CachedState {
        match scope {
            StateScope::User => &self.user_state,
            StateScope::Conversation => &self.conversation_state,
        }
    }

    pub fn state_mut(&mut self, scope: StateScope) -> &mut CachedState {
        match scope {
            StateScope::User => &mut self.user_state,
            StateScope::Conversation => &mut self.conversation_state,
        }
    }
}
