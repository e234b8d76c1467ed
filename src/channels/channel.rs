//! Channel trait and the activity / reply types exchanged with it.

use std::pin::Pin;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ChannelError;

/// Stream of inbound activities produced by a channel.
pub type MessageStream = Pin<Box<dyn Stream<Item = Activity> + Send>>;

/// Kind of an inbound activity. Only `Message` is routed; everything else is
/// acknowledged and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Message,
    ConversationUpdate,
    Typing,
    EndOfConversation,
    Event,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Message => "message",
            Self::ConversationUpdate => "conversation_update",
            Self::Typing => "typing",
            Self::EndOfConversation => "end_of_conversation",
            Self::Event => "event",
        };
        write!(f, "{s}")
    }
}

/// One inbound activity, delivered to the router once per turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: Uuid,
    pub kind: ActivityKind,
    /// Channel the activity arrived on (e.g. "cli").
    pub channel: String,
    /// Sender identity; keys user-scoped state.
    pub user_id: String,
    /// Conversation identity; keys conversation-scoped state (dialog stack).
    pub conversation_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    pub received_at: DateTime<Utc>,
}

impl Activity {
    /// Create an activity of any kind. The conversation id defaults to the
    /// user id (one conversation per user).
    pub fn new(kind: ActivityKind, channel: &str, user_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            channel: channel.to_string(),
            user_id: user_id.to_string(),
            conversation_id: user_id.to_string(),
            text: None,
            received_at: Utc::now(),
        }
    }

    /// Create a message activity carrying `text`.
    pub fn message(channel: &str, user_id: &str, text: &str) -> Self {
        Self {
            text: Some(text.to_string()),
            ..Self::new(ActivityKind::Message, channel, user_id)
        }
    }

    /// Override the conversation id.
    pub fn with_conversation(mut self, conversation_id: &str) -> Self {
        self.conversation_id = conversation_id.to_string();
        self
    }

    pub fn is_message(&self) -> bool {
        self.kind == ActivityKind::Message
    }

    /// Message text, if any.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }
}

/// An outbound reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Reply {
    /// Plain text.
    Text { text: String },
    /// Text plus an ordered set of choices, rendered by the channel as
    /// suggested actions / quick replies.
    SuggestedActions { text: String, choices: Vec<String> },
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn suggested_actions(text: impl Into<String>, choices: Vec<String>) -> Self {
        Self::SuggestedActions {
            text: text.into(),
            choices,
        }
    }

    /// The text part of the reply, regardless of kind.
    pub fn content(&self) -> &str {
        match self {
            Self::Text { text } | Self::SuggestedActions { text, .. } => text,
        }
    }

    /// Offered choices (empty for plain text).
    pub fn choices(&self) -> &[String] {
        match self {
            Self::Text { .. } => &[],
            Self::SuggestedActions { choices, .. } => choices,
        }
    }
}

/// A transport that produces activities and delivers replies.
#[async_trait]
pub trait Channel: Send + Sync {
    /// Channel name, used as the `channel` field of its activities.
    fn name(&self) -> &str;

    /// Start receiving. The stream ends when the transport closes.
    async fn start(&self) -> Result<MessageStream, ChannelError>;

    /// Deliver one reply to the sender of `activity`.
    async fn respond(&self, activity: &Activity, reply: Reply) -> Result<(), ChannelError>;

    async fn health_check(&self) -> Result<(), ChannelError> {
        Ok(())
    }

    async fn shutdown(&self) -> Result<(), ChannelError> {
        Ok(())
    }
}
