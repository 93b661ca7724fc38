//! Conversation synchronization engine: live feed, publisher, typing
//! presence, and the session that ties their lifetimes together.

mod feed;
mod presence;
mod publisher;
mod session;

pub use feed::LiveFeed;
pub use presence::{PeerTyping, TypingNotifier};
pub use publisher::{MessagePublisher, SendOutcome};
pub use session::{ConversationSession, ConversationView, SessionEvent, ViewEntry};

use crate::storage::{StoreError, StorePath, StoreResult};
use duochat_messaging::{ConversationKey, ParticipantId, ResolveError};

/// Root of every conversation's messages and typing flags.
pub const CONVERSATIONS: &str = "conversations";
/// Child of a conversation holding one boolean per participant.
pub const TYPING: &str = "typing";
/// Root of the participant roster.
pub const PROFILES: &str = "profiles";

/// Errors that can occur while publishing a message.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("failed to write message: {0}")]
    Write(#[from] StoreError),
    #[error("failed to encode message: {0}")]
    Encoding(#[from] serde_json::Error),
}

/// Errors raised by a conversation session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("conversation session already closed")]
    Closed,
}

pub fn conversation_path(key: &ConversationKey) -> StoreResult<StorePath> {
    StorePath::root(CONVERSATIONS)?.child(key.as_str())
}

pub fn typing_path(key: &ConversationKey, participant: &ParticipantId) -> StoreResult<StorePath> {
    conversation_path(key)?
        .child(TYPING)?
        .child(participant.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_follow_the_conversation_layout() {
        let seven = ParticipantId::new("7").unwrap();
        let twelve = ParticipantId::new("12").unwrap();
        let key = ConversationKey::resolve(&seven, &twelve).unwrap();

        assert_eq!(conversation_path(&key).unwrap().to_string(), "conversations/12~7");
        assert_eq!(
            typing_path(&key, &seven).unwrap().to_string(),
            "conversations/12~7/typing/7"
        );
    }
}
