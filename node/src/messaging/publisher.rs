//! Appends messages to a conversation under store-generated push keys.

use super::{conversation_path, PublishError};
use crate::storage::{SharedStore, StorePath, StoreResult};
use duochat_messaging::{ConversationKey, MessageRecord, ParticipantId};
use std::sync::Arc;
use tracing::{debug, error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Blank text; nothing was written.
    Skipped,
    /// Written under `key`.
    Sent { key: String },
}

#[derive(Clone)]
pub struct MessagePublisher {
    store: SharedStore,
    conversation: StorePath,
}

impl MessagePublisher {
    pub fn new(store: &SharedStore, key: &ConversationKey) -> StoreResult<Self> {
        Ok(Self {
            store: Arc::clone(store),
            conversation: conversation_path(key)?,
        })
    }

    /// Append `text` as a new message.
    ///
    /// Ordering is left to the push key; failures are logged and returned
    /// without retry.
    pub async fn send(
        &self,
        text: &str,
        sender: &ParticipantId,
        receiver: &ParticipantId,
    ) -> Result<SendOutcome, PublishError> {
        if text.trim().is_empty() {
            return Ok(SendOutcome::Skipped);
        }

        let key = self.store.push_key(&self.conversation);
        let path = self.conversation.child(&key)?;
        let record = MessageRecord::compose(text, sender.clone(), receiver.clone());

        match self.store.set(&path, record.to_value()?).await {
            Ok(()) => {
                debug!(%path, %sender, %receiver, "message published");
                Ok(SendOutcome::Sent { key })
            }
            Err(err) => {
                error!(%err, %path, "error sending message");
                Err(PublishError::Write(err))
            }
        }
    }
}
