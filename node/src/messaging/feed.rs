//! Live, ordered view of one conversation's message log.

use super::conversation_path;
use crate::storage::{SharedStore, Snapshot, StoreResult, Subscription};
use duochat_messaging::{project_feed, ConversationKey, FeedEntry};
use tracing::trace;

/// Listener on `conversations/{key}` holding the latest projected feed.
///
/// Every notification carries the whole conversation, and the entries are
/// replaced wholesale in store child order.
#[derive(Debug)]
pub struct LiveFeed {
    subscription: Subscription,
    entries: Vec<FeedEntry>,
}

impl LiveFeed {
    pub fn subscribe(store: &SharedStore, key: &ConversationKey) -> StoreResult<Self> {
        let subscription = Subscription::open(store, conversation_path(key)?)?;
        Ok(Self {
            subscription,
            entries: Vec::new(),
        })
    }

    pub fn apply(&mut self, snapshot: &Snapshot) {
        let children = snapshot.children();
        let raw = children.len();
        self.entries = project_feed(children);
        trace!(
            path = %snapshot.path(),
            raw,
            shown = self.entries.len(),
            "feed replaced"
        );
    }

    /// Wait for the next notification and apply it.
    ///
    /// Returns `false` once the feed has been unsubscribed.
    pub async fn next_update(&mut self) -> bool {
        match self.subscription.next().await {
            Some(snapshot) => {
                self.apply(&snapshot);
                true
            }
            None => false,
        }
    }

    pub fn current_feed(&self) -> &[FeedEntry] {
        &self.entries
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscription.is_active()
    }

    /// Detach from the store. Safe to call more than once.
    pub fn unsubscribe(&mut self) -> bool {
        self.subscription.cancel()
    }
}
