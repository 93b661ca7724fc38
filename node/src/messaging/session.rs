//! One open conversation screen.
//!
//! The session owns the message listener, the peer-typing listener and the
//! local typing notifier, and releases all three exactly once when it is
//! closed or dropped, whichever comes first.

use super::{
    LiveFeed, MessagePublisher, PeerTyping, SendOutcome, SessionError, TypingNotifier,
};
use crate::config::SessionConfig;
use crate::storage::SharedStore;
use duochat_messaging::{ConversationKey, FeedEntry, Participant};
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    FeedUpdated,
    PeerTyping(bool),
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewEntry {
    #[serde(flatten)]
    pub entry: FeedEntry,
    /// Sent by the local participant.
    pub is_own: bool,
}

/// Render-ready state of the conversation screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationView {
    pub key: ConversationKey,
    pub title: String,
    pub entries: Vec<ViewEntry>,
    pub typing_label: Option<String>,
    pub compose: String,
}

pub struct ConversationSession {
    me: Participant,
    peer: Participant,
    key: ConversationKey,
    feed: LiveFeed,
    peer_typing: PeerTyping,
    notifier: TypingNotifier,
    publisher: MessagePublisher,
    compose: String,
    closed: bool,
}

impl ConversationSession {
    /// Resolve the conversation and attach its listeners.
    pub fn open(
        store: &SharedStore,
        me: Participant,
        peer: Participant,
        config: &SessionConfig,
    ) -> Result<Self, SessionError> {
        let key = ConversationKey::resolve(&me.id, &peer.id)?;
        let feed = LiveFeed::subscribe(store, &key)?;
        let peer_typing = PeerTyping::subscribe(store, &key, &peer.id)?;
        let notifier = TypingNotifier::new(store, &key, &me.id, config.typing_debounce)?;
        let publisher = MessagePublisher::new(store, &key)?;

        info!(%key, me = %me.id, peer = %peer.id, "conversation opened");
        Ok(Self {
            me,
            peer,
            key,
            feed,
            peer_typing,
            notifier,
            publisher,
            compose: String::new(),
            closed: false,
        })
    }

    pub fn key(&self) -> &ConversationKey {
        &self.key
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn compose(&self) -> &str {
        &self.compose
    }

    pub fn current_feed(&self) -> &[FeedEntry] {
        self.feed.current_feed()
    }

    pub fn peer_is_typing(&self) -> bool {
        self.peer_typing.is_typing()
    }

    /// Update the draft; the local typing flag follows whether it is blank.
    pub fn set_compose(&mut self, text: impl Into<String>) {
        self.compose = text.into();
        if !self.closed {
            self.notifier.notify(!self.compose.trim().is_empty());
        }
    }

    /// The compose input lost focus.
    pub fn end_editing(&mut self) {
        if !self.closed {
            self.notifier.notify(false);
        }
    }

    /// Publish the draft. It is cleared only once the write succeeded.
    pub async fn submit(&mut self) -> Result<SendOutcome, SessionError> {
        if self.closed {
            return Err(SessionError::Closed);
        }
        let outcome = self
            .publisher
            .send(&self.compose, &self.me.id, &self.peer.id)
            .await?;
        if let SendOutcome::Sent { .. } = outcome {
            self.set_compose(String::new());
        }
        Ok(outcome)
    }

    /// Wait for the next store notification and apply it.
    pub async fn next_event(&mut self) -> SessionEvent {
        if self.closed {
            return SessionEvent::Closed;
        }
        tokio::select! {
            biased;
            updated = self.feed.next_update() => {
                if updated { SessionEvent::FeedUpdated } else { SessionEvent::Closed }
            }
            typing = self.peer_typing.next_update() => {
                typing.map_or(SessionEvent::Closed, SessionEvent::PeerTyping)
            }
        }
    }

    pub fn view(&self) -> ConversationView {
        let entries = self
            .feed
            .current_feed()
            .iter()
            .map(|entry| ViewEntry {
                is_own: entry.is_from(&self.me.id),
                entry: entry.clone(),
            })
            .collect();
        ConversationView {
            key: self.key.clone(),
            title: format!("Chat {} + {}", self.me.name, self.peer.name),
            entries,
            typing_label: self
                .peer_typing
                .is_typing()
                .then(|| format!("{} is typing...", self.peer.name)),
            compose: self.compose.clone(),
        }
    }

    /// Leave the conversation: detach both listeners and write the local
    /// typing flag `false`. Each release runs regardless of the others.
    pub async fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        let feed_detached = self.feed.unsubscribe();
        let typing_detached = self.peer_typing.unsubscribe();
        if let Err(err) = self.notifier.clear().await {
            warn!(%err, key = %self.key, "failed to clear local typing flag");
        }
        info!(key = %self.key, feed_detached, typing_detached, "conversation closed");
    }
}

impl Drop for ConversationSession {
    fn drop(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;

        self.feed.unsubscribe();
        self.peer_typing.unsubscribe();
        let clear = self.notifier.clear_detached();
        let key = self.key.clone();
        match Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(err) = clear.await {
                        warn!(%err, %key, "failed to clear local typing flag");
                    }
                });
            }
            Err(_) => {
                warn!(%key, "no runtime to clear local typing flag on drop");
            }
        }
        debug!(key = %self.key, "conversation dropped without close");
    }
}
