//! Shared helpers for the conversation integration tests.

use duochat_messaging::{Participant, ParticipantId};
use duochat_node::{ConversationSession, SessionEvent};
use std::time::Duration;

/// Install a test-writer subscriber. Later calls are no-ops.
#[allow(dead_code)]
pub fn init_test_logging() {
    use tracing_subscriber::EnvFilter;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("duochat_node=debug")),
        )
        .with_test_writer()
        .try_init();
}

pub fn participant(id: &str, name: &str) -> Participant {
    Participant {
        id: ParticipantId::new(id).expect("valid test id"),
        name: name.to_owned(),
        avatar_uri: None,
    }
}

/// Apply every notification already queued for `session`.
pub async fn drain(session: &mut ConversationSession) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = tokio::time::timeout(Duration::ZERO, session.next_event()).await {
        if event == SessionEvent::Closed {
            break;
        }
        events.push(event);
    }
    events
}

/// Wait until the session reports the peer's typing flag as `typing`.
pub async fn wait_for_peer_typing(session: &mut ConversationSession, typing: bool) {
    loop {
        match session.next_event().await {
            SessionEvent::PeerTyping(value) if value == typing => return,
            SessionEvent::Closed => panic!("session closed while waiting for typing={typing}"),
            _ => {}
        }
    }
}
