//! Conversation and message models shared across DuoChat clients and services.

pub mod conversation;
pub mod message;
pub mod roster;

pub use conversation::{ConversationKey, IdError, ParticipantId, ResolveError, KEY_DELIMITER};
pub use message::{project_feed, FeedEntry, MessageRecord, TIME_FORMAT};
pub use roster::{Participant, Roster};

/// Characters a store path segment may never contain.
pub const RESERVED_SEGMENT_CHARS: &[char] = &['/', '.', '#', '$', '[', ']'];

/// Whether `segment` can be used verbatim as one level of a store path.
pub fn is_valid_segment(segment: &str) -> bool {
    !segment.is_empty()
        && !segment
            .chars()
            .any(|c| RESERVED_SEGMENT_CHARS.contains(&c) || c.is_control())
}
