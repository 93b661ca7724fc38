//! Participant identifiers and the pair-commutative conversation key.

use serde::{de, Deserialize, Deserializer, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::is_valid_segment;

/// Separates the two participant ids inside a conversation key.
///
/// Participant ids may not contain it, which keeps `{larger}~{smaller}`
/// unambiguous for ids of any length.
pub const KEY_DELIMITER: char = '~';

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IdError {
    #[error("participant id is empty")]
    Empty,
    #[error("participant id {0:?} is not a valid store path segment")]
    InvalidSegment(String),
    #[error("participant id {0:?} contains the reserved delimiter '~'")]
    ReservedDelimiter(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error("a conversation needs two distinct participants, got {0} twice")]
    SameParticipant(ParticipantId),
}

/// Identifier of a roster participant.
///
/// Ids order numerically when both are decimal integers (so `7 < 12`),
/// otherwise lexicographically, with numeric ids before textual ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    pub fn new(id: impl Into<String>) -> Result<Self, IdError> {
        let id = id.into();
        if id.is_empty() {
            return Err(IdError::Empty);
        }
        if id.contains(KEY_DELIMITER) {
            return Err(IdError::ReservedDelimiter(id));
        }
        if !is_valid_segment(&id) {
            return Err(IdError::InvalidSegment(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn numeric(&self) -> Option<u128> {
        if self.0.bytes().all(|b| b.is_ascii_digit()) {
            self.0.parse().ok()
        } else {
            None
        }
    }
}

impl Ord for ParticipantId {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.numeric(), other.numeric()) {
            // "007" and "7" are different ids with the same value; fall back
            // to the text so the order stays total.
            (Some(a), Some(b)) => a.cmp(&b).then_with(|| self.0.cmp(&other.0)),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => self.0.cmp(&other.0),
        }
    }
}

impl PartialOrd for ParticipantId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for ParticipantId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for ParticipantId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        // Older rosters stored ids as JSON numbers.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawId {
            Text(String),
            Number(serde_json::Number),
        }

        let raw = match RawId::deserialize(deserializer)? {
            RawId::Text(text) => text,
            RawId::Number(number) => number.to_string(),
        };
        ParticipantId::new(raw).map_err(de::Error::custom)
    }
}

/// Store path segment addressing one two-party conversation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationKey(String);

impl ConversationKey {
    /// Derive the key for the unordered pair `{a, b}`.
    ///
    /// `resolve(a, b) == resolve(b, a)` for every pair of distinct ids.
    pub fn resolve(a: &ParticipantId, b: &ParticipantId) -> Result<Self, ResolveError> {
        let (larger, smaller) = match a.cmp(b) {
            Ordering::Greater => (a, b),
            Ordering::Less => (b, a),
            Ordering::Equal => return Err(ResolveError::SameParticipant(a.clone())),
        };
        Ok(Self(format!("{larger}{KEY_DELIMITER}{smaller}")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
