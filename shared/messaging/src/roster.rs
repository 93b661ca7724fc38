//! Participant profiles and the contact list shown before opening a chat.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ParticipantId;

/// A roster profile. Read-only to the conversation engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub id: ParticipantId,
    /// Display name
    #[serde(alias = "nom")]
    pub name: String,
    /// Avatar image location, if the profile has one
    #[serde(default, alias = "uriimage", skip_serializing_if = "Option::is_none")]
    pub avatar_uri: Option<String>,
}

/// The signed-in participant's own profile and everyone they can talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Roster {
    pub current: Option<Participant>,
    pub others: Vec<Participant>,
}

impl Roster {
    /// Split raw profile values into the current user and their contacts.
    ///
    /// Entries that don't decode as a [`Participant`] are skipped.
    pub fn split<'a, I>(profiles: I, current: &ParticipantId) -> Self
    where
        I: IntoIterator<Item = &'a Value>,
    {
        let mut roster = Roster::default();
        for profile in profiles {
            let Ok(participant) = Participant::deserialize(profile) else {
                continue;
            };
            if &participant.id == current {
                roster.current = Some(participant);
            } else {
                roster.others.push(participant);
            }
        }
        roster
    }

    pub fn find(&self, id: &ParticipantId) -> Option<&Participant> {
        self.others.iter().find(|p| &p.id == id)
    }
}
