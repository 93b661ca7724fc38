//! Stored message records and the render-ready feed projection.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::ParticipantId;

/// Client-local timestamp format stamped into `time` at publish.
pub const TIME_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// One message as written under `conversations/{key}/{push_key}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    pub body: String,
    pub time: String,
    pub sender: ParticipantId,
    pub receiver: ParticipantId,
}

impl MessageRecord {
    /// Build a record stamped with the current local time.
    pub fn compose(body: impl Into<String>, sender: ParticipantId, receiver: ParticipantId) -> Self {
        Self {
            body: body.into(),
            time: chrono::Local::now().format(TIME_FORMAT).to_string(),
            sender,
            receiver,
        }
    }

    pub fn to_value(&self) -> serde_json::Result<Value> {
        serde_json::to_value(self)
    }
}

/// A message as shown in the feed.
///
/// Everything except `body` is optional: entries written by other clients
/// may be incomplete and are still shown as long as they carry text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedEntry {
    pub key: String,
    pub body: String,
    pub time: Option<String>,
    pub sender: Option<ParticipantId>,
    pub receiver: Option<ParticipantId>,
}

impl FeedEntry {
    fn from_child(key: &str, value: &Value) -> Option<Self> {
        let object = value.as_object()?;
        let body = object.get("body")?.as_str()?;
        if body.trim().is_empty() {
            return None;
        }

        let id_field = |name: &str| {
            object
                .get(name)
                .and_then(|raw| ParticipantId::deserialize(raw).ok())
        };

        Some(Self {
            key: key.to_owned(),
            body: body.to_owned(),
            time: object
                .get("time")
                .and_then(Value::as_str)
                .map(str::to_owned),
            sender: id_field("sender"),
            receiver: id_field("receiver"),
        })
    }

    pub fn is_from(&self, participant: &ParticipantId) -> bool {
        self.sender.as_ref() == Some(participant)
    }
}

/// Project a conversation's children into feed entries, keeping their order.
///
/// Children without a non-blank string `body` are left out; this also drops
/// the `typing` node that lives beside the messages.
pub fn project_feed<'a, I>(children: I) -> Vec<FeedEntry>
where
    I: IntoIterator<Item = (&'a str, &'a Value)>,
{
    children
        .into_iter()
        .filter_map(|(key, value)| FeedEntry::from_child(key, value))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn id(raw: &str) -> ParticipantId {
        ParticipantId::new(raw).unwrap()
    }

    #[test]
    fn compose_stamps_time_and_parties() {
        let record = MessageRecord::compose("hi", id("7"), id("12"));
        assert_eq!(record.body, "hi");
        assert!(chrono::NaiveDateTime::parse_from_str(&record.time, TIME_FORMAT).is_ok());

        let value = record.to_value().unwrap();
        assert_eq!(value["sender"], json!("7"));
        assert_eq!(value["receiver"], json!("12"));
    }

    #[test]
    fn projection_drops_blank_and_malformed_children() {
        let conversation = json!({
            "-A": {"body": "hi", "time": "01/01/2024 10:00:00", "sender": "7", "receiver": "12"},
            "-B": {"body": "   ", "sender": "7"},
            "-C": {"time": "no body"},
            "-D": {"body": 42},
            "-E": {"body": "still here", "sender": 12},
            "typing": {"7": true, "12": false}
        });
        let children = conversation
            .as_object()
            .unwrap()
            .iter()
            .map(|(k, v)| (k.as_str(), v));

        let feed = project_feed(children);
        let keys: Vec<_> = feed.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, ["-A", "-E"]);
        assert!(feed[0].is_from(&id("7")));
        assert_eq!(feed[1].sender, Some(id("12")));
        assert_eq!(feed[1].receiver, None);
    }

    #[test]
    fn projection_is_idempotent() {
        let conversation = json!({
            "-A": {"body": "one"},
            "-B": {"body": ""},
            "-C": {"body": "two"}
        });
        let children = || {
            conversation
                .as_object()
                .unwrap()
                .iter()
                .map(|(k, v)| (k.as_str(), v))
        };

        let first = project_feed(children());
        let second = project_feed(children());
        assert_eq!(first, second);
        assert!(first.iter().all(|e| !e.body.trim().is_empty()));
    }
}
