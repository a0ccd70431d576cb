//! Classification of inbound webhook payloads.
//!
//! A payload looks like `{ "<object>": { "current": {..}, "previous": {..} } }`.
//! `previous` only carries the fields that changed, so a missing `status`
//! there means the status did not change.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid webhook body: {0}")]
pub struct MalformedPayload(#[from] serde_json::Error);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectKind {
    Member,
    Post,
    Page,
}

impl ObjectKind {
    const ALL: [ObjectKind; 3] = [ObjectKind::Member, ObjectKind::Post, ObjectKind::Page];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObjectKind::Member => "member",
            ObjectKind::Post => "post",
            ObjectKind::Page => "page",
        }
    }

    fn has_publish_state(&self) -> bool {
        !matches!(self, ObjectKind::Member)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Added,
    Updated,
    Deleted,
    Published,
    Unpublished,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Added => "added",
            Action::Updated => "updated",
            Action::Deleted => "deleted",
            Action::Published => "published",
            Action::Unpublished => "unpublished",
        }
    }
}

/// Identifying fields copied out of the payload object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub event_type: String,
    pub object: ObjectKind,
    pub action: Action,
    pub receiver_id: String,
    pub data: ObjectSummary,
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.event_type)
    }
}

pub fn parse_body(body: &[u8]) -> Result<Value, MalformedPayload> {
    Ok(serde_json::from_slice(body)?)
}

/// Returns `None` for shapes that carry no recognizable object change.
pub fn classify(receiver_id: &str, payload: &Value) -> Option<Notification> {
    let payload = payload.as_object()?;
    let (kind, entry) = ObjectKind::ALL
        .iter()
        .find_map(|kind| payload.get(kind.as_str()).map(|entry| (*kind, entry)))?;
    let entry = entry.as_object()?;

    let current = non_empty(entry.get("current"));
    let previous = non_empty(entry.get("previous"));

    let action = if kind.has_publish_state() {
        publish_transition(current, previous).or_else(|| presence_action(current, previous))?
    } else {
        presence_action(current, previous)?
    };

    let source = current.or(previous)?;
    Some(Notification {
        event_type: format!("ghost_{}_{}", kind.as_str(), action.as_str()),
        object: kind,
        action,
        receiver_id: receiver_id.to_string(),
        data: summarize(kind, source),
    })
}

fn non_empty(value: Option<&Value>) -> Option<&Map<String, Value>> {
    value.and_then(Value::as_object).filter(|map| !map.is_empty())
}

fn presence_action(
    current: Option<&Map<String, Value>>,
    previous: Option<&Map<String, Value>>,
) -> Option<Action> {
    match (current.is_some(), previous.is_some()) {
        (true, false) => Some(Action::Added),
        (false, true) => Some(Action::Deleted),
        (true, true) => Some(Action::Updated),
        (false, false) => None,
    }
}

fn publish_transition(
    current: Option<&Map<String, Value>>,
    previous: Option<&Map<String, Value>>,
) -> Option<Action> {
    let current_status = current.and_then(|c| str_field(c, "status"));
    let previous_status = previous.and_then(|p| str_field(p, "status").or(current_status));

    let now_published = current_status == Some("published");
    let was_published = previous_status == Some("published");

    match (was_published, now_published) {
        (false, true) => Some(Action::Published),
        (true, false) => Some(Action::Unpublished),
        _ => None,
    }
}

fn summarize(kind: ObjectKind, source: &Map<String, Value>) -> ObjectSummary {
    let field = |name: &str| str_field(source, name).map(str::to_string);
    match kind {
        ObjectKind::Member => ObjectSummary {
            id: field("id"),
            email: field("email"),
            name: field("name"),
            status: field("status"),
            ..Default::default()
        },
        ObjectKind::Post | ObjectKind::Page => ObjectSummary {
            id: field("id"),
            title: field("title"),
            slug: field("slug"),
            status: field("status"),
            url: field("url"),
            ..Default::default()
        },
    }
}

fn str_field<'a>(map: &'a Map<String, Value>, name: &str) -> Option<&'a str> {
    map.get(name).and_then(Value::as_str)
}
