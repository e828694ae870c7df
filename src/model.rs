use serde::{Deserialize, Deserializer, Serialize};

use crate::gql::model::MessageEdge;

/// One entry of the followers list.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    #[serde(rename = "userName", alias = "displayName", alias = "login")]
    pub display_name: String,
    #[serde(
        rename = "userID",
        alias = "userId",
        alias = "id",
        default,
        deserialize_with = "deserialize_user_id"
    )]
    pub user_id: Option<String>,
}

impl UserRecord {
    pub fn new(display_name: impl Into<String>, user_id: Option<&str>) -> Self {
        Self {
            display_name: display_name.into(),
            user_id: user_id.filter(|id| !id.trim().is_empty()).map(str::to_string),
        }
    }
}

/// Accepts a string or a number; null and empty strings mean "unknown user".
fn deserialize_user_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::String(s)) => Ok(Some(s).filter(|s| !s.trim().is_empty())),
        Some(serde_json::Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(D::Error::custom(format!(
            "expected string or number for user id, got {}",
            other
        ))),
    }
}

/// A message as written to an archive file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedMessage {
    pub content: String,
    pub is_deleted: bool,
    pub display_name: String,
    pub sender_id: String,
    pub sent_at: String,
}

impl From<&MessageEdge> for ArchivedMessage {
    fn from(edge: &MessageEdge) -> Self {
        let Some(node) = edge.node.as_ref() else {
            return Self::default();
        };
        let sender = node.sender.as_ref();
        Self {
            content: node
                .content
                .as_ref()
                .and_then(|c| c.text.clone())
                .unwrap_or_default(),
            is_deleted: node.is_deleted.unwrap_or(false),
            display_name: sender
                .and_then(|s| s.display_name.clone())
                .unwrap_or_default(),
            sender_id: sender.and_then(|s| s.id.clone()).unwrap_or_default(),
            sent_at: node.sent_at.clone().unwrap_or_default(),
        }
    }
}

/// Complete message history of one user; one file per user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatArchive {
    pub display_name: String,
    pub user_id: Option<String>,
    pub messages: Vec<ArchivedMessage>,
}

impl ChatArchive {
    /// Archive for a user that does not resolve on the remote side.
    pub fn empty(user: &UserRecord) -> Self {
        Self {
            display_name: user.display_name.clone(),
            user_id: user.user_id.clone(),
            messages: Vec::new(),
        }
    }

    pub fn from_edges(user: &UserRecord, edges: &[MessageEdge]) -> Self {
        Self {
            display_name: user.display_name.clone(),
            user_id: user.user_id.clone(),
            messages: edges.iter().map(ArchivedMessage::from).collect(),
        }
    }
}
