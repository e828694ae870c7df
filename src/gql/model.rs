use serde::Deserialize;
use serde_json::Value;

/// Error message the API reports once the integrity token is rejected.
pub const INTEGRITY_FAILURE_MESSAGE: &str = "failed integrity check";

const MESSAGES_POINTER: &str = "/0/data/viewerCardModLogs/messages";

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MessageContent {
    pub text: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageSender {
    pub id: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageNode {
    pub content: Option<MessageContent>,
    pub is_deleted: Option<bool>,
    pub sender: Option<MessageSender>,
    pub sent_at: Option<String>,
}

#[derive(Deserialize, Debug, Clone, Default)]
pub struct MessageEdge {
    pub cursor: Option<String>,
    pub node: Option<MessageNode>,
}

#[derive(Deserialize, Debug, Clone, Default)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub has_next_page: Option<bool>,
}

#[derive(Deserialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MessagePage {
    pub edges: Vec<MessageEdge>,
    pub page_info: Option<PageInfo>,
}

impl MessagePage {
    pub fn has_next_page(&self) -> bool {
        self.page_info
            .as_ref()
            .and_then(|p| p.has_next_page)
            .unwrap_or(false)
    }

    /// Cursor of the last edge, where the next page starts.
    pub fn last_cursor(&self) -> Option<&str> {
        self.edges.last().and_then(|e| e.cursor.as_deref())
    }
}

/// True when the first response entry reports the integrity failure.
pub fn integrity_failed(payload: &Value) -> bool {
    payload
        .pointer("/0/errors")
        .and_then(Value::as_array)
        .is_some_and(|errors| {
            errors.iter().any(|e| {
                e.get("message").and_then(Value::as_str) == Some(INTEGRITY_FAILURE_MESSAGE)
            })
        })
}

/// Extract the message page, or None when the payload lacks the expected shape.
pub fn extract_page(payload: &Value) -> Option<MessagePage> {
    let messages = payload.pointer(MESSAGES_POINTER)?;
    if messages.is_null() {
        return None;
    }
    serde_json::from_value(messages.clone()).ok()
}
