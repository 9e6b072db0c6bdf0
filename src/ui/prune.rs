// ABOUTME: History pruning - replaces the content of oversized AG-UI messages with a
// ABOUTME: fixed placeholder so the model context stays bounded.

use super::types::{UiFunctionCall, UiMessage, UiToolCall, UserContent};

pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 50_000;

pub const TRUNCATED_PLACEHOLDER: &str =
    "[Content truncated: message exceeded the context size limit]";

fn serialized_len(message: &UiMessage) -> usize {
    serde_json::to_vec(message).map(|v| v.len()).unwrap_or(0)
}

/// Copy of `message` with its content replaced by the placeholder.
/// Role, id and tool-call linkage survive; tool-call arguments become `{}`.
fn truncated(message: &UiMessage) -> UiMessage {
    let placeholder = TRUNCATED_PLACEHOLDER.to_string();
    match message {
        UiMessage::User { id, .. } => UiMessage::User {
            id: id.clone(),
            content: UserContent::Text(placeholder),
        },
        UiMessage::Assistant { id, tool_calls, .. } => UiMessage::Assistant {
            id: id.clone(),
            content: Some(placeholder),
            tool_calls: tool_calls
                .iter()
                .map(|call| UiToolCall {
                    id: call.id.clone(),
                    kind: call.kind.clone(),
                    function: UiFunctionCall {
                        name: call.function.name.clone(),
                        arguments: "{}".to_string(),
                    },
                })
                .collect(),
        },
        UiMessage::Tool {
            id,
            tool_call_id,
            error,
            ..
        } => UiMessage::Tool {
            id: id.clone(),
            content: placeholder,
            tool_call_id: tool_call_id.clone(),
            error: error.as_ref().map(|_| TRUNCATED_PLACEHOLDER.to_string()),
        },
        UiMessage::System { id, .. } => UiMessage::System {
            id: id.clone(),
            content: placeholder,
        },
        UiMessage::Developer { id, .. } => UiMessage::Developer {
            id: id.clone(),
            content: placeholder,
        },
    }
}

/// Prune every message whose serialized JSON exceeds `max_bytes`.
///
/// Returns a new sequence of the same length and role order. Idempotent.
pub fn prune_large_messages(messages: &[UiMessage], max_bytes: usize) -> Vec<UiMessage> {
    messages
        .iter()
        .map(|m| {
            if serialized_len(m) > max_bytes {
                truncated(m)
            } else {
                m.clone()
            }
        })
        .collect()
}
