// ABOUTME: ToolResult - the outcome of one tool call, success or error,
// ABOUTME: with optional structured metadata, convertible to a model content block.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::llm::ContentBlock;

/// Result of a tool execution.
#[derive(Debug, Clone, Default)]
pub struct ToolResult {
    /// Text handed back to the model.
    pub content: String,

    pub is_error: bool,

    /// Structured side data (not sent to the model).
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ToolResult {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: message.into(),
            is_error: true,
            ..Default::default()
        }
    }

    /// Serialize a value as pretty JSON text.
    pub fn json(value: &impl Serialize) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::error(format!("Failed to serialize result: {e}")),
        }
    }

    /// Add metadata to the result. Values that fail to serialize are dropped.
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.metadata.insert(key.into(), v);
        }
        self
    }

    /// Convert into the tool-result block answering `tool_use_id`.
    pub fn into_block(self, tool_use_id: impl Into<String>) -> ContentBlock {
        if self.is_error {
            ContentBlock::tool_error(tool_use_id, self.content)
        } else {
            ContentBlock::tool_result(tool_use_id, self.content)
        }
    }
}
