// ABOUTME: Utility that accumulates StreamEvents into Vec<ContentBlock>.
// ABOUTME: Tracks blocks by index so interleaved tool calls assemble correctly.

use std::collections::BTreeMap;

use super::{ContentBlock, StopReason, StreamEvent, Usage};

enum PartialBlock {
    Text(String),
    ToolUse {
        id: String,
        name: String,
        input: String,
    },
}

impl PartialBlock {
    fn finish(self) -> Option<ContentBlock> {
        match self {
            PartialBlock::Text(text) if text.is_empty() => None,
            PartialBlock::Text(text) => Some(ContentBlock::text(text)),
            PartialBlock::ToolUse { id, name, input } => {
                let input = if input.trim().is_empty() {
                    serde_json::Value::Object(serde_json::Map::new())
                } else {
                    serde_json::from_str(&input)
                        .unwrap_or(serde_json::Value::Object(serde_json::Map::new()))
                };
                Some(ContentBlock::ToolUse { id, name, input })
            }
        }
    }
}

/// Accumulates streaming events into finalized content blocks.
///
/// Feed events via [`handle_event`](Self::handle_event) and call
/// [`into_content`](Self::into_content) to retrieve the assembled blocks in
/// index order.
#[derive(Default)]
pub struct StreamAccumulator {
    open: BTreeMap<usize, PartialBlock>,
    done: BTreeMap<usize, ContentBlock>,
    usage: Usage,
    stop_reason: Option<StopReason>,
}

impl StreamAccumulator {
    /// Create a new empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process a single stream event.
    pub fn handle_event(&mut self, event: &StreamEvent) {
        match event {
            StreamEvent::ContentBlockStart { index, block } => {
                let partial = match block {
                    ContentBlock::ToolUse { id, name, .. } => PartialBlock::ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: String::new(),
                    },
                    ContentBlock::Text { text } => PartialBlock::Text(text.clone()),
                    ContentBlock::ToolResult { .. } => return,
                };
                self.open.insert(*index, partial);
            }
            StreamEvent::ContentBlockDelta { index, text } => {
                match self
                    .open
                    .entry(*index)
                    .or_insert_with(|| PartialBlock::Text(String::new()))
                {
                    PartialBlock::Text(buf) => buf.push_str(text),
                    PartialBlock::ToolUse { .. } => {}
                }
            }
            StreamEvent::InputJsonDelta {
                index,
                partial_json,
            } => {
                if let Some(PartialBlock::ToolUse { input, .. }) = self.open.get_mut(index) {
                    input.push_str(partial_json);
                }
            }
            StreamEvent::ContentBlockStop { index } => {
                if let Some(block) = self.open.remove(index).and_then(PartialBlock::finish) {
                    self.done.insert(*index, block);
                }
            }
            StreamEvent::MessageDelta { stop_reason, usage } => {
                if stop_reason.is_some() {
                    self.stop_reason = *stop_reason;
                }
                self.usage.input_tokens += usage.input_tokens;
                self.usage.output_tokens += usage.output_tokens;
            }
            StreamEvent::MessageStart { .. } | StreamEvent::MessageStop => {}
        }
    }

    /// Returns true if any tool use block is still open.
    pub fn in_tool_use(&self) -> bool {
        self.open
            .values()
            .any(|b| matches!(b, PartialBlock::ToolUse { .. }))
    }

    /// Usage reported by the stream so far.
    pub fn usage(&self) -> &Usage {
        &self.usage
    }

    /// Stop reason reported by the stream, if any.
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// Consume the accumulator and return the content blocks.
    /// Blocks that never saw a stop event are finalized as-is.
    pub fn into_content(mut self) -> Vec<ContentBlock> {
        for (index, partial) in std::mem::take(&mut self.open) {
            if let Some(block) = partial.finish() {
                self.done.insert(index, block);
            }
        }
        self.done.into_values().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool_start(index: usize, id: &str, name: &str) -> StreamEvent {
        StreamEvent::ContentBlockStart {
            index,
            block: ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input: serde_json::json!({}),
            },
        }
    }

    #[test]
    fn test_accumulate_text_only() {
        let mut acc = StreamAccumulator::new();
        acc.handle_event(&StreamEvent::MessageStart {
            id: "msg_1".into(),
            model: "test".into(),
        });
        acc.handle_event(&StreamEvent::ContentBlockStart {
            index: 0,
            block: ContentBlock::text(""),
        });
        acc.handle_event(&StreamEvent::ContentBlockDelta {
            index: 0,
            text: "Hello, ".into(),
        });
        acc.handle_event(&StreamEvent::ContentBlockDelta {
            index: 0,
            text: "world".into(),
        });
        acc.handle_event(&StreamEvent::ContentBlockStop { index: 0 });
        acc.handle_event(&StreamEvent::MessageDelta {
            stop_reason: Some(StopReason::EndTurn),
            usage: Usage {
                input_tokens: 10,
                output_tokens: 2,
            },
        });

        assert_eq!(acc.stop_reason(), Some(StopReason::EndTurn));
        assert_eq!(acc.usage().input_tokens, 10);
        let content = acc.into_content();
        assert_eq!(content, vec![ContentBlock::text("Hello, world")]);
    }

    #[test]
    fn test_interleaved_tool_calls() {
        let mut acc = StreamAccumulator::new();
        acc.handle_event(&tool_start(1, "a", "first"));
        acc.handle_event(&StreamEvent::InputJsonDelta {
            index: 1,
            partial_json: "{\"x\":".into(),
        });
        acc.handle_event(&tool_start(2, "b", "second"));
        assert!(acc.in_tool_use());
        acc.handle_event(&StreamEvent::InputJsonDelta {
            index: 2,
            partial_json: "{}".into(),
        });
        acc.handle_event(&StreamEvent::InputJsonDelta {
            index: 1,
            partial_json: "1}".into(),
        });
        acc.handle_event(&StreamEvent::ContentBlockStop { index: 1 });
        acc.handle_event(&StreamEvent::ContentBlockStop { index: 2 });
        assert!(!acc.in_tool_use());

        let content = acc.into_content();
        assert_eq!(content.len(), 2);
        match &content[0] {
            ContentBlock::ToolUse { id, name, input } => {
                assert_eq!(id, "a");
                assert_eq!(name, "first");
                assert_eq!(input["x"], 1);
            }
            other => panic!("Expected ToolUse, got {:?}", other),
        }
        match &content[1] {
            ContentBlock::ToolUse { name, .. } => assert_eq!(name, "second"),
            other => panic!("Expected ToolUse, got {:?}", other),
        }
    }

    #[test]
    fn test_unclosed_blocks_are_kept() {
        let mut acc = StreamAccumulator::new();
        acc.handle_event(&StreamEvent::ContentBlockDelta {
            index: 0,
            text: "partial".into(),
        });
        assert_eq!(acc.into_content(), vec![ContentBlock::text("partial")]);
    }

    #[test]
    fn test_round_trip_through_replay() {
        let response = crate::llm::Response {
            id: "r".into(),
            content: vec![
                ContentBlock::text("hi"),
                ContentBlock::ToolUse {
                    id: "t".into(),
                    name: "n".into(),
                    input: serde_json::json!({"k": "v"}),
                },
            ],
            stop_reason: StopReason::ToolUse,
            model: "m".into(),
            usage: Usage::default(),
        };

        let mut acc = StreamAccumulator::new();
        for event in StreamEvent::replay(&response) {
            acc.handle_event(&event);
        }
        assert_eq!(acc.into_content(), response.content);
    }
}
