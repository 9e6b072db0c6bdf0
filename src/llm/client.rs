// ABOUTME: Defines the LlmClient trait - the abstraction layer that lets every
// ABOUTME: agent talk to any model provider (OpenAI-compatible, Anthropic).

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;

use super::{ContentBlock, Request, Response, StopReason, Usage};
use crate::error::LlmError;

/// Boxed stream of streaming events tied to the borrowed client and request.
pub type EventStream<'a> = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send + 'a>>;

/// Event types for streaming responses.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// Message creation started.
    MessageStart { id: String, model: String },

    /// A content block started.
    ContentBlockStart { index: usize, block: ContentBlock },

    /// Text delta for a content block.
    ContentBlockDelta { index: usize, text: String },

    /// Partial JSON for a tool use block's input.
    InputJsonDelta { index: usize, partial_json: String },

    /// A content block finished.
    ContentBlockStop { index: usize },

    /// Message metadata update.
    MessageDelta {
        stop_reason: Option<StopReason>,
        usage: Usage,
    },

    /// Message complete.
    MessageStop,
}

impl StreamEvent {
    /// Expand a complete response into the event sequence a streaming
    /// provider would have produced for it.
    pub fn replay(response: &Response) -> Vec<StreamEvent> {
        let mut events = vec![StreamEvent::MessageStart {
            id: response.id.clone(),
            model: response.model.clone(),
        }];

        for (index, block) in response.content.iter().enumerate() {
            match block {
                ContentBlock::Text { text } => {
                    events.push(StreamEvent::ContentBlockStart {
                        index,
                        block: ContentBlock::text(""),
                    });
                    events.push(StreamEvent::ContentBlockDelta {
                        index,
                        text: text.clone(),
                    });
                }
                ContentBlock::ToolUse { id, name, input } => {
                    events.push(StreamEvent::ContentBlockStart {
                        index,
                        block: ContentBlock::ToolUse {
                            id: id.clone(),
                            name: name.clone(),
                            input: serde_json::json!({}),
                        },
                    });
                    events.push(StreamEvent::InputJsonDelta {
                        index,
                        partial_json: input.to_string(),
                    });
                }
                ContentBlock::ToolResult { .. } => continue,
            }
            events.push(StreamEvent::ContentBlockStop { index });
        }

        events.push(StreamEvent::MessageDelta {
            stop_reason: Some(response.stop_reason),
            usage: response.usage.clone(),
        });
        events.push(StreamEvent::MessageStop);
        events
    }
}

/// Trait for LLM client implementations.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Create a message (non-streaming).
    async fn create_message(&self, req: &Request) -> Result<Response, LlmError>;

    /// Create a message with streaming response.
    ///
    /// The default implementation performs a blocking call and replays it.
    fn create_message_stream<'a>(&'a self, req: &'a Request) -> EventStream<'a> {
        Box::pin(async_stream::try_stream! {
            let response = self.create_message(req).await?;
            for event in StreamEvent::replay(&response) {
                yield event;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replay_text_and_tool() {
        let response = Response {
            id: "r1".into(),
            content: vec![
                ContentBlock::text("Checking"),
                ContentBlock::ToolUse {
                    id: "t1".into(),
                    name: "lookup".into(),
                    input: serde_json::json!({"q": 1}),
                },
            ],
            stop_reason: StopReason::ToolUse,
            model: "m".into(),
            usage: Usage {
                input_tokens: 3,
                output_tokens: 4,
            },
        };

        let events = StreamEvent::replay(&response);
        assert_eq!(events.len(), 9);
        assert!(matches!(events[0], StreamEvent::MessageStart { .. }));
        assert_eq!(
            events[2],
            StreamEvent::ContentBlockDelta {
                index: 0,
                text: "Checking".into()
            }
        );
        assert_eq!(
            events[5],
            StreamEvent::InputJsonDelta {
                index: 1,
                partial_json: "{\"q\":1}".into()
            }
        );
        assert_eq!(events[8], StreamEvent::MessageStop);
    }
}
