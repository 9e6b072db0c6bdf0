// ABOUTME: Streaming response adapter - validates a RunAgentInput body, prunes the
// ABOUTME: history, runs the supervisor in streaming mode and encodes AG-UI events.

use std::pin::Pin;
use std::sync::Arc;

use futures::{Stream, StreamExt};
use serde::Serialize;
use tracing::{debug, warn};

use super::encoder::EventEncoding;
use super::prune::{DEFAULT_MAX_MESSAGE_BYTES, prune_large_messages};
use super::types::{RunAgentInput, UiEvent, UiRunDeps};
use crate::agent::{RunContext, Supervisor};

pub type UiEventStream = Pin<Box<dyn Stream<Item = UiEvent> + Send>>;
pub type FrameStream = Pin<Box<dyn Stream<Item = String> + Send>>;

/// A request body that is not a valid RunAgentInput.
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[error("invalid run input: {}", .detail.first().map(|d| d.msg.as_str()).unwrap_or("unknown error"))]
pub struct ValidationError {
    pub detail: Vec<ValidationDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDetail {
    #[serde(rename = "type")]
    pub kind: String,
    pub loc: Vec<String>,
    pub msg: String,
    pub line: usize,
    pub column: usize,
}

impl From<serde_json::Error> for ValidationError {
    fn from(e: serde_json::Error) -> Self {
        let kind = match e.classify() {
            serde_json::error::Category::Data => "value_error",
            serde_json::error::Category::Eof => "json_eof",
            serde_json::error::Category::Syntax | serde_json::error::Category::Io => {
                "json_invalid"
            }
        };
        ValidationError {
            detail: vec![ValidationDetail {
                kind: kind.to_string(),
                loc: vec!["body".to_string()],
                msg: e.to_string(),
                line: e.line(),
                column: e.column(),
            }],
        }
    }
}

/// Encoded response: the negotiated encoding and its frames.
pub struct EncodedEventStream {
    pub encoding: EventEncoding,
    pub frames: FrameStream,
}

/// Stateless bridge between AG-UI requests and the supervisor.
#[derive(Clone)]
pub struct UiAdapter {
    supervisor: Arc<Supervisor>,
    max_message_bytes: usize,
}

impl UiAdapter {
    pub fn new(supervisor: Arc<Supervisor>) -> Self {
        Self {
            supervisor,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max: usize) -> Self {
        self.max_message_bytes = max;
        self
    }

    pub fn parse(body: &[u8]) -> Result<RunAgentInput, ValidationError> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Validate `body` and start the run. Nothing runs when validation fails.
    pub fn adapt(
        &self,
        body: &[u8],
        accept: Option<&str>,
    ) -> Result<EncodedEventStream, ValidationError> {
        let input = Self::parse(body)?;
        let encoding = EventEncoding::from_accept(accept);

        let frames = self.events(input).filter_map(move |event| {
            let frame = match encoding.encode(&event) {
                Ok(frame) => Some(frame),
                Err(e) => {
                    warn!(error = %e, "Dropping unencodable event");
                    None
                }
            };
            futures::future::ready(frame)
        });

        Ok(EncodedEventStream {
            encoding,
            frames: Box::pin(frames),
        })
    }

    /// Run the supervisor on `input`, yielding AG-UI events.
    ///
    /// The stream starts with `RUN_STARTED` and ends with exactly one
    /// `RUN_FINISHED` or `RUN_ERROR`. Dropping it cancels the run.
    pub fn events(&self, mut input: RunAgentInput) -> UiEventStream {
        input.messages = prune_large_messages(&input.messages, self.max_message_bytes);
        let supervisor = Arc::clone(&self.supervisor);

        Box::pin(async_stream::stream! {
            let thread_id = input.thread_id.clone();
            let run_id = input.run_id.clone();
            let conversation = input.to_conversation();
            let ctx = RunContext::new().with_deps(UiRunDeps {
                thread_id: thread_id.clone(),
                run_id: run_id.clone(),
                state: input.state,
                forwarded_props: input.forwarded_props,
            });
            let _cancel_on_drop = ctx.cancellation_token().clone().drop_guard();

            debug!(thread = %thread_id, run = %run_id, messages = conversation.messages.len(), "Starting AG-UI run");
            yield UiEvent::RunStarted {
                thread_id: thread_id.clone(),
                run_id: run_id.clone(),
                parent_run_id: input.parent_run_id,
            };

            let mut run = supervisor.run_stream(conversation, ctx.clone());
            let mut terminated = false;
            while let Some(event) = run.next().await {
                match event {
                    Ok(event) => {
                        let event = UiEvent::from_agent(event, &thread_id, &run_id);
                        let terminal = event.is_terminal();
                        yield event;
                        if terminal {
                            terminated = true;
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(thread = %thread_id, run = %run_id, error = %e, "AG-UI run failed");
                        yield UiEvent::RunError {
                            message: e.to_string(),
                            code: None,
                        };
                        terminated = true;
                        break;
                    }
                }
            }
            if !terminated {
                yield UiEvent::RunError {
                    message: "Run ended without a result".to_string(),
                    code: None,
                };
            }
        })
    }
}
