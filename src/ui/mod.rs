// ABOUTME: AG-UI protocol support - run input and event types, history pruning,
// ABOUTME: SSE/NDJSON encoding, and the adapter that streams supervisor runs.

mod adapter;
mod encoder;
mod prune;
mod types;

pub use adapter::{
    EncodedEventStream, FrameStream, UiAdapter, UiEventStream, ValidationDetail, ValidationError,
};
pub use encoder::{EventEncoding, NDJSON_CONTENT_TYPE, SSE_CONTENT_TYPE};
pub use prune::{DEFAULT_MAX_MESSAGE_BYTES, TRUNCATED_PLACEHOLDER, prune_large_messages};
pub use types::{
    InputPart, RunAgentInput, UiContext, UiEvent, UiFunctionCall, UiMessage, UiRunDeps, UiTool,
    UiToolCall, UserContent,
};
