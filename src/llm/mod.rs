// ABOUTME: LLM module - client abstraction for language model providers.
// ABOUTME: Defines types, settings, the client trait, and provider implementations.

mod anthropic;
mod client;
mod lines;
mod openai;
mod provider;
mod settings;
pub mod stream_accumulator;
mod types;

pub use anthropic::*;
pub use client::*;
pub use openai::*;
pub use provider::*;
pub use settings::*;
pub use stream_accumulator::StreamAccumulator;

pub(crate) use lines::LineBuffer;
pub use types::*;

#[cfg(test)]
pub(crate) mod mock;


#[cfg(test)]
mod anthropic_test;
