// ABOUTME: RunContext - per-request usage accounting, caller dependencies, and
// ABOUTME: cancellation, shared by the supervisor and every delegated run.

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::llm::Usage;

/// Point-in-time copy of the usage counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunUsage {
    pub requests: u64,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub tool_calls: u64,
}

impl RunUsage {
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

/// Additive usage counters. Safe to update from concurrent delegations.
#[derive(Debug, Default)]
pub struct UsageTracker {
    requests: AtomicU64,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
    tool_calls: AtomicU64,
}

impl UsageTracker {
    /// Record one model request and the tokens it consumed.
    pub fn record_request(&self, usage: &Usage) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        self.input_tokens
            .fetch_add(u64::from(usage.input_tokens), Ordering::Relaxed);
        self.output_tokens
            .fetch_add(u64::from(usage.output_tokens), Ordering::Relaxed);
    }

    pub fn record_tool_calls(&self, count: usize) {
        self.tool_calls.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RunUsage {
        RunUsage {
            requests: self.requests.load(Ordering::Relaxed),
            input_tokens: self.input_tokens.load(Ordering::Relaxed),
            output_tokens: self.output_tokens.load(Ordering::Relaxed),
            tool_calls: self.tool_calls.load(Ordering::Relaxed),
        }
    }
}

/// Context threaded through one top-level request.
///
/// Clones share the same usage counters, dependency bag and cancellation
/// token, so a delegated run accounts into its caller's totals.
#[derive(Clone, Default)]
pub struct RunContext {
    usage: Arc<UsageTracker>,
    deps: Option<Arc<dyn Any + Send + Sync>>,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an opaque caller-supplied dependency value.
    pub fn with_deps<T: Any + Send + Sync>(mut self, deps: T) -> Self {
        self.deps = Some(Arc::new(deps));
        self
    }

    /// Borrow the dependency value if it has type `T`.
    pub fn deps<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.deps.as_deref().and_then(|d| d.downcast_ref::<T>())
    }

    pub fn usage(&self) -> &UsageTracker {
        &self.usage
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("usage", &self.usage.snapshot())
            .field("has_deps", &self.deps.is_some())
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}
