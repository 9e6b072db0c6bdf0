// ABOUTME: ModelSettings - sampling and transport knobs shared by every agent.
// ABOUTME: Resolved once from configuration and copied into each request.

use std::collections::BTreeMap;
use std::time::Duration;

/// Settings applied to every model request an agent makes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelSettings {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    /// HTTP timeout for a single model call.
    pub timeout: Option<Duration>,
    pub parallel_tool_calls: Option<bool>,
    pub seed: Option<i64>,
    pub presence_penalty: Option<f64>,
    pub frequency_penalty: Option<f64>,
    pub logit_bias: Option<serde_json::Map<String, serde_json::Value>>,
    pub stop_sequences: Vec<String>,
    pub extra_headers: BTreeMap<String, String>,
    /// Merged into the provider JSON body last, so it can override any field.
    pub extra_body: Option<serde_json::Map<String, serde_json::Value>>,
}

impl ModelSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn stop_sequences(mut self, stops: Vec<String>) -> Self {
        self.stop_sequences = stops;
        self
    }

    pub fn extra_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.insert(name.into(), value.into());
        self
    }

    /// Whether tool calls from one model turn may run concurrently.
    /// Defaults to true when unset.
    pub fn allows_parallel_tool_calls(&self) -> bool {
        self.parallel_tool_calls.unwrap_or(true)
    }

    /// Merge `extra_body` into a serialized provider request.
    pub(crate) fn apply_extra_body(&self, body: &mut serde_json::Value) {
        if let (Some(extra), Some(obj)) = (&self.extra_body, body.as_object_mut()) {
            for (k, v) in extra {
                obj.insert(k.clone(), v.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parallel_defaults_to_true() {
        assert!(ModelSettings::new().allows_parallel_tool_calls());
        assert!(!ModelSettings::new()
            .parallel_tool_calls(false)
            .allows_parallel_tool_calls());
    }

    #[test]
    fn test_extra_body_overrides_fields() {
        let mut extra = serde_json::Map::new();
        extra.insert("temperature".into(), json!(0.1));
        extra.insert("reasoning".into(), json!({"effort": "low"}));
        let settings = ModelSettings {
            extra_body: Some(extra),
            ..Default::default()
        };

        let mut body = json!({"model": "m", "temperature": 0.7});
        settings.apply_extra_body(&mut body);

        assert_eq!(body["temperature"], 0.1);
        assert_eq!(body["reasoning"]["effort"], "low");
        assert_eq!(body["model"], "m");
    }
}
