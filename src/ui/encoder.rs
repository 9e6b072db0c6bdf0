// ABOUTME: Event encoding negotiated from the Accept header: SSE `data:` frames
// ABOUTME: (the default) or newline-delimited JSON.

use super::types::UiEvent;

pub const SSE_CONTENT_TYPE: &str = "text/event-stream";
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventEncoding {
    #[default]
    Sse,
    NdJson,
}

impl EventEncoding {
    /// Pick the first supported media type in `accept`; anything else is SSE.
    pub fn from_accept(accept: Option<&str>) -> Self {
        accept
            .into_iter()
            .flat_map(|a| a.split(','))
            .map(|media| media.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
            .find_map(|media| match media.as_str() {
                SSE_CONTENT_TYPE => Some(EventEncoding::Sse),
                NDJSON_CONTENT_TYPE => Some(EventEncoding::NdJson),
                _ => None,
            })
            .unwrap_or_default()
    }

    pub fn content_type(self) -> &'static str {
        match self {
            EventEncoding::Sse => SSE_CONTENT_TYPE,
            EventEncoding::NdJson => NDJSON_CONTENT_TYPE,
        }
    }

    /// Encode one event as a complete frame.
    pub fn encode(self, event: &UiEvent) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(event)?;
        Ok(match self {
            EventEncoding::Sse => format!("data: {}\n\n", json),
            EventEncoding::NdJson => format!("{}\n", json),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_negotiation() {
        assert_eq!(EventEncoding::from_accept(None), EventEncoding::Sse);
        assert_eq!(
            EventEncoding::from_accept(Some("application/x-ndjson")),
            EventEncoding::NdJson
        );
        assert_eq!(
            EventEncoding::from_accept(Some("application/json, application/x-ndjson; q=0.9")),
            EventEncoding::NdJson
        );
        assert_eq!(
            EventEncoding::from_accept(Some("text/html")),
            EventEncoding::Sse
        );
        assert_eq!(EventEncoding::from_accept(Some("*/*")), EventEncoding::Sse);
    }

    #[test]
    fn test_frames() {
        let event = UiEvent::TextMessageEnd {
            message_id: "m1".into(),
        };
        assert_eq!(
            EventEncoding::Sse.encode(&event).unwrap(),
            "data: {\"type\":\"TEXT_MESSAGE_END\",\"messageId\":\"m1\"}\n\n"
        );
        assert_eq!(
            EventEncoding::NdJson.encode(&event).unwrap(),
            "{\"type\":\"TEXT_MESSAGE_END\",\"messageId\":\"m1\"}\n"
        );
    }
}
