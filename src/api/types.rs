//! Typed response contracts of the school REST API

use serde::Deserialize;

/// Ingest endpoint for a lesson broadcast
///
/// The backend has returned the URL under both `whipUrl` and `whip_url`;
/// the camel-case field wins when both are present.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct WhipEndpoint {
    #[serde(rename = "whipUrl", default)]
    camel: Option<String>,

    #[serde(rename = "whip_url", default)]
    snake: Option<String>,
}

impl WhipEndpoint {
    pub fn url(&self) -> Option<&str> {
        [self.camel.as_deref(), self.snake.as_deref()]
            .into_iter()
            .flatten()
            .map(str::trim)
            .find(|u| !u.is_empty())
    }
}

/// Acknowledgement of a live-lesson start request
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct StartLiveResponse {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub data: Option<serde_json::Value>,
}

/// Error body shape: `{"message": ...}` or `{"error": ...}`
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorBody {
    pub fn into_message(self) -> Option<String> {
        self.message
            .filter(|m| !m.is_empty())
            .or(self.error.filter(|e| !e.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whip_endpoint_camel_case() {
        let ep: WhipEndpoint = serde_json::from_str(r#"{"whipUrl":"https://a/whip"}"#).unwrap();
        assert_eq!(ep.url(), Some("https://a/whip"));
    }

    #[test]
    fn test_whip_endpoint_snake_case() {
        let ep: WhipEndpoint = serde_json::from_str(r#"{"whip_url":"https://b/whip"}"#).unwrap();
        assert_eq!(ep.url(), Some("https://b/whip"));
    }

    #[test]
    fn test_whip_endpoint_prefers_camel_case() {
        let ep: WhipEndpoint =
            serde_json::from_str(r#"{"whipUrl":"https://a","whip_url":"https://b"}"#).unwrap();
        assert_eq!(ep.url(), Some("https://a"));

        let ep: WhipEndpoint =
            serde_json::from_str(r#"{"whipUrl":"","whip_url":"https://b"}"#).unwrap();
        assert_eq!(ep.url(), Some("https://b"));
    }

    #[test]
    fn test_whip_endpoint_missing() {
        let ep: WhipEndpoint = serde_json::from_str(r#"{"status":"ok"}"#).unwrap();
        assert_eq!(ep.url(), None);
    }

    #[test]
    fn test_error_body_message() {
        let body: ErrorBody = serde_json::from_str(r#"{"message":"nope","error":"x"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("nope"));

        let body: ErrorBody = serde_json::from_str(r#"{"error":"bad token"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("bad token"));

        let body: ErrorBody = serde_json::from_str(r#"{}"#).unwrap();
        assert!(body.into_message().is_none());
    }
}
