//! Publisher configuration

use std::time::Duration;

use url::Url;

use crate::error::{Error, Locale, Result};
use crate::media::{MediaConstraints, PreviewOptions};

/// Publisher configuration options
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Media kinds requested from the capture devices
    pub constraints: MediaConstraints,

    /// How the preview renders the capture
    pub preview: PreviewOptions,

    /// Accept plain `http://` ingest URLs
    pub allow_insecure: bool,

    /// Bearer token sent with the WHIP request
    pub bearer_token: Option<String>,

    /// WHIP request timeout (None = transport default)
    pub request_timeout: Option<Duration>,

    /// Send a WHIP DELETE for the session resource on stop
    pub terminate_on_stop: bool,

    /// Capacity of the event channel
    pub event_capacity: usize,

    /// Language of user-facing error messages
    pub locale: Locale,
}

impl Default for PublisherConfig {
    fn default() -> Self {
        Self {
            constraints: MediaConstraints::audio_video(),
            preview: PreviewOptions::default(),
            allow_insecure: false,
            bearer_token: None,
            request_timeout: None,
            terminate_on_stop: false,
            event_capacity: 256,
            locale: Locale::default(),
        }
    }
}

impl PublisherConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested media kinds
    pub fn constraints(mut self, constraints: MediaConstraints) -> Self {
        self.constraints = constraints;
        self
    }

    /// Allow `http://` ingest URLs (local development)
    pub fn allow_insecure(mut self, allow: bool) -> Self {
        self.allow_insecure = allow;
        self
    }

    /// Authenticate the WHIP request with a bearer token
    pub fn bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Bound the WHIP request duration
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Delete the WHIP resource when the broadcast stops
    pub fn terminate_on_stop(mut self, enabled: bool) -> Self {
        self.terminate_on_stop = enabled;
        self
    }

    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Parse and check an ingest URL.
    pub fn validate_ingest_url(&self, raw: &str) -> Result<Url> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(Error::InvalidUrl("empty URL".into()));
        }

        let url = Url::parse(raw).map_err(|e| Error::InvalidUrl(format!("{}: {}", raw, e)))?;

        match url.scheme() {
            "https" => Ok(url),
            "http" if self.allow_insecure => Ok(url),
            scheme => Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                scheme, raw
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PublisherConfig::default();

        assert_eq!(config.constraints, MediaConstraints::audio_video());
        assert!(config.preview.muted);
        assert!(config.preview.autoplay);
        assert!(!config.preview.controls);
        assert!(!config.allow_insecure);
        assert!(config.bearer_token.is_none());
        assert!(config.request_timeout.is_none());
        assert!(!config.terminate_on_stop);
        assert_eq!(config.event_capacity, 256);
    }

    #[test]
    fn test_builder_chaining() {
        let config = PublisherConfig::new()
            .constraints(MediaConstraints::audio_only())
            .allow_insecure(true)
            .bearer_token("secret")
            .request_timeout(Duration::from_secs(10))
            .terminate_on_stop(true)
            .event_capacity(0)
            .locale(Locale::Arabic);

        assert!(!config.constraints.video);
        assert!(config.allow_insecure);
        assert_eq!(config.bearer_token.as_deref(), Some("secret"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(10)));
        assert!(config.terminate_on_stop);
        // Capacity is clamped to at least one
        assert_eq!(config.event_capacity, 1);
        assert_eq!(config.locale, Locale::Arabic);
    }

    #[test]
    fn test_validate_https_url() {
        let config = PublisherConfig::default();
        let url = config
            .validate_ingest_url(" https://ingest.example.com/whip/live ")
            .unwrap();

        assert_eq!(url.host_str(), Some("ingest.example.com"));
        assert_eq!(url.path(), "/whip/live");
    }

    #[test]
    fn test_validate_rejects_empty() {
        let config = PublisherConfig::default();
        assert!(matches!(
            config.validate_ingest_url("   "),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_rejects_garbage() {
        let config = PublisherConfig::default();
        assert!(matches!(
            config.validate_ingest_url("not a url"),
            Err(Error::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_validate_http_requires_opt_in() {
        let config = PublisherConfig::default();
        assert!(config.validate_ingest_url("http://127.0.0.1:8080/whip").is_err());

        let config = config.allow_insecure(true);
        assert!(config.validate_ingest_url("http://127.0.0.1:8080/whip").is_ok());
        assert!(config.validate_ingest_url("rtmp://127.0.0.1/live").is_err());
    }
}
