//! Error types for the publisher

/// Result type alias using the crate error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by publishing and by the lesson API client
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Capture device missing or permission denied
    #[error("Media access error: {0}")]
    MediaAccess(String),

    /// Local or remote session description could not be created/applied
    #[error("Negotiation error: {0}")]
    Negotiation(String),

    /// Ingest endpoint answered with a non-success status
    #[error("WHIP publish failed: {status}")]
    PublishRejected { status: u16 },

    /// Request could not be sent or its response not read
    #[error("Network error: {0}")]
    Network(String),

    /// Ingest URL is empty, malformed or uses a disallowed scheme
    #[error("Invalid ingest URL: {0}")]
    InvalidUrl(String),

    /// A session is already acquiring, negotiating or publishing
    #[error("A broadcast is already in progress")]
    AlreadyPublishing,

    /// The attempt was superseded by stop() before it completed
    #[error("Publish attempt aborted")]
    Aborted,

    /// REST API returned a non-success status
    #[error("{message}")]
    Api { status: u16, message: String },

    /// REST API response carried no ingest URL
    #[error("No ingest URL returned for lesson")]
    MissingIngestUrl,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used for stats and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    MediaAccess,
    Negotiation,
    PublishRejected,
    Network,
    Usage,
    Aborted,
    Api,
}

/// Language of operator-facing messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    English,
    Arabic,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::MediaAccess(_) => ErrorKind::MediaAccess,
            Error::Negotiation(_) => ErrorKind::Negotiation,
            Error::PublishRejected { .. } => ErrorKind::PublishRejected,
            Error::Network(_) | Error::Io(_) => ErrorKind::Network,
            Error::InvalidUrl(_) | Error::AlreadyPublishing => ErrorKind::Usage,
            Error::Aborted => ErrorKind::Aborted,
            Error::Api { .. } | Error::MissingIngestUrl => ErrorKind::Api,
        }
    }

    /// Whether an operator retry could plausibly succeed.
    ///
    /// Nothing is retried automatically.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(_) | Error::Io(_) => true,
            Error::PublishRejected { status } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// Short message suitable for showing next to the broadcast controls.
    pub fn user_message(&self, locale: Locale) -> String {
        match (locale, self) {
            (Locale::English, Error::MediaAccess(_)) => {
                "Camera or microphone is unavailable.".to_string()
            }
            (Locale::Arabic, Error::MediaAccess(_)) => "تعذر الوصول إلى الكاميرا أو الميكروفون.".to_string(),
            (Locale::English, Error::PublishRejected { status }) => {
                format!("WHIP publish failed: {}", status)
            }
            (Locale::Arabic, Error::PublishRejected { status }) => {
                format!("رفض خادم البث الطلب: {}", status)
            }
            (Locale::English, Error::Network(_) | Error::Io(_)) => {
                "Could not reach the streaming server.".to_string()
            }
            (Locale::Arabic, Error::Network(_) | Error::Io(_)) => "تعذر الاتصال بخادم البث.".to_string(),
            (Locale::English, Error::MissingIngestUrl) => {
                "Could not get the broadcast link.".to_string()
            }
            (Locale::Arabic, Error::MissingIngestUrl) => "تعذر الحصول على رابط البث.".to_string(),
            (_, Error::Api { message, .. }) => message.clone(),
            (Locale::English, _) => "Could not start the broadcast.".to_string(),
            (Locale::Arabic, _) => "تعذر بدء البث.".to_string(),
        }
    }

    pub(crate) fn network(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }

    pub(crate) fn negotiation(context: &str, err: impl std::fmt::Display) -> Self {
        Error::Negotiation(format!("{}: {}", context, err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::PublishRejected { status: 500 };
        assert_eq!(err.to_string(), "WHIP publish failed: 500");

        let err = Error::MediaAccess("permission denied".into());
        assert_eq!(err.to_string(), "Media access error: permission denied");
    }

    #[test]
    fn test_error_kind() {
        assert_eq!(Error::MediaAccess("x".into()).kind(), ErrorKind::MediaAccess);
        assert_eq!(Error::Negotiation("x".into()).kind(), ErrorKind::Negotiation);
        assert_eq!(
            Error::PublishRejected { status: 403 }.kind(),
            ErrorKind::PublishRejected
        );
        assert_eq!(Error::Network("x".into()).kind(), ErrorKind::Network);
        assert_eq!(Error::AlreadyPublishing.kind(), ErrorKind::Usage);
        assert_eq!(Error::Aborted.kind(), ErrorKind::Aborted);
    }

    #[test]
    fn test_error_is_retryable() {
        assert!(Error::Network("reset".into()).is_retryable());
        assert!(Error::PublishRejected { status: 503 }.is_retryable());
        assert!(!Error::PublishRejected { status: 401 }.is_retryable());
        assert!(!Error::MediaAccess("denied".into()).is_retryable());
    }

    #[test]
    fn test_user_message() {
        let err = Error::PublishRejected { status: 500 };
        assert_eq!(err.user_message(Locale::English), "WHIP publish failed: 500");

        let err = Error::Negotiation("bad sdp".into());
        assert_eq!(err.user_message(Locale::Arabic), "تعذر بدء البث.");

        let err = Error::Api {
            status: 422,
            message: "Lesson is not scheduled".into(),
        };
        assert_eq!(err.user_message(Locale::Arabic), "Lesson is not scheduled");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io(_)));
    }
}
