use reqwest::StatusCode;

/// Failure talking to a GameTaverns server.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-2xx status. `message` is the `error`
    /// field of the envelope when the body had one, the raw body otherwise.
    #[error("{status}: {message}")]
    Api { status: StatusCode, message: String },
    #[error("could not encode request: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("API key not set")]
    MissingApiKey,
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Api { status, .. } => Some(*status),
            Self::Http(e) => e.status(),
            Self::Encode(_) | Self::MissingApiKey => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }
}
