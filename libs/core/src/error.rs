use thiserror::Error;

/// Why an inbound request failed the signing check.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("missing or unreadable header {0}")]
    MissingHeader(&'static str),
    #[error("timestamp is not a unix second count")]
    BadTimestamp,
    #[error("timestamp outside the replay window")]
    StaleTimestamp,
    #[error("signature header is not v0=<hex digest>")]
    BadSignature,
    #[error("signature mismatch")]
    Mismatch,
}

/// Top-level failure of one webhook invocation.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("verification failed: {0}")]
    Auth(#[from] AuthError),
    #[error("malformed event payload: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("outbound notification failed: {0}")]
    Dispatch(#[from] NotifyError),
}

/// A Slack Web API call failed.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("slack transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("slack api: {0}")]
    Api(String),
}

/// A DocBase fetch failed.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("docbase transport: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("docbase api returned status {0}")]
    Status(u16),
}
